//! Memoization of the loaded dataset.
//!
//! Loading (fetch, join, derive) is the only expensive step. The cache keeps
//! the last dataset together with a fingerprint of its sources and reloads
//! only when the fingerprint changes or the cache is invalidated.

use anyhow::{Context, Result, anyhow};
use std::time::SystemTime;
use tracing::{debug, info};

use crate::config::DataSources;
use crate::fetch::is_remote;
use crate::parser::Dataset;

/// Identity of one source at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFingerprint {
    pub location: String,
    pub len: Option<u64>,
    pub modified: Option<SystemTime>,
}

impl SourceFingerprint {
    /// Local files are identified by path, size and modification time.
    /// Remote sources are identified by URL only.
    pub fn of(location: &str) -> Result<Self> {
        if is_remote(location) {
            return Ok(Self {
                location: location.to_string(),
                len: None,
                modified: None,
            });
        }

        let meta = std::fs::metadata(location)
            .with_context(|| format!("failed to stat '{location}'"))?;
        Ok(Self {
            location: location.to_string(),
            len: Some(meta.len()),
            modified: meta.modified().ok(),
        })
    }
}

/// Cache key covering both source tables and the delimiters they are read with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    pub records: SourceFingerprint,
    pub lookup: SourceFingerprint,
    pub delimiter: u8,
    pub lookup_delimiter: u8,
}

impl CacheKey {
    pub fn for_sources(sources: &DataSources) -> Result<Self> {
        Ok(Self {
            records: SourceFingerprint::of(&sources.records)?,
            lookup: SourceFingerprint::of(&sources.lookup)?,
            delimiter: sources.delimiter,
            lookup_delimiter: sources.lookup_delimiter(),
        })
    }
}

/// Holds at most one loaded dataset.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entry: Option<(CacheKey, Dataset)>,
    loads: usize,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached dataset for `key`, running `load` when the cache is
    /// empty or holds a dataset for a different key.
    pub fn get_or_load<F>(&mut self, key: CacheKey, load: F) -> Result<&Dataset>
    where
        F: FnOnce() -> Result<Dataset>,
    {
        let fresh = matches!(&self.entry, Some((cached, _)) if *cached == key);
        if fresh {
            debug!("Dataset cache hit");
        } else {
            if self.entry.is_some() {
                info!("Sources changed, reloading dataset");
            }
            let dataset = load()?;
            self.entry = Some((key, dataset));
            self.loads += 1;
        }

        self.entry
            .as_ref()
            .map(|(_, dataset)| dataset)
            .ok_or_else(|| anyhow!("dataset cache is empty after load"))
    }

    /// Drops the cached dataset; the next access reloads.
    pub fn invalidate(&mut self) {
        if self.entry.take().is_some() {
            debug!("Dataset cache invalidated");
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.entry.is_some()
    }

    /// Number of loads performed so far.
    pub fn loads(&self) -> usize {
        self.loads
    }
}
