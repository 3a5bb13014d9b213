//! Reading source tables from disk or over HTTP.
//!
//! Locations ending in `.gz` are gunzipped after reading.

mod basic;
mod client;

pub use basic::{FileFetcher, HttpFetcher, SourceFetcher, is_remote};
pub use client::Fetcher;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::io::Read;

/// Fetches `location` and decompresses it when it is gzip-encoded.
#[tracing::instrument(skip(fetcher))]
pub fn fetch_table<F: Fetcher + ?Sized>(fetcher: &F, location: &str) -> Result<Vec<u8>> {
    let bytes = fetcher.fetch(location)?;
    if !location.ends_with(".gz") {
        return Ok(bytes);
    }

    let mut decoded = Vec::new();
    GzDecoder::new(bytes.as_slice())
        .read_to_end(&mut decoded)
        .with_context(|| format!("failed to gunzip '{location}'"))?;
    Ok(decoded)
}
