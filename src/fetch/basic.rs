use anyhow::{Context, Result};
use std::time::Duration;
use tracing::debug;

use super::client::Fetcher;

/// Reads sources from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileFetcher;

impl Fetcher for FileFetcher {
    fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        debug!(path = location, "Reading local source");
        std::fs::read(location).with_context(|| format!("failed to read '{location}'"))
    }
}

/// Downloads sources over HTTP(S) with a blocking client.
pub struct HttpFetcher(reqwest::blocking::Client);

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self(client))
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        debug!(url = location, "Downloading source");
        let response = self
            .0
            .get(location)
            .send()
            .with_context(|| format!("failed to request '{location}'"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            anyhow::bail!("'{location}' returned status {status}: {body}");
        }

        Ok(response.bytes()?.to_vec())
    }
}

/// Dispatches to [`HttpFetcher`] for `http(s)://` locations and to
/// [`FileFetcher`] for everything else.
pub struct SourceFetcher {
    http: HttpFetcher,
}

impl SourceFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: HttpFetcher::new()?,
        })
    }
}

impl Fetcher for SourceFetcher {
    fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        if is_remote(location) {
            self.http.fetch(location)
        } else {
            FileFetcher.fetch(location)
        }
    }
}

/// True for `http://` and `https://` locations.
pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}
