use anyhow::Result;

/// Reads the raw bytes behind a source location.
pub trait Fetcher {
    fn fetch(&self, location: &str) -> Result<Vec<u8>>;
}
