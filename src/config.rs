//! Locations of the two source tables.

use anyhow::{Context, Result};
use serde::Deserialize;

pub const RECORDS_ENV: &str = "MTZ_RECORDS";
pub const LOOKUP_ENV: &str = "MTZ_LOOKUP";
pub const DEFAULT_RECORDS: &str = "data/sap_data.csv";
pub const DEFAULT_LOOKUP: &str = "data/artikel_pruefung.csv";

/// Where the record table and the ticket lookup table live.
///
/// Can be stored as a JSON file:
/// ```json
/// {
///   "records": "data/sap_data.csv.gz",
///   "lookup": "https://intranet.example/artikel_pruefung.csv",
///   "delimiter": ";",
///   "lookup_delimiter": ","
/// }
/// ```
///
/// `lookup_delimiter` defaults to `delimiter`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DataSources {
    pub records: String,
    pub lookup: String,
    #[serde(default = "default_delimiter", deserialize_with = "de_delimiter")]
    pub delimiter: u8,
    #[serde(default, deserialize_with = "de_optional_delimiter")]
    pub lookup_delimiter: Option<u8>,
}

impl DataSources {
    pub fn new(records: impl Into<String>, lookup: impl Into<String>) -> Self {
        Self {
            records: records.into(),
            lookup: lookup.into(),
            delimiter: default_delimiter(),
            lookup_delimiter: None,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_lookup_delimiter(mut self, delimiter: u8) -> Self {
        self.lookup_delimiter = Some(delimiter);
        self
    }

    /// Delimiter of the lookup table.
    pub fn lookup_delimiter(&self) -> u8 {
        self.lookup_delimiter.unwrap_or(self.delimiter)
    }

    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("failed to read config '{path}'"))?;
        let sources: DataSources =
            serde_json::from_str(&content).with_context(|| format!("invalid config '{path}'"))?;
        Ok(sources)
    }

    /// Resolves locations from `env`, falling back to the defaults under `data/`.
    pub fn from_lookup<F>(env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::new(
            env(RECORDS_ENV).unwrap_or_else(|| DEFAULT_RECORDS.to_string()),
            env(LOOKUP_ENV).unwrap_or_else(|| DEFAULT_LOOKUP.to_string()),
        )
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

fn default_delimiter() -> u8 {
    b','
}

/// Parses a single-byte delimiter such as `,`, `;` or `\t`.
pub fn parse_delimiter(raw: &str) -> Result<u8, String> {
    match raw {
        "\\t" | "tab" => Ok(b'\t'),
        s if s.len() == 1 => Ok(s.as_bytes()[0]),
        other => Err(format!("delimiter must be a single byte, got '{other}'")),
    }
}

fn de_delimiter<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_delimiter(&raw).map_err(serde::de::Error::custom)
}

fn de_optional_delimiter<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| parse_delimiter(&raw).map_err(serde::de::Error::custom))
        .transpose()
}
