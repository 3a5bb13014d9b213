use anyhow::{Result, anyhow};

/// Warehouse coordinates taken from `SNOWFLAKE_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseConfig {
    pub account: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    pub role: String,
}

impl WarehouseConfig {
    /// Reads every setting through `env`. The first missing or empty
    /// variable aborts with an error naming it.
    pub fn from_lookup<F>(env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            env(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("{key} must be set"))
        };

        Ok(Self {
            account: require("SNOWFLAKE_ACCOUNT")?,
            warehouse: require("SNOWFLAKE_WAREHOUSE")?,
            database: require("SNOWFLAKE_DATABASE")?,
            schema: require("SNOWFLAKE_SCHEMA")?,
            role: require("SNOWFLAKE_ROLE")?,
        })
    }
}
