//! Bootstrap settings for the remote analytical warehouse.
//!
//! [`WarehouseConfig`] reads account, warehouse, database, schema and role
//! from the environment. [`resolve_access_token`] picks the OAuth token from
//! the forwarded request header or the environment. [`bootstrap`] combines
//! both into [`ConnectionParams`]. No connection is opened here.

mod config;
mod token;

pub use config::WarehouseConfig;
pub use token::{ACCESS_TOKEN_HEADER, resolve_access_token};

use anyhow::Result;
use std::collections::HashMap;
use std::fmt;

/// Everything needed to open an OAuth session against the warehouse.
pub struct ConnectionParams {
    pub config: WarehouseConfig,
    pub authenticator: &'static str,
    pub token: String,
}

impl fmt::Display for ConnectionParams {
    /// Renders the settings with the token redacted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "account={} warehouse={} database={} schema={} role={} authenticator={} token=<{} chars>",
            self.config.account,
            self.config.warehouse,
            self.config.database,
            self.config.schema,
            self.config.role,
            self.authenticator,
            self.token.len()
        )
    }
}

/// Resolves the token and the warehouse settings, failing on the first
/// missing value.
pub fn bootstrap<F>(headers: Option<&HashMap<String, String>>, env: F) -> Result<ConnectionParams>
where
    F: Fn(&str) -> Option<String>,
{
    let token = resolve_access_token(headers, &env)?;
    let config = WarehouseConfig::from_lookup(&env)?;
    Ok(ConnectionParams {
        config,
        authenticator: "oauth",
        token,
    })
}
