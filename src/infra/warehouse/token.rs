use anyhow::{Result, bail};
use std::collections::HashMap;

/// Header set by the hosting proxy with the signed-in user's token.
pub const ACCESS_TOKEN_HEADER: &str = "X-Forwarded-Access-Token";

/// Fallback for local runs without a proxy.
pub const ACCESS_TOKEN_ENV: &str = "ACCESS_TOKEN";

/// Returns the token from the request header when present (header names
/// compare case-insensitively), else from [`ACCESS_TOKEN_ENV`].
pub fn resolve_access_token<F>(headers: Option<&HashMap<String, String>>, env: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let from_header = headers.and_then(|h| {
        h.iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(ACCESS_TOKEN_HEADER))
            .map(|(_, value)| value.trim().to_string())
    });

    match from_header.filter(|t| !t.is_empty()).or_else(|| env(ACCESS_TOKEN_ENV)) {
        Some(token) if !token.trim().is_empty() => Ok(token),
        _ => bail!("no access token: neither {ACCESS_TOKEN_HEADER} header nor {ACCESS_TOKEN_ENV} is set"),
    }
}
