//! HTTP Client Factory
//!
//! Builds the reqwest client used by providers, with optional proxy support.

use std::time::Duration;

use politisight_core::proxy::ProxyConfig;

use crate::types::{LlmError, LlmResult};

/// Connection timeout. Request duration is left to the server's own limits.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Build a `reqwest::Client` with the resolved proxy configuration.
///
/// - `Some(proxy)` -> route every request through the proxy
/// - `None` -> use the environment's default proxy behaviour
pub fn build_http_client(proxy: Option<&ProxyConfig>) -> LlmResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder().connect_timeout(CONNECT_TIMEOUT);
    if let Some(cfg) = proxy {
        cfg.validate()
            .map_err(|message| LlmError::InvalidRequest { message })?;
        let mut p = reqwest::Proxy::all(cfg.url()).map_err(|e| LlmError::InvalidRequest {
            message: format!("invalid proxy URL: {}", e),
        })?;
        if let (Some(u), Some(pw)) = (&cfg.username, &cfg.password) {
            p = p.basic_auth(u, pw);
        }
        builder = builder.proxy(p);
    }
    builder.build().map_err(|e| LlmError::NetworkError {
        message: format!("failed to build HTTP client: {}", e),
    })
}
