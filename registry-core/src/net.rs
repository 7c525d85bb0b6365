//! Centralized logic for building the HTTP client used by every adapter,
//! to ensure uniform configuration (timeouts, user agent, redirect policy).

use crate::errors::RegistryResult;

/// Settings shared by every HTTP request this crate makes.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Per-request deadline for metadata calls (default 30s, per §5).
    pub metadata_timeout: std::time::Duration,
    /// Per-request deadline for bundle downloads (default 5min, per §5).
    pub download_timeout: std::time::Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            metadata_timeout: std::time::Duration::from_secs(30),
            download_timeout: std::time::Duration::from_secs(5 * 60),
        }
    }
}

/// Build a `reqwest::Client` with redirects disabled.
///
/// Adapters follow redirects manually (see `adapters::release_hosted`) so
/// that the `Authorization` header can be dropped/restored per hop based on
/// the trusted-host predicate; reqwest's built-in redirect policy would
/// carry the header across every hop unconditionally.
pub fn build_client(settings: &ClientSettings) -> RegistryResult<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(settings.download_timeout)
        .user_agent(concat!("bundle-registry/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| crate::errors::RegistryError::Network {
            message: e.to_string(),
        })
}
