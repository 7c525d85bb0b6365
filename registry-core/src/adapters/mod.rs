//! Source adapters (§4.1): per-protocol discovery, auth, download.
//!
//! Polymorphic over the capability set {`validate`, `fetch_bundles`,
//! `fetch_metadata`, `download_bundle`, `manifest_url`, `download_url`}.

pub mod auth;
pub mod content_tree;
pub mod http_catalog;
pub mod local;
pub mod release_hosted;

use async_trait::async_trait;
use bundle_registry_schema::{Bundle, DeploymentManifest};

use crate::errors::RegistryResult;

/// The per-protocol driver behind one [`bundle_registry_schema::Source`].
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Check that the source is reachable/well-formed. Implementations may
    /// warn (non-fatally) if the source currently advertises zero bundles.
    async fn validate(&self) -> RegistryResult<()>;

    /// Enumerate every bundle this source currently advertises.
    async fn fetch_bundles(&self) -> RegistryResult<Vec<Bundle>>;

    /// Fetch the deployment manifest for one bundle.
    async fn fetch_metadata(&self, bundle: &Bundle) -> RegistryResult<DeploymentManifest>;

    /// Download one bundle's archive, binary-safe.
    async fn download_bundle(&self, bundle: &Bundle) -> RegistryResult<Vec<u8>>;

    /// The manifest URL for a bundle, without fetching it.
    fn manifest_url(&self, bundle: &Bundle) -> String {
        bundle.manifest_url.clone()
    }

    /// The download URL for a bundle, without fetching it.
    fn download_url(&self, bundle: &Bundle) -> String {
        bundle.download_url.clone()
    }
}

/// Maximum redirect hops a release-hosted download will follow (§4.1, §8).
pub const MAX_REDIRECTS: usize = 10;

/// The trusted-host domain set used to decide whether an `Authorization`
/// header should be attached to a given hop.
pub const GITHUB_TRUSTED_HOSTS: &[&str] = &["github.com", "api.github.com", "*.githubusercontent.com"];

/// GitLab's trusted-host domain set.
pub const GITLAB_TRUSTED_HOSTS: &[&str] = &["gitlab.com", "*.gitlab.com"];

/// Extract a best-effort human snippet from an HTML error page, for use in
/// [`crate::errors::RegistryError::HtmlResponse`].
pub fn html_snippet(body: &str) -> String {
    let text: String = body
        .split(['<', '>'])
        .filter(|chunk| !chunk.is_empty() && !chunk.contains('='))
        .collect::<Vec<_>>()
        .join(" ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_human_snippet_from_html() {
        let html = "<html><body>Access denied</body></html>";
        assert_eq!(html_snippet(html), "html body Access denied body html");
    }
}
