//! GitHub Releases API response shapes.
//!
//! Grounded on the release-hosted fetch path of a self-updater that talks
//! to the same endpoints: `GET /repos/{owner}/{repo}/releases[/latest|/tags/{tag}]`.

use serde::{Deserialize, Serialize};

/// A single GitHub release, as returned by the Releases API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubRelease {
    /// The tag this release represents, verbatim (may carry a `v` prefix).
    pub tag_name: String,
    /// Release title. Empty string when the release has no title.
    #[serde(default)]
    pub name: String,
    /// Free-form release notes body, scanned for `environments:`/`tags:` hints.
    #[serde(default)]
    pub body: Option<String>,
    /// Assets attached to this release.
    #[serde(default)]
    pub assets: Vec<GithubAsset>,
    /// Whether this release is marked as a prerelease.
    #[serde(default)]
    pub prerelease: bool,
    /// ISO-8601 publish timestamp.
    #[serde(default)]
    pub published_at: Option<String>,
    /// The HTML page for this release.
    #[serde(default)]
    pub html_url: Option<String>,
}

/// A single asset attached to a [`GithubRelease`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubAsset {
    /// The API URL for this asset (used for authenticated, content-negotiated downloads).
    pub url: String,
    /// The public CDN download URL for this asset.
    pub browser_download_url: String,
    /// The asset's file name, e.g. `deployment-manifest.yml` or `bundle.zip`.
    pub name: String,
    /// Declared size in bytes.
    #[serde(default)]
    pub size: u64,
}

impl GithubRelease {
    /// Locate the deployment-manifest asset among this release's assets,
    /// accepting either a `.yml` or `.yaml` extension.
    pub fn manifest_asset(&self) -> Option<&GithubAsset> {
        self.assets.iter().find(|a| {
            a.name == "deployment-manifest.yml" || a.name == "deployment-manifest.yaml"
        })
    }

    /// Locate the archive asset among this release's assets, accepting
    /// either a `.zip` or `.tar.gz` extension.
    pub fn archive_asset(&self) -> Option<&GithubAsset> {
        self.assets
            .iter()
            .find(|a| a.name.ends_with(".zip") || a.name.ends_with(".tar.gz"))
    }
}
