use serde::{Deserialize, Serialize};

/// A version of a deployable artifact advertised by a source.
///
/// Bundles are pure descriptions: installing one materialises it via the
/// [`crate::DeploymentManifest`] it references, but the `Bundle` itself
/// owns no filesystem state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    /// Unique id within the installation. For release-hosted sources this
    /// encodes `owner-repo-tag` (see [`BundleIdentity`]).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Semver-ish version string, as advertised by the source.
    pub version: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Author or maintainer, as advertised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Id of the [`crate::Source`] this bundle came from.
    pub source_id: String,
    /// Environment tags (`production`, `staging`, ...), parsed from release notes
    /// for release-hosted sources.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environments: Vec<String>,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// ISO-8601 last-updated timestamp, as advertised by the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// Size in bytes of the download artifact, when known up front.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// License identifier, when advertised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// URL of the deployment manifest asset.
    pub manifest_url: String,
    /// URL of the archive asset to download.
    pub download_url: String,
    /// Origin repository, e.g. `owner/repo`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

/// A source-type-aware identity used to group versions of one bundle.
///
/// Two [`Bundle`]s are the "same bundle, different version" iff their
/// identities are equal; see `VersionManager::extract_bundle_identity`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BundleIdentity(pub String);

impl std::fmt::Display for BundleIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
