use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::manifest::DeploymentManifest;

/// Where an [`InstalledBundle`] lives on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    /// Global, per-user store.
    User,
    /// Legacy scope: same root as `User`, keyed by workspace.
    Workspace,
    /// Under `<workspaceRoot>/.github/`.
    Repository,
}

/// Repository-scope sub-state: whether installed files are meant to be
/// version-controlled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitMode {
    /// Files are left visible to version control.
    Commit,
    /// Files are appended to `.git/info/exclude`.
    LocalOnly,
}

/// A record of a materialised bundle.
///
/// Uniqueness key: `(bundle_id, scope)` — reinstallation replaces the
/// record atomically, it never accumulates duplicates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstalledBundle {
    /// The exact versioned id stored at install time (for release-hosted
    /// sources this includes the tag, e.g. `owner-repo-v1.0.0`).
    pub bundle_id: String,
    /// Installed version string.
    pub version: String,
    /// ISO-8601 install timestamp.
    pub installed_at: String,
    /// Installation scope.
    pub scope: Scope,
    /// Commit mode, only meaningful when `scope == Scope::Repository`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_mode: Option<CommitMode>,
    /// Absolute install path.
    pub install_path: Utf8PathBuf,
    /// The deployment manifest used to materialise this bundle, stored
    /// verbatim for later uninstall/modification-detection.
    pub manifest: DeploymentManifest,
    /// Id of the source this bundle was installed from.
    pub source_id: String,
    /// Kind of the source this bundle was installed from, stored as a
    /// plain string so this record survives a source being later removed.
    pub source_type: String,
    /// Profile this install belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
    /// Per-file SHA-256 checksums computed right after install, keyed by
    /// path relative to `install_path`.
    #[serde(default)]
    pub file_checksums: BTreeMap<String, String>,
}
