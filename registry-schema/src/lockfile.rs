use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{LOCKFILE_SCHEMA_URL, LOCKFILE_SCHEMA_VERSION};

/// A per-repository JSON document pinning the exact installed state.
///
/// Serialised with stable (`BTreeMap`) key ordering, two-space indent and a
/// trailing newline by `LockfileStore::write` in `bundle-registry-core`;
/// this type only carries the shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lockfile {
    /// Schema URL for editor tooling / validators.
    #[serde(rename = "$schema")]
    pub schema: String,
    /// Schema version, bumped on breaking shape changes.
    pub version: u32,
    /// ISO-8601 generation timestamp.
    pub generated_at: String,
    /// Name/version of the tool that generated this lockfile.
    pub generated_by: GeneratedBy,
    /// Installed bundles, keyed by `bundleId`.
    #[serde(default)]
    pub bundles: BTreeMap<String, LockedBundle>,
    /// Sources referenced by the locked bundles, keyed by `sourceId`.
    #[serde(default)]
    pub sources: BTreeMap<String, LockedSource>,
    /// Optional hub bookkeeping, opaque to the lockfile writer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hubs: Option<BTreeMap<String, serde_json::Value>>,
}

impl Lockfile {
    /// An empty lockfile stamped with the current schema version.
    pub fn new(generated_at: impl Into<String>, generated_by: GeneratedBy) -> Self {
        Self {
            schema: LOCKFILE_SCHEMA_URL.to_string(),
            version: LOCKFILE_SCHEMA_VERSION,
            generated_at: generated_at.into(),
            generated_by,
            bundles: BTreeMap::new(),
            sources: BTreeMap::new(),
            hubs: None,
        }
    }
}

/// Name/version of the tool that produced a [`Lockfile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedBy {
    /// Tool name.
    pub name: String,
    /// Tool version.
    pub version: String,
}

/// One locked bundle entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockedBundle {
    /// Installed version.
    pub version: String,
    /// Id of the source this bundle was installed from.
    pub source_id: String,
    /// Per-file SHA-256 checksums, keyed by path relative to the install root.
    pub files: BTreeMap<String, String>,
    /// ISO-8601 install timestamp.
    pub installed_at: String,
}

/// One locked source entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockedSource {
    /// Source kind, stored as the same string used in `Source::kind`'s wire form.
    #[serde(rename = "type")]
    pub kind: String,
    /// Source URL at lock time.
    pub url: String,
}
