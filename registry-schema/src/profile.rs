use serde::{Deserialize, Serialize};

/// A named set of bundle pins, at most one of which is active per hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Unique profile id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Whether this is the currently active profile for its hub.
    pub active: bool,
    /// Hub this profile belongs to, if scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hub_id: Option<String>,
    /// Pinned bundle entries.
    #[serde(default)]
    pub entries: Vec<ProfileEntry>,
}

/// One pinned `(bundle, version, source)` entry within a [`Profile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileEntry {
    /// Bundle identity (version-independent) this entry pins.
    pub bundle_id: String,
    /// Pinned version.
    pub version: String,
    /// Source id this entry resolves against.
    pub source_id: String,
    /// Whether activation fails if this entry cannot be satisfied.
    #[serde(default)]
    pub required: bool,
}
