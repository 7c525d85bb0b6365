//! `cache/sources/<sid>.json`: a source's last-synced bundle list.

use bundle_registry_schema::Bundle;
use serde::{Deserialize, Serialize};

/// A single source's cached bundle list, as written by `RegistryManager::sync_source`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCache {
    /// Id of the source this cache belongs to.
    pub source_id: String,
    /// Bundles advertised by the source as of the last sync.
    pub bundles: Vec<Bundle>,
}
