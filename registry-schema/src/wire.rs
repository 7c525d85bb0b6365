//! Wire-format types for the remote protocols source adapters speak.
//!
//! These are deliberately kept separate from the domain types ([`crate::Bundle`]
//! and friends) because the wire shape is owned by the remote service, not
//! by us; adapters translate from these into domain types.

pub mod github;

use serde::{Deserialize, Serialize};

/// A collection descriptor, as read by the content-tree (awesome-copilot
/// style) adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    /// Version-independent collection id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Collection version.
    pub version: String,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Items (prompt/instruction files) declared by this collection.
    #[serde(default)]
    pub items: Vec<CollectionItem>,
}

/// One item declared by a [`CollectionDescriptor`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionItem {
    /// Path of the item, relative to the collection root.
    pub path: String,
    /// Item kind, e.g. `prompt` or `instruction`.
    pub kind: String,
}
