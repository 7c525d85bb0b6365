use serde::{Deserialize, Serialize};

/// A named remote origin that advertises bundles.
///
/// Created, mutated and destroyed only by user action; destroying a source
/// cascade-clears its cached bundle list (enforced by the storage layer,
/// not by this type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Opaque, globally-unique identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// The protocol driver this source uses.
    #[serde(rename = "type")]
    pub kind: SourceKind,
    /// The origin URL (repository URL, API base, or local path).
    pub url: String,
    /// Whether this source participates in sync/search.
    pub enabled: bool,
    /// Ordering hint when multiple sources advertise the same bundle identity.
    pub priority: i64,
    /// Type-specific configuration (branch, collections path, ...).
    #[serde(default)]
    pub config: SourceConfig,
    /// Opaque bearer token, explicitly configured by the user.
    ///
    /// Whitespace-only strings are treated as absent by the auth fallback
    /// chain, never here; this field stores exactly what the user typed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Adapter variant a [`Source`] is driven by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// GitHub releases, one bundle per tagged release.
    GithubRelease,
    /// Awesome-copilot style collection-descriptor tree, remote.
    AwesomeCopilot,
    /// Awesome-copilot style collection-descriptor tree, local filesystem.
    LocalAwesomeCopilot,
    /// A plain local directory of bundles.
    Local,
    /// GitLab releases, one bundle per tagged release.
    GitlabRelease,
    /// A generic HTTP catalog endpoint.
    Http,
}

impl SourceKind {
    /// Whether this kind is a release-hosted (tag-per-version) adapter.
    pub fn is_release_hosted(self) -> bool {
        matches!(self, SourceKind::GithubRelease | SourceKind::GitlabRelease)
    }

    /// Whether this kind is a content-tree (version-independent id) adapter.
    pub fn is_content_tree(self) -> bool {
        matches!(
            self,
            SourceKind::AwesomeCopilot | SourceKind::LocalAwesomeCopilot
        )
    }
}

/// Type-specific configuration carried by a [`Source`].
///
/// Internally tagged so that persisted JSON self-describes which variant it
/// is; the storage layer validates this against `kind` before use rather
/// than trusting the tag alone (see design notes on dynamic JSON).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Branch to read releases/collections from, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Path inside the repository tree holding collection descriptors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collections_path: Option<String>,
    /// Override API base URL (GitHub Enterprise, self-hosted GitLab, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
}
