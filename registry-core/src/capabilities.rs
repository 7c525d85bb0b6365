//! Capabilities consumed from the host (§6).
//!
//! The engine never reaches for a global filesystem/network/UI singleton;
//! every service that needs one of these takes it as a constructor
//! argument, the way `cargo-dist`'s services take an explicit
//! `axoasset::AxoClient` rather than reaching for a static.

use async_trait::async_trait;
use camino::Utf8PathBuf;
use serde_json::Value;

use crate::errors::RegistryResult;

/// Per-user and per-workspace data directory resolution.
pub trait HostDirs: Send + Sync {
    /// Root directory for the global, per-user store.
    fn user_data_dir(&self) -> Utf8PathBuf;
    /// Root directory for the currently open workspace, if any.
    fn workspace_dir(&self) -> Option<Utf8PathBuf>;
}

/// A host-provided key/value store, used for update preferences (§4.3) and
/// other small cross-session bits the engine does not want to own a file
/// format for.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch a value by key.
    async fn get(&self, key: &str) -> RegistryResult<Option<Value>>;
    /// Overwrite a value by key.
    async fn update(&self, key: &str, value: Value) -> RegistryResult<()>;
    /// List all keys currently stored.
    async fn keys(&self) -> RegistryResult<Vec<String>>;
}

/// A dialog/notification/quick-pick surface. The engine only ever *emits*
/// requests to this surface; it never blocks waiting for a decision beyond
/// what the trait's return value represents.
#[async_trait]
pub trait InteractiveSurface: Send + Sync {
    /// Show a warning with a fixed set of action labels and return which one
    /// was chosen, or `None` if the surface was dismissed without a choice.
    async fn show_warning(&self, message: &str, actions: &[&str]) -> Option<String>;
    /// Show an informational message with no actions.
    async fn show_info(&self, message: &str);
    /// Show an error message with no actions.
    async fn show_error(&self, message: &str);
    /// Open a URL in the host's external browser/handler.
    async fn open_external(&self, url: &str);
}

/// A host-provided, silent credential session (e.g. an editor's signed-in
/// GitHub identity), consulted as fallback #2 in the auth chain (§4.1).
#[async_trait]
pub trait AuthSessionProvider: Send + Sync {
    /// Silently fetch a token for the given host, without prompting the user.
    async fn silent_token(&self, host: &str) -> Option<String>;
}
