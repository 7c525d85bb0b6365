//! User scope: a single global, per-user store shared across workspaces.

use bundle_registry_schema::Scope;
use camino::Utf8PathBuf;

/// Returns `Scope::User`'s install root: the host's per-user data directory.
pub fn root(user_data_dir: &Utf8PathBuf) -> Utf8PathBuf {
    user_data_dir.clone()
}

/// Always [`Scope::User`]; exists so call sites can stay uniform with the
/// other scope modules.
pub fn scope() -> Scope {
    Scope::User
}
