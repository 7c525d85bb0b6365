//! Scope & lockfile subsystem (§4.5): user vs repository vs workspace
//! scopes, commit/local-only modes.

pub mod conflict_resolver;
pub mod repository;
pub mod user;

use bundle_registry_schema::Scope;
use camino::Utf8PathBuf;

use crate::{
    capabilities::HostDirs,
    errors::{RegistryError, RegistryResult},
};

/// Resolve the install root for `scope`, per §4.5 and invariant 3
/// ("`installPath` always lies inside the root for its scope").
pub fn root_for_scope(dirs: &dyn HostDirs, scope: Scope) -> RegistryResult<Utf8PathBuf> {
    match scope {
        // User and Workspace share a root today; see the open question in
        // §9 about giving Workspace its own subdirectory.
        Scope::User | Scope::Workspace => Ok(dirs.user_data_dir()),
        Scope::Repository => dirs
            .workspace_dir()
            .map(|root| root.join(".github"))
            .ok_or(RegistryError::NoWorkspace),
    }
}
