//! Scope Conflict Resolver: implements `move(bundleId, fromScope, toScope)`
//! as an uninstall-then-install migration with rollback on partial
//! failure.
//!
//! Takes install/uninstall as injected callbacks so it never re-enters the
//! manager directly (§9 design note on cross-component references).

use std::future::Future;
use std::pin::Pin;

use bundle_registry_schema::{InstalledBundle, Scope};

use crate::errors::RegistryResult;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Migrates one bundle from one scope to another. Callbacks take owned
/// strings rather than borrows so the resolver itself carries no lifetime
/// tied to its caller's stack frame.
pub struct ScopeConflictResolver<'a> {
    uninstall: Box<dyn Fn(String, Scope) -> BoxFuture<'a, RegistryResult<()>> + 'a>,
    install: Box<
        dyn Fn(String, Scope, Option<String>) -> BoxFuture<'a, RegistryResult<InstalledBundle>>
            + 'a,
    >,
}

impl<'a> ScopeConflictResolver<'a> {
    /// Build a resolver around the given uninstall/install callbacks.
    pub fn new(
        uninstall: impl Fn(String, Scope) -> BoxFuture<'a, RegistryResult<()>> + 'a,
        install: impl Fn(String, Scope, Option<String>) -> BoxFuture<'a, RegistryResult<InstalledBundle>>
            + 'a,
    ) -> Self {
        Self {
            uninstall: Box::new(uninstall),
            install: Box::new(install),
        }
    }

    /// Move `bundle_id` from `from` to `to`, preserving `version` if given.
    /// If install into `to` fails, the bundle is re-installed at `from` so
    /// the caller never ends up with the bundle nowhere installed.
    pub async fn move_bundle(
        &self,
        bundle_id: &str,
        from: Scope,
        to: Scope,
        version: Option<&str>,
    ) -> RegistryResult<InstalledBundle> {
        (self.uninstall)(bundle_id.to_string(), from).await?;

        match (self.install)(bundle_id.to_string(), to, version.map(str::to_string)).await {
            Ok(record) => Ok(record),
            Err(install_err) => {
                // Best-effort rollback: reinstall at the original scope so a
                // failed migration never leaves the bundle uninstalled
                // everywhere. If the rollback itself fails, surface the
                // original install error; the bundle is still recoverable
                // by re-running install manually.
                let _ = (self.install)(
                    bundle_id.to_string(),
                    from,
                    version.map(str::to_string),
                )
                .await;
                Err(install_err)
            }
        }
    }
}
