//! Update checker (§4.7): re-syncs release-hosted sources, then derives the
//! candidate list, tolerating an individual source's sync failure rather
//! than failing the whole check.

use std::sync::Arc;

use bundle_registry_schema::SourceKind;
use tracing::warn;

use crate::{
    errors::RegistryResult,
    manager::{RegistryManager, UpdateCandidate},
    update::cache::UpdateCache,
};

/// Runs [`RegistryManager::check_updates`] behind a short-lived cache,
/// first re-syncing every `github-release`/`gitlab-release` source so the
/// result reflects current tags rather than a stale cache.
///
/// Content-tree and local sources are not re-synced here: those update in
/// place during [`RegistryManager::sync_source`] itself (see its
/// content-tree auto-update step), so re-syncing them again on every update
/// check would be redundant network traffic.
pub struct UpdateChecker {
    manager: Arc<RegistryManager>,
    cache: UpdateCache,
}

impl UpdateChecker {
    /// Build a checker around `manager`, with its own private cache.
    pub fn new(manager: Arc<RegistryManager>) -> Self {
        Self {
            manager,
            cache: UpdateCache::default(),
        }
    }

    /// Return the cached candidate list if still valid, otherwise
    /// re-derive it and refresh the cache.
    pub async fn check_for_updates(&self) -> RegistryResult<Vec<UpdateCandidate>> {
        if let Some(cached) = self.cache.get().await {
            return Ok(cached);
        }
        let candidates = self.check_for_updates_uncached().await?;
        self.cache.set(candidates.clone()).await;
        Ok(candidates)
    }

    /// Force a fresh check regardless of cache state. Does not itself
    /// populate the cache; callers that want the result cached should use
    /// [`Self::check_for_updates`] instead.
    pub async fn check_for_updates_uncached(&self) -> RegistryResult<Vec<UpdateCandidate>> {
        self.sync_release_hosted_sources().await;
        self.manager.check_updates().await
    }

    /// Drop the cached candidate list.
    pub async fn invalidate(&self) {
        self.cache.clear().await;
    }

    async fn sync_release_hosted_sources(&self) {
        let sources = match self.manager.list_sources().await {
            Ok(sources) => sources,
            Err(e) => {
                warn!(error = %e, "failed to load sources before update check");
                return;
            }
        };
        for source in sources.iter().filter(|s| {
            s.enabled && matches!(s.kind, SourceKind::GithubRelease | SourceKind::GitlabRelease)
        }) {
            if let Err(e) = self.manager.sync_source(&source.id).await {
                // One source's network hiccup shouldn't hide update
                // information for every other source.
                warn!(source_id = %source.id, error = %e, "skipping source during update check");
            }
        }
    }
}
