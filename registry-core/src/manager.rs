//! Registry manager (§4.2): the orchestrator tying adapters, storage, the
//! installer, scope services and the lockfile together. Every public
//! operation acquires a per-`(bundleId, scope)` exclusion lock so two
//! concurrent calls touching the same installed bundle serialise rather
//! than race; source syncs coalesce per source id the same way.

use std::collections::HashMap;
use std::sync::Arc;

use bundle_registry_schema::{
    Bundle, BundleIdentity, CommitMode, InstalledBundle, Profile, Scope, Source, SourceKind,
};
use camino::Utf8PathBuf;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::{
    adapters::{
        content_tree::ContentTreeAdapter,
        http_catalog::HttpCatalogAdapter,
        local::{LocalAwesomeCopilotAdapter, LocalDirectoryAdapter},
        release_hosted::{parse_owner_repo, Provider, ReleaseHostedAdapter},
        SourceAdapter,
    },
    capabilities::{AuthSessionProvider, HostDirs},
    errors::{RegistryError, RegistryResult},
    events::{EventSink, RegistryEvent},
    installer::BundleInstaller,
    lockfile::LockfileStore,
    scope,
    storage::{sanitise_filename, Storage},
    version,
};

const LOCKFILE_FILENAME: &str = "bundle-registry.lock.json";

/// One bundle for which a newer version is available, as surfaced by
/// [`RegistryManager::check_updates`].
#[derive(Debug, Clone)]
pub struct UpdateCandidate {
    /// The currently installed bundle id.
    pub bundle_id: String,
    /// Scope the bundle is installed in.
    pub scope: Scope,
    /// Currently installed version.
    pub installed_version: String,
    /// The newer bundle id available from the source (release-hosted
    /// sources mint a new id per tag; content-tree sources reuse the same
    /// id, so this may equal `bundle_id`).
    pub latest_bundle_id: String,
    /// The newer version string.
    pub latest_version: String,
}

/// One bundle identity's consolidated search result: the highest available
/// version, plus every version's own stored bundle id.
#[derive(Debug, Clone)]
pub struct ConsolidatedBundle {
    /// The highest-version `Bundle` for this identity.
    pub bundle: Bundle,
    /// Every version of this identity, highest first.
    pub versions: Vec<BundleVersionRef>,
}

/// One version entry within a [`ConsolidatedBundle::versions`] list.
#[derive(Debug, Clone)]
pub struct BundleVersionRef {
    /// The stored bundle id for this version (for release-hosted sources,
    /// distinct per version; for others, equal to the identity itself).
    pub bundle_id: String,
    /// This version's version string.
    pub version: String,
}

fn build_adapter(
    source: &Source,
    session_provider: Option<Arc<dyn AuthSessionProvider>>,
) -> RegistryResult<Arc<dyn SourceAdapter>> {
    let adapter: Arc<dyn SourceAdapter> = match source.kind {
        SourceKind::GithubRelease => Arc::new(ReleaseHostedAdapter::new(
            source.id.clone(),
            &source.url,
            Provider::GitHub,
            source.token.clone(),
            session_provider,
            source.config.api_base_url.clone(),
        )?),
        SourceKind::GitlabRelease => Arc::new(ReleaseHostedAdapter::new(
            source.id.clone(),
            &source.url,
            Provider::GitLab,
            source.token.clone(),
            session_provider,
            source.config.api_base_url.clone(),
        )?),
        SourceKind::AwesomeCopilot => {
            let (owner, repo) = parse_owner_repo(&source.url)?;
            Arc::new(ContentTreeAdapter::new(
                source.id.clone(),
                owner,
                repo,
                source.config.branch.clone().unwrap_or_else(|| "main".to_string()),
                source
                    .config
                    .collections_path
                    .clone()
                    .unwrap_or_else(|| "collections".to_string()),
            )?)
        }
        SourceKind::LocalAwesomeCopilot => Arc::new(LocalAwesomeCopilotAdapter::new(
            source.id.clone(),
            Utf8PathBuf::from(&source.url),
        )),
        SourceKind::Local => Arc::new(LocalDirectoryAdapter::new(
            source.id.clone(),
            Utf8PathBuf::from(&source.url),
        )),
        SourceKind::Http => Arc::new(HttpCatalogAdapter::new(
            source.id.clone(),
            source.url.clone(),
            source.token.clone(),
        )?),
    };
    Ok(adapter)
}

/// The central orchestrator: one instance per open registry (one per
/// editor/CLI process).
pub struct RegistryManager {
    storage: Storage,
    dirs: Arc<dyn HostDirs>,
    session_provider: Option<Arc<dyn AuthSessionProvider>>,
    events: Arc<dyn EventSink>,
    adapters: Mutex<HashMap<String, Arc<dyn SourceAdapter>>>,
    bundle_locks: Mutex<HashMap<(String, Scope), Arc<Mutex<()>>>>,
    source_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RegistryManager {
    /// Open a manager backed by `storage`, resolving scope roots via `dirs`
    /// and publishing events to `events`.
    pub fn new(
        storage: Storage,
        dirs: Arc<dyn HostDirs>,
        session_provider: Option<Arc<dyn AuthSessionProvider>>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            storage,
            dirs,
            session_provider,
            events,
            adapters: Mutex::new(HashMap::new()),
            bundle_locks: Mutex::new(HashMap::new()),
            source_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn bundle_lock(&self, bundle_id: &str, scope: Scope) -> Arc<Mutex<()>> {
        let mut locks = self.bundle_locks.lock().await;
        locks
            .entry((bundle_id.to_string(), scope))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn source_lock(&self, source_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.source_locks.lock().await;
        locks
            .entry(source_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn adapter_for(&self, source: &Source) -> RegistryResult<Arc<dyn SourceAdapter>> {
        let mut adapters = self.adapters.lock().await;
        if let Some(adapter) = adapters.get(&source.id) {
            return Ok(adapter.clone());
        }
        let adapter = build_adapter(source, self.session_provider.clone())?;
        adapters.insert(source.id.clone(), adapter.clone());
        Ok(adapter)
    }

    /// Every configured source, enabled and disabled alike.
    pub async fn list_sources(&self) -> RegistryResult<Vec<Source>> {
        Ok(self.storage.load_config().await?.sources)
    }

    /// List every bundle installed in any scope.
    pub async fn list_installed_bundles(&self) -> RegistryResult<Vec<InstalledBundle>> {
        self.storage.list_installed().await
    }

    /// Add a new source. Rejects a duplicate id with
    /// [`RegistryError::DuplicateId`] rather than silently overwriting it.
    #[instrument(skip(self, source))]
    pub async fn add_source(&self, source: Source) -> RegistryResult<()> {
        let mut config = self.storage.load_config().await?;
        if config.source(&source.id).is_some() {
            return Err(RegistryError::DuplicateId { id: source.id });
        }
        config.sources.push(source);
        self.storage.save_config(&config).await
    }

    /// Remove a source, cascade-clearing its cached bundle list (invariant 1).
    /// Already-installed bundles from this source are left untouched.
    #[instrument(skip(self))]
    pub async fn remove_source(&self, source_id: &str) -> RegistryResult<()> {
        let mut config = self.storage.load_config().await?;
        let before = config.sources.len();
        config.sources.retain(|s| s.id != source_id);
        if config.sources.len() == before {
            return Err(RegistryError::NotFound {
                kind: "source",
                id: source_id.to_string(),
            });
        }
        self.storage.save_config(&config).await?;
        self.storage.clear_source_cache(source_id).await?;
        self.adapters.lock().await.remove(source_id);
        Ok(())
    }

    /// Re-fetch one source's bundle list and refresh its cache. Concurrent
    /// calls for the same source id coalesce onto one in-flight sync rather
    /// than each re-fetching independently.
    #[instrument(skip(self))]
    pub async fn sync_source(&self, source_id: &str) -> RegistryResult<Vec<Bundle>> {
        let lock = self.source_lock(source_id).await;
        let _guard = lock.lock().await;

        let config = self.storage.load_config().await?;
        let source = config
            .source(source_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                kind: "source",
                id: source_id.to_string(),
            })?;
        if !source.enabled {
            return Ok(Vec::new());
        }

        let adapter = self.adapter_for(&source).await?;
        let bundles = adapter.fetch_bundles().await?;
        self.storage.write_source_cache(source_id, &bundles).await?;

        self.events
            .emit(RegistryEvent::SourceSynced {
                source_id: source_id.to_string(),
                bundle_count: bundles.len(),
            })
            .await;

        if source.kind.is_content_tree() {
            self.auto_update_content_tree_installs(&source, &bundles)
                .await;
        }

        Ok(bundles)
    }

    /// Content-tree bundles keep the same id across versions, so a version
    /// bump is invisible to anything keyed purely on bundle id. Re-sync
    /// quietly reinstalls any already-installed bundle whose cached version
    /// moved forward, in every scope it's installed in.
    async fn auto_update_content_tree_installs(&self, source: &Source, bundles: &[Bundle]) {
        let installed = match self.storage.list_installed().await {
            Ok(installed) => installed,
            Err(e) => {
                warn!(error = %e, "failed to list installed bundles for content-tree auto-update");
                return;
            }
        };
        for record in installed {
            if record.source_id != source.id {
                continue;
            }
            let Some(latest) = bundles.iter().find(|b| b.id == record.bundle_id) else {
                continue;
            };
            if !version::is_update_available(&record.version, &latest.version) {
                continue;
            }
            info!(
                bundle_id = %record.bundle_id,
                from = %record.version,
                to = %latest.version,
                "auto-updating content-tree bundle after sync"
            );
            if let Err(e) = self
                .update_bundle(&record.bundle_id, record.scope)
                .await
            {
                warn!(bundle_id = %record.bundle_id, error = %e, "content-tree auto-update failed");
            }
        }
    }

    /// Search every synced source's cache, optionally narrowed by source id
    /// and/or tag, and optionally filtered by free text against name,
    /// description and tags. Returns a merged, version-consolidated list:
    /// one entry per bundle identity, pointing at the highest available
    /// version, with an auxiliary `versions` list carrying every version's
    /// own stored bundle id.
    #[instrument(skip(self))]
    pub async fn search_bundles(
        &self,
        source_id: Option<&str>,
        tag: Option<&str>,
        text: Option<&str>,
    ) -> RegistryResult<Vec<ConsolidatedBundle>> {
        let config = self.storage.load_config().await?;
        let caches = self.storage.read_all_source_caches().await?;
        let mut bundles: Vec<Bundle> = caches.into_iter().flat_map(|c| c.bundles).collect();

        if let Some(source_id) = source_id {
            bundles.retain(|b| b.source_id == source_id);
        }
        if let Some(tag) = tag {
            bundles.retain(|b| b.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)));
        }
        if let Some(text) = text {
            let needle = text.to_ascii_lowercase();
            bundles.retain(|b| {
                b.name.to_ascii_lowercase().contains(&needle)
                    || b
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_ascii_lowercase().contains(&needle))
                    || b.tags.iter().any(|t| t.to_ascii_lowercase().contains(&needle))
            });
        }

        let mut by_identity: HashMap<BundleIdentity, Vec<Bundle>> = HashMap::new();
        for bundle in bundles {
            let source_kind = config.source(&bundle.source_id).map(|s| s.kind);
            let identity = match source_kind {
                Some(kind) => version::extract_bundle_identity(&bundle.id, kind),
                None => bundle.id.clone(),
            };
            by_identity.entry(BundleIdentity(identity)).or_default().push(bundle);
        }

        let mut consolidated: Vec<ConsolidatedBundle> = by_identity
            .into_values()
            .filter_map(|mut versions| {
                versions.sort_by(|a, b| version::compare_versions(&b.version, &a.version));
                let latest = versions.first()?.clone();
                let version_refs = versions
                    .iter()
                    .map(|b| BundleVersionRef {
                        bundle_id: b.id.clone(),
                        version: b.version.clone(),
                    })
                    .collect();
                Some(ConsolidatedBundle {
                    bundle: latest,
                    versions: version_refs,
                })
            })
            .collect();
        consolidated.sort_by(|a, b| a.bundle.name.cmp(&b.bundle.name));
        Ok(consolidated)
    }

    fn lockfile_store(&self, workspace_root: &Utf8PathBuf) -> LockfileStore {
        LockfileStore::new(workspace_root.join(LOCKFILE_FILENAME))
    }

    /// Install `bundle_id` (as currently advertised by `source_id`) into
    /// `scope`. `commit_mode` only applies to [`Scope::Repository`].
    #[instrument(skip(self))]
    pub async fn install_bundle(
        &self,
        bundle_id: &str,
        source_id: &str,
        scope: Scope,
        profile_id: Option<String>,
        commit_mode: CommitMode,
    ) -> RegistryResult<InstalledBundle> {
        let lock = self.bundle_lock(bundle_id, scope).await;
        let _guard = lock.lock().await;
        self.install_bundle_locked(bundle_id, source_id, scope, profile_id, commit_mode)
            .await
    }

    async fn install_bundle_locked(
        &self,
        bundle_id: &str,
        source_id: &str,
        scope: Scope,
        profile_id: Option<String>,
        commit_mode: CommitMode,
    ) -> RegistryResult<InstalledBundle> {
        let record = self
            .place_bundle(bundle_id, source_id, scope, profile_id, commit_mode)
            .await?;

        self.events
            .emit(RegistryEvent::BundleInstalled {
                bundle_id: bundle_id.to_string(),
                scope,
            })
            .await;

        Ok(record)
    }

    /// Fetch, extract and record a bundle without emitting any event. Used
    /// by [`Self::install_bundle_locked`] (which emits `BundleInstalled`)
    /// and by [`Self::update_bundle`] (which emits only `BundleUpdated`,
    /// never a paired `BundleInstalled`).
    async fn place_bundle(
        &self,
        bundle_id: &str,
        source_id: &str,
        scope: Scope,
        profile_id: Option<String>,
        commit_mode: CommitMode,
    ) -> RegistryResult<InstalledBundle> {
        let config = self.storage.load_config().await?;
        let source = config
            .source(source_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                kind: "source",
                id: source_id.to_string(),
            })?;

        let cache = self.storage.read_source_cache(source_id).await?;
        let bundle = cache
            .and_then(|c| c.bundles.into_iter().find(|b| b.id == bundle_id))
            .ok_or_else(|| RegistryError::NotFound {
                kind: "bundle",
                id: bundle_id.to_string(),
            })?;

        let root = scope::root_for_scope(self.dirs.as_ref(), scope)?;
        std::fs::create_dir_all(&root)?;

        let adapter = self.adapter_for(&source).await?;
        let manifest = adapter.fetch_metadata(&bundle).await?;
        let archive = adapter.download_bundle(&bundle).await?;

        let final_dir_name = sanitise_filename(bundle_id)?;
        let outcome =
            BundleInstaller::install(&archive, &manifest, &root, &final_dir_name, bundle.size)?;

        let installed_at = Utc::now().to_rfc3339();
        let record = InstalledBundle {
            bundle_id: bundle_id.to_string(),
            version: bundle.version.clone(),
            installed_at: installed_at.clone(),
            scope,
            commit_mode: (scope == Scope::Repository).then_some(commit_mode),
            install_path: outcome.install_path,
            manifest,
            source_id: source_id.to_string(),
            source_type: format!("{:?}", source.kind),
            profile_id,
            file_checksums: outcome.file_checksums,
        };
        self.storage.write_installed(&record).await?;

        if scope == Scope::Repository {
            let workspace_root = scope::repository::require_workspace(self.dirs.workspace_dir().as_ref())?;
            scope::repository::switch_commit_mode(&workspace_root, bundle_id, commit_mode).await?;
            self.lockfile_store(&workspace_root)
                .upsert_entry(
                    bundle_id,
                    bundle_registry_schema::LockedBundle {
                        version: record.version.clone(),
                        source_id: source_id.to_string(),
                        files: record.file_checksums.clone(),
                        installed_at,
                    },
                    source_id,
                    bundle_registry_schema::LockedSource {
                        kind: format!("{:?}", source.kind),
                        url: source.url.clone(),
                    },
                    &Utc::now().to_rfc3339(),
                    env!("CARGO_PKG_NAME"),
                    env!("CARGO_PKG_VERSION"),
                )
                .await?;
        }

        Ok(record)
    }

    /// Update an installed bundle to its latest advertised version. For
    /// release-hosted sources, the new version carries a different bundle
    /// id (`owner-repo-tag`); the old install is removed and the new one
    /// placed, but exactly one [`RegistryEvent::BundleUpdated`] is emitted,
    /// never a paired uninstall/install pair.
    #[instrument(skip(self))]
    pub async fn update_bundle(
        &self,
        bundle_id: &str,
        scope: Scope,
    ) -> RegistryResult<InstalledBundle> {
        let lock = self.bundle_lock(bundle_id, scope).await;
        let _guard = lock.lock().await;

        let current = self
            .storage
            .read_installed(bundle_id, scope)
            .await?
            .ok_or_else(|| RegistryError::NotFound {
                kind: "installed bundle",
                id: bundle_id.to_string(),
            })?;

        let config = self.storage.load_config().await?;
        let source = config
            .source(&current.source_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                kind: "source",
                id: current.source_id.clone(),
            })?;

        let identity = version::extract_bundle_identity(bundle_id, source.kind);
        let cache = self.storage.read_source_cache(&current.source_id).await?;
        let candidates: Vec<Bundle> = cache
            .map(|c| c.bundles)
            .unwrap_or_default()
            .into_iter()
            .filter(|b| version::extract_bundle_identity(&b.id, source.kind) == identity)
            .collect();

        let latest = candidates
            .into_iter()
            .max_by(|a, b| version::compare_versions(&a.version, &b.version))
            .ok_or_else(|| RegistryError::NotFound {
                kind: "bundle",
                id: bundle_id.to_string(),
            })?;

        let previous_version = current.version.clone();
        let new_id = latest.id.clone();
        let new_version = latest.version.clone();

        let root = scope::root_for_scope(self.dirs.as_ref(), scope)?;
        let expected_root = root.clone();
        BundleInstaller::uninstall(&current.install_path, &expected_root)?;
        self.storage.remove_installed(bundle_id, scope).await?;
        if scope == Scope::Repository {
            if let Some(workspace_root) = self.dirs.workspace_dir() {
                scope::repository::remove_exclude_entry(&workspace_root, bundle_id).await?;
            }
        }

        let commit_mode = current.commit_mode.unwrap_or(CommitMode::Commit);
        let install_result = self
            .place_bundle(
                &new_id,
                &current.source_id,
                scope,
                current.profile_id.clone(),
                commit_mode,
            )
            .await;

        let record = match install_result {
            Ok(record) => record,
            Err(e) => {
                warn!(bundle_id = %new_id, error = %e, "update install failed, previous install already removed");
                return Err(e);
            }
        };

        self.events
            .emit(RegistryEvent::BundleUpdated {
                bundle_id: new_id,
                previous_version,
                new_version,
            })
            .await;

        Ok(record)
    }

    /// Uninstall a bundle from `scope`, removing its lockfile entry and
    /// exclude-file state when applicable.
    #[instrument(skip(self))]
    pub async fn uninstall_bundle(&self, bundle_id: &str, scope: Scope) -> RegistryResult<()> {
        let lock = self.bundle_lock(bundle_id, scope).await;
        let _guard = lock.lock().await;

        let record = self
            .storage
            .read_installed(bundle_id, scope)
            .await?
            .ok_or_else(|| RegistryError::NotFound {
                kind: "installed bundle",
                id: bundle_id.to_string(),
            })?;

        let expected_root = scope::root_for_scope(self.dirs.as_ref(), scope)?;
        BundleInstaller::uninstall(&record.install_path, &expected_root)?;
        self.storage.remove_installed(bundle_id, scope).await?;

        if scope == Scope::Repository {
            if let Some(workspace_root) = self.dirs.workspace_dir() {
                scope::repository::remove_exclude_entry(&workspace_root, bundle_id).await?;
                self.lockfile_store(&workspace_root)
                    .remove_entry(bundle_id)
                    .await?;
            }
        }

        self.events
            .emit(RegistryEvent::BundleUninstalled {
                bundle_id: bundle_id.to_string(),
            })
            .await;
        Ok(())
    }

    /// Move an installed bundle from one scope to another, via
    /// [`scope::conflict_resolver::ScopeConflictResolver`].
    #[instrument(skip(self))]
    pub async fn move_scope(
        &self,
        bundle_id: &str,
        from: Scope,
        to: Scope,
    ) -> RegistryResult<InstalledBundle> {
        if self.storage.read_installed(bundle_id, to).await?.is_some() {
            return Err(RegistryError::Conflict {
                bundle_id: bundle_id.to_string(),
            });
        }
        let current = self
            .storage
            .read_installed(bundle_id, from)
            .await?
            .ok_or_else(|| RegistryError::NotFound {
                kind: "installed bundle",
                id: bundle_id.to_string(),
            })?;
        let source_id = current.source_id.clone();
        let version = current.version.clone();
        let commit_mode = current.commit_mode.unwrap_or(CommitMode::Commit);

        let resolver = scope::conflict_resolver::ScopeConflictResolver::new(
            |id: String, scope: Scope| Box::pin(async move { self.uninstall_bundle(&id, scope).await }) as _,
            |id: String, scope: Scope, _version: Option<String>| {
                let source_id = source_id.clone();
                let profile_id = current.profile_id.clone();
                let commit_mode = commit_mode;
                Box::pin(async move {
                    self.install_bundle(&id, &source_id, scope, profile_id, commit_mode)
                        .await
                }) as _
            },
        );
        resolver
            .move_bundle(bundle_id, from, to, Some(version.as_str()))
            .await
    }

    /// Compare every installed bundle's version against its source's most
    /// recently *cached* bundle list (this does not itself trigger a sync;
    /// callers that want fresh data should `sync_source` first, which is
    /// exactly what the update checker does).
    #[instrument(skip(self))]
    pub async fn check_updates(&self) -> RegistryResult<Vec<UpdateCandidate>> {
        let installed = self.storage.list_installed().await?;
        let config = self.storage.load_config().await?;
        let mut candidates = Vec::new();

        for record in installed {
            let Some(source) = config.source(&record.source_id) else {
                continue;
            };
            let identity = version::extract_bundle_identity(&record.bundle_id, source.kind);
            let Some(cache) = self.storage.read_source_cache(&record.source_id).await? else {
                continue;
            };
            let latest = cache
                .bundles
                .into_iter()
                .filter(|b| version::extract_bundle_identity(&b.id, source.kind) == identity)
                .max_by(|a, b| version::compare_versions(&a.version, &b.version));
            let Some(latest) = latest else { continue };
            if version::is_update_available(&record.version, &latest.version) {
                candidates.push(UpdateCandidate {
                    bundle_id: record.bundle_id.clone(),
                    scope: record.scope,
                    installed_version: record.version.clone(),
                    latest_bundle_id: latest.id,
                    latest_version: latest.version,
                });
            }
        }
        Ok(candidates)
    }

    /// The profile currently active for `hub_id` (`None` for the
    /// hub-less/default profile set), if any.
    #[instrument(skip(self))]
    pub async fn get_active_profile(&self, hub_id: Option<&str>) -> RegistryResult<Option<Profile>> {
        let config = self.storage.load_config().await?;
        Ok(config
            .profiles
            .into_iter()
            .find(|p| p.active && p.hub_id.as_deref() == hub_id))
    }

    /// Create a new profile. Fails with [`RegistryError::DuplicateId`] if
    /// `profile.id` collides with an existing one.
    #[instrument(skip(self, profile))]
    pub async fn create_profile(&self, profile: Profile) -> RegistryResult<Profile> {
        let mut config = self.storage.load_config().await?;
        if config.profiles.iter().any(|p| p.id == profile.id) {
            return Err(RegistryError::DuplicateId { id: profile.id });
        }
        config.profiles.push(profile.clone());
        self.storage.save_config(&config).await?;
        Ok(profile)
    }

    /// Activate `profile_id`, deactivating every other profile sharing its
    /// hub so that at most one profile is active per hub (data model
    /// invariant).
    #[instrument(skip(self))]
    pub async fn activate_profile(&self, profile_id: &str) -> RegistryResult<Profile> {
        let mut config = self.storage.load_config().await?;
        let hub_id = config
            .profiles
            .iter()
            .find(|p| p.id == profile_id)
            .ok_or_else(|| RegistryError::NotFound {
                kind: "profile",
                id: profile_id.to_string(),
            })?
            .hub_id
            .clone();

        for profile in &mut config.profiles {
            if profile.hub_id == hub_id {
                profile.active = profile.id == profile_id;
            }
        }
        self.storage.save_config(&config).await?;

        Ok(config
            .profiles
            .into_iter()
            .find(|p| p.id == profile_id)
            .expect("looked up by the same id above"))
    }
}
