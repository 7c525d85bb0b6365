//! Storage layer (§4.3): filesystem-backed JSON store under a root path.
//!
//! Directory layout (bit-exact, per the specification's §4.3, plus one
//! addition documented as an open question resolution in `DESIGN.md`):
//!
//! ```text
//! <root>/
//!   config.json
//!   cache/sources/<sanitised sid>.json
//!   cache/bundles/<sanitised bid>.json
//!   installed/user/<sanitised bid>.json
//!   installed/<sanitised bid>.json               -- workspace scope, kept alongside user/ for compatibility
//!   installed/repository/<sanitised bid>.json     -- repository scope (not spec-enumerated; see DESIGN.md)
//!   profiles/
//!   logs/
//! ```

mod cache;
mod config;
mod kv;

pub use cache::SourceCache;
pub use config::RegistryConfig;
pub use kv::FileKeyValueStore;

use std::collections::BTreeMap;

use bundle_registry_schema::{Bundle, InstalledBundle, Scope};
use camino::{Utf8Path, Utf8PathBuf};
use tokio::sync::Mutex;
use tracing::instrument;

use crate::errors::{RegistryError, RegistryResult};

/// Any character outside `[A-Za-z0-9._-]` is replaced with `_`; the result
/// is truncated to 200 characters. Empty ids are rejected. Applied
/// uniformly to bundle ids, source ids and profile ids wherever they
/// become part of a file path.
pub fn sanitise_filename(id: &str) -> RegistryResult<String> {
    if id.is_empty() {
        return Err(RegistryError::Validation {
            message: "id must not be empty".to_string(),
        });
    }
    let sanitised: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    Ok(sanitised.chars().take(200).collect())
}

/// Filesystem-backed JSON store rooted at a single directory.
pub struct Storage {
    root: Utf8PathBuf,
    config_memo: Mutex<Option<RegistryConfig>>,
}

impl Storage {
    /// Open (but do not yet populate) a store rooted at `root`.
    pub fn new(root: Utf8PathBuf) -> Self {
        Self {
            root,
            config_memo: Mutex::new(None),
        }
    }

    /// The root directory this store is backed by.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn config_path(&self) -> Utf8PathBuf {
        self.root.join("config.json")
    }

    fn source_cache_path(&self, source_id: &str) -> RegistryResult<Utf8PathBuf> {
        Ok(self
            .root
            .join("cache")
            .join("sources")
            .join(format!("{}.json", sanitise_filename(source_id)?)))
    }

    fn bundle_cache_path(&self, bundle_id: &str) -> RegistryResult<Utf8PathBuf> {
        Ok(self
            .root
            .join("cache")
            .join("bundles")
            .join(format!("{}.json", sanitise_filename(bundle_id)?)))
    }

    fn installed_path(&self, bundle_id: &str, scope: Scope) -> RegistryResult<Utf8PathBuf> {
        let file = format!("{}.json", sanitise_filename(bundle_id)?);
        Ok(match scope {
            Scope::User => self.root.join("installed").join("user").join(file),
            // Workspace scope shares the top-level `installed/` directory
            // with no dedicated subdirectory: status-quo layout, called out
            // as an open question in the specification (§9).
            Scope::Workspace => self.root.join("installed").join(file),
            Scope::Repository => self.root.join("installed").join("repository").join(file),
        })
    }

    async fn write_json<T: serde::Serialize>(path: &Utf8Path, value: &T) -> RegistryResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(value).map_err(|e| RegistryError::ParseFailure {
            format: "json",
            message: e.to_string(),
        })?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        path: &Utf8Path,
    ) -> RegistryResult<Option<T>> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                let value = serde_json::from_str(&contents).map_err(|e| RegistryError::ParseFailure {
                    format: "json",
                    message: e.to_string(),
                })?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Load `config.json`, memoising the result. Callers that mutate
    /// config must call [`Storage::save_config`], which overwrites the
    /// memo atomically rather than leaving it stale.
    #[instrument(skip(self))]
    pub async fn load_config(&self) -> RegistryResult<RegistryConfig> {
        let mut memo = self.config_memo.lock().await;
        if let Some(cfg) = memo.as_ref() {
            return Ok(cfg.clone());
        }
        let loaded = Self::read_json(&self.config_path())
            .await?
            .unwrap_or_default();
        *memo = Some(loaded);
        Ok(memo.as_ref().unwrap().clone())
    }

    /// Persist `config.json` and refresh the memo in the same critical
    /// section, so no reader can observe a stale value after this returns.
    #[instrument(skip(self, config))]
    pub async fn save_config(&self, config: &RegistryConfig) -> RegistryResult<()> {
        let mut memo = self.config_memo.lock().await;
        Self::write_json(&self.config_path(), config).await?;
        *memo = Some(config.clone());
        Ok(())
    }

    /// Write a source's synced bundle list to its cache file.
    pub async fn write_source_cache(
        &self,
        source_id: &str,
        bundles: &[Bundle],
    ) -> RegistryResult<()> {
        let path = self.source_cache_path(source_id)?;
        Self::write_json(&path, &SourceCache {
            source_id: source_id.to_string(),
            bundles: bundles.to_vec(),
        })
        .await
    }

    /// Read a source's cached bundle list, or `None` if it has never synced.
    pub async fn read_source_cache(&self, source_id: &str) -> RegistryResult<Option<SourceCache>> {
        Self::read_json(&self.source_cache_path(source_id)?).await
    }

    /// Remove a source's cache file. Invariant 1: a removed source leaves
    /// no residual cached bundles.
    pub async fn clear_source_cache(&self, source_id: &str) -> RegistryResult<()> {
        let path = self.source_cache_path(source_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) | Err(_) if !path.exists() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Read every source cache file currently on disk.
    pub async fn read_all_source_caches(&self) -> RegistryResult<Vec<SourceCache>> {
        let dir = self.root.join("cache").join("sources");
        let mut out = Vec::new();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = Utf8PathBuf::from_path_buf(entry.path())
                .map_err(|p| RegistryError::Validation {
                    message: format!("non-utf8 cache path: {}", p.display()),
                })?;
            if let Some(cache) = Self::read_json::<SourceCache>(&path).await? {
                out.push(cache);
            }
        }
        Ok(out)
    }

    /// Persist a bundle's detailed metadata cache entry.
    pub async fn write_bundle_cache(&self, bundle: &Bundle) -> RegistryResult<()> {
        let path = self.bundle_cache_path(&bundle.id)?;
        Self::write_json(&path, bundle).await
    }

    /// Write an installed-bundle record.
    pub async fn write_installed(&self, record: &InstalledBundle) -> RegistryResult<()> {
        let path = self.installed_path(&record.bundle_id, record.scope)?;
        Self::write_json(&path, record).await
    }

    /// Read a single installed-bundle record.
    pub async fn read_installed(
        &self,
        bundle_id: &str,
        scope: Scope,
    ) -> RegistryResult<Option<InstalledBundle>> {
        Self::read_json(&self.installed_path(bundle_id, scope)?).await
    }

    /// Remove an installed-bundle record.
    pub async fn remove_installed(&self, bundle_id: &str, scope: Scope) -> RegistryResult<()> {
        let path = self.installed_path(bundle_id, scope)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// List every installed-bundle record across all scopes.
    pub async fn list_installed(&self) -> RegistryResult<Vec<InstalledBundle>> {
        let mut out = Vec::new();
        for dir in [
            self.root.join("installed").join("user"),
            self.root.join("installed"),
            self.root.join("installed").join("repository"),
        ] {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(e) => e,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let path = Utf8PathBuf::from_path_buf(path).map_err(|p| RegistryError::Validation {
                    message: format!("non-utf8 installed path: {}", p.display()),
                })?;
                if let Some(record) = Self::read_json::<InstalledBundle>(&path).await? {
                    out.push(record);
                }
            }
        }
        Ok(out)
    }
}

/// Update preferences persisted via the host key/value store (§4.3).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct UpdatePreferences {
    /// Per-bundle auto-update settings, keyed by bundle id.
    #[serde(default)]
    pub entries: BTreeMap<String, UpdatePreferenceEntry>,
}

/// One bundle's auto-update preference.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct UpdatePreferenceEntry {
    /// Whether this bundle updates itself automatically.
    #[serde(default)]
    pub auto_update: bool,
    /// ISO-8601 timestamp of the last update check for this bundle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<String>,
}
