//! Content-tree adapter (awesome-copilot style): collection descriptors
//! read out of a directory in a repository tree.
//!
//! Unlike the release-hosted adapter, a bundle's id here is
//! version-independent (it's the collection's own `id`), so re-sync
//! replaces the installed record in place rather than producing a new,
//! differently-id'd bundle — see `RegistryManager::sync_source`'s
//! auto-update step.

use std::io::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bundle_registry_schema::wire::CollectionDescriptor;
use bundle_registry_schema::{
    Bundle, BundleSettings, CommonManifestFields, DeploymentManifest, ManifestFile, ManifestMetadata,
};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::{
    adapters::SourceAdapter,
    errors::{RegistryError, RegistryResult},
};

/// How long a synced collection listing stays valid before the next
/// `fetch_bundles` call re-fetches it from the remote tree.
const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Deserialize)]
struct TreeEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
    download_url: Option<String>,
}

/// Content-tree [`SourceAdapter`].
pub struct ContentTreeAdapter {
    source_id: String,
    owner: String,
    repo: String,
    branch: String,
    collections_path: String,
    client: reqwest::Client,
    cache: Mutex<Option<(Instant, Vec<Bundle>)>>,
}

impl ContentTreeAdapter {
    /// Build an adapter for the collections tree at `collections_path`
    /// inside `owner/repo@branch`.
    pub fn new(
        source_id: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
        collections_path: impl Into<String>,
    ) -> RegistryResult<Self> {
        Ok(Self {
            source_id: source_id.into(),
            owner: owner.into(),
            repo: repo.into(),
            branch: branch.into(),
            collections_path: collections_path.into(),
            client: crate::net::build_client(&crate::net::ClientSettings::default())?,
            cache: Mutex::new(None),
        })
    }

    /// Clear the in-memory collection cache, forcing the next
    /// `fetch_bundles` to re-fetch from the remote tree.
    pub async fn clear_cache(&self) {
        *self.cache.lock().await = None;
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "https://api.github.com/repos/{}/{}/contents/{}?ref={}",
            self.owner, self.repo, path, self.branch
        )
    }

    async fn list_descriptor_files(&self) -> RegistryResult<Vec<TreeEntry>> {
        let url = self.contents_url(&self.collections_path);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| RegistryError::Network {
                message: e.to_string(),
            })?;
        let entries: Vec<TreeEntry> = response.json().await.map_err(|e| RegistryError::ParseFailure {
            format: "json",
            message: e.to_string(),
        })?;
        Ok(entries
            .into_iter()
            .filter(|e| e.kind == "file" && (e.name.ends_with(".yml") || e.name.ends_with(".yaml")))
            .collect())
    }

    async fn fetch_descriptor(&self, entry: &TreeEntry) -> RegistryResult<CollectionDescriptor> {
        let url = entry
            .download_url
            .clone()
            .unwrap_or_else(|| self.contents_url(&entry.path));
        let body = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RegistryError::Network {
                message: e.to_string(),
            })?
            .text()
            .await
            .map_err(|e| RegistryError::Network {
                message: e.to_string(),
            })?;
        serde_yml::from_str(&body).map_err(|e| RegistryError::ParseFailure {
            format: "yaml",
            message: e.to_string(),
        })
    }

    fn descriptor_to_bundle(&self, descriptor: &CollectionDescriptor) -> Bundle {
        Bundle {
            id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            version: descriptor.version.clone(),
            description: descriptor.description.clone(),
            author: None,
            source_id: self.source_id.clone(),
            environments: Vec::new(),
            tags: descriptor.tags.clone(),
            last_updated: None,
            size: None,
            license: None,
            manifest_url: format!(
                "{}/{}/collection/{}",
                self.owner, self.repo, descriptor.id
            ),
            download_url: format!(
                "{}/{}/collection/{}",
                self.owner, self.repo, descriptor.id
            ),
            repository: Some(format!("{}/{}", self.owner, self.repo)),
        }
    }

    async fn descriptor_for_bundle(&self, bundle: &Bundle) -> RegistryResult<CollectionDescriptor> {
        let entries = self.list_descriptor_files().await?;
        for entry in entries {
            let descriptor = self.fetch_descriptor(&entry).await?;
            if descriptor.id == bundle.id {
                return Ok(descriptor);
            }
        }
        Err(RegistryError::NotFound {
            kind: "bundle",
            id: bundle.id.clone(),
        })
    }
}

#[async_trait]
impl SourceAdapter for ContentTreeAdapter {
    async fn validate(&self) -> RegistryResult<()> {
        self.list_descriptor_files().await?;
        Ok(())
    }

    async fn fetch_bundles(&self) -> RegistryResult<Vec<Bundle>> {
        {
            let cache = self.cache.lock().await;
            if let Some((fetched_at, bundles)) = cache.as_ref() {
                if fetched_at.elapsed() < CACHE_TTL {
                    return Ok(bundles.clone());
                }
            }
        }

        let entries = self.list_descriptor_files().await?;
        let mut bundles = Vec::with_capacity(entries.len());
        for entry in &entries {
            let descriptor = self.fetch_descriptor(entry).await?;
            bundles.push(self.descriptor_to_bundle(&descriptor));
        }

        *self.cache.lock().await = Some((Instant::now(), bundles.clone()));
        Ok(bundles)
    }

    async fn fetch_metadata(&self, bundle: &Bundle) -> RegistryResult<DeploymentManifest> {
        let descriptor = self.descriptor_for_bundle(bundle).await?;
        let files = descriptor
            .items
            .iter()
            .map(|item| ManifestFile {
                source: item.path.clone(),
                target: item.path.clone(),
            })
            .collect();
        Ok(DeploymentManifest {
            common: CommonManifestFields {
                directories: Vec::new(),
                files,
                include_patterns: Vec::new(),
                exclude_patterns: Vec::new(),
            },
            bundle_settings: BundleSettings {
                compression: Some("zip".to_string()),
                naming: None,
                include_common: false,
            },
            metadata: ManifestMetadata {
                version: Some(descriptor.version.clone()),
                description: descriptor.description.clone(),
            },
        })
    }

    async fn download_bundle(&self, bundle: &Bundle) -> RegistryResult<Vec<u8>> {
        let descriptor = self.descriptor_for_bundle(bundle).await?;
        let mut buffer = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buffer));
            let options = zip::write::SimpleFileOptions::default();
            for item in &descriptor.items {
                let raw_url = format!(
                    "https://raw.githubusercontent.com/{}/{}/{}/{}",
                    self.owner, self.repo, self.branch, item.path
                );
                let contents = self
                    .client
                    .get(&raw_url)
                    .send()
                    .await
                    .map_err(|e| RegistryError::Network {
                        message: e.to_string(),
                    })?
                    .bytes()
                    .await
                    .map_err(|e| RegistryError::Network {
                        message: e.to_string(),
                    })?;
                writer
                    .start_file(item.path.clone(), options)
                    .map_err(|e| RegistryError::Validation {
                        message: e.to_string(),
                    })?;
                writer.write_all(&contents)?;
            }
            writer.finish().map_err(|e| RegistryError::Validation {
                message: e.to_string(),
            })?;
        }
        Ok(buffer)
    }
}
