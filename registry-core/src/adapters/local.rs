//! Local adapters: a plain directory of bundles, and a local copy of the
//! content-tree layout (`local-awesome-copilot`).

use std::io::Write as _;

use async_trait::async_trait;
use bundle_registry_schema::wire::CollectionDescriptor;
use bundle_registry_schema::{
    Bundle, BundleSettings, CommonManifestFields, DeploymentManifest, ManifestFile, ManifestMetadata,
};
use camino::Utf8PathBuf;
use walkdir::WalkDir;

use crate::{
    adapters::SourceAdapter,
    errors::{RegistryError, RegistryResult},
};

/// Lists a root directory for subdirectories that each contain a
/// `deployment-manifest.yml` (or `.yaml`), treating every such directory as
/// one bundle version.
pub struct LocalDirectoryAdapter {
    source_id: String,
    root: Utf8PathBuf,
}

impl LocalDirectoryAdapter {
    /// Build an adapter rooted at `root`.
    pub fn new(source_id: impl Into<String>, root: Utf8PathBuf) -> Self {
        Self {
            source_id: source_id.into(),
            root,
        }
    }

    fn manifest_path(dir: &Utf8PathBuf) -> Option<Utf8PathBuf> {
        for name in ["deployment-manifest.yml", "deployment-manifest.yaml"] {
            let candidate = dir.join(name);
            if candidate.exists() {
                return Some(candidate);
            }
        }
        None
    }
}

#[async_trait]
impl SourceAdapter for LocalDirectoryAdapter {
    async fn validate(&self) -> RegistryResult<()> {
        if !self.root.exists() {
            return Err(RegistryError::Validation {
                message: format!("local source root '{}' does not exist", self.root),
            });
        }
        std::fs::metadata(&self.root).map_err(RegistryError::Io)?;
        Ok(())
    }

    async fn fetch_bundles(&self) -> RegistryResult<Vec<Bundle>> {
        let mut bundles = Vec::new();
        let entries = std::fs::read_dir(&self.root).map_err(RegistryError::Io)?;
        for entry in entries {
            let entry = entry.map_err(RegistryError::Io)?;
            let Ok(dir) = Utf8PathBuf::from_path_buf(entry.path()) else {
                continue;
            };
            if !dir.is_dir() {
                continue;
            }
            let Some(manifest_path) = Self::manifest_path(&dir) else {
                continue;
            };
            let contents = std::fs::read_to_string(&manifest_path).map_err(RegistryError::Io)?;
            let manifest: DeploymentManifest =
                serde_yml::from_str(&contents).map_err(|e| RegistryError::ParseFailure {
                    format: "yaml",
                    message: e.to_string(),
                })?;
            let name = dir
                .file_name()
                .unwrap_or("bundle")
                .to_string();
            let version = manifest.metadata.version.clone().unwrap_or_else(|| "0.0.0".to_string());
            bundles.push(Bundle {
                id: name.clone(),
                name: name.clone(),
                version,
                description: manifest.metadata.description.clone(),
                author: None,
                source_id: self.source_id.clone(),
                environments: Vec::new(),
                tags: Vec::new(),
                last_updated: None,
                size: None,
                license: None,
                manifest_url: manifest_path.to_string(),
                download_url: dir.to_string(),
                repository: None,
            });
        }
        Ok(bundles)
    }

    async fn fetch_metadata(&self, bundle: &Bundle) -> RegistryResult<DeploymentManifest> {
        let contents = std::fs::read_to_string(&bundle.manifest_url).map_err(RegistryError::Io)?;
        serde_yml::from_str(&contents).map_err(|e| RegistryError::ParseFailure {
            format: "yaml",
            message: e.to_string(),
        })
    }

    async fn download_bundle(&self, bundle: &Bundle) -> RegistryResult<Vec<u8>> {
        let dir = Utf8PathBuf::from(&bundle.download_url);
        let mut buffer = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buffer));
            let options = zip::write::SimpleFileOptions::default();
            for entry in WalkDir::new(&dir).into_iter().filter_map(Result::ok) {
                if !entry.file_type().is_file() {
                    continue;
                }
                let rel = entry
                    .path()
                    .strip_prefix(&dir)
                    .unwrap_or(entry.path())
                    .to_string_lossy()
                    .replace('\\', "/");
                let contents = std::fs::read(entry.path()).map_err(RegistryError::Io)?;
                writer
                    .start_file(rel, options)
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

/// Local on-disk equivalent of [`super::content_tree::ContentTreeAdapter`]:
/// reads collection descriptors from a local directory tree instead of a
/// remote repository.
pub struct LocalAwesomeCopilotAdapter {
    source_id: String,
    collections_root: Utf8PathBuf,
}

impl LocalAwesomeCopilotAdapter {
    /// Build an adapter rooted at `collections_root`.
    pub fn new(source_id: impl Into<String>, collections_root: Utf8PathBuf) -> Self {
        Self {
            source_id: source_id.into(),
            collections_root,
        }
    }

    fn descriptor_files(&self) -> RegistryResult<Vec<Utf8PathBuf>> {
        let mut out = Vec::new();
        for entry in WalkDir::new(&self.collections_root)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if name.ends_with(".yml") || name.ends_with(".yaml") {
                if let Ok(path) = Utf8PathBuf::from_path_buf(entry.path().to_path_buf()) {
                    out.push(path);
                }
            }
        }
        Ok(out)
    }

    fn load_descriptor(path: &Utf8PathBuf) -> RegistryResult<CollectionDescriptor> {
        let contents = std::fs::read_to_string(path).map_err(RegistryError::Io)?;
        serde_yml::from_str(&contents).map_err(|e| RegistryError::ParseFailure {
            format: "yaml",
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl SourceAdapter for LocalAwesomeCopilotAdapter {
    async fn validate(&self) -> RegistryResult<()> {
        if !self.collections_root.exists() {
            return Err(RegistryError::Validation {
                message: format!(
                    "local collections root '{}' does not exist",
                    self.collections_root
                ),
            });
        }
        Ok(())
    }

    async fn fetch_bundles(&self) -> RegistryResult<Vec<Bundle>> {
        self.descriptor_files()?
            .iter()
            .map(|path| {
                let descriptor = Self::load_descriptor(path)?;
                Ok(Bundle {
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
                    manifest_url: path.to_string(),
                    download_url: path.to_string(),
                    repository: None,
                })
            })
            .collect()
    }

    async fn fetch_metadata(&self, bundle: &Bundle) -> RegistryResult<DeploymentManifest> {
        let descriptor = Self::load_descriptor(&Utf8PathBuf::from(&bundle.manifest_url))?;
        Ok(DeploymentManifest {
            common: CommonManifestFields {
                directories: Vec::new(),
                files: descriptor
                    .items
                    .iter()
                    .map(|item| ManifestFile {
                        source: item.path.clone(),
                        target: item.path.clone(),
                    })
                    .collect(),
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
        let descriptor_path = Utf8PathBuf::from(&bundle.download_url);
        let descriptor = Self::load_descriptor(&descriptor_path)?;
        let base = descriptor_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| self.collections_root.clone());
        let mut buffer = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buffer));
            let options = zip::write::SimpleFileOptions::default();
            for item in &descriptor.items {
                let contents = std::fs::read(base.join(&item.path)).map_err(RegistryError::Io)?;
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
