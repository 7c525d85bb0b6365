use serde::{Deserialize, Serialize};

/// Declarative description of what the installer places on disk.
///
/// Parsed from a `deployment-manifest.{yml,yaml}` asset; the top-level
/// keys mirror the wire format in §6 of the specification: the placement
/// fields nest under a `common` key (`common.directories`,
/// `common.files`, ...), alongside top-level `bundle_settings`/`metadata`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentManifest {
    /// Placement fields (`directories`, `files`, `include_patterns`,
    /// `exclude_patterns`), nested under the manifest's `common` key.
    #[serde(default)]
    pub common: CommonManifestFields,
    /// Bundle-level settings (compression, naming, include-common flags).
    #[serde(default)]
    pub bundle_settings: BundleSettings,
    /// Free-form manifest metadata (version, description).
    #[serde(default)]
    pub metadata: ManifestMetadata,
}

impl DeploymentManifest {
    /// Directories to create under the install root.
    pub fn directories(&self) -> &[String] {
        &self.common.directories
    }

    /// Explicit file entries to place.
    pub fn files(&self) -> &[ManifestFile] {
        &self.common.files
    }

    /// Glob patterns selecting which archive entries to extract.
    pub fn include_patterns(&self) -> &[String] {
        &self.common.include_patterns
    }

    /// Glob patterns excluding archive entries from extraction.
    pub fn exclude_patterns(&self) -> &[String] {
        &self.common.exclude_patterns
    }
}

/// The `common` block of a deployment manifest: the fields that describe
/// what gets placed, as opposed to `bundle_settings`/`metadata` which
/// describe the bundle itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommonManifestFields {
    /// Directories to create under the install root.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directories: Vec<String>,
    /// Explicit file entries to place.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<ManifestFile>,
    /// Glob patterns selecting which archive entries to extract.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_patterns: Vec<String>,
    /// Glob patterns excluding archive entries from extraction.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_patterns: Vec<String>,
}

/// A single explicit file placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestFile {
    /// Path inside the downloaded archive.
    pub source: String,
    /// Path, relative to the install root, to place the file at.
    pub target: String,
}

/// Compression/naming settings for a bundle's archive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleSettings {
    /// Archive compression kind, e.g. `zip` or `tar.gz`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,
    /// Naming convention applied to the archive, e.g. `{name}-{version}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub naming: Option<String>,
    /// Whether files shared across bundles ("common" files) are included.
    #[serde(default)]
    pub include_common: bool,
}

/// Free-form metadata carried by a deployment manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Version string recorded in the manifest itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Description recorded in the manifest itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
