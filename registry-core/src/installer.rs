//! Bundle installer (§4.4): archive extraction, file materialisation,
//! checksums.

use std::collections::BTreeMap;
use std::io::Read;

use camino::{Utf8Path, Utf8PathBuf};
use globset::{Glob, GlobSetBuilder};
use sha2::{Digest, Sha256};
use tracing::instrument;

use bundle_registry_schema::DeploymentManifest;

use crate::errors::{RegistryError, RegistryResult};

/// The outcome of a successful install.
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    /// Absolute path the bundle was materialised at.
    pub install_path: Utf8PathBuf,
    /// Per-file SHA-256 checksums, keyed by path relative to `install_path`.
    pub file_checksums: BTreeMap<String, String>,
}

/// Archive extraction, placement and checksumming for one bundle.
pub struct BundleInstaller;

impl BundleInstaller {
    /// Install `archive_bytes` (already downloaded) according to
    /// `manifest`, into a fresh directory under `root`. On any failure
    /// before the final atomic rename, the staging directory is removed;
    /// `root` itself is never partially populated.
    #[instrument(skip(archive_bytes, manifest))]
    pub fn install(
        archive_bytes: &[u8],
        manifest: &DeploymentManifest,
        root: &Utf8Path,
        final_dir_name: &str,
        expected_size: Option<u64>,
    ) -> RegistryResult<InstallOutcome> {
        if let Some(expected) = expected_size {
            if archive_bytes.len() as u64 != expected {
                return Err(RegistryError::IntegrityFailure {
                    path: "archive".to_string(),
                    expected: expected.to_string(),
                    actual: archive_bytes.len().to_string(),
                });
            }
        }

        let staging = root.join(format!(".staging-{}", uuid::Uuid::new_v4()));
        let result = Self::install_into_staging(archive_bytes, manifest, &staging);
        let staging_result = match result {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = std::fs::remove_dir_all(&staging);
                Err(e)
            }
        };
        staging_result?;

        let final_path = root.join(final_dir_name);
        if final_path.exists() {
            std::fs::remove_dir_all(&final_path)?;
        }
        if let Err(e) = std::fs::rename(&staging, &final_path) {
            let _ = std::fs::remove_dir_all(&staging);
            return Err(e.into());
        }

        match Self::checksum_tree(&final_path) {
            Ok(file_checksums) => Ok(InstallOutcome {
                install_path: final_path,
                file_checksums,
            }),
            Err(e) => {
                // Compensating delete: we can't leave a half-recorded install.
                let _ = std::fs::remove_dir_all(&final_path);
                Err(e)
            }
        }
    }

    fn install_into_staging(
        archive_bytes: &[u8],
        manifest: &DeploymentManifest,
        staging: &Utf8Path,
    ) -> RegistryResult<()> {
        std::fs::create_dir_all(staging)?;

        let extracted = staging.join(".extracted");
        std::fs::create_dir_all(&extracted)?;
        extract_archive(archive_bytes, &extracted)?;

        for dir in manifest.directories() {
            std::fs::create_dir_all(staging.join(dir))?;
        }

        if manifest.files().is_empty() {
            let include = compile_globset(manifest.include_patterns())?;
            let exclude = compile_globset(manifest.exclude_patterns())?;
            copy_filtered_tree(&extracted, staging, include.as_ref(), exclude.as_ref())?;
        } else {
            for file in manifest.files() {
                let source = extracted.join(&file.source);
                let target = staging.join(&file.target);
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::copy(&source, &target)?;
            }
        }

        std::fs::remove_dir_all(&extracted)?;
        Ok(())
    }

    fn checksum_tree(root: &Utf8Path) -> RegistryResult<BTreeMap<String, String>> {
        let mut out = BTreeMap::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = Utf8PathBuf::from_path_buf(entry.path().to_path_buf()).map_err(|p| {
                RegistryError::Validation {
                    message: format!("non-utf8 path in installed tree: {}", p.display()),
                }
            })?;
            let rel = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .as_str()
                .replace('\\', "/");
            let checksum = sha256_file(&path)?;
            out.insert(rel, checksum);
        }
        Ok(out)
    }

    /// Remove an installed bundle's directory, but only if it lies inside
    /// `expected_root` for its scope — refuses to delete anything outside
    /// that boundary even if a caller passes a bogus path.
    pub fn uninstall(install_path: &Utf8Path, expected_root: &Utf8Path) -> RegistryResult<()> {
        let canonical_path = install_path
            .canonicalize_utf8()
            .unwrap_or_else(|_| install_path.to_path_buf());
        let canonical_root = expected_root
            .canonicalize_utf8()
            .unwrap_or_else(|_| expected_root.to_path_buf());
        if !canonical_path.starts_with(&canonical_root) {
            return Err(RegistryError::Validation {
                message: format!(
                    "refusing to remove '{install_path}': outside expected root '{expected_root}'"
                ),
            });
        }
        match std::fs::remove_dir_all(install_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Compute the SHA-256 checksum of a single file, hex-encoded.
pub fn sha256_file(path: &Utf8Path) -> RegistryResult<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn compile_globset(patterns: &[String]) -> RegistryResult<Option<globset::GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| RegistryError::Validation {
            message: format!("invalid glob pattern '{pattern}': {e}"),
        })?;
        builder.add(glob);
    }
    Ok(Some(builder.build().map_err(|e| RegistryError::Validation {
        message: e.to_string(),
    })?))
}

fn copy_filtered_tree(
    source_root: &Utf8Path,
    target_root: &Utf8Path,
    include: Option<&globset::GlobSet>,
    exclude: Option<&globset::GlobSet>,
) -> RegistryResult<()> {
    for entry in walkdir::WalkDir::new(source_root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = Utf8PathBuf::from_path_buf(entry.path().to_path_buf())
            .map_err(|p| RegistryError::Validation {
                message: format!("non-utf8 archive entry: {}", p.display()),
            })?;
        let rel = path.strip_prefix(source_root).unwrap_or(&path).to_path_buf();

        if let Some(include) = include {
            if !include.is_match(rel.as_std_path()) {
                continue;
            }
        }
        if let Some(exclude) = exclude {
            if exclude.is_match(rel.as_std_path()) {
                continue;
            }
        }

        let target = target_root.join(&rel);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&path, &target)?;
    }
    Ok(())
}

/// Extract a ZIP or gzip-compressed tar archive into `dest`, detected by
/// magic bytes (`PK\x03\x04` for ZIP, `\x1f\x8b` for gzip).
fn extract_archive(bytes: &[u8], dest: &Utf8Path) -> RegistryResult<()> {
    if bytes.starts_with(b"PK\x03\x04") || bytes.is_empty() {
        extract_zip(bytes, dest)
    } else if bytes.starts_with(&[0x1f, 0x8b]) {
        extract_tar_gz(bytes, dest)
    } else {
        Err(RegistryError::Validation {
            message: "unrecognised archive format (expected .zip or .tar.gz)".to_string(),
        })
    }
}

fn extract_zip(bytes: &[u8], dest: &Utf8Path) -> RegistryResult<()> {
    if bytes.is_empty() {
        return Ok(());
    }
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| {
        RegistryError::Validation {
            message: format!("invalid zip archive: {e}"),
        }
    })?;
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(|e| RegistryError::Validation {
            message: e.to_string(),
        })?;
        let Some(name) = file.enclosed_name() else {
            continue;
        };
        let Ok(name) = Utf8PathBuf::from_path_buf(name.to_path_buf()) else {
            continue;
        };
        let out_path = dest.join(&name);
        if file.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = std::fs::File::create(&out_path)?;
        std::io::copy(&mut file, &mut out)?;
    }
    Ok(())
}

fn extract_tar_gz(bytes: &[u8], dest: &Utf8Path) -> RegistryResult<()> {
    let decoder = flate2::read::GzDecoder::new(bytes);
    let mut archive = tar::Archive::new(decoder);
    archive.unpack(dest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundle_registry_schema::{CommonManifestFields, ManifestFile};

    fn zip_with_file(path: &str, contents: &[u8]) -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buffer));
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file(path, options).unwrap();
            std::io::Write::write_all(&mut writer, contents).unwrap();
            writer.finish().unwrap();
        }
        buffer
    }

    #[test]
    fn empty_archive_yields_zero_length_result() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let manifest = DeploymentManifest::default();
        let outcome =
            BundleInstaller::install(&[], &manifest, &root, "empty-bundle", None).unwrap();
        assert!(outcome.file_checksums.is_empty());
    }

    #[test]
    fn installs_and_checksums_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let archive = zip_with_file("foo.md", b"hello world");
        let manifest = DeploymentManifest::default();
        let outcome =
            BundleInstaller::install(&archive, &manifest, &root, "my-bundle", None).unwrap();
        assert!(outcome.install_path.join("foo.md").exists());
        assert_eq!(outcome.file_checksums.len(), 1);
        assert_eq!(
            outcome.file_checksums.get("foo.md").unwrap(),
            &sha256_file(&outcome.install_path.join("foo.md")).unwrap()
        );
    }

    #[test]
    fn explicit_file_mapping_renames_on_placement() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let archive = zip_with_file("src/foo.md", b"hi");
        let manifest = DeploymentManifest {
            common: CommonManifestFields {
                files: vec![ManifestFile {
                    source: "src/foo.md".to_string(),
                    target: "prompts/foo.md".to_string(),
                }],
                ..Default::default()
            },
            ..Default::default()
        };
        let outcome =
            BundleInstaller::install(&archive, &manifest, &root, "renamed-bundle", None).unwrap();
        assert!(outcome.install_path.join("prompts/foo.md").exists());
    }

    #[test]
    fn size_mismatch_is_integrity_failure() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let archive = zip_with_file("foo.md", b"hello world");
        let manifest = DeploymentManifest::default();
        let err = BundleInstaller::install(&archive, &manifest, &root, "bad-bundle", Some(999))
            .unwrap_err();
        assert!(matches!(err, RegistryError::IntegrityFailure { .. }));
    }

    #[test]
    fn uninstall_refuses_paths_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let outside = Utf8PathBuf::from("/etc");
        let err = BundleInstaller::uninstall(&outside, &root).unwrap_err();
        assert!(matches!(err, RegistryError::Validation { .. }));
    }
}
