//! Lockfile & modification detection (§4.8).

use camino::{Utf8Path, Utf8PathBuf};

use bundle_registry_schema::{Lockfile, LockedBundle, LockedSource};

use crate::{
    capabilities::InteractiveSurface,
    errors::{RegistryError, RegistryResult},
    installer::sha256_file,
};

/// Reads and writes one repository's `lockfile.json`.
pub struct LockfileStore {
    path: Utf8PathBuf,
}

impl LockfileStore {
    /// Back this store with the lockfile at `path`.
    pub fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }

    /// Read the lockfile, or `None` if it doesn't exist yet.
    pub async fn read(&self) -> RegistryResult<Option<Lockfile>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => serde_json::from_str(&contents).map(Some).map_err(|e| {
                RegistryError::ParseFailure {
                    format: "json",
                    message: e.to_string(),
                }
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the lockfile with canonical serialisation: stable (`BTreeMap`)
    /// key ordering, two-space indent, trailing newline.
    pub async fn write(&self, lockfile: &Lockfile) -> RegistryResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut buf = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(
            &mut buf,
            serde_json::ser::PrettyFormatter::with_indent(b"  "),
        );
        serde::Serialize::serialize(lockfile, &mut serializer).map_err(|e| {
            RegistryError::ParseFailure {
                format: "json",
                message: e.to_string(),
            }
        })?;
        buf.push(b'\n');
        tokio::fs::write(&self.path, buf).await?;
        Ok(())
    }

    /// Remove the lockfile entry for `bundle_id`, if present. Invariant 5:
    /// uninstall removes the entry.
    pub async fn remove_entry(&self, bundle_id: &str) -> RegistryResult<()> {
        let Some(mut lockfile) = self.read().await? else {
            return Ok(());
        };
        if lockfile.bundles.remove(bundle_id).is_some() {
            self.write(&lockfile).await?;
        }
        Ok(())
    }

    /// Insert or replace a bundle's locked entry.
    pub async fn upsert_entry(
        &self,
        bundle_id: &str,
        entry: LockedBundle,
        source_id: &str,
        source: LockedSource,
        generated_at: &str,
        generated_by_name: &str,
        generated_by_version: &str,
    ) -> RegistryResult<()> {
        let mut lockfile = match self.read().await? {
            Some(existing) => existing,
            None => Lockfile::new(
                generated_at.to_string(),
                bundle_registry_schema::GeneratedBy {
                    name: generated_by_name.to_string(),
                    version: generated_by_version.to_string(),
                },
            ),
        };
        lockfile.generated_at = generated_at.to_string();
        lockfile.bundles.insert(bundle_id.to_string(), entry);
        lockfile.sources.insert(source_id.to_string(), source);
        self.write(&lockfile).await
    }
}

/// What changed about one locked file, as reported by [`detect_modified_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModificationType {
    /// The file no longer exists on disk.
    Missing,
    /// The file exists but its hash no longer matches the lockfile.
    Modified,
    /// A file tracked by the lockfile entry that is not itself part of the
    /// detection (reserved for future "extra tracked file" detection).
    New,
}

/// One detected change for a single path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifiedFile {
    /// Path, relative to the bundle's install root.
    pub path: String,
    /// What kind of change was detected.
    pub modification_type: ModificationType,
}

/// For each path in `bundle_id`'s lockfile entry, compute its current
/// SHA-256 and compare against the pinned value.
pub fn detect_modified_files(
    lockfile: &Lockfile,
    bundle_id: &str,
    install_root: &Utf8Path,
) -> RegistryResult<Vec<ModifiedFile>> {
    let Some(entry) = lockfile.bundles.get(bundle_id) else {
        return Ok(Vec::new());
    };

    let mut modified = Vec::new();
    for (path, expected_hash) in &entry.files {
        let full_path = install_root.join(path);
        if !full_path.exists() {
            modified.push(ModifiedFile {
                path: path.clone(),
                modification_type: ModificationType::Missing,
            });
            continue;
        }
        let actual_hash = sha256_file(&full_path)?;
        if &actual_hash != expected_hash {
            modified.push(ModifiedFile {
                path: path.clone(),
                modification_type: ModificationType::Modified,
            });
        }
    }
    Ok(modified)
}

/// The fixed-order action set for the modification warning dialog (§4.8).
pub const MODIFICATION_DIALOG_ACTIONS: [&str; 3] = ["Contribute Changes", "Override", "Cancel"];

/// The user's choice in the modification warning dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModificationChoice {
    /// Open the bundle's repository so the user can contribute their changes upstream.
    Contribute,
    /// Proceed, discarding the local modifications.
    Override,
    /// Abort the operation, leaving local modifications untouched.
    Cancel,
}

/// Show the fixed three-action warning dialog listing every affected path,
/// and, if `Contribute` is chosen and a repository URL is known, open it.
pub async fn warn_about_modifications(
    surface: &dyn InteractiveSurface,
    modified: &[ModifiedFile],
    repository_url: Option<&str>,
) -> ModificationChoice {
    let paths = modified
        .iter()
        .map(|m| m.path.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let message = format!("The following files have local modifications: {paths}");
    let choice = surface
        .show_warning(&message, &MODIFICATION_DIALOG_ACTIONS)
        .await;

    let choice = match choice.as_deref() {
        Some("Contribute Changes") => ModificationChoice::Contribute,
        Some("Override") => ModificationChoice::Override,
        _ => ModificationChoice::Cancel,
    };

    if choice == ModificationChoice::Contribute {
        if let Some(url) = repository_url {
            surface.open_external(url).await;
        }
    }
    choice
}
