//! Repository scope: bundles installed under `<workspaceRoot>/.github/`,
//! with a commit-mode sub-state controlling whether files are tracked by
//! version control.

use camino::{Utf8Path, Utf8PathBuf};
use tokio::sync::Mutex;

use bundle_registry_schema::CommitMode;

use crate::errors::{RegistryError, RegistryResult};

/// Repository scope's install root, relative to the workspace root.
pub fn root(workspace_root: &Utf8Path) -> Utf8PathBuf {
    workspace_root.join(".github")
}

fn exclude_file_path(workspace_root: &Utf8Path) -> Utf8PathBuf {
    workspace_root.join(".git").join("info").join("exclude")
}

/// The pattern appended to `.git/info/exclude` for a locally-excluded
/// bundle, relative to the workspace root.
fn exclude_pattern(bundle_id: &str) -> String {
    format!(".github/{bundle_id}/")
}

/// Serialises concurrent writers to `.git/info/exclude` (single-writer
/// discipline, per §5 — the file itself has no locking primitive).
static EXCLUDE_FILE_LOCK: Mutex<()> = Mutex::const_new(());

/// Append `bundle_id`'s exclude pattern to `.git/info/exclude`, once,
/// de-duplicated against whatever is already there.
pub async fn add_exclude_entry(workspace_root: &Utf8Path, bundle_id: &str) -> RegistryResult<()> {
    let _guard = EXCLUDE_FILE_LOCK.lock().await;
    let path = exclude_file_path(workspace_root);
    let pattern = exclude_pattern(bundle_id);

    let existing = tokio::fs::read_to_string(&path).await.unwrap_or_default();
    if existing.lines().any(|line| line.trim() == pattern) {
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut updated = existing;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&pattern);
    updated.push('\n');
    tokio::fs::write(&path, updated).await?;
    Ok(())
}

/// Remove `bundle_id`'s exclude pattern from `.git/info/exclude`, leaving
/// every other line untouched. Files on disk are never moved by this call.
pub async fn remove_exclude_entry(
    workspace_root: &Utf8Path,
    bundle_id: &str,
) -> RegistryResult<()> {
    let _guard = EXCLUDE_FILE_LOCK.lock().await;
    let path = exclude_file_path(workspace_root);
    let pattern = exclude_pattern(bundle_id);

    let existing = match tokio::fs::read_to_string(&path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    let filtered: Vec<&str> = existing
        .lines()
        .filter(|line| line.trim() != pattern)
        .collect();
    let mut updated = filtered.join("\n");
    if !updated.is_empty() {
        updated.push('\n');
    }
    tokio::fs::write(&path, updated).await?;
    Ok(())
}

/// Switch `bundle_id`'s commit mode in the exclude file, toggling the entry
/// without moving any installed files.
pub async fn switch_commit_mode(
    workspace_root: &Utf8Path,
    bundle_id: &str,
    new_mode: CommitMode,
) -> RegistryResult<()> {
    match new_mode {
        CommitMode::Commit => remove_exclude_entry(workspace_root, bundle_id).await,
        CommitMode::LocalOnly => add_exclude_entry(workspace_root, bundle_id).await,
    }
}

/// Require that `workspace_root` is `Some`, surfacing [`RegistryError::NoWorkspace`]
/// the way every repository-scope operation must per §4.5.
pub fn require_workspace(workspace_root: Option<&Utf8PathBuf>) -> RegistryResult<Utf8PathBuf> {
    workspace_root.cloned().ok_or(RegistryError::NoWorkspace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_then_switch_to_commit_removes_entry() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

        add_exclude_entry(&root, "owner-repo-v1.0.0").await.unwrap();
        let contents = tokio::fs::read_to_string(exclude_file_path(&root)).await.unwrap();
        assert!(contents.contains(".github/owner-repo-v1.0.0/"));

        switch_commit_mode(&root, "owner-repo-v1.0.0", CommitMode::Commit)
            .await
            .unwrap();
        let contents = tokio::fs::read_to_string(exclude_file_path(&root)).await.unwrap();
        assert!(!contents.contains(".github/owner-repo-v1.0.0/"));
    }

    #[tokio::test]
    async fn add_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

        add_exclude_entry(&root, "bundle-a").await.unwrap();
        add_exclude_entry(&root, "bundle-a").await.unwrap();
        let contents = tokio::fs::read_to_string(exclude_file_path(&root)).await.unwrap();
        assert_eq!(contents.matches(".github/bundle-a/").count(), 1);
    }
}
