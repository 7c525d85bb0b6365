//! End-to-end tests driving `RegistryManager` through its public API,
//! backed by a mock HTTP server for release-hosted sources and a real
//! temporary filesystem for everything scope/lockfile related.

use std::sync::Arc;

use bundle_registry_core::{
    capabilities::HostDirs,
    events::{EventSink, RecordingEventSink, RegistryEvent},
    errors::RegistryError,
    lockfile::{detect_modified_files, LockfileStore},
    manager::RegistryManager,
    schema::{CommitMode, Scope, Source, SourceConfig, SourceKind},
    storage::Storage,
};
use camino::Utf8PathBuf;
use httpmock::MockServer;
use serde_json::json;

struct TestHostDirs {
    user_data_dir: Utf8PathBuf,
    workspace_dir: Option<Utf8PathBuf>,
}

impl HostDirs for TestHostDirs {
    fn user_data_dir(&self) -> Utf8PathBuf {
        self.user_data_dir.clone()
    }

    fn workspace_dir(&self) -> Option<Utf8PathBuf> {
        self.workspace_dir.clone()
    }
}

fn utf8_tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, path)
}

fn zip_with_file(name: &str, contents: &[u8]) -> Vec<u8> {
    let mut buffer = Vec::new();
    {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buffer));
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file(name, options).unwrap();
        std::io::Write::write_all(&mut writer, contents).unwrap();
        writer.finish().unwrap();
    }
    buffer
}

fn build_manager(
    user_data_dir: Utf8PathBuf,
    workspace_dir: Option<Utf8PathBuf>,
) -> (Arc<RegistryManager>, Arc<RecordingEventSink>) {
    let dirs = Arc::new(TestHostDirs {
        user_data_dir: user_data_dir.clone(),
        workspace_dir,
    });
    let storage = Storage::new(user_data_dir);
    let events = Arc::new(RecordingEventSink::default());
    let manager = Arc::new(RegistryManager::new(
        storage,
        dirs,
        None,
        events.clone() as Arc<dyn EventSink>,
    ));
    (manager, events)
}

/// Scenario 1 (spec §8): add a release-hosted source, sync it, install one
/// version, then update to a newer one advertised by the same source.
#[tokio::test]
async fn release_hosted_add_sync_install_update() {
    let server = MockServer::start_async().await;
    let (_data_dir, data_dir) = utf8_tempdir();

    let zip_v1 = zip_with_file("hello.md", b"hello world v1");
    let zip_v2 = zip_with_file("hello.md", b"hello world v2");

    let release = |tag: &str, zip_len: usize| {
        json!({
            "tag_name": tag,
            "name": "",
            "body": "environments: production\ntags: writing\n",
            "prerelease": false,
            "published_at": "2026-01-01T00:00:00Z",
            "assets": [
                {
                    "url": format!("{}/assets/{}/manifest-api", server.base_url(), tag),
                    "browser_download_url": format!("{}/assets/{}/deployment-manifest.yml", server.base_url(), tag),
                    "name": "deployment-manifest.yml",
                    "size": 0,
                },
                {
                    "url": format!("{}/assets/{}/bundle-api", server.base_url(), tag),
                    "browser_download_url": format!("{}/assets/{}/bundle.zip", server.base_url(), tag),
                    "name": "bundle.zip",
                    "size": zip_len,
                }
            ]
        })
    };

    let releases_mock = server
        .mock_async(|when, then| {
            when.method("GET").path("/repos/acme/widgets/releases");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!([release("v1.0.0", zip_v1.len()), release("v1.1.0", zip_v2.len())]));
        })
        .await;

    let _manifest_v1 = server
        .mock_async(|when, then| {
            when.method("GET").path("/assets/v1.0.0/deployment-manifest.yml");
            then.status(200).header("content-type", "text/yaml").body("{}");
        })
        .await;
    let _manifest_v2 = server
        .mock_async(|when, then| {
            when.method("GET").path("/assets/v1.1.0/deployment-manifest.yml");
            then.status(200).header("content-type", "text/yaml").body("{}");
        })
        .await;

    let archive_mock_v1 = server
        .mock_async(|when, then| {
            when.method("GET").path("/assets/v1.0.0/bundle.zip");
            then.status(200)
                .header("content-type", "application/octet-stream")
                .body(&zip_v1);
        })
        .await;
    let archive_mock_v2 = server
        .mock_async(|when, then| {
            when.method("GET").path("/assets/v1.1.0/bundle.zip");
            then.status(200)
                .header("content-type", "application/octet-stream")
                .body(&zip_v2);
        })
        .await;

    let (manager, events) = build_manager(data_dir, None);

    manager
        .add_source(Source {
            id: "acme-widgets".to_string(),
            name: "Acme Widgets".to_string(),
            kind: SourceKind::GithubRelease,
            url: "https://github.com/acme/widgets".to_string(),
            enabled: true,
            priority: 0,
            config: SourceConfig {
                api_base_url: Some(server.base_url()),
                ..Default::default()
            },
            token: None,
        })
        .await
        .unwrap();

    let bundles = manager.sync_source("acme-widgets").await.unwrap();
    assert_eq!(bundles.len(), 2);
    releases_mock.assert_async().await;

    let installed = manager
        .install_bundle("acme-widgets-v1.0.0", "acme-widgets", Scope::User, None, CommitMode::Commit)
        .await
        .unwrap();
    assert_eq!(installed.version, "1.0.0");
    assert_eq!(
        std::fs::read_to_string(installed.install_path.join("hello.md")).unwrap(),
        "hello world v1"
    );
    archive_mock_v1.assert_async().await;

    let updated = manager
        .update_bundle("acme-widgets-v1.0.0", Scope::User)
        .await
        .unwrap();
    assert_eq!(updated.bundle_id, "acme-widgets-v1.1.0");
    assert_eq!(updated.version, "1.1.0");
    assert_eq!(
        std::fs::read_to_string(updated.install_path.join("hello.md")).unwrap(),
        "hello world v2"
    );
    archive_mock_v2.assert_async().await;
    assert!(!installed.install_path.exists(), "old version's directory should be gone");

    let recorded = events.events().await;
    let installed_count = recorded
        .iter()
        .filter(|e| matches!(e, RegistryEvent::BundleInstalled { .. }))
        .count();
    let updated_count = recorded
        .iter()
        .filter(|e| matches!(e, RegistryEvent::BundleUpdated { .. }))
        .count();
    let uninstalled_count = recorded
        .iter()
        .filter(|e| matches!(e, RegistryEvent::BundleUninstalled { .. }))
        .count();
    assert_eq!(installed_count, 1, "exactly one install event, from the initial install");
    assert_eq!(updated_count, 1, "exactly one update event");
    assert_eq!(uninstalled_count, 0, "update must never emit an uninstall event");
}

/// Scenario 2 (spec §8): a content-tree-style source keeps a
/// version-independent bundle id, so a newer version is picked up by a
/// plain re-sync rather than an explicit `update_bundle` call.
#[tokio::test]
async fn content_tree_auto_updates_on_resync() {
    let (_data_dir, data_dir) = utf8_tempdir();
    let (_collections_dir, collections_dir) = utf8_tempdir();

    let write_descriptor = |version: &str, item_contents: &str| {
        std::fs::write(
            collections_dir.join("writing.yml"),
            format!(
                "id: writing-helpers\nname: Writing Helpers\nversion: {version}\ndescription: helpers\ntags: [writing]\nitems:\n  - path: helper.md\n"
            ),
        )
        .unwrap();
        std::fs::write(collections_dir.join("helper.md"), item_contents).unwrap();
    };
    write_descriptor("1.0.0", "v1 contents");

    let (manager, events) = build_manager(data_dir, None);
    manager
        .add_source(Source {
            id: "local-writing".to_string(),
            name: "Local Writing Helpers".to_string(),
            kind: SourceKind::LocalAwesomeCopilot,
            url: collections_dir.to_string(),
            enabled: true,
            priority: 0,
            config: SourceConfig::default(),
            token: None,
        })
        .await
        .unwrap();

    manager.sync_source("local-writing").await.unwrap();
    let installed = manager
        .install_bundle("writing-helpers", "local-writing", Scope::User, None, CommitMode::Commit)
        .await
        .unwrap();
    assert_eq!(installed.version, "1.0.0");

    write_descriptor("1.1.0", "v2 contents");
    manager.sync_source("local-writing").await.unwrap();

    let after = manager
        .list_installed_bundles()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.bundle_id == "writing-helpers")
        .expect("bundle still installed under the same id");
    assert_eq!(after.version, "1.1.0");
    assert_eq!(
        std::fs::read_to_string(after.install_path.join("helper.md")).unwrap(),
        "v2 contents"
    );

    let recorded = events.events().await;
    let updated_count = recorded
        .iter()
        .filter(|e| matches!(e, RegistryEvent::BundleUpdated { bundle_id, .. } if bundle_id == "writing-helpers"))
        .count();
    assert_eq!(updated_count, 1, "auto-update during resync should fire one BundleUpdated");
}

/// Scenario 3 (spec §8, §4.1): redirects are followed manually up to
/// `MAX_REDIRECTS`, and a chain longer than that surfaces a network error
/// rather than looping forever.
#[tokio::test]
async fn redirect_following_and_max_redirects_exceeded() {
    let server = MockServer::start_async().await;
    let (_data_dir, data_dir) = utf8_tempdir();

    let zip_bytes = zip_with_file("hello.md", b"redirected contents");

    let releases_mock = server
        .mock_async(|when, then| {
            when.method("GET").path("/repos/acme/redirects/releases");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!([{
                    "tag_name": "v2.0.0",
                    "name": "",
                    "body": "",
                    "prerelease": false,
                    "published_at": "2026-01-01T00:00:00Z",
                    "assets": [
                        {
                            "url": "",
                            "browser_download_url": format!("{}/manifest-redirect-1", server.base_url()),
                            "name": "deployment-manifest.yml",
                            "size": 0,
                        },
                        {
                            "url": "",
                            "browser_download_url": format!("{}/bundle-redirect-1", server.base_url()),
                            "name": "bundle.zip",
                            "size": zip_bytes.len(),
                        }
                    ]
                }]));
        })
        .await;

    let _manifest_redirect_1 = server
        .mock_async(|when, then| {
            when.method("GET").path("/manifest-redirect-1");
            then.status(302).header("location", format!("{}/manifest-final", server.base_url()));
        })
        .await;
    let _manifest_final = server
        .mock_async(|when, then| {
            when.method("GET").path("/manifest-final");
            then.status(200).header("content-type", "text/yaml").body("{}");
        })
        .await;
    let _bundle_redirect_1 = server
        .mock_async(|when, then| {
            when.method("GET").path("/bundle-redirect-1");
            then.status(302).header("location", format!("{}/bundle-final", server.base_url()));
        })
        .await;
    let bundle_final = server
        .mock_async(|when, then| {
            when.method("GET").path("/bundle-final");
            then.status(200)
                .header("content-type", "application/octet-stream")
                .body(&zip_bytes);
        })
        .await;

    let (manager, _events) = build_manager(data_dir, None);
    manager
        .add_source(Source {
            id: "acme-redirects".to_string(),
            name: "Acme Redirects".to_string(),
            kind: SourceKind::GithubRelease,
            url: "https://github.com/acme/redirects".to_string(),
            enabled: true,
            priority: 0,
            config: SourceConfig {
                api_base_url: Some(server.base_url()),
                ..Default::default()
            },
            token: None,
        })
        .await
        .unwrap();

    manager.sync_source("acme-redirects").await.unwrap();
    releases_mock.assert_async().await;

    let installed = manager
        .install_bundle("acme-redirects-v2.0.0", "acme-redirects", Scope::User, None, CommitMode::Commit)
        .await
        .unwrap();
    assert_eq!(
        std::fs::read_to_string(installed.install_path.join("hello.md")).unwrap(),
        "redirected contents"
    );
    bundle_final.assert_async().await;

    // Now exercise a redirect chain that never terminates.
    let loop_mock = server
        .mock_async(|when, then| {
            when.method("GET").path("/loop");
            then.status(302).header("location", format!("{}/loop", server.base_url()));
        })
        .await;
    let releases_loop_mock = server
        .mock_async(|when, then| {
            when.method("GET").path("/repos/acme/loopy/releases");
            then.status(302).header("location", format!("{}/loop", server.base_url()));
        })
        .await;

    manager
        .add_source(Source {
            id: "acme-loopy".to_string(),
            name: "Acme Loopy".to_string(),
            kind: SourceKind::GithubRelease,
            url: "https://github.com/acme/loopy".to_string(),
            enabled: true,
            priority: 0,
            config: SourceConfig {
                api_base_url: Some(server.base_url()),
                ..Default::default()
            },
            token: None,
        })
        .await
        .unwrap();

    let err = manager.sync_source("acme-loopy").await.unwrap_err();
    assert!(matches!(err, RegistryError::Network { .. }));
    assert!(releases_loop_mock.hits_async().await > 0);
    assert!(loop_mock.hits_async().await > 0);
}

/// Scenario 4 (spec §8, §4.1, §7): an HTML response where JSON was expected
/// (e.g. a login page) is surfaced as `HtmlResponse`, not parsed as data;
/// a 401/403 status is surfaced as `Authentication` with the attempted
/// methods recorded.
#[tokio::test]
async fn html_response_and_authentication_failures_are_distinguished() {
    let server = MockServer::start_async().await;
    let (_data_dir, data_dir) = utf8_tempdir();

    let html_mock = server
        .mock_async(|when, then| {
            when.method("GET").path("/repos/acme/html/releases");
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body("<html><body>Please sign in to continue</body></html>");
        })
        .await;

    let (manager, _events) = build_manager(data_dir.clone(), None);
    manager
        .add_source(Source {
            id: "acme-html".to_string(),
            name: "Acme Html".to_string(),
            kind: SourceKind::GithubRelease,
            url: "https://github.com/acme/html".to_string(),
            enabled: true,
            priority: 0,
            config: SourceConfig {
                api_base_url: Some(server.base_url()),
                ..Default::default()
            },
            token: None,
        })
        .await
        .unwrap();

    let err = manager.sync_source("acme-html").await.unwrap_err();
    match err {
        RegistryError::HtmlResponse { snippet } => {
            assert!(snippet.contains("sign in"));
        }
        other => panic!("expected HtmlResponse, got {other:?}"),
    }
    html_mock.assert_async().await;

    let auth_mock = server
        .mock_async(|when, then| {
            when.method("GET").path("/repos/acme/denied/releases");
            then.status(401).header("content-type", "application/json").body("{}");
        })
        .await;

    manager
        .add_source(Source {
            id: "acme-denied".to_string(),
            name: "Acme Denied".to_string(),
            kind: SourceKind::GithubRelease,
            url: "https://github.com/acme/denied".to_string(),
            enabled: true,
            priority: 0,
            config: SourceConfig {
                api_base_url: Some(server.base_url()),
                ..Default::default()
            },
            token: Some("some-token".to_string()),
        })
        .await
        .unwrap();

    let err = manager.sync_source("acme-denied").await.unwrap_err();
    match err {
        RegistryError::Authentication { status, attempted_methods, .. } => {
            assert_eq!(status, 401);
            assert!(!attempted_methods.is_empty());
        }
        other => panic!("expected Authentication, got {other:?}"),
    }
    auth_mock.assert_async().await;
}

/// Scenario 5 (spec §8, §4.5): moving an installed bundle from `User` scope
/// to `Repository` scope materialises it under `.github/` in the workspace
/// and removes the `User`-scope copy; moving onto an already-occupied scope
/// is rejected with `Conflict`.
#[tokio::test]
async fn move_scope_from_user_to_repository() {
    let (_data_dir, data_dir) = utf8_tempdir();
    let (_workspace_dir, workspace_dir) = utf8_tempdir();
    std::fs::create_dir_all(workspace_dir.join(".git")).unwrap();

    let (_collections_dir, collections_dir) = utf8_tempdir();
    std::fs::write(
        collections_dir.join("writing.yml"),
        "id: writing-helpers\nname: Writing Helpers\nversion: 1.0.0\ndescription: helpers\ntags: []\nitems:\n  - path: helper.md\n",
    )
    .unwrap();
    std::fs::write(collections_dir.join("helper.md"), "move me").unwrap();

    let (manager, _events) = build_manager(data_dir, Some(workspace_dir.clone()));
    manager
        .add_source(Source {
            id: "local-writing".to_string(),
            name: "Local Writing Helpers".to_string(),
            kind: SourceKind::LocalAwesomeCopilot,
            url: collections_dir.to_string(),
            enabled: true,
            priority: 0,
            config: SourceConfig::default(),
            token: None,
        })
        .await
        .unwrap();
    manager.sync_source("local-writing").await.unwrap();

    let user_install = manager
        .install_bundle("writing-helpers", "local-writing", Scope::User, None, CommitMode::Commit)
        .await
        .unwrap();

    let moved = manager
        .move_scope("writing-helpers", Scope::User, Scope::Repository)
        .await
        .unwrap();
    assert_eq!(moved.scope, Scope::Repository);
    assert!(moved.install_path.starts_with(workspace_dir.join(".github")));
    assert!(!user_install.install_path.exists());
    assert!(
        manager
            .list_installed_bundles()
            .await
            .unwrap()
            .into_iter()
            .all(|r| r.scope != Scope::User)
    );

    // Reinstall into User so the conflict check below has something to collide with.
    manager
        .install_bundle("writing-helpers", "local-writing", Scope::User, None, CommitMode::Commit)
        .await
        .unwrap();

    let conflict = manager
        .move_scope("writing-helpers", Scope::User, Scope::Repository)
        .await
        .unwrap_err();
    assert!(matches!(conflict, RegistryError::Conflict { .. }));
}

/// Scenario 6 (spec §8, §4.8): a locally modified installed file is
/// detected against the lockfile's pinned checksum.
#[tokio::test]
async fn lockfile_drift_detection() {
    let (_data_dir, data_dir) = utf8_tempdir();
    let (_workspace_dir, workspace_dir) = utf8_tempdir();
    std::fs::create_dir_all(workspace_dir.join(".git")).unwrap();

    let (_collections_dir, collections_dir) = utf8_tempdir();
    std::fs::write(
        collections_dir.join("writing.yml"),
        "id: writing-helpers\nname: Writing Helpers\nversion: 1.0.0\ndescription: helpers\ntags: []\nitems:\n  - path: helper.md\n",
    )
    .unwrap();
    std::fs::write(collections_dir.join("helper.md"), "original contents").unwrap();

    let (manager, _events) = build_manager(data_dir, Some(workspace_dir.clone()));
    manager
        .add_source(Source {
            id: "local-writing".to_string(),
            name: "Local Writing Helpers".to_string(),
            kind: SourceKind::LocalAwesomeCopilot,
            url: collections_dir.to_string(),
            enabled: true,
            priority: 0,
            config: SourceConfig::default(),
            token: None,
        })
        .await
        .unwrap();
    manager.sync_source("local-writing").await.unwrap();

    let installed = manager
        .install_bundle("writing-helpers", "local-writing", Scope::Repository, None, CommitMode::Commit)
        .await
        .unwrap();

    let lockfile_store = LockfileStore::new(workspace_dir.join("bundle-registry.lock.json"));
    let lockfile = lockfile_store.read().await.unwrap().expect("lockfile written on install");
    let install_root = workspace_dir.join(".github");

    let clean = detect_modified_files(&lockfile, "writing-helpers", &install_root).unwrap();
    assert!(clean.is_empty());

    std::fs::write(installed.install_path.join("helper.md"), "tampered contents").unwrap();
    let dirty = detect_modified_files(&lockfile, "writing-helpers", &install_root).unwrap();
    assert_eq!(dirty.len(), 1);
    assert_eq!(dirty[0].path, "helper.md");

    std::fs::remove_file(installed.install_path.join("helper.md")).unwrap();
    let missing = detect_modified_files(&lockfile, "writing-helpers", &install_root).unwrap();
    assert_eq!(missing.len(), 1);

    manager.uninstall_bundle("writing-helpers", Scope::Repository).await.unwrap();
    let after_uninstall = lockfile_store.read().await.unwrap().unwrap();
    assert!(
        !after_uninstall.bundles.contains_key("writing-helpers"),
        "uninstall must remove the lockfile entry"
    );
}
