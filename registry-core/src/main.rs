//! `bundle-registry`: a thin CLI front-end over [`bundle_registry_core`],
//! exposing the operations a host application would otherwise drive
//! through the library directly.

use std::sync::Arc;

use bundle_registry_core::{
    capabilities::{AuthSessionProvider, HostDirs, InteractiveSurface},
    events::{EventSink, RegistryEvent},
    manager::RegistryManager,
    schema::{CommitMode, Profile, Scope, Source, SourceConfig, SourceKind},
    storage::{FileKeyValueStore, Storage},
    update::{AutoUpdateService, UpdateChecker},
};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;

#[derive(Parser)]
#[command(name = "bundle-registry", version, about = "Versioned prompt/instruction bundle registry")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a new source.
    AddSource {
        /// Unique id for the source.
        id: String,
        /// Display name.
        name: String,
        /// Source kind.
        #[arg(value_enum)]
        kind: SourceKindArg,
        /// Origin URL or local path.
        url: String,
        /// Explicit bearer token, if the source requires one.
        #[arg(long)]
        token: Option<String>,
    },
    /// Remove a source.
    RemoveSource {
        /// Id of the source to remove.
        id: String,
    },
    /// Re-sync one source and print its advertised bundles.
    Sync {
        /// Id of the source to sync.
        id: String,
    },
    /// Search every synced source's cached bundle list, version-consolidated.
    Search {
        /// Free-text query, matched against name/description/tags.
        query: Option<String>,
        /// Restrict results to one source.
        #[arg(long)]
        source_id: Option<String>,
        /// Restrict results to bundles carrying this tag.
        #[arg(long)]
        tag: Option<String>,
    },
    /// Install a bundle.
    Install {
        /// Bundle id, as advertised by its source.
        bundle_id: String,
        /// Id of the source the bundle comes from.
        source_id: String,
        /// Install scope.
        #[arg(value_enum, default_value = "user")]
        scope: ScopeArg,
    },
    /// Update an installed bundle to its latest advertised version.
    Update {
        /// Bundle id to update.
        bundle_id: String,
        /// Scope the bundle is installed in.
        #[arg(value_enum, default_value = "user")]
        scope: ScopeArg,
    },
    /// Uninstall a bundle.
    Uninstall {
        /// Bundle id to uninstall.
        bundle_id: String,
        /// Scope the bundle is installed in.
        #[arg(value_enum, default_value = "user")]
        scope: ScopeArg,
    },
    /// List every installed bundle.
    List,
    /// Check for available updates across every installed bundle.
    CheckUpdates,
    /// Check a repository-scoped bundle's installed files against its
    /// lockfile entry and report any local modifications.
    CheckModifications {
        /// Bundle id to check.
        bundle_id: String,
    },
    /// Print the profile currently active for a hub (or the hub-less
    /// default set, if no hub is given).
    GetActiveProfile {
        /// Hub to look up; omit for the hub-less default profile set.
        #[arg(long)]
        hub_id: Option<String>,
    },
    /// Create a new profile.
    CreateProfile {
        /// Unique id for the profile.
        id: String,
        /// Display name.
        name: String,
        /// Hub this profile belongs to, if scoped.
        #[arg(long)]
        hub_id: Option<String>,
    },
    /// Activate a profile, deactivating any other profile in the same hub.
    ActivateProfile {
        /// Id of the profile to activate.
        profile_id: String,
    },
}

#[derive(Clone, clap::ValueEnum)]
enum SourceKindArg {
    GithubRelease,
    GitlabRelease,
    AwesomeCopilot,
    LocalAwesomeCopilot,
    Local,
    Http,
}

impl From<SourceKindArg> for SourceKind {
    fn from(value: SourceKindArg) -> Self {
        match value {
            SourceKindArg::GithubRelease => SourceKind::GithubRelease,
            SourceKindArg::GitlabRelease => SourceKind::GitlabRelease,
            SourceKindArg::AwesomeCopilot => SourceKind::AwesomeCopilot,
            SourceKindArg::LocalAwesomeCopilot => SourceKind::LocalAwesomeCopilot,
            SourceKindArg::Local => SourceKind::Local,
            SourceKindArg::Http => SourceKind::Http,
        }
    }
}

#[derive(Clone, clap::ValueEnum)]
enum ScopeArg {
    User,
    Workspace,
    Repository,
}

impl From<ScopeArg> for Scope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::User => Scope::User,
            ScopeArg::Workspace => Scope::Workspace,
            ScopeArg::Repository => Scope::Repository,
        }
    }
}

struct CliHostDirs {
    user_data_dir: Utf8PathBuf,
    workspace_dir: Option<Utf8PathBuf>,
}

impl HostDirs for CliHostDirs {
    fn user_data_dir(&self) -> Utf8PathBuf {
        self.user_data_dir.clone()
    }

    fn workspace_dir(&self) -> Option<Utf8PathBuf> {
        self.workspace_dir.clone()
    }
}

struct StderrEventSink;

#[async_trait::async_trait]
impl EventSink for StderrEventSink {
    async fn emit(&self, event: RegistryEvent) {
        eprintln!("{event:?}");
    }
}

struct NoSessionProvider;

#[async_trait::async_trait]
impl AuthSessionProvider for NoSessionProvider {
    async fn silent_token(&self, _host: &str) -> Option<String> {
        None
    }
}

struct NoInteractiveSurface;

#[async_trait::async_trait]
impl InteractiveSurface for NoInteractiveSurface {
    async fn show_warning(&self, message: &str, _actions: &[&str]) -> Option<String> {
        eprintln!("warning: {message}");
        None
    }

    async fn show_info(&self, message: &str) {
        println!("{message}");
    }

    async fn show_error(&self, message: &str) {
        eprintln!("error: {message}");
    }

    async fn open_external(&self, url: &str) {
        eprintln!("(would open {url} in a browser)");
    }
}

fn resolve_dirs() -> miette::Result<CliHostDirs> {
    let project_dirs = directories::ProjectDirs::from("com", "example", "bundle-registry")
        .ok_or_else(|| miette::miette!("could not determine a home directory for this platform"))?;
    let user_data_dir = Utf8PathBuf::from_path_buf(project_dirs.data_dir().to_path_buf())
        .map_err(|p| miette::miette!("non-utf8 data directory: {}", p.display()))?;

    let cwd = std::env::current_dir().into_diagnostic()?;
    let workspace_dir = if cwd.join(".git").exists() {
        Some(
            Utf8PathBuf::from_path_buf(cwd)
                .map_err(|p| miette::miette!("non-utf8 current directory: {}", p.display()))?,
        )
    } else {
        None
    };

    Ok(CliHostDirs {
        user_data_dir,
        workspace_dir,
    })
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let dirs = Arc::new(resolve_dirs()?);
    let storage = Storage::new(dirs.user_data_dir());
    let manager = Arc::new(RegistryManager::new(
        storage,
        dirs.clone(),
        Some(Arc::new(NoSessionProvider) as Arc<dyn AuthSessionProvider>),
        Arc::new(StderrEventSink),
    ));

    match cli.command {
        Command::AddSource { id, name, kind, url, token } => {
            manager
                .add_source(Source {
                    id,
                    name,
                    kind: kind.into(),
                    url,
                    enabled: true,
                    priority: 0,
                    config: SourceConfig::default(),
                    token,
                })
                .await?;
            println!("source added");
        }
        Command::RemoveSource { id } => {
            manager.remove_source(&id).await?;
            println!("source removed");
        }
        Command::Sync { id } => {
            let bundles = manager.sync_source(&id).await?;
            for bundle in bundles {
                println!("{}\t{}", bundle.id, bundle.version);
            }
        }
        Command::Search { query, source_id, tag } => {
            let results = manager
                .search_bundles(source_id.as_deref(), tag.as_deref(), query.as_deref())
                .await?;
            for result in results {
                let versions: Vec<&str> = result.versions.iter().map(|v| v.version.as_str()).collect();
                println!(
                    "{}\t{}\t{}\tversions: {}",
                    result.bundle.id,
                    result.bundle.version,
                    result.bundle.source_id,
                    versions.join(", ")
                );
            }
        }
        Command::Install { bundle_id, source_id, scope } => {
            let record = manager
                .install_bundle(&bundle_id, &source_id, scope.into(), None, CommitMode::Commit)
                .await?;
            println!("installed {} @ {}", record.bundle_id, record.version);
        }
        Command::Update { bundle_id, scope } => {
            let record = manager.update_bundle(&bundle_id, scope.into()).await?;
            println!("updated to {} @ {}", record.bundle_id, record.version);
        }
        Command::Uninstall { bundle_id, scope } => {
            manager.uninstall_bundle(&bundle_id, scope.into()).await?;
            println!("uninstalled {bundle_id}");
        }
        Command::List => {
            for record in manager.list_installed_bundles().await? {
                println!(
                    "{}\t{}\t{:?}\t{}",
                    record.bundle_id, record.version, record.scope, record.source_id
                );
            }
        }
        Command::CheckUpdates => {
            let preferences_path = dirs.user_data_dir().join("update-preferences.json");
            let preferences = Arc::new(FileKeyValueStore::new(preferences_path));
            let checker = UpdateChecker::new(manager.clone());
            let candidates = checker.check_for_updates().await?;
            for candidate in &candidates {
                println!(
                    "{} {} -> {} ({})",
                    candidate.bundle_id, candidate.installed_version, candidate.latest_version, candidate.latest_bundle_id
                );
            }
            let _auto_update = AutoUpdateService::new(manager.clone(), preferences);
        }
        Command::CheckModifications { bundle_id } => {
            let Some(workspace_root) = dirs.workspace_dir() else {
                println!("no open workspace; nothing to check");
                return Ok(());
            };
            let lockfile_path = workspace_root.join("bundle-registry.lock.json");
            let lockfile_store = bundle_registry_core::lockfile::LockfileStore::new(lockfile_path);
            let Some(lockfile) = lockfile_store.read().await? else {
                println!("no lockfile present");
                return Ok(());
            };
            let install_root = workspace_root.join(".github");
            let modified = bundle_registry_core::lockfile::detect_modified_files(
                &lockfile,
                &bundle_id,
                &install_root,
            )?;
            if modified.is_empty() {
                println!("no local modifications detected");
                return Ok(());
            }
            let choice = bundle_registry_core::lockfile::warn_about_modifications(
                &NoInteractiveSurface,
                &modified,
                None,
            )
            .await;
            println!("{choice:?}");
        }
        Command::GetActiveProfile { hub_id } => match manager.get_active_profile(hub_id.as_deref()).await? {
            Some(profile) => println!("{}\t{}", profile.id, profile.name),
            None => println!("no active profile"),
        },
        Command::CreateProfile { id, name, hub_id } => {
            let profile = manager
                .create_profile(Profile {
                    id,
                    name,
                    active: false,
                    hub_id,
                    entries: Vec::new(),
                })
                .await?;
            println!("profile created: {}", profile.id);
        }
        Command::ActivateProfile { profile_id } => {
            let profile = manager.activate_profile(&profile_id).await?;
            println!("activated {}", profile.id);
        }
    }

    Ok(())
}
