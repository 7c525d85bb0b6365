#![deny(missing_docs)]

//! # bundle-registry-schema
//!
//! Serializable data model shared by every layer of the bundle registry
//! engine: sources, bundles, installed-bundle records, deployment
//! manifests, lockfiles and profiles.
//!
//! This crate intentionally carries no networking or filesystem
//! dependencies so that thin clients (CLIs, editor-host bridges) can link
//! against it without pulling in `reqwest`/`tokio`.

mod bundle;
mod installed;
mod lockfile;
mod manifest;
mod profile;
mod source;
pub mod wire;

pub use bundle::{Bundle, BundleIdentity};
pub use installed::{CommitMode, InstalledBundle, Scope};
pub use lockfile::{GeneratedBy, Lockfile, LockedBundle, LockedSource};
pub use manifest::{BundleSettings, CommonManifestFields, DeploymentManifest, ManifestFile, ManifestMetadata};
pub use profile::{Profile, ProfileEntry};
pub use source::{Source, SourceConfig, SourceKind};

/// Current lockfile schema version written by this crate.
pub const LOCKFILE_SCHEMA_VERSION: u32 = 1;

/// Canonical `$schema` URL embedded in persisted lockfiles.
pub const LOCKFILE_SCHEMA_URL: &str =
    "https://example.com/schemas/bundle-registry-lockfile/v1.json";
