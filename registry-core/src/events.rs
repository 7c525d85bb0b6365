//! Events emitted by the [`crate::manager::RegistryManager`] (§4.2, §5).
//!
//! Within one bundle, events fire in causal order
//! (`Installing -> Installed`, `Updating -> Installed` with a single
//! `onBundleUpdated`); across bundles, no ordering is promised.

use async_trait::async_trait;

/// One event the manager can emit.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// A source finished syncing. Fires always, including a zero-count sync.
    SourceSynced {
        /// The synced source's id.
        source_id: String,
        /// How many bundles the source advertised.
        bundle_count: usize,
    },
    /// A bundle finished installing.
    BundleInstalled {
        /// The installed bundle's stored id.
        bundle_id: String,
        /// Scope it was installed into.
        scope: bundle_registry_schema::Scope,
    },
    /// A bundle finished updating. Fired exactly once per update; never
    /// paired with `BundleUninstalled`/`BundleInstalled`.
    BundleUpdated {
        /// The bundle's stored id (post-update).
        bundle_id: String,
        /// Version before the update.
        previous_version: String,
        /// Version after the update.
        new_version: String,
    },
    /// A bundle finished uninstalling.
    BundleUninstalled {
        /// The uninstalled bundle's stored id.
        bundle_id: String,
    },
}

/// A sink the manager publishes [`RegistryEvent`]s to. The core never
/// assumes a particular transport (channel, callback list, UI bus); it only
/// requires something implementing this trait.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Handle one event. Implementations must not block indefinitely;
    /// the manager awaits this call before returning from the triggering
    /// operation.
    async fn emit(&self, event: RegistryEvent);
}

/// An [`EventSink`] that records every event it receives, for tests that
/// assert on event ordering (e.g. "exactly one `BundleUpdated`, never an
/// uninstall/install pair").
#[derive(Default)]
pub struct RecordingEventSink {
    events: tokio::sync::Mutex<Vec<RegistryEvent>>,
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn emit(&self, event: RegistryEvent) {
        self.events.lock().await.push(event);
    }
}

impl RecordingEventSink {
    /// A snapshot of every event recorded so far, in emission order.
    pub async fn events(&self) -> Vec<RegistryEvent> {
        self.events.lock().await.clone()
    }
}
