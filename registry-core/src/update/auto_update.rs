//! Auto-update service (§4.7): applies updates for bundles the user has
//! opted into automatic updates for, leaving the rest as surfaced
//! candidates for manual action.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::{
    capabilities::KeyValueStore,
    errors::{RegistryError, RegistryResult},
    manager::RegistryManager,
    storage::UpdatePreferences,
    update::checker::UpdateChecker,
};

/// Key under which [`UpdatePreferences`] are stored in the host key/value
/// store.
const PREFERENCES_KEY: &str = "update-preferences";

/// Consults per-bundle auto-update preferences and applies updates for the
/// bundles that opted in, after one [`UpdateChecker`] pass.
pub struct AutoUpdateService {
    manager: Arc<RegistryManager>,
    checker: UpdateChecker,
    preferences: Arc<dyn KeyValueStore>,
}

impl AutoUpdateService {
    /// Build a service around `manager`, backed by `preferences` for the
    /// per-bundle opt-in map.
    pub fn new(manager: Arc<RegistryManager>, preferences: Arc<dyn KeyValueStore>) -> Self {
        let checker = UpdateChecker::new(manager.clone());
        Self {
            manager,
            checker,
            preferences,
        }
    }

    async fn load_preferences(&self) -> RegistryResult<UpdatePreferences> {
        Ok(self
            .preferences
            .get(PREFERENCES_KEY)
            .await?
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default())
    }

    async fn save_preferences(&self, prefs: &UpdatePreferences) -> RegistryResult<()> {
        let value = serde_json::to_value(prefs).map_err(|e| RegistryError::ParseFailure {
            format: "json",
            message: e.to_string(),
        })?;
        self.preferences.update(PREFERENCES_KEY, value).await
    }

    /// Set whether `bundle_id` updates itself automatically.
    pub async fn set_auto_update(&self, bundle_id: &str, auto_update: bool) -> RegistryResult<()> {
        let mut prefs = self.load_preferences().await?;
        prefs
            .entries
            .entry(bundle_id.to_string())
            .or_default()
            .auto_update = auto_update;
        self.save_preferences(&prefs).await
    }

    /// Whether `bundle_id` currently has auto-update enabled.
    pub async fn is_auto_update_enabled(&self, bundle_id: &str) -> RegistryResult<bool> {
        let prefs = self.load_preferences().await?;
        Ok(prefs
            .entries
            .get(bundle_id)
            .map(|e| e.auto_update)
            .unwrap_or(false))
    }

    /// Run one check, then install updates for every candidate whose
    /// preference has `auto_update = true`. Candidates without an opt-in are
    /// left as-is for the caller to surface as manual update prompts.
    pub async fn check_and_apply(&self) -> RegistryResult<()> {
        let candidates = self.checker.check_for_updates_uncached().await?;
        let mut prefs = self.load_preferences().await?;
        let now = Utc::now().to_rfc3339();

        for candidate in &candidates {
            let entry = prefs.entries.entry(candidate.bundle_id.clone()).or_default();
            entry.last_checked = Some(now.clone());
            if !entry.auto_update {
                continue;
            }
            info!(
                bundle_id = %candidate.bundle_id,
                to = %candidate.latest_version,
                "applying opted-in auto-update"
            );
            if let Err(e) = self
                .manager
                .update_bundle(&candidate.bundle_id, candidate.scope)
                .await
            {
                warn!(bundle_id = %candidate.bundle_id, error = %e, "auto-update failed");
            }
        }

        self.save_preferences(&prefs).await
    }
}
