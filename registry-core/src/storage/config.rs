//! `config.json`: sources, profiles and engine-wide settings.

use bundle_registry_schema::{Profile, Source};
use serde::{Deserialize, Serialize};

/// The document persisted at `<root>/config.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Configured sources.
    #[serde(default)]
    pub sources: Vec<Source>,
    /// Configured profiles.
    #[serde(default)]
    pub profiles: Vec<Profile>,
    /// Engine-wide settings.
    #[serde(default)]
    pub settings: RegistrySettings,
}

impl RegistryConfig {
    /// Find a source by id.
    pub fn source(&self, id: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Find a source by id, mutably.
    pub fn source_mut(&mut self, id: &str) -> Option<&mut Source> {
        self.sources.iter_mut().find(|s| s.id == id)
    }
}

/// Engine-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Update-check frequency: `daily`, `weekly` or `manual`.
    #[serde(default = "default_update_frequency")]
    pub update_frequency: String,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            update_frequency: default_update_frequency(),
        }
    }
}

fn default_update_frequency() -> String {
    "daily".to_string()
}
