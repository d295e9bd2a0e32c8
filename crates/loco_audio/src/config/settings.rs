//! # Sound Override Configuration
//!
//! Settings for the override engine, loadable from TOML or RON through the
//! [`Config`] trait. Every field has a default, so a partial file (or no
//! file at all) is valid.
//!
//! ```toml
//! log_level = "debug"
//! sound_dir = "Mods/LocoSounds/sounds"
//!
//! [registry]
//! path = "Mods/LocoSounds/registry.json"
//!
//! [discovery]
//! max_depth = 12
//!
//! [[discovery.extra_rules]]
//! role = "bell"
//! all_of = ["gong"]
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::Config;
use crate::discovery::rules::RoleRule;

/// Discovery tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Maximum tree depth visited below an audio entry point
    pub max_depth: usize,
    /// Object names that carry no information; the first clip name is used instead
    pub placeholder_names: Vec<String>,
    /// Keep audio objects without a role as generic sounds
    pub record_generic: bool,
    /// Heuristic rules evaluated after the built-in table
    pub extra_rules: Vec<RoleRule>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_depth: 16,
            placeholder_names: vec!["Clip".to_string(), "clip".to_string()],
            record_generic: true,
            extra_rules: Vec::new(),
        }
    }
}

impl DiscoveryConfig {
    /// Whether `name` is a placeholder that says nothing about the sound
    pub fn is_placeholder(&self, name: &str) -> bool {
        name.trim().is_empty() || self.placeholder_names.iter().any(|p| p == name)
    }
}

/// Persistence of the override registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// JSON file holding every customized vehicle; `None` keeps state in memory only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Write the file after every change
    pub autosave: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: None,
            autosave: true,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
    /// Root of the on-disk sound catalog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound_dir: Option<PathBuf>,
    /// Registry persistence
    pub registry: RegistryConfig,
    /// Discovery tuning
    pub discovery: DiscoveryConfig,
}

impl SoundConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            sound_dir: None,
            registry: RegistryConfig::default(),
            discovery: DiscoveryConfig::default(),
        }
    }

    /// Set the sound catalog directory
    pub fn with_sound_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sound_dir = Some(dir.into());
        self
    }

    /// Set the registry file
    pub fn with_registry_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry.path = Some(path.into());
        self
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for SoundConfig {}
