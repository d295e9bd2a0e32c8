//! Configuration system

pub mod settings;

pub use settings::{DiscoveryConfig, RegistryConfig, SoundConfig};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&contents).map_err(|e| ConfigError::parse(path, e)),
            Some("ron") => ron::from_str(&contents).map_err(|e| ConfigError::parse(path, e)),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Load configuration from file, falling back to defaults when absent
    fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from_file(path)
        } else {
            log::info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?,
            Some("ron") => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };

        std::fs::write(path, contents).map_err(|e| ConfigError::io(path, e))
    }
}

/// Errors loading or saving a sound configuration file
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The file could not be read or written
    #[error("cannot access config {}: {source}", .path.display())]
    Io {
        /// Config file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML/RON for this configuration
    #[error("invalid config {}: {message}", .path.display())]
    Parse {
        /// Config file
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// The configuration could not be encoded
    #[error("cannot serialize config: {0}")]
    Serialize(String),

    /// Neither `.toml` nor `.ron`
    #[error("unsupported config format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

impl ConfigError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn parse(path: &Path, error: impl std::fmt::Display) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            message: error.to_string(),
        }
    }
}
