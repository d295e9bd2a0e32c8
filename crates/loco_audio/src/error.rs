//! Error types shared by every subsystem
//!
//! None of these errors are fatal to the host. Callers treat `NotFound` as
//! "do nothing, try again later"; batch operations collect errors into a
//! [`BatchReport`] instead of stopping at the first one.

use std::path::PathBuf;

use crate::catalog::SoundKey;

/// Errors raised by discovery, override application and persistence
#[derive(thiserror::Error, Debug)]
pub enum SoundError {
    /// The role is unsupported on this vehicle, or the object cannot be resolved yet
    #[error("{key} not found: {reason}")]
    NotFound {
        /// Role or generic sound that was looked up
        key: SoundKey,
        /// Why resolution failed
        reason: String,
    },

    /// A cached handle points at an object that has since been destroyed
    #[error("stale handle for {0}")]
    StaleHandle(SoundKey),

    /// Restore requested without a captured vanilla snapshot
    #[error("no vanilla snapshot captured for {0}")]
    MissingSnapshot(SoundKey),

    /// Malformed override definition or an asset that cannot be loaded
    #[error("configuration error in '{name}': {message}")]
    Configuration {
        /// Override (or file) the problem was found in
        name: String,
        /// Human readable description
        message: String,
    },

    /// Unknown vehicle instance handle
    #[error("unknown vehicle instance")]
    UnknownInstance,

    /// IO error
    #[error("IO error on {path}: {source}")]
    Io {
        /// File being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),
}

impl SoundError {
    /// Shorthand for a [`SoundError::NotFound`]
    pub fn not_found(key: &SoundKey, reason: impl Into<String>) -> Self {
        Self::NotFound {
            key: key.clone(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`SoundError::Configuration`]
    pub fn configuration(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Wrap an IO error together with the path that caused it
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error only means "try again later"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Outcome of a batch operation that isolates failures per item
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Items that completed successfully
    pub succeeded: usize,
    /// Items that were skipped on purpose (unsupported, mismatched type, ...)
    pub skipped: usize,
    /// Items that failed, with a label identifying the item
    pub failures: Vec<(String, SoundError)>,
}

impl BatchReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a success
    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    /// Record a deliberate skip
    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// Record a failure for one item
    pub fn record_failure(&mut self, label: impl Into<String>, error: SoundError) {
        self.failures.push((label.into(), error));
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: Self) {
        self.succeeded += other.succeeded;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
    }

    /// True when no item failed
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
