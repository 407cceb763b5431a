#![forbid(unsafe_code)]

//! History limits.
//!
//! ```toml
//! # rewind.toml
//! local_limit = 100
//! global_limit = 100
//! ```
//!
//! ```rust,ignore
//! let config = UndoConfig::from_toml_file("rewind.toml")?;
//! ```
//!
//! Missing keys keep their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default depth of every local history.
pub const DEFAULT_LOCAL_LIMIT: usize = 100;
/// Default depth of the global history.
pub const DEFAULT_GLOBAL_LIMIT: usize = 100;

/// Depth limits of the histories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UndoConfig {
    /// Maximum number of groups on one resource's undo side.
    pub local_limit: usize,
    /// Maximum number of groups on the global undo side.
    pub global_limit: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            local_limit: DEFAULT_LOCAL_LIMIT,
            global_limit: DEFAULT_GLOBAL_LIMIT,
        }
    }
}

impl UndoConfig {
    /// Create a configuration with custom limits.
    #[must_use]
    pub fn new(local_limit: usize, global_limit: usize) -> Self {
        Self {
            local_limit,
            global_limit,
        }
    }

    /// Set the local limit.
    #[must_use]
    pub fn with_local_limit(mut self, limit: usize) -> Self {
        self.local_limit = limit;
        self
    }

    /// Set the global limit.
    #[must_use]
    pub fn with_global_limit(mut self, limit: usize) -> Self {
        self.global_limit = limit;
        self
    }

    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Serialize to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Validate the limits.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.local_limit == 0 {
            errors.push("local_limit must be > 0".to_string());
        }
        if self.global_limit == 0 {
            errors.push("global_limit must be > 0".to_string());
        }
        errors
    }
}

/// Errors from loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}
