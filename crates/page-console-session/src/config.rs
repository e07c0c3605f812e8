//! Console session configuration (`console.toml` or a `[console]` table).

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use page_console_core::{Printer, TracingDebugOutput};
use serde::{Deserialize, Serialize};

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid console config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Per-session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Capacity of the session's command channel.
    pub command_buffer: usize,
    /// Mirror generic console messages into `tracing` under `page_console::debug`.
    pub forward_debug_output: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            command_buffer: 64,
            forward_debug_output: true,
        }
    }
}

impl ConsoleConfig {
    /// Parse from TOML text. Missing keys take their defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] on malformed TOML or mistyped keys.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load from a specific path.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Printer matching these settings.
    #[must_use]
    pub fn printer(&self) -> Printer {
        if self.forward_debug_output {
            Printer::new(Arc::new(TracingDebugOutput))
        } else {
            Printer::silent()
        }
    }

    /// Channel capacity, never zero.
    #[must_use]
    pub fn channel_capacity(&self) -> usize {
        self.command_buffer.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_keys() {
        let config = ConsoleConfig::from_toml_str("forward_debug_output = false").unwrap();
        assert_eq!(config.command_buffer, 64);
        assert!(!config.forward_debug_output);
        assert_eq!(ConsoleConfig::from_toml_str("").unwrap(), ConsoleConfig::default());
    }

    #[test]
    fn test_rejects_mistyped_values() {
        let err = ConsoleConfig::from_toml_str("command_buffer = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let config = ConsoleConfig {
            command_buffer: 0,
            ..ConsoleConfig::default()
        };
        assert_eq!(config.channel_capacity(), 1);
    }

    #[test]
    fn test_missing_file() {
        let err = ConsoleConfig::load_from(Path::new("/nonexistent/console.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
