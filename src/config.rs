//! # Engine Configuration
//!
//! Settings for the core thread and the task scheduler. Every field has a
//! default, so an empty JSON object is a valid configuration.
//!
//! ```rust
//! use render_task_core::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "core_thread": { "name": "render" } }"#).unwrap();
//! assert_eq!(config.core_thread.name, "render");
//! assert!(config.tasks.drain_on_shutdown);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Name given to the core thread when none is configured.
pub const DEFAULT_CORE_THREAD_NAME: &str = "core";

/// Top-level configuration consumed by [`crate::engine_state::Engine::new`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Settings for the dedicated rendering thread
    pub core_thread: CoreThreadConfig,
    /// Settings for task scheduling
    pub tasks: TaskConfig,
}

/// Settings for the dedicated rendering thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreThreadConfig {
    /// OS-level thread name, visible in debuggers and panic messages
    pub name: String,
    /// Stack size in bytes, `None` uses the platform default
    pub stack_size: Option<usize>,
}

impl Default for CoreThreadConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_CORE_THREAD_NAME.to_string(),
            stack_size: None,
        }
    }
}

/// Settings for task scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Force-drain every pending task on the core thread before it shuts down
    pub drain_on_shutdown: bool,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            drain_on_shutdown: true,
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from a JSON string.
    ///
    /// # Arguments
    /// * `json` - JSON text, missing keys take their defaults
    ///
    /// # Returns
    /// The parsed configuration or a `Config` error
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Arguments
    /// * `path` - Location of the configuration file
    ///
    /// # Returns
    /// The parsed configuration, an `Io` error if the file cannot be read, or a
    /// `Config` error if it is malformed
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RenderCoreError;

    #[test]
    fn empty_object_uses_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.core_thread.name, DEFAULT_CORE_THREAD_NAME);
        assert_eq!(config.core_thread.stack_size, None);
    }

    #[test]
    fn partial_sections_are_filled_in() {
        let config = EngineConfig::from_json_str(
            r#"{
                "core_thread": { "stack_size": 1048576 },
                "tasks": { "drain_on_shutdown": false }
            }"#,
        )
        .unwrap();
        assert_eq!(config.core_thread.name, DEFAULT_CORE_THREAD_NAME);
        assert_eq!(config.core_thread.stack_size, Some(1_048_576));
        assert!(!config.tasks.drain_on_shutdown);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let error = EngineConfig::from_json_str("{ core_thread: ").unwrap_err();
        assert!(matches!(error, RenderCoreError::Config(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let error = EngineConfig::load("/definitely/not/here/engine.json").unwrap_err();
        assert!(matches!(error, RenderCoreError::Io(_)));
    }
}
