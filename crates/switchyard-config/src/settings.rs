//! Process settings.
//!
//! Every field has a default so an empty JSON object (or no file at all) is a
//! valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors raised while loading settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
  #[error("failed to read settings file: {0}")]
  Io(#[from] std::io::Error),

  #[error("failed to parse settings file: {0}")]
  Parse(#[from] serde_json::Error),
}

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// SQLite database file name, relative to the data directory.
  pub database_file: String,
  pub engine: EngineSettings,
  pub registry: RegistrySettings,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      database_file: "switchyard.db".to_string(),
      engine: EngineSettings::default(),
      registry: RegistrySettings::default(),
    }
  }
}

impl Settings {
  /// Load settings from a JSON file.
  pub fn load(path: &Path) -> Result<Self, SettingsError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
  }
}

/// Defaults and behaviour of the workflow engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
  pub default_max_parallel_steps: usize,
  pub default_step_timeout_seconds: u64,
  pub default_workflow_timeout_seconds: u64,
  pub default_max_retries: u32,
  /// Re-dispatch executions that were running when the process stopped.
  pub resume_interrupted: bool,
  /// Capacity of each workflow driver's control channel.
  pub control_buffer_size: usize,
}

impl Default for EngineSettings {
  fn default() -> Self {
    Self {
      default_max_parallel_steps: 3,
      default_step_timeout_seconds: 300,
      default_workflow_timeout_seconds: 3600,
      default_max_retries: 2,
      resume_interrupted: true,
      control_buffer_size: 16,
    }
  }
}

/// Allocation behaviour of the tool registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
  pub max_tools_per_agent: usize,
  /// Weight of caller-supplied recent performance when re-ranking tools.
  pub recent_performance_weight: f64,
}

impl Default for RegistrySettings {
  fn default() -> Self {
    Self {
      max_tools_per_agent: 6,
      recent_performance_weight: 0.3,
    }
  }
}
