use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("failed to read settings file '{path}': {source}")]
  Read {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid settings file '{path}': {source}")]
  Parse {
    path: String,
    #[source]
    source: serde_json::Error,
  },
}

/// Runtime settings for the orchestrator and CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// Overrides applied on top of every task's own retry policy.
  pub retry: RetrySettings,
  /// Integration short name -> credential secret.
  pub credentials: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_attempts: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub delay_ms: Option<u64>,
}

impl Settings {
  /// Load settings from a JSON file. Missing fields take their defaults.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.display().to_string(),
      source,
    })?;

    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.display().to_string(),
      source,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_load_partial_settings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, r#"{ "retry": { "max_attempts": 0 } }"#).unwrap();

    let settings = Settings::load(&path).unwrap();
    assert_eq!(settings.retry.max_attempts, Some(0));
    assert_eq!(settings.retry.delay_ms, None);
    assert!(settings.credentials.is_empty());
  }

  #[test]
  fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Settings::load(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
  }
}
