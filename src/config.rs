//! Assistant configuration stored in ~/.calpilot/config.json.
//!
//! A file on disk overrides the embedded defaults; with no file present the
//! defaults are used as-is, so the pipeline works without any setup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantConfig {
    /// Model identifiers rotated across primary-strategy retry attempts.
    #[serde(default = "default_model_rotation")]
    pub model_rotation: Vec<String>,
    /// OpenAI-compatible chat completions endpoint.
    #[serde(default = "default_completion_endpoint")]
    pub completion_endpoint: String,
    /// Attempts for the primary extraction strategy before cascading.
    #[serde(default = "default_extraction_attempts")]
    pub primary_extraction_attempts: u32,
    /// Bounded attempts for the creation retry loop.
    #[serde(default = "default_create_attempts")]
    pub max_create_attempts: u32,
    /// Base delay between extraction retries; doubles per attempt.
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
}

fn default_model_rotation() -> Vec<String> {
    vec![
        "llama-3.3-70b-versatile".to_string(),
        "llama-3.1-8b-instant".to_string(),
        "mixtral-8x7b-32768".to_string(),
    ]
}

fn default_completion_endpoint() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}

fn default_extraction_attempts() -> u32 {
    3
}

fn default_create_attempts() -> u32 {
    3
}

fn default_retry_base_ms() -> u64 {
    200
}

impl Default for AssistantConfig {
    fn default() -> Self {
        AssistantConfig {
            model_rotation: default_model_rotation(),
            completion_endpoint: default_completion_endpoint(),
            primary_extraction_attempts: default_extraction_attempts(),
            max_create_attempts: default_create_attempts(),
            retry_base_ms: default_retry_base_ms(),
        }
    }
}

/// Canonical config file path.
pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".calpilot")
        .join("config.json")
}

impl AssistantConfig {
    /// Load from the canonical path; defaults when absent or unreadable.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    /// Load from a specific path. Missing file or bad JSON falls back to
    /// defaults — a broken config must not take the pipeline down.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("config parse failed at {}: {}; using defaults", path.display(), e);
                    AssistantConfig::default()
                }
            },
            Err(_) => AssistantConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = AssistantConfig::default();
        assert_eq!(c.max_create_attempts, 3);
        assert_eq!(c.primary_extraction_attempts, 3);
        assert!(!c.model_rotation.is_empty());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let c = AssistantConfig::load_from(Path::new("/nonexistent/config.json"));
        assert_eq!(c.max_create_attempts, 3);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"maxCreateAttempts": 5}"#).unwrap();

        let c = AssistantConfig::load_from(&path);
        assert_eq!(c.max_create_attempts, 5);
        // Unspecified fields keep their defaults.
        assert!(!c.model_rotation.is_empty());
    }

    #[test]
    fn test_load_corrupt_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        let c = AssistantConfig::load_from(&path);
        assert_eq!(c.max_create_attempts, 3);
    }
}
