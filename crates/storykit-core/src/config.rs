//! Client configuration.

use crate::media::UploadLimits;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {message}")]
    Io { path: String, message: String },
    #[error("Invalid config: {0}")]
    Parse(String),
    #[error("Invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Settings shared by the story composer and publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryKitConfig {
    /// Client-side upload ceilings.
    pub limits: UploadLimits,
    /// Storage folder stories are uploaded under.
    pub story_path_prefix: String,
}

impl Default for StoryKitConfig {
    fn default() -> Self {
        Self {
            limits: UploadLimits::default(),
            story_path_prefix: "stories".to_string(),
        }
    }
}

impl StoryKitConfig {
    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Reject settings that would make every upload fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_image_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "limits.max_image_bytes",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.limits.video_target_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "limits.video_target_bytes",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.story_path_prefix.trim_matches('/').is_empty() {
            return Err(ConfigError::Invalid {
                field: "story_path_prefix",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
