//! Viewer configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::DecoderChoice;
use crate::session::DEFAULT_DRAG_FACTOR;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {message}")]
    Read { path: String, message: String },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Settings shared by the front-ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Container file extension, matched case-insensitively.
    pub extension: String,
    /// Sub-directory receiving deleted files.
    pub quarantine_dir: String,
    /// Sub-directory receiving exported JPEGs and the job list.
    pub export_dir: String,
    /// Job list file name inside `export_dir`.
    pub export_list: String,
    /// Multiplier applied to pointer deltas while panning.
    pub drag_factor: f64,
    pub decoder: DecoderChoice,
    /// Viewport assumed until the first resize, `(width, height)`.
    pub initial_viewport: (i32, i32),
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            extension: "X3F".to_string(),
            quarantine_dir: "delete".to_string(),
            export_dir: "export".to_string(),
            export_list: "export_list.txt".to_string(),
            drag_factor: DEFAULT_DRAG_FACTOR,
            decoder: DecoderChoice::Auto,
            initial_viewport: (860, 600),
        }
    }
}

impl ViewerConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extension.is_empty() {
            return Err(ConfigError::Invalid("extension must not be empty".into()));
        }
        for (name, dir) in [
            ("quarantine_dir", &self.quarantine_dir),
            ("export_dir", &self.export_dir),
            ("export_list", &self.export_list),
        ] {
            if dir.is_empty() || dir.contains(['/', '\\']) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a plain name, got '{}'",
                    name, dir
                )));
            }
        }
        if !(self.drag_factor.is_finite() && self.drag_factor > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "drag_factor must be positive, got {}",
                self.drag_factor
            )));
        }
        Ok(())
    }
}

/// Parse a `WIDTHxHEIGHT` viewport string such as `1280x720`.
pub fn parse_viewport(value: &str) -> Result<(i32, i32), ConfigError> {
    let invalid = || ConfigError::Invalid(format!("viewport must look like 860x600, got '{}'", value));
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(invalid)?;
    let width = w.trim().parse::<i32>().map_err(|_| invalid())?;
    let height = h.trim().parse::<i32>().map_err(|_| invalid())?;
    Ok((width, height))
}
