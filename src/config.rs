//! Annotator configuration.
//!
//! Every recognised option is a field with a serde default, so a partial JSON
//! file fills in the rest. The configuration is validated once when an
//! [`Annotator`](crate::Annotator) is constructed.

use serde::{Deserialize, Serialize};

use crate::codec::{Label, MAX_LABEL};
use crate::history::DEFAULT_CAPACITY;

/// Log level setting for the command-line tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Annotator options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatorConfig {
    /// Version of the configuration file format
    #[serde(default = "default_version")]
    pub version: u32,

    /// Display colour per label; labels past the end wrap around
    #[serde(default = "default_colormap")]
    pub colormap: Vec<[u8; 3]>,

    /// Alpha of superpixel boundary pixels
    #[serde(default = "default_boundary_alpha")]
    pub boundary_alpha: u8,

    /// Alpha of the label visualization
    #[serde(default = "default_visualization_alpha")]
    pub visualization_alpha: u8,

    /// Alpha of highlighted pixels; derived from `visualization_alpha` when unset
    #[serde(default)]
    pub highlight_alpha: Option<u8>,

    /// Initial label of every pixel and initial paint label
    #[serde(default)]
    pub default_label: Label,

    /// Number of undo steps kept
    #[serde(default = "default_max_history_record")]
    pub max_history_record: usize,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_colormap() -> Vec<[u8; 3]> {
    vec![[255, 255, 255], [255, 0, 0]]
}

fn default_boundary_alpha() -> u8 {
    127
}

fn default_visualization_alpha() -> u8 {
    144
}

fn default_max_history_record() -> usize {
    DEFAULT_CAPACITY
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            colormap: default_colormap(),
            boundary_alpha: default_boundary_alpha(),
            visualization_alpha: default_visualization_alpha(),
            highlight_alpha: None,
            default_label: 0,
            max_history_record: default_max_history_record(),
            log_level: LogLevel::default(),
        }
    }
}

impl AnnotatorConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Highlight alpha, falling back to `min(255, visualization_alpha + 128)`.
    pub fn effective_highlight_alpha(&self) -> u8 {
        self.highlight_alpha
            .unwrap_or_else(|| self.visualization_alpha.saturating_add(128))
    }

    /// Check the options that have no meaningful fallback.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: self.version,
                supported_version: CONFIG_VERSION,
            });
        }
        if self.colormap.is_empty() {
            return Err(ConfigError::invalid("colormap must not be empty"));
        }
        if self.max_history_record == 0 {
            return Err(ConfigError::invalid("max_history_record must be at least 1"));
        }
        if self.default_label > MAX_LABEL {
            return Err(ConfigError::invalid(format!(
                "default_label {} exceeds {}",
                self.default_label, MAX_LABEL
            )));
        }
        Ok(())
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize and validate configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "segment-annotator.json"
    }

    /// Get the default config file path.
    pub fn default_path() -> Option<std::path::PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(
                config_dir
                    .join("segment-annotator")
                    .join(Self::default_filename()),
            )
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("segment-annotator")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from `path`.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// Option value rejected by validation
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    /// I/O error when reading config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnnotatorConfig::default();
        assert_eq!(config.boundary_alpha, 127);
        assert_eq!(config.visualization_alpha, 144);
        assert_eq!(config.effective_highlight_alpha(), 255);
        assert_eq!(config.max_history_record, 10);
        assert_eq!(config.colormap, vec![[255, 255, 255], [255, 0, 0]]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_highlight_alpha_derivation() {
        let config = AnnotatorConfig {
            visualization_alpha: 64,
            ..Default::default()
        };
        assert_eq!(config.effective_highlight_alpha(), 192);

        let config = AnnotatorConfig {
            highlight_alpha: Some(10),
            ..Default::default()
        };
        assert_eq!(config.effective_highlight_alpha(), 10);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = AnnotatorConfig::from_json(r#"{ "max_history_record": 3, "log_level": "debug" }"#)
            .expect("Failed to parse config");
        assert_eq!(config.max_history_record, 3);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.visualization_alpha, 144);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AnnotatorConfig {
            colormap: vec![[0, 0, 0], [1, 2, 3], [4, 5, 6]],
            default_label: 2,
            ..Default::default()
        };
        let json = config.to_json().expect("Failed to export JSON");
        assert_eq!(AnnotatorConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            AnnotatorConfig::from_json(r#"{ "colormap": [] }"#),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            AnnotatorConfig::from_json(r#"{ "max_history_record": 0 }"#),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            AnnotatorConfig::from_json(r#"{ "default_label": 16777216 }"#),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            AnnotatorConfig::from_json(r#"{ "version": 99 }"#),
            Err(ConfigError::VersionTooNew { file_version: 99, .. })
        ));
        assert!(matches!(
            AnnotatorConfig::from_json("not json"),
            Err(ConfigError::ParseError(_))
        ));
    }
}
