//! Configuration management for tasklist
//!
//! Persists output preferences and the default field set used when no
//! `--fields` argument is given.

use crate::error::{Error, Result};
use crate::fields::FieldSelector;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const CONFIG_FILE: &str = "config.toml";

/// tasklist configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Output options
    #[serde(default)]
    pub output: OutputConfig,
    /// Field selection defaults
    #[serde(default)]
    pub fields: FieldsConfig,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// "text" or "json"
    #[serde(default = "default_format")]
    pub format: String,
    /// Sort column: "pid", "name", "cpu", "pmem"
    #[serde(default = "default_sort_column")]
    pub sort_column: String,
    /// Sort ascending (false = descending)
    #[serde(default = "default_true")]
    pub sort_ascending: bool,
    /// Print a header row in text mode
    #[serde(default = "default_true")]
    pub show_header: bool,
}

/// Default field configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldsConfig {
    /// Field names collected when none are given on the command line
    #[serde(default = "default_fields")]
    pub default: Vec<String>,
}

// Default value functions
fn default_format() -> String {
    "text".to_string()
}

fn default_sort_column() -> String {
    "pid".to_string()
}

fn default_true() -> bool {
    true
}

fn default_fields() -> Vec<String> {
    vec![
        "pid".to_string(),
        "ppid".to_string(),
        "owner".to_string(),
        "pmem".to_string(),
        "cpu".to_string(),
        "name".to_string(),
    ]
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            sort_column: default_sort_column(),
            sort_ascending: true,
            show_header: true,
        }
    }
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            default: default_fields(),
        }
    }
}

impl Config {
    /// Get the default configuration directory
    ///
    /// Returns `~/.config/tasklist` on Unix-like systems,
    /// or `%APPDATA%\tasklist` on Windows.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(windows) {
            std::env::var("APPDATA")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
        } else {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|_| PathBuf::from(".config"))
        };

        Ok(config_dir.join("tasklist"))
    }

    /// Load configuration from the default path, or defaults if absent
    pub fn load() -> Result<Self> {
        let config_file = Self::default_path()?.join(CONFIG_FILE);
        if !config_file.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&config_file)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Parse(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_dir = Self::default_path()?;
        std::fs::create_dir_all(&config_dir)?;
        self.save_to(&config_dir.join(CONFIG_FILE))
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Selector for the configured default fields
    ///
    /// Unknown names are dropped with a warning so a stale config file does
    /// not break the tool.
    pub fn selector(&self) -> FieldSelector {
        let mut selector = FieldSelector::none();
        for name in &self.fields.default {
            match name.parse() {
                Ok(field) => selector.set(field, true),
                Err(e) => warn!("Ignoring configured field: {}", e),
            }
        }
        selector
    }
}
