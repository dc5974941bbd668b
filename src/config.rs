//! Configuration management for the compatibility checker
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (proto-compat.toml)
//! - Environment variables (PROTO_COMPAT__*)
//!
//! ## Example config file (proto-compat.toml):
//! ```toml
//! [report]
//! suppress_warnings = false
//! format = "text"
//!
//! [check]
//! fail_on_warnings = false
//!
//! [loader]
//! extension = "proto"
//! follow_symlinks = false
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompatConfig {
    /// Report settings
    #[serde(default)]
    pub report: ReportConfig,

    /// Pass/fail policy
    #[serde(default)]
    pub check: CheckConfig,

    /// Schema loading
    #[serde(default)]
    pub loader: LoaderConfig,
}

/// Report configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Leave the warning block out of text reports
    #[serde(default)]
    pub suppress_warnings: bool,

    #[serde(default)]
    pub format: OutputFormat,
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Exit-code policy for the front end
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Treat warnings as failures too
    #[serde(default)]
    pub fail_on_warnings: bool,
}

/// Loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// File extension collected when loading a directory
    #[serde(default = "default_extension")]
    pub extension: String,

    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_extension() -> String {
    "proto".to_string()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            follow_symlinks: false,
        }
    }
}

impl CompatConfig {
    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "proto-compat.toml",
            ".proto-compat.toml",
            "config/proto-compat.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "proto-compat", "proto-compat") {
            let xdg_config = config_dir.config_dir().join("proto-compat.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("PROTO_COMPAT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
