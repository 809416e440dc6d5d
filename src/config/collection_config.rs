use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::env_vars::expand_path;
use crate::constants::{DEFAULT_CONFIG_FILE, DEFAULT_LOG_ROOT, DEFAULT_OUTPUT_DIR};

/// Settings read from `logsnap.yaml`. Command-line flags take precedence.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LogsnapConfig {
    /// Directory containing every application's log tree.
    #[serde(default = "default_log_root")]
    pub log_root_dir: String,
    /// Directory receiving snapshot archives.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Kinds collected when none are named on the command line. Empty means all.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Cap on per-directory workers; absent means one per CPU.
    #[serde(default)]
    pub max_workers: Option<usize>,
}

fn default_log_root() -> String {
    DEFAULT_LOG_ROOT.to_string()
}

fn default_output_dir() -> String {
    DEFAULT_OUTPUT_DIR.to_string()
}

impl Default for LogsnapConfig {
    fn default() -> Self {
        LogsnapConfig {
            log_root_dir: default_log_root(),
            output_dir: default_output_dir(),
            sources: Vec::new(),
            max_workers: None,
        }
    }
}

impl LogsnapConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: LogsnapConfig =
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save_to_yaml_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .context(format!("Failed to create config directory {}", parent.display()))?;
        }
        fs::write(path, yaml).context(format!("Failed to write config to {}", path.display()))?;

        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Log root with environment variables and `~` expanded.
    pub fn log_root_path(&self) -> PathBuf {
        expand_path(&self.log_root_dir)
    }

    /// Output directory with environment variables and `~` expanded.
    pub fn output_path(&self) -> PathBuf {
        expand_path(&self.output_dir)
    }
}

/// Load a configuration file, writing the defaults to it first if it is missing.
///
/// # Arguments
///
/// * `config_path` - Configuration file, `logsnap.yaml` in the working directory when `None`
///
/// # Returns
///
/// * `Ok(LogsnapConfig)` - The loaded or created configuration
/// * `Err` - If the file exists but cannot be parsed, or cannot be created
pub fn load_or_create_config(config_path: Option<&Path>) -> Result<LogsnapConfig> {
    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

    if path.exists() {
        LogsnapConfig::from_yaml_file(path)
    } else {
        info!("Creating default config at {}", path.display());
        let default_config = LogsnapConfig::default();
        default_config.save_to_yaml_file(path)?;
        Ok(default_config)
    }
}
