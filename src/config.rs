// src/config.rs
//! Runtime configuration: an optional YAML file, overridden by environment
//! variables, overridden by the first command-line argument.

use crate::error::ConfigError;
use crate::fetch::RetryPolicy;
use crate::pipeline::PipelineOptions;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

pub const CONFIG_PATH_ENV: &str = "FINGATE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "fingate.yaml";

/// Default archive: the shared statement bundle the tool was built around.
pub const DEFAULT_DRIVE_FILE_ID: &str = "1A0yeEBAvLkX64PlatHboPAHhHVIcJICw";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// A Drive file id, a Drive share URL, or a local ZIP path.
    pub archive: String,
    /// Entries with these suffixes are treated as documents.
    pub document_extensions: Vec<String>,
    pub output_dir: PathBuf,
    pub workbook_name: String,
    pub report_name: String,
    pub fetch: RetryPolicy,
    pub pipeline: PipelineOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            archive: DEFAULT_DRIVE_FILE_ID.to_string(),
            document_extensions: vec![".html".to_string(), ".htm".to_string()],
            output_dir: PathBuf::from("output"),
            workbook_name: "all_tables.xlsx".to_string(),
            report_name: "tables.json".to_string(),
            fetch: RetryPolicy::default(),
            pipeline: PipelineOptions::default(),
        }
    }
}

impl Config {
    /// Reads a YAML config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Applies `FINGATE_*` overrides from `vars`.
    pub fn apply_env(&mut self, vars: &HashMap<String, String>) -> Result<(), ConfigError> {
        if let Some(v) = vars.get("FINGATE_DRIVE_FILE_ID") {
            self.archive = v.clone();
        }
        // A local archive path beats a file id when both are set.
        if let Some(v) = vars.get("FINGATE_ARCHIVE") {
            self.archive = v.clone();
        }
        if let Some(v) = vars.get("FINGATE_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = vars.get("FINGATE_MAX_RETRIES") {
            self.fetch.max_retries = v.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: "FINGATE_MAX_RETRIES".to_string(),
                value: v.clone(),
            })?;
        }
        Ok(())
    }

    /// Resolves the full configuration for a run: the file named by
    /// `FINGATE_CONFIG` (or `fingate.yaml` when present), then the
    /// environment, then `cli_archive`.
    pub fn load(cli_archive: Option<&str>) -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();

        let mut config = match vars.get(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(Path::new(path))?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => {
                debug!("no config file, using defaults");
                Self::default()
            }
        };
        config.apply_env(&vars)?;
        if let Some(archive) = cli_archive {
            config.archive = archive.to_string();
        }
        info!(archive = %config.archive, output = %config.output_dir.display(), "configuration loaded");
        Ok(config)
    }

    pub fn workbook_path(&self) -> PathBuf {
        self.output_dir.join(&self.workbook_name)
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(&self.report_name)
    }
}
