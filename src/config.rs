use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use context_dataset_core::extract::DEFAULT_WINDOW_SIZE;
use context_dataset_core::models::TaskStatus;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub git: GitConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./data/datasets")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    #[serde(default = "default_window_size")]
    pub window_size: u32,
    #[serde(default)]
    pub merge_overlapping_ranges: bool,
    #[serde(default = "default_task_statuses")]
    pub task_statuses: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            merge_overlapping_ranges: false,
            task_statuses: default_task_statuses(),
        }
    }
}

fn default_window_size() -> u32 {
    DEFAULT_WINDOW_SIZE
}
fn default_task_statuses() -> Vec<String> {
    vec!["complete".to_string()]
}

impl ExtractionConfig {
    /// Parsed task statuses. Only valid after [`load_config`] succeeded.
    pub fn statuses(&self) -> Vec<TaskStatus> {
        self.task_statuses
            .iter()
            .filter_map(|s| TaskStatus::parse(s))
            .collect()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GitConfig {
    #[serde(default)]
    pub repo_dir: Option<PathBuf>,
    #[serde(default = "default_target_branch")]
    pub default_target_branch: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            repo_dir: None,
            default_target_branch: default_target_branch(),
        }
    }
}

fn default_target_branch() -> String {
    "main".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.extraction.window_size == 0 {
        anyhow::bail!("extraction.window_size must be > 0");
    }

    if config.extraction.task_statuses.is_empty() {
        anyhow::bail!("extraction.task_statuses must not be empty");
    }

    for status in &config.extraction.task_statuses {
        if TaskStatus::parse(status).is_none() {
            anyhow::bail!(
                "Unknown task status: '{}'. Must be one of to_do, in_progress, blocked, \
                 in_review, complete, canceled, failed.",
                status
            );
        }
    }

    if config.git.default_target_branch.trim().is_empty() {
        anyhow::bail!("git.default_target_branch must not be empty");
    }

    Ok(())
}
