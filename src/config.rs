//! Configuration loading and management.
//!
//! Configuration is loaded from multiple sources with the following precedence
//! (highest to lowest):
//!
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. `.pipeline-lint.toml` in current directory
//! 4. `~/.config/pipeline-lint/config.toml`
//! 5. Default values
//!
//! # Configuration File Format
//!
//! ```toml
//! [discovery]
//! pipeline_file = "pipeline.yml"
//! tasks_dir = "tasks"
//! task_file = "task.yml"
//!
//! [query_validation]
//! workers = 8                  # 0 disables dry-run validation
//!
//! [templating.variables]
//! ds = "2024-01-01"
//! project = "analytics-prod"
//!
//! [rules]
//! disabled = ["valid-task-type"]
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `PIPELINE_LINT_WORKERS` | Query validation worker count |

use std::{collections::HashMap, env, fs, path::PathBuf};

use serde::Deserialize;

use crate::error::{AppResult, config_error};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub discovery:        DiscoveryConfig,
    #[serde(default)]
    pub query_validation: QueryValidationConfig,
    #[serde(default)]
    pub templating:       TemplatingConfig,
    #[serde(default)]
    pub rules:            RulesConfig
}

/// File names the builder looks for
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub pipeline_file: String,
    pub tasks_dir:     String,
    pub task_file:     String
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            pipeline_file: String::from("pipeline.yml"),
            tasks_dir:     String::from("tasks"),
            task_file:     String::from("task.yml")
        }
    }
}

/// Dry-run query validation settings
#[derive(Debug, Clone, Deserialize, Default)]
pub struct QueryValidationConfig {
    /// Worker count per warehouse rule, 0 disables validation
    #[serde(default)]
    pub workers: usize
}

/// Template variables available to executables
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TemplatingConfig {
    #[serde(default)]
    pub variables: HashMap<String, String>
}

/// Rules configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RulesConfig {
    /// Disabled rule names
    #[serde(default)]
    pub disabled: Vec<String>
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file in current directory (.pipeline-lint.toml)
    /// 3. Config file in home directory (~/.config/pipeline-lint/config.toml)
    /// 4. Default values
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(home) = env::var_os("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("pipeline-lint")
                .join("config.toml");

            if home_config.exists() {
                config = Self::from_file(&home_config)?;
            }
        }

        let local_config = PathBuf::from(".pipeline-lint.toml");
        if local_config.exists() {
            config = Self::from_file(&local_config)?;
        }

        if let Ok(workers) = env::var("PIPELINE_LINT_WORKERS") {
            config.query_validation.workers = workers.trim().parse().map_err(|_| {
                config_error(format!(
                    "PIPELINE_LINT_WORKERS must be a non-negative integer, got '{}'",
                    workers
                ))
            })?;
        }

        Ok(config)
    }

    fn from_file(path: &PathBuf) -> AppResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| config_error(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parse a TOML document, filling missing sections with defaults.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| config_error(format!("Invalid config file: {}", e)))
    }
}
