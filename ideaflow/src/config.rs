//! ideaflow configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::events::DEFAULT_CHANNEL_CAPACITY;
use crate::refine::RefinementConfig;

/// Main ideaflow configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Session execution limits
    pub workflow: WorkflowConfig,

    /// Idea refinement loop
    pub refinement: RefinementConfig,

    /// Event bus and event log
    pub events: EventsConfig,

    /// Final report output
    pub reports: ReportsConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        self.refinement.validate()?;
        if self.workflow.phase_timeout_ms == 0 {
            eyre::bail!("workflow.phase-timeout-ms must be greater than 0");
        }
        if self.workflow.shutdown_timeout_ms == 0 {
            eyre::bail!("workflow.shutdown-timeout-ms must be greater than 0");
        }
        if self.workflow.max_concurrent_sessions == 0 {
            eyre::bail!("workflow.max-concurrent-sessions must be at least 1");
        }
        if self.events.channel_capacity == 0 {
            eyre::bail!("events.channel-capacity must be at least 1");
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .ideaflow.yml
        let local_config = PathBuf::from(".ideaflow.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/ideaflow/ideaflow.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("ideaflow").join("ideaflow.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Session execution limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Timeout for one phase in milliseconds
    #[serde(rename = "phase-timeout-ms")]
    pub phase_timeout_ms: u64,

    /// Sessions allowed to run at the same time
    #[serde(rename = "max-concurrent-sessions")]
    pub max_concurrent_sessions: usize,

    /// How long shutdown waits for running sessions in milliseconds
    #[serde(rename = "shutdown-timeout-ms")]
    pub shutdown_timeout_ms: u64,
}

impl WorkflowConfig {
    pub fn phase_timeout(&self) -> Duration {
        Duration::from_millis(self.phase_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            phase_timeout_ms: 600_000, // 10 minutes
            max_concurrent_sessions: 8,
            shutdown_timeout_ms: 30_000,
        }
    }
}

/// Event bus and event log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Broadcast channel capacity; slow subscribers skip events beyond it
    #[serde(rename = "channel-capacity")]
    pub channel_capacity: usize,

    /// Directory for per-session event logs (default: ~/.local/share/ideaflow/sessions)
    #[serde(rename = "log-dir", skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            log_dir: None,
        }
    }
}

/// Final report output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    /// Directory for JSON reports (default: ~/.local/share/ideaflow/reports)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}
