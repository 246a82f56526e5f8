//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ideaflow - multi-phase business idea workflow
#[derive(Parser)]
#[command(
    name = "ideaflow",
    about = "Research, ideate, analyze and report on business ideas with a quality-gated refinement loop",
    version,
    after_help = "Logs are written to: ~/.local/share/ideaflow/logs/ideaflow.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run one session per input and print the results
    Run {
        /// Free-text description of what to build; each one runs as its own session
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<String>,

        /// User the sessions belong to
        #[arg(short, long, default_value = "local")]
        user: String,

        /// Extra requirements applied to every session
        #[arg(short, long)]
        requirements: Option<String>,

        /// Maximum refinement iterations
        #[arg(short, long)]
        max_iterations: Option<u32>,

        /// Passing score threshold (0-100)
        #[arg(short, long)]
        threshold: Option<u32>,

        /// Ideas generated per iteration
        #[arg(short, long)]
        ideas: Option<usize>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Directory for per-session event logs
        #[arg(long)]
        events_dir: Option<PathBuf>,

        /// Directory for JSON reports
        #[arg(long)]
        reports_dir: Option<PathBuf>,
    },

    /// Print the effective configuration as YAML
    Config,
}

/// Output format for the run command
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}
