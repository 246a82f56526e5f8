//! ideaflow - Multi-Phase Agentic Workflow Orchestrator
//!
//! CLI entry point for running idea sessions.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use ideaflow::cli::{Cli, Command, OutputFormat};
use ideaflow::collaborators::offline_pipeline;
use ideaflow::config::Config;
use ideaflow::domain::{SessionStatus, SessionStatusView, WorkflowState};
use ideaflow::events::{EventLogger, create_event_bus, spawn_event_logger};
use ideaflow::orchestrator::{JsonReportSink, PhaseOrchestrator, SessionManager, SessionRequest};
use ideaflow::state::StateManager;

fn setup_logging(level: &str) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ideaflow")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Write to the log file, not stdout/stderr
    let level: tracing::Level = level
        .parse()
        .map_err(|_| eyre::eyre!("Invalid log level '{}'", level))?;
    let log_file = fs::File::create(log_dir.join("ideaflow.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config comes first so its log level can apply
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    let level = cli
        .log_level
        .clone()
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| "info".to_string());
    setup_logging(&level).context("Failed to setup logging")?;

    match cli.command {
        Some(Command::Run {
            inputs,
            user,
            requirements,
            max_iterations,
            threshold,
            ideas,
            format,
            events_dir,
            reports_dir,
        }) => {
            let mut config = config;
            if let Some(max_iterations) = max_iterations {
                config.refinement.max_iterations = max_iterations;
            }
            if let Some(threshold) = threshold {
                config.refinement.passing_score_threshold = threshold;
            }
            if let Some(ideas) = ideas {
                config.refinement.ideas_per_iteration = ideas;
            }
            if events_dir.is_some() {
                config.events.log_dir = events_dir;
            }
            if reports_dir.is_some() {
                config.reports.dir = reports_dir;
            }
            cmd_run(&config, inputs, &user, requirements, format).await
        }
        Some(Command::Config) => cmd_config(&config),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

/// Print the effective configuration
fn cmd_config(config: &Config) -> Result<()> {
    config.validate()?;
    print!("{}", serde_yaml::to_string(config).context("Failed to serialize config")?);
    Ok(())
}

/// Run one session per input and print the outcome
async fn cmd_run(
    config: &Config,
    inputs: Vec<String>,
    user: &str,
    requirements: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    config.validate().context("Invalid configuration")?;
    info!(
        "Running {} session(s): max-iterations={}, threshold={}",
        inputs.len(),
        config.refinement.max_iterations,
        config.refinement.passing_score_threshold
    );

    let events_dir = match &config.events.log_dir {
        Some(dir) => dir.clone(),
        None => EventLogger::default_dir()?,
    };
    let reports_dir = match &config.reports.dir {
        Some(dir) => dir.clone(),
        None => JsonReportSink::default_dir()?,
    };

    let store = StateManager::spawn_in_memory();
    let bus = create_event_bus(config.events.channel_capacity);
    let logger_shutdown = CancellationToken::new();
    let logger = spawn_event_logger(&bus, &events_dir, logger_shutdown.clone()).context("Failed to start event logger")?;

    let orchestrator = PhaseOrchestrator::new(
        store.clone(),
        bus.clone(),
        Arc::new(offline_pipeline(&config.refinement)),
        config.workflow.phase_timeout(),
    )
    .with_sink(Arc::new(JsonReportSink::new(&reports_dir)));
    let manager = SessionManager::new(
        store,
        bus,
        orchestrator,
        config.workflow.max_concurrent_sessions,
        config.workflow.shutdown_timeout(),
    );

    let mut session_ids = Vec::new();
    for input in &inputs {
        let mut request = SessionRequest::new(user, input.as_str());
        if let Some(requirements) = &requirements {
            request = request.with_requirements(requirements.as_str());
        }
        match manager.start(request).await {
            Ok(id) => session_ids.push(id),
            Err(e) => {
                manager.shutdown().await?;
                logger_shutdown.cancel();
                let _ = logger.await;
                return Err(e).context(format!("Failed to start session for '{}'", input));
            }
        }
    }

    let waits = join_all(session_ids.iter().map(|id| manager.wait(id)));
    tokio::pin!(waits);
    let finished = tokio::select! {
        results = &mut waits => Some(results),
        _ = tokio::signal::ctrl_c() => None,
    };
    let results = match finished {
        Some(results) => results,
        None => {
            warn!("Interrupted, cancelling sessions");
            for id in &session_ids {
                let _ = manager.cancel(id).await;
            }
            waits.await
        }
    };

    let mut states: Vec<WorkflowState> = Vec::new();
    for result in results {
        states.push(result?);
    }

    manager.shutdown().await?;
    logger_shutdown.cancel();
    if let Err(e) = logger.await {
        warn!("Event logger task failed: {}", e);
    }

    match format {
        OutputFormat::Json => {
            let views: Vec<SessionStatusView> = states.iter().map(SessionStatusView::from).collect();
            println!("{}", serde_json::to_string_pretty(&views)?);
        }
        OutputFormat::Text => {
            for state in &states {
                print_session(state, &reports_dir);
            }
        }
    }

    let failed = states.iter().filter(|s| s.status == SessionStatus::Failed).count();
    if failed > 0 {
        eyre::bail!("{} of {} session(s) failed", failed, states.len());
    }
    Ok(())
}

fn print_session(state: &WorkflowState, reports_dir: &std::path::Path) {
    println!("{} {}", "Session".bold(), state.session_id);
    println!("  Input:    {}", state.input);
    let status = match state.status {
        SessionStatus::Completed => state.status.to_string().green(),
        SessionStatus::Failed => state.status.to_string().red(),
        SessionStatus::Running => state.status.to_string().yellow(),
    };
    println!("  Status:   {} ({}%)", status, state.progress_percentage);

    if let Some(report) = &state.final_report {
        if let Some(idea) = &report.idea {
            let verdict = if idea.passed { "passed".green() } else { "below threshold".yellow() };
            println!("  Idea:     {} - {}/100, {}", idea.title.bold(), idea.total, verdict);
            println!("  Rounds:   {}", idea.iterations);
        }
        println!("  Report:   {}", reports_dir.join(format!("{}.json", state.session_id)).display());
    }
    if let Some(error) = &state.error {
        println!("  Error:    {}", error.red());
    }
    println!();
}
