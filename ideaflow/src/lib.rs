//! ideaflow - Multi-Phase Agentic Workflow Orchestrator
//!
//! ideaflow drives long-running sessions through a fixed pipeline of
//! research, ideation, analysis and report phases. Ideation runs a bounded
//! refinement loop that generates candidate business ideas, scores them on
//! four weighted criteria and retries with feedback until one passes or the
//! iteration budget is spent.
//!
//! # Core Concepts
//!
//! - **Single writer**: every session change goes through one store actor
//! - **Monotonic progress**: phases never repeat and progress never drops
//! - **Failure isolation**: a failing or panicking session fails alone
//! - **Fallback to best**: ideation always returns its best candidate
//!
//! # Modules
//!
//! - [`domain`] - Session, step, idea and report types
//! - [`state`] - Session store actor
//! - [`events`] - Event bus and JSONL event log
//! - [`progress`] - Progress reporter handed to collaborators
//! - [`refine`] - Iterative refinement loop
//! - [`orchestrator`] - Phase orchestrator and session manager
//! - [`collaborators`] - Offline phase agents
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod collaborators;
pub mod config;
pub mod domain;
pub mod events;
pub mod orchestrator;
pub mod progress;
pub mod refine;
pub mod state;

// Re-export commonly used types
pub use config::{Config, EventsConfig, ReportsConfig, WorkflowConfig};
pub use domain::{
    BusinessIdea, Criterion, CriterionScores, FinalReport, IdeaEvaluation, IdeaSummary, Phase, ReportStatus, SessionId,
    SessionStatus, SessionStatusView, StepRecord, StepStatus, WorkflowState,
};
pub use events::{EventBus, EventEmitter, EventLogger, WorkflowEvent};
pub use orchestrator::{
    JsonReportSink, ManagerError, PhaseAgent, PhaseContext, PhaseError, PhaseOrchestrator, PhaseOutput, PhasePipeline,
    ReportSink, SessionManager, SessionRequest,
};
pub use progress::ProgressReporter;
pub use refine::{IdeaEvaluator, IdeaGenerator, IdeationOutcome, RefineError, RefinementConfig, RefinementLoop};
pub use state::{MemoryRepository, SessionRepository, StateError, StateManager};
