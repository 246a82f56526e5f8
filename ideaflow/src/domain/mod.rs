//! Domain types for ideaflow
//!
//! Session state, the step log, phases, ideas with their evaluations, and
//! the final report. Everything here is plain serde data; the store and the
//! orchestrator own the rules for changing it.

mod id;
mod idea;
mod phase;
mod report;
mod session;
mod step;

pub use id::SessionId;
pub use idea::{BusinessIdea, Criterion, CriterionScores, DEFAULT_PASSING_THRESHOLD, IdeaEvaluation, ScoreError};
pub use phase::{Phase, SessionStatus};
pub use report::{FinalReport, IdeaSummary, REPORT_SCHEMA_VERSION, ReportStatus};
pub use session::{INITIAL_PROGRESS, SessionStatusView, WorkflowState};
pub use step::{StepRecord, StepStatus};
