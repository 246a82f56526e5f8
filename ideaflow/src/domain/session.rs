//! WorkflowState domain type
//!
//! One record per session. The store owns every WorkflowState and hands out
//! clones, so a snapshot never changes underneath its reader.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::id::SessionId;
use super::phase::{Phase, SessionStatus};
use super::report::FinalReport;
use super::step::StepRecord;

/// Progress a freshly created session starts at
pub const INITIAL_PROGRESS: u8 = 5;

/// Full per-session workflow record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub session_id: SessionId,

    pub user_id: String,

    /// Trimmed user input text
    pub input: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,

    pub phase: Phase,

    pub status: SessionStatus,

    /// 0-100, non-decreasing while running
    pub progress_percentage: u8,

    /// Append-only step log
    #[serde(default)]
    pub steps: Vec<StepRecord>,

    /// Only set on success
    #[serde(default)]
    pub final_report: Option<FinalReport>,

    #[serde(default)]
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl WorkflowState {
    /// Create the initial state for a new session
    pub fn new(session_id: SessionId, user_id: impl Into<String>, input: impl Into<String>) -> Self {
        let user_id = user_id.into();
        debug!(%session_id, %user_id, "WorkflowState::new: called");
        let now = Utc::now();
        Self {
            session_id,
            user_id,
            input: input.into(),
            requirements: None,
            phase: Phase::Research,
            status: SessionStatus::Running,
            progress_percentage: INITIAL_PROGRESS,
            steps: Vec::new(),
            final_report: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder: set requirements, dropping blank text
    pub fn with_requirements(mut self, requirements: Option<String>) -> Self {
        self.requirements = requirements.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Bump updated_at
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn last_step(&self) -> Option<&StepRecord> {
        self.steps.last()
    }

    /// Steps recorded by one agent, in log order
    pub fn steps_for<'a>(&'a self, agent: &'a str) -> impl Iterator<Item = &'a StepRecord> + 'a {
        self.steps.iter().filter(move |s| s.agent == agent)
    }
}

/// Status view returned to pollers
///
/// `final_report` and `error` are always present (null when unset) so
/// clients can rely on the shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatusView {
    pub session_id: SessionId,
    pub phase: Phase,
    pub status: SessionStatus,
    pub progress_percentage: u8,
    pub steps: Vec<StepRecord>,
    pub final_report: Option<FinalReport>,
    pub error: Option<String>,
}

impl From<&WorkflowState> for SessionStatusView {
    fn from(state: &WorkflowState) -> Self {
        Self {
            session_id: state.session_id.clone(),
            phase: state.phase,
            status: state.status,
            progress_percentage: state.progress_percentage,
            steps: state.steps.clone(),
            final_report: state.final_report.clone(),
            error: state.error.clone(),
        }
    }
}

impl From<WorkflowState> for SessionStatusView {
    fn from(state: WorkflowState) -> Self {
        Self {
            session_id: state.session_id,
            phase: state.phase,
            status: state.status,
            progress_percentage: state.progress_percentage,
            steps: state.steps,
            final_report: state.final_report,
            error: state.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_defaults() {
        let state = WorkflowState::new(SessionId::generate(), "u1", "smart parking");
        assert_eq!(state.phase, Phase::Research);
        assert_eq!(state.status, SessionStatus::Running);
        assert_eq!(state.progress_percentage, 5);
        assert!(state.steps.is_empty());
        assert!(state.final_report.is_none());
        assert!(!state.is_terminal());
    }

    #[test]
    fn test_blank_requirements_dropped() {
        let state = WorkflowState::new(SessionId::generate(), "u1", "x").with_requirements(Some("   ".to_string()));
        assert!(state.requirements.is_none());

        let state =
            WorkflowState::new(SessionId::generate(), "u1", "x").with_requirements(Some(" B2B only ".to_string()));
        assert_eq!(state.requirements.as_deref(), Some("B2B only"));
    }

    #[test]
    fn test_steps_for_filters_by_agent() {
        let mut state = WorkflowState::new(SessionId::generate(), "u1", "x");
        state.steps.push(StepRecord::in_progress("research", "Researching"));
        state.steps.push(StepRecord::completed("research", "Research done"));
        state.steps.push(StepRecord::in_progress("ideation", "Generating"));
        assert_eq!(state.steps_for("research").count(), 2);
        assert_eq!(state.last_step().unwrap().agent, "ideation");
    }

    #[test]
    fn test_status_view_nulls() {
        let state = WorkflowState::new(SessionId::generate(), "u1", "x");
        let view = SessionStatusView::from(&state);
        let json = serde_json::to_value(&view).unwrap();
        assert!(json["final_report"].is_null());
        assert!(json["error"].is_null());
        assert_eq!(json["status"], "running");
        assert_eq!(json["phase"], "research");
        assert_eq!(json["progress_percentage"], 5);
    }
}
