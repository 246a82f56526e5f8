//! State manager messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{FinalReport, Phase, SessionId, SessionStatus, StepRecord, WorkflowState};

use super::manager::SessionMetrics;

/// Errors from state operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Invalid progress: {0}")]
    InvalidProgress(String),

    #[error("Invalid phase: {0}")]
    InvalidPhase(String),

    #[error("Session {0} is terminal")]
    Terminal(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Channel error")]
    ChannelError,
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Optional reply slot: `None` for fire-and-forget progress reports
pub type Reply<T> = Option<oneshot::Sender<StateResponse<T>>>;

/// Commands sent to the StateManager actor
#[derive(Debug)]
pub enum StateCommand {
    Create {
        state: Box<WorkflowState>,
        reply: oneshot::Sender<StateResponse<SessionId>>,
    },
    Get {
        session_id: SessionId,
        reply: oneshot::Sender<StateResponse<WorkflowState>>,
    },
    AppendStep {
        session_id: SessionId,
        step: StepRecord,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    /// Append `step` only if the step log is still empty
    Claim {
        session_id: SessionId,
        step: StepRecord,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    UpdateProgress {
        session_id: SessionId,
        phase: Phase,
        percentage: u8,
        reply: Reply<()>,
    },
    MarkCompleted {
        session_id: SessionId,
        report: Box<FinalReport>,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    MarkFailed {
        session_id: SessionId,
        error: String,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    List {
        status_filter: Option<SessionStatus>,
        reply: oneshot::Sender<StateResponse<Vec<WorkflowState>>>,
    },
    Metrics {
        reply: oneshot::Sender<StateResponse<SessionMetrics>>,
    },

    // Shutdown
    Shutdown {
        reply: oneshot::Sender<StateResponse<()>>,
    },
}
