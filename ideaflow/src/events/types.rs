//! Event types for workflow activity streaming
//!
//! These events describe everything observable about a session:
//! - Session lifecycle (created, completed, failed)
//! - Phase boundaries and sub-progress
//! - Step log appends
//! - Refinement loop iterations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Phase, ReportStatus, SessionId, StepStatus};

/// Core event enum - the vocabulary of workflow activity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkflowEvent {
    // === Session Lifecycle ===
    /// A session was created and queued for execution
    SessionCreated {
        session_id: SessionId,
        user_id: String,
        input: String,
    },
    /// The session finished every phase
    SessionCompleted {
        session_id: SessionId,
        report_status: ReportStatus,
    },
    /// The session halted on an error
    SessionFailed { session_id: SessionId, error: String },

    // === Phases ===
    PhaseStarted { session_id: SessionId, phase: Phase },
    PhaseCompleted {
        session_id: SessionId,
        phase: Phase,
        duration_ms: u64,
    },
    PhaseFailed {
        session_id: SessionId,
        phase: Phase,
        error: String,
    },
    /// Sub-progress reported inside a phase's range
    ProgressReported {
        session_id: SessionId,
        phase: Phase,
        percentage: u8,
    },

    // === Step Log ===
    StepRecorded {
        session_id: SessionId,
        agent: String,
        action: String,
        status: StepStatus,
    },

    // === Refinement ===
    /// One generate/evaluate/decide cycle finished
    IterationCompleted {
        session_id: SessionId,
        iteration: u32,
        candidates: usize,
        best_total: u32,
        passed: bool,
    },
}

impl WorkflowEvent {
    /// Get the session ID for this event
    pub fn session_id(&self) -> &SessionId {
        match self {
            WorkflowEvent::SessionCreated { session_id, .. }
            | WorkflowEvent::SessionCompleted { session_id, .. }
            | WorkflowEvent::SessionFailed { session_id, .. }
            | WorkflowEvent::PhaseStarted { session_id, .. }
            | WorkflowEvent::PhaseCompleted { session_id, .. }
            | WorkflowEvent::PhaseFailed { session_id, .. }
            | WorkflowEvent::ProgressReported { session_id, .. }
            | WorkflowEvent::StepRecorded { session_id, .. }
            | WorkflowEvent::IterationCompleted { session_id, .. } => session_id,
        }
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            WorkflowEvent::SessionCreated { .. } => "SessionCreated",
            WorkflowEvent::SessionCompleted { .. } => "SessionCompleted",
            WorkflowEvent::SessionFailed { .. } => "SessionFailed",
            WorkflowEvent::PhaseStarted { .. } => "PhaseStarted",
            WorkflowEvent::PhaseCompleted { .. } => "PhaseCompleted",
            WorkflowEvent::PhaseFailed { .. } => "PhaseFailed",
            WorkflowEvent::ProgressReported { .. } => "ProgressReported",
            WorkflowEvent::StepRecorded { .. } => "StepRecorded",
            WorkflowEvent::IterationCompleted { .. } => "IterationCompleted",
        }
    }

    /// Whether this is the last event a session will emit
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowEvent::SessionCompleted { .. } | WorkflowEvent::SessionFailed { .. }
        )
    }
}

/// A timestamped event log entry for file persistence
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventLogEntry {
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    pub event: WorkflowEvent,
}

impl EventLogEntry {
    /// Create a new log entry with current timestamp
    pub fn new(event: WorkflowEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid() -> SessionId {
        SessionId::from_string("test-123")
    }

    #[test]
    fn test_event_session_id_and_type() {
        let event = WorkflowEvent::PhaseStarted {
            session_id: sid(),
            phase: Phase::Ideation,
        };
        assert_eq!(event.session_id().as_str(), "test-123");
        assert_eq!(event.event_type(), "PhaseStarted");
        assert!(!event.is_terminal());
    }

    #[test]
    fn test_terminal_events() {
        let done = WorkflowEvent::SessionCompleted {
            session_id: sid(),
            report_status: ReportStatus::Partial,
        };
        let failed = WorkflowEvent::SessionFailed {
            session_id: sid(),
            error: "boom".to_string(),
        };
        assert!(done.is_terminal());
        assert!(failed.is_terminal());
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = WorkflowEvent::IterationCompleted {
            session_id: sid(),
            iteration: 2,
            candidates: 3,
            best_total: 72,
            passed: true,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "IterationCompleted");
        assert_eq!(json["best_total"], 72);

        let parsed: WorkflowEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_event_log_entry() {
        let entry = EventLogEntry::new(WorkflowEvent::SessionCreated {
            session_id: sid(),
            user_id: "u1".to_string(),
            input: "smart parking".to_string(),
        });
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"ts\""));
        assert!(json.contains("SessionCreated"));
    }
}
