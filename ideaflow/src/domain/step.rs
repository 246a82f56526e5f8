//! StepRecord domain type
//!
//! Immutable log entry for one unit of work inside a session. Steps are
//! appended to the session's step log through the store and never edited:
//! a phase that starts and then finishes produces two records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

/// Status carried by a step record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One entry in a session's step log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Unique ID (UUID v7, so IDs sort in creation order)
    pub id: String,

    /// Originating collaborator tag (e.g., "research", "ideation")
    pub agent: String,

    /// Human-readable description of the work
    pub action: String,

    pub status: StepStatus,

    pub timestamp: DateTime<Utc>,

    /// Wall-clock duration of the work, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// Structured extra data (scores, error text, collaborator name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl StepRecord {
    /// Create a new step record stamped with the current time
    pub fn new(agent: impl Into<String>, action: impl Into<String>, status: StepStatus) -> Self {
        let agent = agent.into();
        let action = action.into();
        debug!(%agent, %action, %status, "StepRecord::new: called");
        Self {
            id: Uuid::now_v7().to_string(),
            agent,
            action,
            status,
            timestamp: Utc::now(),
            duration_ms: None,
            details: None,
        }
    }

    /// Shorthand for an in-progress record
    pub fn in_progress(agent: impl Into<String>, action: impl Into<String>) -> Self {
        Self::new(agent, action, StepStatus::InProgress)
    }

    /// Shorthand for a completed record
    pub fn completed(agent: impl Into<String>, action: impl Into<String>) -> Self {
        Self::new(agent, action, StepStatus::Completed)
    }

    /// Shorthand for a failed record
    pub fn failed(agent: impl Into<String>, action: impl Into<String>) -> Self {
        Self::new(agent, action, StepStatus::Failed)
    }

    /// Builder: set duration
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        debug!(id = %self.id, duration_ms, "StepRecord::with_duration_ms");
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Builder: set details
    pub fn with_details(mut self, details: Value) -> Self {
        debug!(id = %self.id, "StepRecord::with_details");
        self.details = Some(details);
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == StepStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_ids_are_unique() {
        let a = StepRecord::in_progress("research", "Researching");
        let b = StepRecord::in_progress("research", "Researching");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_builders() {
        let step = StepRecord::failed("analysis", "Analysis failed")
            .with_duration_ms(1500)
            .with_details(json!({"error": "boom"}));

        assert!(step.is_failed());
        assert_eq!(step.duration_ms, Some(1500));
        assert_eq!(step.details.as_ref().unwrap()["error"], "boom");
    }

    #[test]
    fn test_optional_fields_skipped_when_empty() {
        let step = StepRecord::completed("report", "Report written");
        let json = serde_json::to_value(&step).unwrap();
        assert!(json.get("duration_ms").is_none());
        assert!(json.get("details").is_none());
        assert_eq!(json["status"], "completed");
    }

    #[test]
    fn test_status_display() {
        assert_eq!(StepStatus::InProgress.to_string(), "in_progress");
        assert_eq!(StepStatus::default(), StepStatus::Pending);
    }
}
