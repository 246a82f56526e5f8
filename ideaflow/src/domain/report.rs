//! Final report hand-off type

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::id::SessionId;

/// Bumped whenever the report layout changes incompatibly
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Outcome discriminator carried by every report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Workflow completed and the selected idea passed
    Success,
    /// Workflow completed with a fallback idea below the threshold
    Partial,
    /// Workflow failed; only ever handed to a report sink
    Failed,
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Partial => write!(f, "partial"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// The orchestrator-visible summary of the selected idea
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaSummary {
    pub title: String,
    pub total: u32,
    pub passed: bool,
    pub iterations: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    pub schema_version: u32,
    pub status: ReportStatus,
    pub session_id: SessionId,
    pub user_id: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idea: Option<IdeaSummary>,
    /// Whatever the report phase produced
    #[serde(default)]
    pub document: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FinalReport {
    /// Report for a workflow that ran to completion
    pub fn completed(session_id: SessionId, user_id: impl Into<String>, idea: Option<IdeaSummary>, document: Value) -> Self {
        let status = match &idea {
            Some(summary) if !summary.passed => ReportStatus::Partial,
            _ => ReportStatus::Success,
        };
        debug!(%session_id, %status, "FinalReport::completed: called");
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            status,
            session_id,
            user_id: user_id.into(),
            generated_at: Utc::now(),
            idea,
            document,
            error: None,
        }
    }

    /// Report for a workflow that failed
    pub fn failed(session_id: SessionId, user_id: impl Into<String>, error: impl Into<String>) -> Self {
        debug!(%session_id, "FinalReport::failed: called");
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            status: ReportStatus::Failed,
            session_id,
            user_id: user_id.into(),
            generated_at: Utc::now(),
            idea: None,
            document: Value::Null,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ReportStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn summary(passed: bool) -> IdeaSummary {
        IdeaSummary {
            title: "Parking spot marketplace".to_string(),
            total: if passed { 72 } else { 65 },
            passed,
            iterations: 2,
        }
    }

    #[test]
    fn test_status_follows_idea_pass() {
        let ok = FinalReport::completed(SessionId::generate(), "u1", Some(summary(true)), json!({}));
        assert_eq!(ok.status, ReportStatus::Success);
        assert!(ok.is_success());

        let partial = FinalReport::completed(SessionId::generate(), "u1", Some(summary(false)), json!({}));
        assert_eq!(partial.status, ReportStatus::Partial);
    }

    #[test]
    fn test_failed_report() {
        let report = FinalReport::failed(SessionId::generate(), "u1", "analysis phase failed: boom");
        assert_eq!(report.status, ReportStatus::Failed);
        assert!(report.idea.is_none());
        assert_eq!(report.error.as_deref(), Some("analysis phase failed: boom"));
    }

    #[test]
    fn test_serialized_shape() {
        let report = FinalReport::completed(
            SessionId::from_string("s-1"),
            "u1",
            Some(summary(true)),
            json!({"markdown": "# Report"}),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["schema_version"], 1);
        assert_eq!(json["status"], "success");
        assert_eq!(json["session_id"], "s-1");
        assert_eq!(json["idea"]["total"], 72);
        assert!(json.get("error").is_none());

        let back: FinalReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }
}
