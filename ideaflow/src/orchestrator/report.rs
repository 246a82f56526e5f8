//! Final report hand-off

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use eyre::{Context, Result};
use tracing::{debug, info};

use crate::domain::FinalReport;

/// Receives every session's final report, successful or not
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn persist(&self, report: &FinalReport) -> Result<()>;
}

/// Writes each report to `<dir>/<session-id>.json`
pub struct JsonReportSink {
    dir: PathBuf,
}

impl JsonReportSink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        debug!(dir = %dir.display(), "JsonReportSink::new: called");
        Self { dir }
    }

    /// Default location: `<data_local_dir>/ideaflow/reports`
    pub fn default_dir() -> Result<PathBuf> {
        let base = dirs::data_local_dir().ok_or_else(|| eyre::eyre!("Could not determine local data directory"))?;
        Ok(base.join("ideaflow").join("reports"))
    }

    pub fn path_for(&self, report: &FinalReport) -> PathBuf {
        self.dir.join(format!("{}.json", report.session_id))
    }
}

#[async_trait]
impl ReportSink for JsonReportSink {
    async fn persist(&self, report: &FinalReport) -> Result<()> {
        debug!(session_id = %report.session_id, status = %report.status, "JsonReportSink::persist: called");
        fs::create_dir_all(&self.dir).context(format!("Failed to create report directory {}", self.dir.display()))?;

        let path = self.path_for(report);
        let content = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
        fs::write(&path, content).context(format!("Failed to write report {}", path.display()))?;

        info!(session_id = %report.session_id, path = %path.display(), "Report written");
        Ok(())
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Keeps reports in memory; optionally fails every call
    #[derive(Default)]
    pub struct MemorySink {
        pub fail: bool,
        reports: Mutex<Vec<FinalReport>>,
    }

    impl MemorySink {
        pub fn failing() -> Self {
            Self {
                fail: true,
                reports: Mutex::new(Vec::new()),
            }
        }

        pub fn reports(&self) -> Vec<FinalReport> {
            self.reports.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReportSink for MemorySink {
        async fn persist(&self, report: &FinalReport) -> Result<()> {
            if self.fail {
                eyre::bail!("sink unavailable");
            }
            self.reports.lock().unwrap().push(report.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IdeaSummary, ReportStatus, SessionId};
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_json_sink_writes_report() {
        let temp = TempDir::new().unwrap();
        let sink = JsonReportSink::new(temp.path().join("reports"));
        let report = FinalReport::completed(
            SessionId::from_string("s-1"),
            "u1",
            Some(IdeaSummary {
                title: "Valet".to_string(),
                total: 72,
                passed: true,
                iterations: 2,
            }),
            json!({"markdown": "# Valet"}),
        );

        sink.persist(&report).await.unwrap();

        let content = fs::read_to_string(temp.path().join("reports").join("s-1.json")).unwrap();
        let loaded: FinalReport = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded.status, ReportStatus::Success);
        assert_eq!(loaded.idea.unwrap().total, 72);
        assert_eq!(loaded.document["markdown"], "# Valet");
    }

    #[tokio::test]
    async fn test_json_sink_reports_unwritable_dir() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let sink = JsonReportSink::new(blocker.join("reports"));

        let report = FinalReport::failed(SessionId::from_string("s-2"), "u1", "boom");
        assert!(sink.persist(&report).await.is_err());
    }
}
