//! Workflow phases and session status

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Coarse pipeline stage of a session
///
/// Ordering follows the pipeline: research < ideation < analysis < report <
/// completed. `Completed` is only ever entered through a terminal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Research,
    Ideation,
    Analysis,
    Report,
    Completed,
}

impl Phase {
    /// The executable phases, in the order the orchestrator runs them
    pub const PIPELINE: [Phase; 4] = [Phase::Research, Phase::Ideation, Phase::Analysis, Phase::Report];

    /// Progress range owned by this phase: (start, end) in percent
    ///
    /// Ranges are contiguous: each phase starts where the previous one ends,
    /// and research starts at the initial session progress.
    pub fn progress_range(&self) -> (u8, u8) {
        match self {
            Phase::Research => (5, 25),
            Phase::Ideation => (25, 60),
            Phase::Analysis => (60, 80),
            Phase::Report => (80, 100),
            Phase::Completed => (100, 100),
        }
    }

    /// The phase that follows this one
    pub fn next(&self) -> Option<Phase> {
        match self {
            Phase::Research => Some(Phase::Ideation),
            Phase::Ideation => Some(Phase::Analysis),
            Phase::Analysis => Some(Phase::Report),
            Phase::Report => Some(Phase::Completed),
            Phase::Completed => None,
        }
    }

    /// Whether progress updates may name this phase
    pub fn is_executable(&self) -> bool {
        !matches!(self, Phase::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Research => "research",
            Phase::Ideation => "ideation",
            Phase::Analysis => "analysis",
            Phase::Report => "report",
            Phase::Completed => "completed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "research" => Ok(Phase::Research),
            "ideation" => Ok(Phase::Ideation),
            "analysis" => Ok(Phase::Analysis),
            "report" => Ok(Phase::Report),
            "completed" => Ok(Phase::Completed),
            other => Err(format!("unknown phase '{}'", other)),
        }
    }
}

/// Lifecycle status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Running,
    Completed,
    Failed,
}

impl SessionStatus {
    /// Completed and failed sessions are immutable
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "running" => Ok(SessionStatus::Running),
            "completed" => Ok(SessionStatus::Completed),
            "failed" => Ok(SessionStatus::Failed),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}
