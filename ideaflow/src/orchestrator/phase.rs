//! Phase collaborator contract

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::{Phase, SessionId};
use crate::progress::ProgressReporter;
use crate::refine::RefineError;

/// Errors a phase can end with; every variant fails the session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhaseError {
    #[error("{0}")]
    Collaborator(String),

    #[error("Malformed output: {0}")]
    Malformed(String),

    #[error("Phase timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Session cancelled")]
    Cancelled,

    #[error(transparent)]
    Refinement(#[from] RefineError),
}

/// What a phase sees when it runs
#[derive(Debug, Clone)]
pub struct PhaseContext {
    pub session_id: SessionId,
    pub user_id: String,
    pub input: String,
    pub requirements: Option<String>,
    pub phase: Phase,
    /// Outputs of the phases that already ran
    pub prior: BTreeMap<Phase, Value>,
    /// Fires when the session is cancelled
    pub cancel: CancellationToken,
}

impl PhaseContext {
    /// Output of an earlier phase, or null if it has not run
    pub fn output(&self, phase: Phase) -> &Value {
        self.prior.get(&phase).unwrap_or(&Value::Null)
    }
}

/// Result of one phase
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseOutput {
    pub data: Value,
    /// One-line description for the completed step record
    pub summary: Option<String>,
}

impl PhaseOutput {
    pub fn new(data: Value) -> Self {
        Self { data, summary: None }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// A collaborator that does the work of one phase
#[async_trait]
pub trait PhaseAgent: Send + Sync {
    fn name(&self) -> &str;

    /// Run the phase
    ///
    /// Sub-progress goes through `reporter`; the orchestrator records the
    /// phase's own start and end steps.
    async fn execute(&self, ctx: &PhaseContext, reporter: &ProgressReporter) -> Result<PhaseOutput, PhaseError>;
}

/// The agent for each executable phase
#[derive(Clone)]
pub struct PhasePipeline {
    research: Arc<dyn PhaseAgent>,
    ideation: Arc<dyn PhaseAgent>,
    analysis: Arc<dyn PhaseAgent>,
    report: Arc<dyn PhaseAgent>,
}

impl PhasePipeline {
    pub fn new(
        research: Arc<dyn PhaseAgent>,
        ideation: Arc<dyn PhaseAgent>,
        analysis: Arc<dyn PhaseAgent>,
        report: Arc<dyn PhaseAgent>,
    ) -> Self {
        Self {
            research,
            ideation,
            analysis,
            report,
        }
    }

    /// Agent for `phase`; `None` for [`Phase::Completed`]
    pub fn agent(&self, phase: Phase) -> Option<&Arc<dyn PhaseAgent>> {
        match phase {
            Phase::Research => Some(&self.research),
            Phase::Ideation => Some(&self.ideation),
            Phase::Analysis => Some(&self.analysis),
            Phase::Report => Some(&self.report),
            Phase::Completed => None,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_output_defaults_to_null() {
        let mut prior = BTreeMap::new();
        prior.insert(Phase::Research, json!({"keywords": ["parking"]}));
        let ctx = PhaseContext {
            session_id: SessionId::from_string("s1"),
            user_id: "u1".to_string(),
            input: "smart parking".to_string(),
            requirements: None,
            phase: Phase::Ideation,
            prior,
            cancel: CancellationToken::new(),
        };
        assert_eq!(ctx.output(Phase::Research)["keywords"][0], "parking");
        assert!(ctx.output(Phase::Analysis).is_null());
    }

    #[test]
    fn test_pipeline_has_no_agent_for_completed() {
        let pipeline = mock::pipeline_with(vec![]);
        assert_eq!(pipeline.agent(Phase::Analysis).unwrap().name(), "mock-analysis");
        assert!(pipeline.agent(Phase::Completed).is_none());
    }

    #[test]
    fn test_refine_error_is_transparent() {
        let err: PhaseError = RefineError::Cancelled.into();
        assert_eq!(err.to_string(), "Refinement cancelled");
    }
}
