//! Ideation phase: runs the refinement loop as a phase agent

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::Phase;
use crate::progress::ProgressReporter;
use crate::refine::{IdeaEvaluator, IdeaGenerator, RefineError, RefinementConfig, RefinementContext, RefinementLoop};

use super::phase::{PhaseAgent, PhaseContext, PhaseError, PhaseOutput};

/// [`PhaseAgent`] that drives one [`RefinementLoop`] per session
pub struct IdeationPhase {
    config: RefinementConfig,
    generator: Arc<dyn IdeaGenerator>,
    evaluator: Arc<dyn IdeaEvaluator>,
}

impl IdeationPhase {
    pub fn new(config: RefinementConfig, generator: Arc<dyn IdeaGenerator>, evaluator: Arc<dyn IdeaEvaluator>) -> Self {
        Self {
            config,
            generator,
            evaluator,
        }
    }
}

#[async_trait]
impl PhaseAgent for IdeationPhase {
    fn name(&self) -> &str {
        "refinement-loop"
    }

    async fn execute(&self, ctx: &PhaseContext, reporter: &ProgressReporter) -> Result<PhaseOutput, PhaseError> {
        debug!(session_id = %ctx.session_id, "IdeationPhase::execute: called");
        let context = RefinementContext {
            session_id: ctx.session_id.clone(),
            input: ctx.input.clone(),
            requirements: ctx.requirements.clone(),
            research: ctx.output(Phase::Research).clone(),
        };

        let mut engine = RefinementLoop::new(self.config.clone(), self.generator.clone(), self.evaluator.clone());
        let outcome = engine
            .run(context, reporter, &ctx.cancel)
            .await
            .map_err(|e| match e {
                RefineError::Cancelled => PhaseError::Cancelled,
                other => PhaseError::Refinement(other),
            })?;

        let summary = format!(
            "Selected \"{}\" ({}/100, {}) after {} iteration(s)",
            outcome.selected.title,
            outcome.evaluation.total,
            if outcome.passed() { "passed" } else { "below threshold" },
            outcome.iterations
        );
        let data = serde_json::to_value(&outcome).map_err(|e| PhaseError::Malformed(e.to_string()))?;
        Ok(PhaseOutput::new(data).with_summary(summary))
    }
}
