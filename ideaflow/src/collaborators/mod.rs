//! Offline collaborators
//!
//! Deterministic phase agents and refinement collaborators that need no
//! network access. They back the `run` command and the integration tests.

mod analyst;
mod evaluator;
mod generator;
mod research;
mod writer;

use std::sync::Arc;

use tracing::debug;

use crate::orchestrator::{IdeationPhase, PhasePipeline};
use crate::refine::RefinementConfig;

pub use analyst::{Scorecard, ScorecardAnalyst};
pub use evaluator::HeuristicEvaluator;
pub use generator::TemplateIdeaGenerator;
pub use research::{KeywordResearcher, extract_keywords};
pub use writer::MarkdownWriter;

/// Pipeline of offline agents, with ideation driven by `refinement`
pub fn offline_pipeline(refinement: &RefinementConfig) -> PhasePipeline {
    debug!(?refinement, "offline_pipeline: called");
    let ideation = IdeationPhase::new(
        refinement.clone(),
        Arc::new(TemplateIdeaGenerator::new()),
        Arc::new(HeuristicEvaluator::new()),
    );
    PhasePipeline::new(
        Arc::new(KeywordResearcher::new()),
        Arc::new(ideation),
        Arc::new(ScorecardAnalyst::new()),
        Arc::new(MarkdownWriter::new()),
    )
}
