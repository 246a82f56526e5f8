//! Iterative idea refinement
//!
//! A bounded generate, evaluate, decide loop. Each iteration asks an
//! [`IdeaGenerator`] for candidates, scores them with an [`IdeaEvaluator`]
//! against four fixed-weight criteria, and either stops (something passed, or
//! the iteration budget is spent) or feeds a summary of the shortfalls into
//! the next generation. The best candidate seen across all iterations is
//! returned even when nothing passed.

mod config;
mod engine;
mod error;
mod feedback;
mod scoring;
mod traits;

pub use config::RefinementConfig;
pub use engine::{IDEATION_AGENT, IdeationOutcome, IterationSummary, RefinementLoop, RefinementState};
pub use error::RefineError;
pub use feedback::FeedbackSynthesizer;
pub use scoring::{ScoredIdea, select_best, should_iterate};
pub use traits::{IdeaEvaluator, IdeaGenerator, IdeaRequest, RefinementContext};

#[cfg(test)]
pub use traits::mock;
