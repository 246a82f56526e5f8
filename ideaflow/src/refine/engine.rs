//! RefinementLoop - bounded generate, evaluate, decide cycle

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{BusinessIdea, IdeaEvaluation, IdeaSummary, Phase, StepRecord};
use crate::progress::ProgressReporter;

use super::config::RefinementConfig;
use super::error::RefineError;
use super::feedback::FeedbackSynthesizer;
use super::scoring::{ScoredIdea, select_best, should_iterate};
use super::traits::{IdeaEvaluator, IdeaGenerator, IdeaRequest, RefinementContext};

/// Agent tag for the loop's step records
pub const IDEATION_AGENT: &str = "ideation";

/// Where the loop is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinementState {
    AwaitingGeneration,
    AwaitingEvaluation,
    Deciding,
    Concluded,
}

impl fmt::Display for RefinementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingGeneration => write!(f, "awaiting_generation"),
            Self::AwaitingEvaluation => write!(f, "awaiting_evaluation"),
            Self::Deciding => write!(f, "deciding"),
            Self::Concluded => write!(f, "concluded"),
        }
    }
}

/// Per-iteration summary kept in the outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationSummary {
    pub iteration: u32,
    pub candidates: usize,
    pub best_total: u32,
    pub any_passed: bool,
    /// Feedback handed to the next iteration, if there was one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// Result of a concluded refinement run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeationOutcome {
    pub selected: BusinessIdea,
    pub evaluation: IdeaEvaluation,
    /// Iteration the selected idea came from
    pub selected_iteration: u32,
    /// Cycles actually run
    pub iterations: u32,
    pub history: Vec<IterationSummary>,
}

impl IdeationOutcome {
    pub fn passed(&self) -> bool {
        self.evaluation.passed
    }

    pub fn summary(&self) -> IdeaSummary {
        IdeaSummary {
            title: self.selected.title.clone(),
            total: self.evaluation.total,
            passed: self.evaluation.passed,
            iterations: self.iterations,
        }
    }
}

/// Refinement loop engine
///
/// One instance drives one session's ideation; it is not reusable.
pub struct RefinementLoop {
    config: RefinementConfig,
    generator: Arc<dyn IdeaGenerator>,
    evaluator: Arc<dyn IdeaEvaluator>,
    feedback: FeedbackSynthesizer,
    state: RefinementState,
    iteration: u32,
}

impl RefinementLoop {
    pub fn new(config: RefinementConfig, generator: Arc<dyn IdeaGenerator>, evaluator: Arc<dyn IdeaEvaluator>) -> Self {
        debug!(?config, generator = generator.name(), evaluator = evaluator.name(), "RefinementLoop::new: called");
        Self {
            config,
            generator,
            evaluator,
            feedback: FeedbackSynthesizer::new(),
            state: RefinementState::AwaitingGeneration,
            iteration: 0,
        }
    }

    pub fn state(&self) -> RefinementState {
        self.state
    }

    /// Current 1-based iteration (0 before the first generation)
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    fn transition(&mut self, next: RefinementState) {
        debug!(from = %self.state, to = %next, iteration = self.iteration, "RefinementLoop::transition");
        self.state = next;
    }

    fn max_iterations(&self) -> u32 {
        self.config.max_iterations.max(1)
    }

    /// Run one collaborator call under the per-call timeout, racing cancellation
    async fn guarded<T>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        call: impl Future<Output = Result<T, RefineError>>,
    ) -> Result<T, RefineError> {
        let timeout_ms = self.config.call_timeout_ms;
        tokio::select! {
            _ = cancel.cancelled() => Err(RefineError::Cancelled),
            result = tokio::time::timeout(Duration::from_millis(timeout_ms), call) => match result {
                Ok(inner) => inner,
                Err(_) => {
                    warn!(operation, timeout_ms, "RefinementLoop: collaborator call timed out");
                    Err(RefineError::Timeout {
                        operation: operation.to_string(),
                        timeout_ms,
                    })
                }
            },
        }
    }

    async fn generate(&self, request: &IdeaRequest, cancel: &CancellationToken) -> Result<Vec<BusinessIdea>, RefineError> {
        debug!(iteration = request.iteration, count = request.count, "RefinementLoop::generate: called");
        let mut ideas = self
            .guarded("generate", cancel, self.generator.generate(request))
            .await?;

        if ideas.is_empty() {
            return Err(RefineError::NoCandidates {
                iteration: request.iteration,
            });
        }
        if ideas.len() > request.count {
            warn!(
                returned = ideas.len(),
                requested = request.count,
                "RefinementLoop::generate: truncating extra candidates"
            );
            ideas.truncate(request.count);
        }
        Ok(ideas)
    }

    async fn evaluate(
        &self,
        ideas: Vec<BusinessIdea>,
        context: &RefinementContext,
        cancel: &CancellationToken,
    ) -> Result<Vec<ScoredIdea>, RefineError> {
        debug!(count = ideas.len(), "RefinementLoop::evaluate: called");
        let threshold = self.config.passing_score_threshold;
        let iteration = self.iteration;

        let calls = ideas.into_iter().map(|idea| async move {
            let scores = self
                .guarded("evaluate", cancel, self.evaluator.evaluate(&idea, context))
                .await?;
            let evaluation = IdeaEvaluation::new(idea.id.clone(), scores, threshold).map_err(|source| {
                RefineError::InvalidScore {
                    title: idea.title.clone(),
                    source,
                }
            })?;
            Ok::<_, RefineError>(ScoredIdea {
                idea,
                evaluation,
                iteration,
            })
        });

        try_join_all(calls).await
    }

    /// Run the loop to conclusion
    ///
    /// Each cycle appends one `ideation` step through `reporter`, emits an
    /// `IterationCompleted` event and advances ideation sub-progress.
    pub async fn run(
        &mut self,
        context: RefinementContext,
        reporter: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<IdeationOutcome, RefineError> {
        let max_iterations = self.max_iterations();
        info!(
            session_id = %context.session_id,
            max_iterations,
            threshold = self.config.passing_score_threshold,
            "Starting idea refinement"
        );

        let mut all: Vec<ScoredIdea> = Vec::new();
        let mut history: Vec<IterationSummary> = Vec::new();
        let mut feedback: Option<String> = None;
        self.iteration = 1;
        self.transition(RefinementState::AwaitingGeneration);

        loop {
            if cancel.is_cancelled() {
                return Err(RefineError::Cancelled);
            }
            let started = Instant::now();

            let request = IdeaRequest {
                context: context.clone(),
                iteration: self.iteration,
                count: self.config.ideas_per_iteration.max(1),
                feedback: feedback.take(),
            };

            let scored = match self.cycle(&request, reporter, cancel).await {
                Ok(scored) => scored,
                Err(e) => {
                    let step = StepRecord::failed(IDEATION_AGENT, format!("Iteration {} failed", self.iteration))
                        .with_duration_ms(started.elapsed().as_millis() as u64)
                        .with_details(json!({ "iteration": self.iteration, "error": e.to_string() }));
                    let _ = reporter.record_step(step).await;
                    return Err(e);
                }
            };

            self.transition(RefinementState::Deciding);
            let evaluations: Vec<IdeaEvaluation> = scored.iter().map(|s| s.evaluation.clone()).collect();
            let best_total = evaluations.iter().map(|e| e.total).max().unwrap_or(0);
            let any_passed = evaluations.iter().any(|e| e.passed);
            let again = should_iterate(&evaluations, self.iteration, max_iterations);
            let next_feedback = again.then(|| {
                self.feedback
                    .synthesize(self.iteration, self.config.passing_score_threshold, &scored)
            });

            info!(
                session_id = %context.session_id,
                iteration = self.iteration,
                best_total,
                any_passed,
                "Refinement iteration {}/{} complete",
                self.iteration,
                max_iterations
            );

            let step = StepRecord::completed(
                IDEATION_AGENT,
                format!(
                    "Iteration {}: evaluated {} ideas, best score {}/100",
                    self.iteration,
                    scored.len(),
                    best_total
                ),
            )
            .with_duration_ms(started.elapsed().as_millis() as u64)
            .with_details(json!({
                "iteration": self.iteration,
                "scores": scored.iter().map(|s| json!({"title": s.idea.title, "total": s.evaluation.total, "passed": s.evaluation.passed})).collect::<Vec<_>>(),
                "passed": any_passed,
                "continue": again,
            }));
            let _ = reporter.record_step(step).await;
            reporter
                .emitter()
                .iteration_completed(self.iteration, scored.len(), best_total, any_passed);
            reporter.report_fraction(Phase::Ideation, self.iteration as f64 / max_iterations as f64);

            history.push(IterationSummary {
                iteration: self.iteration,
                candidates: scored.len(),
                best_total,
                any_passed,
                feedback: next_feedback.clone(),
            });
            all.extend(scored);

            if !again {
                break;
            }
            feedback = next_feedback;
            self.iteration += 1;
            self.transition(RefinementState::AwaitingGeneration);
        }

        self.transition(RefinementState::Concluded);
        let best = select_best(&all).cloned().ok_or(RefineError::NoCandidates {
            iteration: self.iteration,
        })?;

        if best.evaluation.passed {
            info!(session_id = %context.session_id, title = %best.idea.title, total = best.evaluation.total, "Idea passed");
        } else {
            info!(
                session_id = %context.session_id,
                title = %best.idea.title,
                total = best.evaluation.total,
                "No idea passed, falling back to best candidate"
            );
        }

        Ok(IdeationOutcome {
            selected: best.idea,
            evaluation: best.evaluation,
            selected_iteration: best.iteration,
            iterations: self.iteration,
            history,
        })
    }

    /// Generation then evaluation for the current iteration
    async fn cycle(
        &mut self,
        request: &IdeaRequest,
        reporter: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<Vec<ScoredIdea>, RefineError> {
        let max_iterations = self.max_iterations() as f64;
        let ideas = self.generate(request, cancel).await?;
        self.transition(RefinementState::AwaitingEvaluation);
        reporter.report_fraction(Phase::Ideation, (self.iteration as f64 - 0.5) / max_iterations);
        self.evaluate(ideas, &request.context, cancel).await
    }
}
