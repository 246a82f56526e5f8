//! Generator and evaluator collaborator traits

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{BusinessIdea, CriterionScores, SessionId};

use super::RefineError;

/// Everything the loop knows about the session it is refining ideas for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementContext {
    pub session_id: SessionId,
    pub input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    /// Output of the research phase
    #[serde(default)]
    pub research: Value,
}

/// One generation call
#[derive(Debug, Clone)]
pub struct IdeaRequest {
    pub context: RefinementContext,
    /// 1-based iteration number
    pub iteration: u32,
    /// Number of candidates wanted
    pub count: usize,
    /// Shortfalls of the previous iteration's candidates
    pub feedback: Option<String>,
}

/// Produces candidate ideas
#[async_trait]
pub trait IdeaGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Generate up to `request.count` candidates
    ///
    /// Returning fewer is allowed, returning none is an error, and extras are
    /// dropped by the loop.
    async fn generate(&self, request: &IdeaRequest) -> Result<Vec<BusinessIdea>, RefineError>;
}

/// Scores one idea against the four weighted criteria
#[async_trait]
pub trait IdeaEvaluator: Send + Sync {
    fn name(&self) -> &str;

    async fn evaluate(&self, idea: &BusinessIdea, context: &RefinementContext) -> Result<CriterionScores, RefineError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use serde_json::json;
    use tracing::debug;

    /// Split a total into valid criterion scores, filling the heavy criteria first
    pub fn scores_for_total(total: u32) -> CriterionScores {
        let mut remaining = total.min(100);
        let mut take = |max: u32| {
            let v = remaining.min(max);
            remaining -= v;
            v
        };
        let mp = take(35);
        let sf = take(35);
        let ca = take(15);
        let pr = take(15);
        CriterionScores::new(mp, sf, ca, pr)
    }

    /// Generator that returns `count` numbered ideas per call
    pub struct MockGenerator {
        /// Overrides the requested count when set
        pub fixed_count: Option<usize>,
        pub fail_on_iteration: Option<u32>,
        pub delay: Option<Duration>,
        requests: Mutex<Vec<IdeaRequest>>,
    }

    impl MockGenerator {
        pub fn new() -> Self {
            Self {
                fixed_count: None,
                fail_on_iteration: None,
                delay: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn with_fixed_count(mut self, count: usize) -> Self {
            self.fixed_count = Some(count);
            self
        }

        pub fn failing_on(mut self, iteration: u32) -> Self {
            self.fail_on_iteration = Some(iteration);
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn requests(&self) -> Vec<IdeaRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl IdeaGenerator for MockGenerator {
        fn name(&self) -> &str {
            "mock-generator"
        }

        async fn generate(&self, request: &IdeaRequest) -> Result<Vec<BusinessIdea>, RefineError> {
            debug!(iteration = request.iteration, "MockGenerator::generate: called");
            self.requests.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_on_iteration == Some(request.iteration) {
                return Err(RefineError::Generator("mock generator failure".to_string()));
            }
            let count = self.fixed_count.unwrap_or(request.count);
            Ok((1..=count)
                .map(|n| {
                    BusinessIdea::new(
                        format!("iter{}-idea{}", request.iteration, n),
                        json!({ "iteration": request.iteration }),
                    )
                })
                .collect())
        }
    }

    /// Evaluator that hands out scripted totals in call order
    pub struct MockEvaluator {
        totals: Mutex<VecDeque<u32>>,
        raw: Mutex<VecDeque<CriterionScores>>,
        call_count: AtomicUsize,
    }

    impl MockEvaluator {
        pub fn with_totals(totals: Vec<u32>) -> Self {
            Self {
                totals: Mutex::new(totals.into()),
                raw: Mutex::new(VecDeque::new()),
                call_count: AtomicUsize::new(0),
            }
        }

        /// Return these scores verbatim (may be out of range)
        pub fn with_raw(scores: Vec<CriterionScores>) -> Self {
            Self {
                totals: Mutex::new(VecDeque::new()),
                raw: Mutex::new(scores.into()),
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IdeaEvaluator for MockEvaluator {
        fn name(&self) -> &str {
            "mock-evaluator"
        }

        async fn evaluate(&self, idea: &BusinessIdea, _context: &RefinementContext) -> Result<CriterionScores, RefineError> {
            debug!(title = %idea.title, "MockEvaluator::evaluate: called");
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Some(scores) = self.raw.lock().unwrap().pop_front() {
                return Ok(scores);
            }
            self.totals
                .lock()
                .unwrap()
                .pop_front()
                .map(|total| scores_for_total(total).with_feedback(format!("{} needs work", idea.title)))
                .ok_or_else(|| RefineError::Evaluator("no more scripted scores".to_string()))
        }
    }
}
