//! Deterministic heuristic scoring

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::domain::{BusinessIdea, Criterion, CriterionScores};
use crate::refine::{IdeaEvaluator, RefineError, RefinementContext};

use super::research::extract_keywords;

/// Stable across runs and platforms, unlike the std hasher
fn fnv1a(text: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in text.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Scores ideas from their text alone
///
/// Every criterion starts at 55% of its maximum, gains up to 30% from a
/// hash of the idea title, 20% when the idea focuses on that criterion and,
/// for strategic fit, 10% when the pitch mentions a requirement keyword.
/// The result never exceeds the criterion maximum.
#[derive(Debug, Default)]
pub struct HeuristicEvaluator;

impl HeuristicEvaluator {
    pub fn new() -> Self {
        Self
    }

    fn score(criterion: Criterion, idea: &BusinessIdea, context: &RefinementContext) -> u32 {
        let max = criterion.max_score();
        let base = max * 55 / 100;
        let jitter_range = max * 30 / 100 + 1;
        let jitter = (fnv1a(&format!("{}:{}", idea.title, criterion.label())) % jitter_range as u64) as u32;

        let focused = idea
            .payload
            .get("focus")
            .and_then(Value::as_array)
            .is_some_and(|focus| focus.iter().any(|f| serde_json::from_value::<Criterion>(f.clone()).ok() == Some(criterion)));
        let focus_bonus = if focused { max * 20 / 100 } else { 0 };

        let fit_bonus = if criterion == Criterion::StrategicFit && Self::matches_requirements(idea, context) {
            max * 10 / 100
        } else {
            0
        };

        (base + jitter + focus_bonus + fit_bonus).min(max)
    }

    fn matches_requirements(idea: &BusinessIdea, context: &RefinementContext) -> bool {
        let Some(requirements) = context.requirements.as_deref() else {
            return false;
        };
        let text = format!(
            "{} {}",
            idea.title,
            idea.payload.get("pitch").and_then(Value::as_str).unwrap_or_default()
        )
        .to_lowercase();
        extract_keywords(requirements, 8).iter().any(|kw| text.contains(kw.as_str()))
    }
}

#[async_trait]
impl IdeaEvaluator for HeuristicEvaluator {
    fn name(&self) -> &str {
        "heuristic-evaluator"
    }

    async fn evaluate(&self, idea: &BusinessIdea, context: &RefinementContext) -> Result<CriterionScores, RefineError> {
        debug!(title = %idea.title, "HeuristicEvaluator::evaluate: called");
        let [mp, sf, ca, pr] = Criterion::ALL.map(|c| Self::score(c, idea, context));
        let scores = CriterionScores::new(mp, sf, ca, pr);

        let ratio = |c: Criterion| scores.get(c) as f64 / c.max_score() as f64;
        let mut ranked = Criterion::ALL;
        ranked.sort_by(|a, b| ratio(*b).total_cmp(&ratio(*a)));
        let feedback = format!("strongest on {}, weakest on {}", ranked[0], ranked[3]);

        Ok(scores.with_feedback(feedback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SessionId;
    use proptest::prelude::*;
    use serde_json::json;

    fn context(requirements: Option<&str>) -> RefinementContext {
        RefinementContext {
            session_id: SessionId::from_string("s1"),
            input: "smart parking".to_string(),
            requirements: requirements.map(str::to_string),
            research: Value::Null,
        }
    }

    #[tokio::test]
    async fn test_scores_are_deterministic() {
        let evaluator = HeuristicEvaluator::new();
        let idea = BusinessIdea::new("Parking Marketplace", json!({}));
        let a = evaluator.evaluate(&idea, &context(None)).await.unwrap();
        let b = evaluator.evaluate(&idea, &context(None)).await.unwrap();
        assert_eq!(a, b);
        assert!(a.validate().is_ok());
        assert!(a.feedback.unwrap().starts_with("strongest on"));
    }

    #[tokio::test]
    async fn test_focus_raises_score() {
        let evaluator = HeuristicEvaluator::new();
        let plain = BusinessIdea::new("Parking Marketplace", json!({}));
        let focused = BusinessIdea::new("Parking Marketplace", json!({ "focus": ["profitability"] }));
        let plain = evaluator.evaluate(&plain, &context(None)).await.unwrap();
        let focused = evaluator.evaluate(&focused, &context(None)).await.unwrap();
        assert!(focused.profitability > plain.profitability);
        assert_eq!(focused.market_potential, plain.market_potential);
    }

    #[tokio::test]
    async fn test_requirements_raise_strategic_fit() {
        let evaluator = HeuristicEvaluator::new();
        let idea = BusinessIdea::new("Parking Subscription", json!({ "pitch": "monthly parking plan" }));
        let without = evaluator.evaluate(&idea, &context(None)).await.unwrap();
        let with = evaluator.evaluate(&idea, &context(Some("monthly pricing"))).await.unwrap();
        assert!(with.strategic_fit > without.strategic_fit);
    }

    proptest! {
        #[test]
        fn prop_scores_within_bounds(title in ".{0,40}", focused in proptest::bool::ANY) {
            let payload = if focused {
                json!({ "focus": ["market_potential", "strategic_fit", "competitive_advantage", "profitability"] })
            } else {
                json!({})
            };
            let idea = BusinessIdea::new(title, payload);
            for criterion in Criterion::ALL {
                let score = HeuristicEvaluator::score(criterion, &idea, &context(Some("anything")));
                prop_assert!(score <= criterion.max_score());
            }
        }
    }
}
