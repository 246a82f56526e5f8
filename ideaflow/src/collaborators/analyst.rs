//! Scorecard analysis of the selected idea

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Criterion, Phase};
use crate::orchestrator::{PhaseAgent, PhaseContext, PhaseError, PhaseOutput};
use crate::progress::ProgressReporter;
use crate::refine::IdeationOutcome;

/// Criteria at or above this share of their maximum count as strengths
const STRENGTH_RATIO: f64 = 0.8;
const WEAKNESS_RATIO: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    pub title: String,
    pub total: u32,
    pub passed: bool,
    pub strengths: Vec<Criterion>,
    pub weaknesses: Vec<Criterion>,
    pub recommendation: String,
}

/// Analysis phase agent that reads the ideation outcome
#[derive(Debug, Default)]
pub struct ScorecardAnalyst;

impl ScorecardAnalyst {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(outcome: &IdeationOutcome) -> Scorecard {
        let evaluation = &outcome.evaluation;
        let strengths = Criterion::ALL
            .into_iter()
            .filter(|c| evaluation.score(*c) as f64 >= c.max_score() as f64 * STRENGTH_RATIO)
            .collect();
        let weaknesses = evaluation.weak_criteria(WEAKNESS_RATIO);

        let recommendation = match (evaluation.passed, weaknesses.first()) {
            (true, None) => "Proceed to validation with early customers".to_string(),
            (true, Some(weakest)) => format!("Proceed, but de-risk {} first", weakest),
            (false, Some(weakest)) => format!("Rework {} before investing further", weakest),
            (false, None) => "Rework the concept before investing further".to_string(),
        };

        Scorecard {
            title: outcome.selected.title.clone(),
            total: evaluation.total,
            passed: evaluation.passed,
            strengths,
            weaknesses,
            recommendation,
        }
    }
}

#[async_trait]
impl PhaseAgent for ScorecardAnalyst {
    fn name(&self) -> &str {
        "scorecard-analyst"
    }

    async fn execute(&self, ctx: &PhaseContext, reporter: &ProgressReporter) -> Result<PhaseOutput, PhaseError> {
        debug!(session_id = %ctx.session_id, "ScorecardAnalyst::execute: called");
        let outcome: IdeationOutcome = serde_json::from_value(ctx.output(Phase::Ideation).clone())
            .map_err(|e| PhaseError::Malformed(format!("ideation output: {}", e)))?;
        reporter.report(Phase::Analysis, 70);

        let scorecard = Self::analyze(&outcome);
        let summary = format!("{}: {}", scorecard.title, scorecard.recommendation);
        let data = serde_json::to_value(&scorecard).map_err(|e| PhaseError::Malformed(e.to_string()))?;
        Ok(PhaseOutput::new(data).with_summary(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BusinessIdea, CriterionScores, IdeaEvaluation};
    use serde_json::Value;

    fn outcome(scores: CriterionScores) -> IdeationOutcome {
        let selected = BusinessIdea::new("Parking Marketplace", Value::Null);
        let evaluation = IdeaEvaluation::new(selected.id.clone(), scores, 70).unwrap();
        IdeationOutcome {
            selected,
            evaluation,
            selected_iteration: 1,
            iterations: 1,
            history: vec![],
        }
    }

    #[test]
    fn test_passed_idea_with_weak_spot() {
        let card = ScorecardAnalyst::analyze(&outcome(CriterionScores::new(30, 30, 5, 10)));
        assert!(card.passed);
        assert_eq!(card.strengths, vec![Criterion::MarketPotential, Criterion::StrategicFit]);
        assert_eq!(card.weaknesses, vec![Criterion::CompetitiveAdvantage]);
        assert_eq!(card.recommendation, "Proceed, but de-risk competitive advantage first");
    }

    #[test]
    fn test_fallback_idea_is_reworked() {
        let card = ScorecardAnalyst::analyze(&outcome(CriterionScores::new(20, 20, 8, 8)));
        assert!(!card.passed);
        assert_eq!(card.weaknesses[0], Criterion::CompetitiveAdvantage);
        assert!(card.recommendation.starts_with("Rework"));
    }
}
