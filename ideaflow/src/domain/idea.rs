//! Business ideas and their evaluations
//!
//! Ideas are opaque beyond an ID and a title. Evaluations carry the four
//! fixed-weight criterion scores; the weights are the criterion maxima and
//! sum to 100, so the total is directly a percentage.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Default minimum total for an idea to pass
pub const DEFAULT_PASSING_THRESHOLD: u32 = 70;

/// A candidate idea produced by a generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessIdea {
    /// Unique ID, referenced by evaluations
    pub id: String,

    pub title: String,

    /// Everything else the generator produced (not inspected here)
    #[serde(default)]
    pub payload: Value,
}

impl BusinessIdea {
    pub fn new(title: impl Into<String>, payload: Value) -> Self {
        let title = title.into();
        debug!(%title, "BusinessIdea::new: called");
        Self {
            id: Uuid::now_v7().to_string(),
            title,
            payload,
        }
    }
}

/// One of the four weighted scoring dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    MarketPotential,
    StrategicFit,
    CompetitiveAdvantage,
    Profitability,
}

impl Criterion {
    pub const ALL: [Criterion; 4] = [
        Criterion::MarketPotential,
        Criterion::StrategicFit,
        Criterion::CompetitiveAdvantage,
        Criterion::Profitability,
    ];

    /// Maximum score for this criterion (its weight out of 100)
    pub fn max_score(&self) -> u32 {
        match self {
            Criterion::MarketPotential => 35,
            Criterion::StrategicFit => 35,
            Criterion::CompetitiveAdvantage => 15,
            Criterion::Profitability => 15,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Criterion::MarketPotential => "market potential",
            Criterion::StrategicFit => "strategic fit",
            Criterion::CompetitiveAdvantage => "competitive advantage",
            Criterion::Profitability => "profitability",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors from building an evaluation out of raw scores
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    #[error("{criterion} score {value} exceeds maximum {max}")]
    OutOfRange { criterion: Criterion, value: u32, max: u32 },

    #[error("Passing threshold {0} exceeds 100")]
    InvalidThreshold(u32),
}

/// Raw criterion scores as returned by an evaluator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionScores {
    pub market_potential: u32,
    pub strategic_fit: u32,
    pub competitive_advantage: u32,
    pub profitability: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl CriterionScores {
    pub fn new(market_potential: u32, strategic_fit: u32, competitive_advantage: u32, profitability: u32) -> Self {
        Self {
            market_potential,
            strategic_fit,
            competitive_advantage,
            profitability,
            feedback: None,
        }
    }

    /// Builder: attach evaluator feedback
    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }

    pub fn get(&self, criterion: Criterion) -> u32 {
        match criterion {
            Criterion::MarketPotential => self.market_potential,
            Criterion::StrategicFit => self.strategic_fit,
            Criterion::CompetitiveAdvantage => self.competitive_advantage,
            Criterion::Profitability => self.profitability,
        }
    }

    /// Check every criterion against its maximum
    pub fn validate(&self) -> Result<(), ScoreError> {
        for criterion in Criterion::ALL {
            let value = self.get(criterion);
            let max = criterion.max_score();
            if value > max {
                debug!(%criterion, value, max, "CriterionScores::validate: out of range");
                return Err(ScoreError::OutOfRange { criterion, value, max });
            }
        }
        Ok(())
    }

    pub fn total(&self) -> u32 {
        Criterion::ALL.iter().map(|c| self.get(*c)).sum()
    }
}

/// A validated evaluation of one idea
///
/// Only constructible through [`IdeaEvaluation::new`], so `total` always
/// equals the sum of the criteria and `passed` always matches the threshold
/// it was built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaEvaluation {
    pub idea_ref: String,
    pub market_potential: u32,
    pub strategic_fit: u32,
    pub competitive_advantage: u32,
    pub profitability: u32,
    pub total: u32,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl IdeaEvaluation {
    /// Validate raw scores and derive total and pass/fail
    pub fn new(idea_ref: impl Into<String>, scores: CriterionScores, threshold: u32) -> Result<Self, ScoreError> {
        let idea_ref = idea_ref.into();
        debug!(%idea_ref, ?scores, threshold, "IdeaEvaluation::new: called");
        if threshold > 100 {
            return Err(ScoreError::InvalidThreshold(threshold));
        }
        scores.validate()?;

        let total = scores.total();
        Ok(Self {
            idea_ref,
            market_potential: scores.market_potential,
            strategic_fit: scores.strategic_fit,
            competitive_advantage: scores.competitive_advantage,
            profitability: scores.profitability,
            total,
            passed: total >= threshold,
            feedback: scores.feedback,
        })
    }

    pub fn score(&self, criterion: Criterion) -> u32 {
        match criterion {
            Criterion::MarketPotential => self.market_potential,
            Criterion::StrategicFit => self.strategic_fit,
            Criterion::CompetitiveAdvantage => self.competitive_advantage,
            Criterion::Profitability => self.profitability,
        }
    }

    /// Criteria scoring below `ratio` of their maximum, weakest first
    pub fn weak_criteria(&self, ratio: f64) -> Vec<Criterion> {
        let mut weak: Vec<(Criterion, f64)> = Criterion::ALL
            .iter()
            .map(|c| (*c, self.score(*c) as f64 / c.max_score() as f64))
            .filter(|(_, r)| *r < ratio)
            .collect();
        weak.sort_by(|a, b| a.1.total_cmp(&b.1));
        weak.into_iter().map(|(c, _)| c).collect()
    }
}
