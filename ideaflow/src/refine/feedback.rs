//! Feedback synthesis between iterations
//!
//! Turns the evaluations of a failed iteration into guidance text for the
//! next generator call. Rendered with handlebars so the wording stays in one
//! template.

use handlebars::Handlebars;
use serde_json::json;
use tracing::{debug, warn};

use super::scoring::ScoredIdea;

/// Criteria below this share of their maximum are called out as weak
const WEAK_RATIO: f64 = 0.7;

const FEEDBACK_TEMPLATE: &str = "\
Iteration {{iteration}}: no idea reached the passing score of {{threshold}}/100.
{{#each candidates}}
- \"{{title}}\" scored {{total}}/100
{{~#if weak}}; weakest: {{#each weak}}{{this}}{{#unless @last}}, {{/unless}}{{/each}}{{/if}}
{{~#if notes}}. Evaluator notes: {{notes}}{{/if}}
{{/each}}
Address these shortfalls in the next set of ideas.";

/// Renders iteration feedback
pub struct FeedbackSynthesizer {
    hbs: Handlebars<'static>,
}

impl FeedbackSynthesizer {
    pub fn new() -> Self {
        debug!("FeedbackSynthesizer::new: called");
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        Self { hbs }
    }

    /// Summarize every candidate's shortfalls for the next iteration
    pub fn synthesize(&self, iteration: u32, threshold: u32, candidates: &[ScoredIdea]) -> String {
        debug!(iteration, threshold, count = candidates.len(), "FeedbackSynthesizer::synthesize: called");
        let rows: Vec<_> = candidates
            .iter()
            .map(|c| {
                let weak: Vec<&str> = c
                    .evaluation
                    .weak_criteria(WEAK_RATIO)
                    .iter()
                    .map(|criterion| criterion.label())
                    .collect();
                json!({
                    "title": c.idea.title,
                    "total": c.evaluation.total,
                    "weak": weak,
                    "notes": c.evaluation.feedback,
                })
            })
            .collect();
        let data = json!({
            "iteration": iteration,
            "threshold": threshold,
            "candidates": rows,
        });

        match self.hbs.render_template(FEEDBACK_TEMPLATE, &data) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "FeedbackSynthesizer::synthesize: template failed, using plain summary");
                let best = candidates.iter().map(|c| c.evaluation.total).max().unwrap_or(0);
                format!(
                    "Iteration {}: best score {}/100 is below the passing score of {}/100.",
                    iteration, best, threshold
                )
            }
        }
    }
}

impl Default for FeedbackSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BusinessIdea, CriterionScores, IdeaEvaluation};
    use serde_json::Value;

    fn candidate(title: &str, scores: CriterionScores) -> ScoredIdea {
        let idea = BusinessIdea::new(title, Value::Null);
        let evaluation = IdeaEvaluation::new(idea.id.clone(), scores, 70).unwrap();
        ScoredIdea {
            idea,
            evaluation,
            iteration: 1,
        }
    }

    #[test]
    fn test_feedback_mentions_every_candidate() {
        let synth = FeedbackSynthesizer::new();
        let candidates = vec![
            candidate("Valet app", CriterionScores::new(30, 20, 5, 5)),
            candidate("Sensor network", CriterionScores::new(20, 20, 10, 5).with_feedback("capex heavy")),
        ];

        let text = synth.synthesize(1, 70, &candidates);
        assert!(text.contains("Iteration 1"));
        assert!(text.contains("70/100"));
        assert!(text.contains("\"Valet app\" scored 60/100"));
        assert!(text.contains("\"Sensor network\" scored 55/100"));
        assert!(text.contains("Evaluator notes: capex heavy"));
    }

    #[test]
    fn test_weak_criteria_listed() {
        let synth = FeedbackSynthesizer::new();
        let candidates = vec![candidate("Valet app", CriterionScores::new(30, 20, 5, 5))];
        let text = synth.synthesize(1, 70, &candidates);
        // competitive advantage 5/15 and profitability 5/15 are weakest, then strategic fit 20/35
        assert!(text.contains("weakest: competitive advantage, profitability, strategic fit"));
    }

    #[test]
    fn test_no_html_escaping() {
        let synth = FeedbackSynthesizer::new();
        let candidates = vec![candidate("Park & Ride <Pro>", CriterionScores::new(10, 10, 5, 5))];
        let text = synth.synthesize(2, 70, &candidates);
        assert!(text.contains("Park & Ride <Pro>"));
    }
}
