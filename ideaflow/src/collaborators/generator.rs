//! Template-based idea generation

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::domain::{BusinessIdea, Criterion};
use crate::refine::{IdeaGenerator, IdeaRequest, RefineError};

use super::research::extract_keywords;

/// Business models combined with research keywords
const MODELS: &[(&str, &str)] = &[
    ("Marketplace", "connects providers and customers around {kw} and takes a commission per booking"),
    ("Subscription", "offers {kw} as a monthly plan with tiered features"),
    ("Analytics", "sells dashboards and forecasts built from {kw} data to operators"),
    ("Hardware-as-a-Service", "leases {kw} devices with maintenance and monitoring included"),
    ("Community App", "builds a local community around {kw} with premium memberships"),
    ("B2B Platform", "gives businesses a white-label {kw} platform with per-seat pricing"),
];

/// What each weak criterion asks of the next pitch
fn focus_hint(criterion: Criterion) -> &'static str {
    match criterion {
        Criterion::MarketPotential => "targets a large, growing customer segment",
        Criterion::StrategicFit => "builds directly on the stated requirements",
        Criterion::CompetitiveAdvantage => "relies on proprietary data that is hard to copy",
        Criterion::Profitability => "earns recurring revenue from day one",
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Combines keywords with business-model templates
///
/// Each iteration shifts through the combinations, so a retry never
/// repeats the previous iteration's candidates. Criteria named in the
/// feedback become the focus of the new pitches.
#[derive(Debug, Default)]
pub struct TemplateIdeaGenerator;

impl TemplateIdeaGenerator {
    pub fn new() -> Self {
        Self
    }

    fn keywords(request: &IdeaRequest) -> Vec<String> {
        let researched: Vec<String> = request
            .context
            .research
            .get("keywords")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        if researched.is_empty() {
            extract_keywords(&request.context.input, 8)
        } else {
            researched
        }
    }

    fn focus(feedback: Option<&str>) -> Vec<Criterion> {
        let Some(feedback) = feedback else {
            return Vec::new();
        };
        let feedback = feedback.to_lowercase();
        Criterion::ALL
            .into_iter()
            .filter(|c| feedback.contains(c.label()))
            .collect()
    }
}

#[async_trait]
impl IdeaGenerator for TemplateIdeaGenerator {
    fn name(&self) -> &str {
        "template-generator"
    }

    async fn generate(&self, request: &IdeaRequest) -> Result<Vec<BusinessIdea>, RefineError> {
        debug!(iteration = request.iteration, count = request.count, "TemplateIdeaGenerator::generate: called");
        let keywords = Self::keywords(request);
        if keywords.is_empty() {
            return Err(RefineError::Generator("no keywords to build ideas from".to_string()));
        }
        let focus = Self::focus(request.feedback.as_deref());
        let offset = (request.iteration.saturating_sub(1) as usize) * request.count;

        let ideas = (0..request.count)
            .map(|n| {
                let slot = offset + n;
                let keyword = &keywords[slot % keywords.len()];
                let (model, template) = MODELS[slot % MODELS.len()];
                let mut pitch = format!("A {} that {}", model.to_lowercase(), template.replace("{kw}", keyword));
                for criterion in &focus {
                    pitch.push_str("; ");
                    pitch.push_str(focus_hint(*criterion));
                }
                BusinessIdea::new(
                    format!("{} {}", capitalize(keyword), model),
                    json!({
                        "keyword": keyword,
                        "model": model,
                        "pitch": pitch,
                        "focus": focus,
                        "iteration": request.iteration,
                    }),
                )
            })
            .collect();
        Ok(ideas)
    }
}
