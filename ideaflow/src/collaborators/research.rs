//! Keyword research from the session's own text

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::domain::{Phase, StepRecord};
use crate::orchestrator::{PhaseAgent, PhaseContext, PhaseError, PhaseOutput};
use crate::progress::ProgressReporter;

/// Most keywords kept per source text
const MAX_KEYWORDS: usize = 8;

const STOPWORDS: &[&str] = &[
    "about", "also", "and", "are", "but", "can", "for", "from", "has", "have", "into", "its", "more", "must", "not",
    "our", "should", "that", "the", "their", "them", "they", "this", "use", "using", "want", "was", "were", "what",
    "when", "which", "will", "with", "would", "you", "your",
];

/// Lowercased keywords in first-seen order, without stopwords or duplicates
pub fn extract_keywords(text: &str, limit: usize) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        let word = word.to_lowercase();
        if word.chars().count() < 3 || STOPWORDS.contains(&word.as_str()) || word.chars().all(char::is_numeric) {
            continue;
        }
        if !keywords.contains(&word) {
            keywords.push(word);
        }
        if keywords.len() == limit {
            break;
        }
    }
    keywords
}

/// Research phase agent that works offline from the input text
#[derive(Debug, Default)]
pub struct KeywordResearcher;

impl KeywordResearcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PhaseAgent for KeywordResearcher {
    fn name(&self) -> &str {
        "keyword-researcher"
    }

    async fn execute(&self, ctx: &PhaseContext, reporter: &ProgressReporter) -> Result<PhaseOutput, PhaseError> {
        debug!(session_id = %ctx.session_id, "KeywordResearcher::execute: called");
        let keywords = extract_keywords(&ctx.input, MAX_KEYWORDS);
        if keywords.is_empty() {
            return Err(PhaseError::Collaborator(format!(
                "no usable keywords in input '{}'",
                ctx.input
            )));
        }
        reporter.report(Phase::Research, 15);

        let constraints = ctx
            .requirements
            .as_deref()
            .map(|r| extract_keywords(r, MAX_KEYWORDS))
            .unwrap_or_default();

        let step = StepRecord::completed(
            self.name(),
            format!("Extracted {} keywords and {} constraints", keywords.len(), constraints.len()),
        )
        .with_details(json!({ "keywords": keywords, "constraints": constraints }));
        let _ = reporter.record_step(step).await;
        reporter.report(Phase::Research, 25);

        let summary = format!("Research found: {}", keywords.join(", "));
        Ok(PhaseOutput::new(json!({
            "keywords": keywords,
            "constraints": constraints,
        }))
        .with_summary(summary))
    }
}
