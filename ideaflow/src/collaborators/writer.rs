//! Markdown report rendering

use async_trait::async_trait;
use handlebars::Handlebars;
use serde_json::json;
use tracing::debug;

use crate::domain::Phase;
use crate::orchestrator::{PhaseAgent, PhaseContext, PhaseError, PhaseOutput};
use crate::progress::ProgressReporter;

const REPORT_TEMPLATE: &str = r#"# {{idea.selected.title}}

**Request:** {{input}}
{{#if requirements}}**Requirements:** {{requirements}}
{{/if}}
## Scores

| Criterion | Score |
|---|---|
| Market potential | {{idea.evaluation.market_potential}}/35 |
| Strategic fit | {{idea.evaluation.strategic_fit}}/35 |
| Competitive advantage | {{idea.evaluation.competitive_advantage}}/15 |
| Profitability | {{idea.evaluation.profitability}}/15 |
| **Total** | **{{idea.evaluation.total}}/100** |

{{#if idea.evaluation.passed}}The idea passed the quality gate.{{else}}No idea passed the quality gate; this is the best candidate found.{{/if}}

## Pitch

{{idea.selected.payload.pitch}}

## Analysis

{{analysis.recommendation}}
{{#if analysis.strengths}}
Strengths: {{#each analysis.strengths}}{{this}}{{#unless @last}}, {{/unless}}{{/each}}
{{/if}}{{#if analysis.weaknesses}}
Weaknesses: {{#each analysis.weaknesses}}{{this}}{{#unless @last}}, {{/unless}}{{/each}}
{{/if}}
## Refinement history
{{#each idea.history}}
- Iteration {{iteration}}: {{candidates}} candidates, best {{best_total}}/100
{{/each}}
"#;

/// Report phase agent that renders a markdown document
pub struct MarkdownWriter {
    hbs: Handlebars<'static>,
}

impl MarkdownWriter {
    pub fn new() -> Self {
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        Self { hbs }
    }
}

impl Default for MarkdownWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PhaseAgent for MarkdownWriter {
    fn name(&self) -> &str {
        "markdown-writer"
    }

    async fn execute(&self, ctx: &PhaseContext, reporter: &ProgressReporter) -> Result<PhaseOutput, PhaseError> {
        debug!(session_id = %ctx.session_id, "MarkdownWriter::execute: called");
        let idea = ctx.output(Phase::Ideation);
        if idea.is_null() {
            return Err(PhaseError::Malformed("no ideation output to report on".to_string()));
        }
        let data = json!({
            "input": ctx.input,
            "requirements": ctx.requirements,
            "idea": idea,
            "analysis": ctx.output(Phase::Analysis),
        });

        let markdown = self
            .hbs
            .render_template(REPORT_TEMPLATE, &data)
            .map_err(|e| PhaseError::Collaborator(format!("report template failed: {}", e)))?;
        reporter.report(Phase::Report, 95);

        let title = idea["selected"]["title"].as_str().unwrap_or("Untitled").to_string();
        Ok(PhaseOutput::new(json!({
            "format": "markdown",
            "title": title,
            "markdown": markdown,
        }))
        .with_summary(format!("Rendered report for \"{}\"", title)))
    }
}
