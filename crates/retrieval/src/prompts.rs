//! Prompt templates for the LLM-backed planner and evaluator.

use handlebars::Handlebars;
use scout_core::{AppError, AppResult};
use serde::Serialize;

pub const PLAN_TEMPLATE: &str = "plan";
pub const FOLLOW_UP_TEMPLATE: &str = "follow_up";
pub const EVALUATE_TEMPLATE: &str = "evaluate";

/// System prompt shared by every structured request.
pub const SYSTEM_PROMPT: &str =
    "You are a retrieval planning assistant. Respond with a single JSON object and nothing else.";

const PLAN: &str = r#"Break the user's question into focused search queries for a document retrieval system.
{{#if topic_name}}
Topic: {{topic_name}}{{#if topic_description}} ({{topic_description}}){{/if}}
{{/if}}
{{#if previous_queries}}
Earlier questions in this session:
{{#each previous_queries}}
- {{this}}
{{/each}}
{{/if}}
Question: {{query}}

Return JSON of the form:
{"complexity": "simple|moderate|complex", "subQueries": [{"query": "...", "reasoning": "...", "topK": 5, "dependencies": [0]}]}
Use at most {{max_sub_queries}} sub-queries. Omit "dependencies" when a sub-query stands alone."#;

const FOLLOW_UP: &str = r#"A search for the question below left gaps in the retrieved evidence.

Question: {{query}}

Gaps:
{{#each gaps}}
- {{this}}
{{/each}}

Retrieved so far:
{{#each results}}
[{{@index}}] {{this}}
{{/each}}

Write one new search query that fills the most important gap.
Return JSON of the form:
{"query": "...", "reasoning": "..."}
Return {"query": ""} if no further search would help."#;

const EVALUATE: &str = r#"Judge whether the retrieved passages answer the question.

Question: {{query}}

Passages:
{{#each results}}
[{{@index}}] (similarity {{this.similarity}}) {{this.text}}
{{/each}}

A confidence of {{threshold}} or more means the passages are good enough to answer.
Return JSON of the form:
{"confidence": 0.0, "isComplete": false, "gaps": ["what is still missing"]}"#;

/// Registry of the built-in templates, compiled once.
pub struct PromptTemplates {
    registry: Handlebars<'static>,
}

impl PromptTemplates {
    pub fn new() -> AppResult<Self> {
        let mut registry = Handlebars::new();

        // Prompts are plain text
        registry.register_escape_fn(handlebars::no_escape);
        registry.set_strict_mode(false);

        for (name, template) in [
            (PLAN_TEMPLATE, PLAN),
            (FOLLOW_UP_TEMPLATE, FOLLOW_UP),
            (EVALUATE_TEMPLATE, EVALUATE),
        ] {
            registry
                .register_template_string(name, template)
                .map_err(|e| AppError::Llm(format!("Failed to register template '{}': {}", name, e)))?;
        }

        Ok(Self { registry })
    }

    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> AppResult<String> {
        self.registry
            .render(name, data)
            .map_err(|e| AppError::Llm(format!("Failed to render template '{}': {}", name, e)))
    }
}

/// The outermost `{...}` span of a model response.
pub fn extract_json_object(text: &str) -> AppResult<&str> {
    let start = text.find('{');
    let end = text.rfind('}');

    match (start, end) {
        (Some(start), Some(end)) if start < end => Ok(&text[start..=end]),
        _ => Err(AppError::Llm(format!(
            "No JSON object in model response: {}",
            truncate_for_log(text)
        ))),
    }
}

/// Shorten model output for error messages.
pub(crate) fn truncate_for_log(text: &str) -> String {
    const MAX: usize = 200;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(MAX).collect::<String>())
    }
}
