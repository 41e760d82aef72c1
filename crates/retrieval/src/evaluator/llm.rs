//! Evaluator backed by an LLM.

use super::ResultEvaluator;
use crate::prompts::{extract_json_object, PromptTemplates, EVALUATE_TEMPLATE, SYSTEM_PROMPT};
use crate::types::{Evaluation, QueryContext, SearchResult};
use async_trait::async_trait;
use scout_core::{AppError, AppResult};
use scout_llm::{LlmClient, LlmRequest};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const MAX_PASSAGES: usize = 8;
const MAX_PASSAGE_CHARS: usize = 500;
const TEMPERATURE: f32 = 0.0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvaluationResponse {
    confidence: f32,
    #[serde(default)]
    is_complete: bool,
    #[serde(default)]
    gaps: Vec<String>,
}

/// Asks a model whether the retrieved passages answer the query.
pub struct LlmEvaluator {
    client: Arc<dyn LlmClient>,
    model: String,
    templates: Arc<PromptTemplates>,
}

impl LlmEvaluator {
    pub fn new(
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
        templates: Arc<PromptTemplates>,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            templates,
        }
    }
}

#[async_trait]
impl ResultEvaluator for LlmEvaluator {
    fn name(&self) -> &str {
        "llm"
    }

    async fn evaluate(
        &self,
        query: &str,
        results: &[SearchResult],
        confidence_threshold: f32,
        _context: Option<&QueryContext>,
    ) -> AppResult<Evaluation> {
        if results.is_empty() {
            return Ok(Evaluation::no_results());
        }

        let passages: Vec<serde_json::Value> = results
            .iter()
            .take(MAX_PASSAGES)
            .map(|r| {
                json!({
                    "similarity": format!("{:.2}", r.similarity),
                    "text": r.chunk.text.chars().take(MAX_PASSAGE_CHARS).collect::<String>(),
                })
            })
            .collect();

        let prompt = self.templates.render(
            EVALUATE_TEMPLATE,
            &json!({
                "query": query,
                "results": passages,
                "threshold": confidence_threshold,
            }),
        )?;

        let request = LlmRequest::new(prompt, self.model.clone())
            .with_system(SYSTEM_PROMPT)
            .with_temperature(TEMPERATURE)
            .with_json_output();
        let response = self.client.complete(&request).await?;

        let parsed: EvaluationResponse =
            serde_json::from_str(extract_json_object(&response.content)?)
                .map_err(|e| AppError::Evaluator(format!("Malformed evaluation: {}", e)))?;

        if !parsed.confidence.is_finite() {
            return Err(AppError::Evaluator(
                "Evaluation confidence is not a number".to_string(),
            ));
        }

        Ok(Evaluation {
            confidence: parsed.confidence.clamp(0.0, 1.0),
            is_complete: parsed.is_complete,
            gaps: parsed
                .gaps
                .into_iter()
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty())
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::{chunk, ScriptedLlm};

    fn evaluator(llm: Arc<ScriptedLlm>) -> LlmEvaluator {
        LlmEvaluator::new(llm, "test-model", Arc::new(PromptTemplates::new().unwrap()))
    }

    fn results() -> Vec<SearchResult> {
        vec![SearchResult::new(
            Arc::new(chunk("c1", "Indexes speed up lookups", vec![1.0])),
            0.83,
        )]
    }

    #[tokio::test]
    async fn test_parses_and_clamps() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .reply(r#"{"confidence": 1.4, "isComplete": true, "gaps": ["", " joins "]}"#),
        );

        let evaluation = evaluator(llm.clone())
            .evaluate("indexes", &results(), 0.7, None)
            .await
            .unwrap();

        assert_eq!(evaluation.confidence, 1.0);
        assert!(evaluation.is_complete);
        assert_eq!(evaluation.gaps, vec!["joins"]);
        assert!(llm.prompts()[0].contains("(similarity 0.83) Indexes speed up lookups"));
    }

    #[tokio::test]
    async fn test_empty_results_skip_model() {
        let llm = Arc::new(ScriptedLlm::new());
        let evaluation = evaluator(llm.clone())
            .evaluate("indexes", &[], 0.7, None)
            .await
            .unwrap();

        assert_eq!(evaluation, Evaluation::no_results());
        assert!(llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_output_is_evaluator_error() {
        let llm = Arc::new(ScriptedLlm::new().reply(r#"{"verdict": "good"}"#));
        let result = evaluator(llm).evaluate("indexes", &results(), 0.7, None).await;
        assert!(matches!(result, Err(AppError::Evaluator(_))));
    }
}
