//! Planner backed by an LLM.

use super::heuristic::analyze_complexity;
use super::QueryPlanner;
use crate::prompts::{
    extract_json_object, truncate_for_log, PromptTemplates, FOLLOW_UP_TEMPLATE, PLAN_TEMPLATE,
    SYSTEM_PROMPT,
};
use crate::types::{
    Complexity, FollowUpQuery, PlanStrategy, QueryContext, QueryPlan, SearchResult, SubQuery,
};
use async_trait::async_trait;
use scout_core::{AppError, AppResult};
use scout_llm::{LlmClient, LlmRequest};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const MAX_SUB_QUERIES: usize = 5;
const MAX_CONTEXT_RESULTS: usize = 5;
const MAX_EXCERPT_CHARS: usize = 300;
const TEMPERATURE: f32 = 0.1;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanResponse {
    #[serde(default)]
    complexity: Option<Complexity>,
    #[serde(default)]
    sub_queries: Vec<PlannedSubQuery>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlannedSubQuery {
    query: String,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    top_k: Option<usize>,
    #[serde(default)]
    dependencies: Option<Vec<usize>>,
}

#[derive(Debug, Deserialize)]
struct FollowUpResponse {
    #[serde(default)]
    query: String,
    #[serde(default)]
    reasoning: String,
}

/// Asks a model to decompose queries and write follow-ups.
///
/// Any transport or parse failure is returned as an error so the caller can
/// fall back to the deterministic plans.
pub struct LlmPlanner {
    client: Arc<dyn LlmClient>,
    model: String,
    templates: Arc<PromptTemplates>,
}

impl LlmPlanner {
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

    async fn ask(&self, prompt: String) -> AppResult<String> {
        let request = LlmRequest::new(prompt, self.model.clone())
            .with_system(SYSTEM_PROMPT)
            .with_temperature(TEMPERATURE)
            .with_json_output();

        let response = self.client.complete(&request).await?;
        Ok(response.content)
    }
}

/// Turn a model's plan into a [`QueryPlan`], dropping unusable entries.
fn parse_plan(query: &str, content: &str) -> AppResult<QueryPlan> {
    let parsed: PlanResponse = serde_json::from_str(extract_json_object(content)?)
        .map_err(|e| AppError::Planner(format!("Malformed plan: {}", e)))?;

    let sub_queries: Vec<SubQuery> = parsed
        .sub_queries
        .into_iter()
        .filter(|s| !s.query.trim().is_empty())
        .take(MAX_SUB_QUERIES)
        .enumerate()
        .map(|(i, s)| {
            let mut sub = SubQuery::new(s.query.trim(), s.reasoning, s.top_k.unwrap_or(0));
            // Only edges to earlier sub-queries are meaningful
            if let Some(deps) = s.dependencies {
                let deps: Vec<usize> = deps.into_iter().filter(|d| *d < i).collect();
                if !deps.is_empty() {
                    sub = sub.with_dependencies(deps);
                }
            }
            sub
        })
        .collect();

    if sub_queries.is_empty() {
        return Err(AppError::Planner(format!(
            "Plan contained no sub-queries: {}",
            truncate_for_log(content)
        )));
    }

    Ok(QueryPlan {
        original_query: query.to_string(),
        sub_queries,
        strategy: PlanStrategy::Llm,
        complexity: parsed
            .complexity
            .unwrap_or_else(|| analyze_complexity(query)),
    })
}

#[async_trait]
impl QueryPlanner for LlmPlanner {
    fn name(&self) -> &str {
        "llm"
    }

    async fn create_plan(
        &self,
        query: &str,
        context: Option<&QueryContext>,
    ) -> AppResult<QueryPlan> {
        let context = context.cloned().unwrap_or_default();
        let prompt = self.templates.render(
            PLAN_TEMPLATE,
            &json!({
                "query": query,
                "topic_name": context.topic_name,
                "topic_description": context.topic_description,
                "previous_queries": context.previous_queries,
                "max_sub_queries": MAX_SUB_QUERIES,
            }),
        )?;

        let content = self.ask(prompt).await?;
        let plan = parse_plan(query, &content)?;
        tracing::debug!("LLM plan with {} sub-queries", plan.sub_queries.len());
        Ok(plan)
    }

    async fn generate_follow_up_query(
        &self,
        original_query: &str,
        existing_results: &[SearchResult],
        gaps: &[String],
    ) -> AppResult<Option<FollowUpQuery>> {
        if gaps.is_empty() {
            return Ok(None);
        }

        let excerpts: Vec<String> = existing_results
            .iter()
            .take(MAX_CONTEXT_RESULTS)
            .map(|r| r.chunk.text.chars().take(MAX_EXCERPT_CHARS).collect())
            .collect();

        let prompt = self.templates.render(
            FOLLOW_UP_TEMPLATE,
            &json!({
                "query": original_query,
                "gaps": gaps,
                "results": excerpts,
            }),
        )?;

        let content = self.ask(prompt).await?;
        let parsed: FollowUpResponse = serde_json::from_str(extract_json_object(&content)?)
            .map_err(|e| AppError::Planner(format!("Malformed follow-up: {}", e)))?;

        let query = parsed.query.trim();
        if query.is_empty() {
            return Ok(None);
        }

        Ok(Some(FollowUpQuery {
            query: query.to_string(),
            reasoning: parsed.reasoning,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::ScriptedLlm;

    fn planner(llm: ScriptedLlm) -> LlmPlanner {
        LlmPlanner::new(
            Arc::new(llm),
            "test-model",
            Arc::new(PromptTemplates::new().unwrap()),
        )
    }

    #[tokio::test]
    async fn test_parses_plan_from_chatty_output() {
        let llm = ScriptedLlm::new().reply(
            r#"Here is the plan:
{"complexity": "complex", "subQueries": [
  {"query": "TCP handshake", "reasoning": "first", "topK": 4},
  {"query": "  ", "reasoning": "blank is dropped"},
  {"query": "UDP datagrams", "reasoning": "second", "dependencies": [0, 3]}
]}"#,
        );

        let plan = planner(llm).create_plan("TCP vs UDP", None).await.unwrap();

        assert_eq!(plan.strategy, PlanStrategy::Llm);
        assert_eq!(plan.complexity, Complexity::Complex);
        assert_eq!(plan.sub_queries.len(), 2);
        assert_eq!(plan.sub_queries[0].top_k, 4);
        assert_eq!(plan.sub_queries[1].effective_top_k(), 5);
        assert_eq!(plan.sub_queries[1].dependencies, Some(vec![0]));
    }

    #[tokio::test]
    async fn test_empty_plan_is_error() {
        let llm = ScriptedLlm::new().reply(r#"{"subQueries": []}"#);
        let result = planner(llm).create_plan("anything", None).await;
        assert!(matches!(result, Err(AppError::Planner(_))));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let result = planner(ScriptedLlm::new()).create_plan("anything", None).await;
        assert!(matches!(result, Err(AppError::Llm(_))));
    }

    #[tokio::test]
    async fn test_prompt_carries_context() {
        let llm = Arc::new(ScriptedLlm::new().reply(r#"{"subQueries": [{"query": "q"}]}"#));
        let planner = LlmPlanner::new(
            llm.clone(),
            "test-model",
            Arc::new(PromptTemplates::new().unwrap()),
        );
        let context = QueryContext {
            topic_name: Some("databases".to_string()),
            topic_description: None,
            previous_queries: vec!["what is an index".to_string()],
        };

        planner.create_plan("how do joins work", Some(&context)).await.unwrap();

        let prompts = llm.prompts();
        assert!(prompts[0].contains("Topic: databases"));
        assert!(prompts[0].contains("- what is an index"));
    }

    #[tokio::test]
    async fn test_follow_up_parsing() {
        let llm = ScriptedLlm::new()
            .reply(r#"{"query": "index selectivity", "reasoning": "missing"}"#)
            .reply(r#"{"query": ""}"#);
        let planner = planner(llm);
        let gaps = vec!["Missing information about 'selectivity'".to_string()];

        let first = planner
            .generate_follow_up_query("indexes", &[], &gaps)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.query, "index selectivity");

        let second = planner.generate_follow_up_query("indexes", &[], &gaps).await.unwrap();
        assert!(second.is_none());

        // no gaps, no request
        assert!(planner
            .generate_follow_up_query("indexes", &[], &[])
            .await
            .unwrap()
            .is_none());
    }
}
