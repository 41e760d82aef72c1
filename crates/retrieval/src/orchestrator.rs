//! Agentic query orchestration.
//!
//! One call runs plan, retrieve, evaluate and refine under the iteration
//! budget, then deduplicates and re-ranks everything retrieved and evaluates
//! the merged set once more. All steps run sequentially.

use crate::embeddings::EmbeddingProvider;
use crate::evaluator::{HeuristicEvaluator, LlmEvaluator, ResultEvaluator};
use crate::planner::{HeuristicPlanner, LlmPlanner, QueryPlanner};
use crate::prompts::PromptTemplates;
use crate::store::VectorStore;
use crate::strategy::{RetrievalStrategy, StrategyRegistry};
use crate::types::{
    AgenticQueryResult, AgenticSearchStep, Evaluation, QueryContext, QueryPlan, SearchResult,
    DEFAULT_TOP_K,
};
use scout_core::{AgenticConfig, AppResult};
use scout_llm::LlmClient;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Results returned by an agentic query.
pub const MAX_FINAL_RESULTS: usize = 10;

/// Result count for follow-up retrievals.
pub const FOLLOW_UP_TOP_K: usize = DEFAULT_TOP_K;

/// Planner and evaluator used together for one query.
#[derive(Clone)]
struct Components {
    planner: Arc<dyn QueryPlanner>,
    evaluator: Arc<dyn ResultEvaluator>,
}

/// Drives agentic queries against a shared store.
pub struct Orchestrator {
    store: Arc<VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    strategies: StrategyRegistry,
    heuristic: Components,
    fallback_evaluator: HeuristicEvaluator,
    llm: Option<Components>,
}

impl Orchestrator {
    /// Orchestrator with the built-in strategies and heuristic components.
    pub fn new(store: Arc<VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let strategies = StrategyRegistry::with_defaults(Arc::clone(&store), Arc::clone(&embedder));

        Self {
            store,
            embedder,
            strategies,
            heuristic: Components {
                planner: Arc::new(HeuristicPlanner::new()),
                evaluator: Arc::new(HeuristicEvaluator::new()),
            },
            fallback_evaluator: HeuristicEvaluator::new(),
            llm: None,
        }
    }

    /// Enable LLM mode with the planner and evaluator built on `client`.
    pub fn with_llm(self, client: Arc<dyn LlmClient>, model: impl Into<String>) -> AppResult<Self> {
        let model = model.into();
        let templates = Arc::new(PromptTemplates::new()?);

        let planner = LlmPlanner::new(Arc::clone(&client), model.clone(), Arc::clone(&templates));
        let evaluator = LlmEvaluator::new(client, model, templates);

        Ok(self.with_llm_components(Arc::new(planner), Arc::new(evaluator)))
    }

    /// Enable LLM mode with explicit components.
    pub fn with_llm_components(
        mut self,
        planner: Arc<dyn QueryPlanner>,
        evaluator: Arc<dyn ResultEvaluator>,
    ) -> Self {
        self.llm = Some(Components { planner, evaluator });
        self
    }

    /// Register an additional strategy, replacing any with the same name.
    pub fn with_strategy(mut self, strategy: Arc<dyn RetrievalStrategy>) -> Self {
        self.strategies.register(strategy);
        self
    }

    pub fn strategies(&self) -> &StrategyRegistry {
        &self.strategies
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// Plain vector search, without planning or evaluation.
    pub async fn execute_simple_query(
        &self,
        topic_id: &str,
        query: &str,
        top_k: usize,
    ) -> AppResult<Vec<SearchResult>> {
        let embedding = self.embedder.embed(query).await?;
        self.store.search(topic_id, &embedding, top_k).await
    }

    /// Run the full plan, retrieve, evaluate and refine loop.
    ///
    /// Fails on invalid configuration, an unknown strategy, an unknown topic,
    /// or an embedding error. Planner and evaluator failures are logged and
    /// replaced by their deterministic fallbacks.
    #[instrument(name = "agentic_query", skip_all, fields(topic = %topic_id, query = %query))]
    pub async fn execute_agentic_query(
        &self,
        topic_id: &str,
        query: &str,
        config: &AgenticConfig,
        context: Option<&QueryContext>,
    ) -> AppResult<AgenticQueryResult> {
        config.validate()?;

        let topic = self.store.get_topic(topic_id).await?;
        let context = match context {
            Some(context) => context.clone(),
            None => QueryContext::for_topic(&topic),
        };

        let components = self.select_components(config.use_llm);
        let strategy = self.strategies.get(&config.retrieval_strategy)?;
        let threshold = config.confidence_threshold;

        let plan = self
            .plan(components.planner.as_ref(), query, config, &context)
            .await;
        debug!(
            "Plan: {:?}/{:?} with {} sub-queries",
            plan.strategy,
            plan.complexity,
            plan.sub_queries.len()
        );

        let mut iterations: u32 = 0;
        let mut steps: Vec<AgenticSearchStep> = Vec::new();
        let mut accumulated: Vec<SearchResult> = Vec::new();

        for sub_query in &plan.sub_queries {
            if iterations >= config.max_iterations {
                debug!("Iteration budget of {} reached", config.max_iterations);
                break;
            }

            let results = strategy
                .search(topic_id, &sub_query.query, sub_query.effective_top_k())
                .await?;
            iterations += 1;

            let mut evaluation = self
                .evaluate(
                    components.evaluator.as_ref(),
                    &sub_query.query,
                    &results,
                    threshold,
                    &context,
                )
                .await;
            push_step(
                &mut steps,
                &sub_query.query,
                strategy.name(),
                results.len(),
                &evaluation,
                &sub_query.reasoning,
            );
            accumulated.extend(results);

            if config.enable_iterative_refinement
                && !evaluation.is_complete
                && iterations < config.max_iterations
            {
                let follow_up = match components
                    .planner
                    .generate_follow_up_query(query, &accumulated, &evaluation.gaps)
                    .await
                {
                    Ok(follow_up) => follow_up,
                    Err(e) => {
                        warn!(
                            "Follow-up generation by '{}' failed, using fallback: {}",
                            components.planner.name(),
                            e
                        );
                        Some(
                            components
                                .planner
                                .fallback_follow_up_query(query, &evaluation.gaps),
                        )
                    }
                };

                if let Some(follow_up) = follow_up {
                    debug!("Refining with follow-up '{}'", follow_up.query);
                    let results = strategy
                        .search(topic_id, &follow_up.query, FOLLOW_UP_TOP_K)
                        .await?;
                    iterations += 1;

                    evaluation = self
                        .evaluate(
                            components.evaluator.as_ref(),
                            &follow_up.query,
                            &results,
                            threshold,
                            &context,
                        )
                        .await;
                    push_step(
                        &mut steps,
                        &follow_up.query,
                        strategy.name(),
                        results.len(),
                        &evaluation,
                        &follow_up.reasoning,
                    );
                    accumulated.extend(results);
                }
            }

            if evaluation.is_sufficient(threshold) {
                debug!(
                    "Confidence {:.2} meets threshold {:.2}, stopping",
                    evaluation.confidence, threshold
                );
                break;
            }
        }

        let mut final_results = deduplicate(accumulated);
        let final_evaluation = self
            .evaluate(
                components.evaluator.as_ref(),
                query,
                &final_results,
                threshold,
                &context,
            )
            .await;
        final_results.truncate(MAX_FINAL_RESULTS);

        info!(
            iterations,
            steps = steps.len(),
            results = final_results.len(),
            confidence = final_evaluation.confidence,
            "Agentic query complete"
        );

        Ok(AgenticQueryResult {
            final_results,
            steps,
            total_iterations: iterations,
            query_plan: plan,
            confidence: final_evaluation.confidence,
        })
    }

    fn select_components(&self, use_llm: bool) -> Components {
        match (&self.llm, use_llm) {
            (Some(llm), true) => llm.clone(),
            (None, true) => {
                warn!("LLM mode requested but no LLM is available, using heuristics");
                self.heuristic.clone()
            }
            _ => self.heuristic.clone(),
        }
    }

    async fn plan(
        &self,
        planner: &dyn QueryPlanner,
        query: &str,
        config: &AgenticConfig,
        context: &QueryContext,
    ) -> QueryPlan {
        if !config.enable_query_decomposition {
            return planner.fallback_single_query_plan(query);
        }

        match planner.create_plan(query, Some(context)).await {
            Ok(plan) if !plan.sub_queries.is_empty() => plan,
            Ok(_) => {
                warn!("Planner '{}' returned an empty plan, using fallback", planner.name());
                planner.fallback_single_query_plan(query)
            }
            Err(e) => {
                warn!("Planner '{}' failed, using fallback plan: {}", planner.name(), e);
                planner.fallback_single_query_plan(query)
            }
        }
    }

    async fn evaluate(
        &self,
        evaluator: &dyn ResultEvaluator,
        query: &str,
        results: &[SearchResult],
        threshold: f32,
        context: &QueryContext,
    ) -> Evaluation {
        match evaluator
            .evaluate(query, results, threshold, Some(context))
            .await
        {
            Ok(evaluation) => evaluation,
            Err(e) => {
                warn!(
                    "Evaluator '{}' failed, using heuristic evaluation: {}",
                    evaluator.name(),
                    e
                );
                self.fallback_evaluator.assess(query, results, threshold)
            }
        }
    }
}

fn push_step(
    steps: &mut Vec<AgenticSearchStep>,
    query: &str,
    strategy: &str,
    results_count: usize,
    evaluation: &Evaluation,
    reasoning: &str,
) {
    steps.push(AgenticSearchStep {
        step_number: steps.len() as u32 + 1,
        query: query.to_string(),
        strategy: strategy.to_string(),
        results_count,
        confidence: evaluation.confidence,
        reasoning: reasoning.to_string(),
    });
}

/// One result per chunk id, keeping the highest similarity, best first.
///
/// Equal similarities keep the first occurrence.
pub fn deduplicate(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<SearchResult> = Vec::new();

    for result in results {
        match positions.get(&result.chunk.id) {
            Some(&i) => {
                if result.similarity > unique[i].similarity {
                    unique[i] = result;
                }
            }
            None => {
                positions.insert(result.chunk.id.clone(), unique.len());
                unique.push(result);
            }
        }
    }

    unique.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::chunk;

    fn result(id: &str, text: &str, similarity: f32) -> SearchResult {
        SearchResult::new(Arc::new(chunk(id, text, vec![1.0])), similarity)
    }

    #[test]
    fn test_deduplicate_keeps_max() {
        let merged = deduplicate(vec![
            result("a", "first", 0.4),
            result("b", "other", 0.6),
            result("a", "second", 0.9),
            result("a", "third", 0.2),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].chunk.id, "a");
        assert_eq!(merged[0].similarity, 0.9);
        assert_eq!(merged[0].chunk.text, "second");
        assert_eq!(merged[1].chunk.id, "b");
    }

    #[test]
    fn test_deduplicate_tie_keeps_first() {
        let merged = deduplicate(vec![result("a", "first", 0.5), result("a", "second", 0.5)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].chunk.text, "first");
    }

    #[test]
    fn test_deduplicate_empty() {
        assert!(deduplicate(Vec::new()).is_empty());
    }
}
