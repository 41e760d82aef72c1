//! End-to-end behavior of the agentic query loop.

use crate::evaluator::{HeuristicEvaluator, ResultEvaluator};
use crate::orchestrator::Orchestrator;
use crate::planner::{HeuristicPlanner, QueryPlanner};
use crate::store::VectorStore;
use crate::strategy::RetrievalStrategy;
use crate::tests::fixtures::{open_store, seed_topic, ScriptedLlm, StubEmbedder};
use crate::types::{
    Evaluation, FollowUpQuery, PlanStrategy, QueryContext, QueryPlan, SearchResult, Topic,
};
use async_trait::async_trait;
use scout_core::{AgenticConfig, AppError, AppResult};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

struct FailingPlanner;

#[async_trait]
impl QueryPlanner for FailingPlanner {
    fn name(&self) -> &str {
        "failing"
    }

    async fn create_plan(&self, _: &str, _: Option<&QueryContext>) -> AppResult<QueryPlan> {
        Err(AppError::Planner("model returned nonsense".to_string()))
    }

    async fn generate_follow_up_query(
        &self,
        _: &str,
        _: &[SearchResult],
        _: &[String],
    ) -> AppResult<Option<FollowUpQuery>> {
        Err(AppError::Planner("model returned nonsense".to_string()))
    }
}

/// Always returns the same verdict and counts calls.
struct FixedEvaluator {
    evaluation: Evaluation,
    calls: AtomicUsize,
}

impl FixedEvaluator {
    fn new(confidence: f32, is_complete: bool, gaps: &[&str]) -> Self {
        Self {
            evaluation: Evaluation {
                confidence,
                is_complete,
                gaps: gaps.iter().map(|g| g.to_string()).collect(),
            },
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ResultEvaluator for FixedEvaluator {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn evaluate(
        &self,
        _: &str,
        _: &[SearchResult],
        _: f32,
        _: Option<&QueryContext>,
    ) -> AppResult<Evaluation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.evaluation.clone())
    }
}

/// Returns the topic's chunks in storage order, ignoring the query.
struct InOrderStrategy {
    store: Arc<VectorStore>,
}

#[async_trait]
impl RetrievalStrategy for InOrderStrategy {
    fn name(&self) -> &str {
        "in-order"
    }

    async fn search(&self, topic_id: &str, _: &str, top_k: usize) -> AppResult<Vec<SearchResult>> {
        let snapshot = self.store.snapshot(topic_id).await?;
        let mut chunks = snapshot.chunks.clone();
        chunks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(chunks
            .into_iter()
            .take(top_k)
            .map(|chunk| SearchResult::new(chunk, 0.5))
            .collect())
    }
}

struct FailingEvaluator;

#[async_trait]
impl ResultEvaluator for FailingEvaluator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn evaluate(
        &self,
        _: &str,
        _: &[SearchResult],
        _: f32,
        _: Option<&QueryContext>,
    ) -> AppResult<Evaluation> {
        Err(AppError::Evaluator("timeout".to_string()))
    }
}

async fn corpus() -> (TempDir, Arc<VectorStore>, Topic) {
    let (temp, store) = open_store().await;
    let topic = seed_topic(
        &store,
        &[
            ("c01", "X is a message queue built for throughput", vec![1.0, 0.0]),
            ("c02", "Y is a log-structured event store", vec![0.9, 0.1]),
            ("c03", "X and Y both persist messages to disk", vec![0.8, 0.2]),
            ("c04", "Retention policies differ between systems", vec![0.7, 0.3]),
            ("c05", "Consumers track offsets", vec![0.6, 0.4]),
            ("c06", "Partitions allow parallel reads", vec![0.5, 0.5]),
            ("c07", "Replication protects against node loss", vec![0.4, 0.6]),
            ("c08", "Compaction keeps the latest value per key", vec![0.3, 0.7]),
            ("c09", "Producers batch writes", vec![0.2, 0.8]),
            ("c10", "Brokers coordinate through a controller", vec![0.1, 0.9]),
            ("c11", "Schemas describe payloads", vec![0.05, 0.95]),
            ("c12", "Unrelated trivia", vec![0.0, 1.0]),
        ],
    )
    .await;
    (temp, store, topic)
}

fn orchestrator(store: Arc<VectorStore>) -> Orchestrator {
    Orchestrator::new(store, Arc::new(StubEmbedder::new(2)))
}

fn config(max_iterations: u32) -> AgenticConfig {
    AgenticConfig {
        max_iterations,
        ..AgenticConfig::default()
    }
}

#[tokio::test]
async fn test_iteration_budget_skips_remaining_sub_queries() {
    let (_temp, store, topic) = corpus().await;

    let result = orchestrator(store)
        .execute_agentic_query(&topic.id, "Compare X and Y", &config(1), None)
        .await
        .unwrap();

    assert_eq!(result.query_plan.sub_queries.len(), 3);
    assert_eq!(result.total_iterations, 1);
    assert_eq!(result.steps.len(), 1);
    assert_eq!(result.steps[0].query, "Information about X");
    assert_eq!(result.steps[0].step_number, 1);
}

#[tokio::test]
async fn test_total_iterations_never_exceed_budget() {
    let (_temp, store, topic) = corpus().await;
    let orchestrator = orchestrator(store);

    let queries = [
        "Compare X and Y",
        "What is the impact of retention on consumers?",
        "How do partitions and replication work?",
        "offsets",
    ];

    for max_iterations in 1..=4 {
        for query in queries {
            let result = orchestrator
                .execute_agentic_query(&topic.id, query, &config(max_iterations), None)
                .await
                .unwrap();

            assert!(result.total_iterations <= max_iterations);
            assert_eq!(result.steps.len() as u32, result.total_iterations);
        }
    }
}

#[tokio::test]
async fn test_stops_once_sufficient() {
    let (_temp, store, topic) = corpus().await;
    let evaluator = Arc::new(FixedEvaluator::new(0.95, true, &[]));
    let orchestrator = orchestrator(store).with_llm_components(
        Arc::new(HeuristicPlanner::new()),
        evaluator.clone(),
    );
    let config = AgenticConfig {
        use_llm: true,
        ..config(5)
    };

    let result = orchestrator
        .execute_agentic_query(&topic.id, "Compare X and Y", &config, None)
        .await
        .unwrap();

    assert_eq!(result.query_plan.sub_queries.len(), 3);
    assert_eq!(result.total_iterations, 1);
    // one per step plus the final evaluation
    assert_eq!(evaluator.calls.load(Ordering::SeqCst), 2);
    assert_eq!(result.confidence, 0.95);
}

#[tokio::test]
async fn test_complete_but_below_threshold_keeps_going() {
    let (_temp, store, topic) = corpus().await;
    let evaluator = Arc::new(FixedEvaluator::new(0.3, true, &[]));
    let orchestrator = orchestrator(store)
        .with_llm_components(Arc::new(HeuristicPlanner::new()), evaluator.clone());
    let config = AgenticConfig {
        use_llm: true,
        ..config(5)
    };

    let result = orchestrator
        .execute_agentic_query(&topic.id, "Compare X and Y", &config, None)
        .await
        .unwrap();

    // every planned sub-query runs; complete verdicts never ask for follow-ups
    assert_eq!(result.total_iterations, 3);
    assert_eq!(evaluator.calls.load(Ordering::SeqCst), 4);
    assert_eq!(result.confidence, 0.3);
}

#[tokio::test]
async fn test_unresolvable_follow_up_moves_to_next_sub_query() {
    let (_temp, store, topic) = corpus().await;
    // "offsets" is already in the retrieved chunks, so no follow-up exists
    let evaluator = Arc::new(FixedEvaluator::new(
        0.2,
        false,
        &["Missing information about 'offsets'"],
    ));
    let orchestrator =
        orchestrator(store).with_llm_components(Arc::new(HeuristicPlanner::new()), evaluator);
    let config = AgenticConfig {
        use_llm: true,
        retrieval_strategy: "vector".to_string(),
        ..config(5)
    };

    let result = orchestrator
        .execute_agentic_query(&topic.id, "Compare X and Y", &config, None)
        .await
        .unwrap();

    assert_eq!(result.total_iterations, 3);
    let planned: Vec<&str> = result
        .query_plan
        .sub_queries
        .iter()
        .map(|s| s.query.as_str())
        .collect();
    let executed: Vec<&str> = result.steps.iter().map(|s| s.query.as_str()).collect();
    assert_eq!(executed, planned);
}

#[tokio::test]
async fn test_unknown_strategy_is_fatal() {
    let (_temp, store, topic) = corpus().await;
    let embedder = Arc::new(StubEmbedder::new(2));
    let config = AgenticConfig {
        retrieval_strategy: "bm25".to_string(),
        ..AgenticConfig::default()
    };

    let result = Orchestrator::new(store, embedder.clone())
        .execute_agentic_query(&topic.id, "offsets", &config, None)
        .await;

    assert!(matches!(result, Err(AppError::UnknownStrategy(name)) if name == "bm25"));
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn test_registered_strategy_is_used_by_name() {
    let (_temp, store, topic) = corpus().await;
    let orchestrator = orchestrator(Arc::clone(&store)).with_strategy(Arc::new(InOrderStrategy {
        store: Arc::clone(&store),
    }));
    assert_eq!(
        orchestrator.strategies().names(),
        vec!["hybrid", "in-order", "mmr", "vector"]
    );

    let config = AgenticConfig {
        retrieval_strategy: "in-order".to_string(),
        enable_iterative_refinement: false,
        ..config(1)
    };
    let result = orchestrator
        .execute_agentic_query(&topic.id, "offsets", &config, None)
        .await
        .unwrap();

    assert_eq!(result.steps[0].strategy, "in-order");
    assert_eq!(result.final_results[0].chunk.id, "c01");
}

#[tokio::test]
async fn test_unknown_topic_is_fatal() {
    let (_temp, store, _topic) = corpus().await;

    let result = orchestrator(store)
        .execute_agentic_query("no-such-topic", "offsets", &AgenticConfig::default(), None)
        .await;

    assert!(matches!(result, Err(AppError::TopicNotFound(_))));
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let (_temp, store, topic) = corpus().await;

    let result = orchestrator(store)
        .execute_agentic_query(&topic.id, "offsets", &config(0), None)
        .await;

    assert!(matches!(result, Err(AppError::Config(_))));
}

#[tokio::test]
async fn test_planner_failures_fall_back() {
    let (_temp, store, topic) = corpus().await;
    let evaluator = Arc::new(FixedEvaluator::new(0.2, false, &["gap one"]));
    let orchestrator =
        orchestrator(store).with_llm_components(Arc::new(FailingPlanner), evaluator);
    let config = AgenticConfig {
        use_llm: true,
        ..config(3)
    };

    let result = orchestrator
        .execute_agentic_query(&topic.id, "message queues", &config, None)
        .await
        .unwrap();

    assert_eq!(result.query_plan.strategy, PlanStrategy::Fallback);
    assert_eq!(result.query_plan.sub_queries.len(), 1);
    assert_eq!(result.total_iterations, 2);
    assert_eq!(result.steps[1].query, "message queues gap one");
    assert!(result.steps[1].reasoning.starts_with("Fallback"));
}

#[tokio::test]
async fn test_refinement_disabled_runs_no_follow_ups() {
    let (_temp, store, topic) = corpus().await;
    let evaluator = Arc::new(FixedEvaluator::new(0.2, false, &["gap one"]));
    let orchestrator =
        orchestrator(store).with_llm_components(Arc::new(FailingPlanner), evaluator);
    let config = AgenticConfig {
        use_llm: true,
        enable_iterative_refinement: false,
        ..config(3)
    };

    let result = orchestrator
        .execute_agentic_query(&topic.id, "message queues", &config, None)
        .await
        .unwrap();

    assert_eq!(result.total_iterations, 1);
}

#[tokio::test]
async fn test_evaluator_failure_uses_heuristics() {
    let (_temp, store, topic) = corpus().await;
    let orchestrator = orchestrator(store).with_llm_components(
        Arc::new(HeuristicPlanner::new()),
        Arc::new(FailingEvaluator),
    );
    let config = AgenticConfig {
        use_llm: true,
        ..config(2)
    };

    let result = orchestrator
        .execute_agentic_query(&topic.id, "offsets", &config, None)
        .await
        .unwrap();

    let expected = HeuristicEvaluator::new().assess("offsets", &result.final_results, 0.7);
    assert!(!result.final_results.is_empty());
    assert_eq!(result.confidence, expected.confidence);
}

#[tokio::test]
async fn test_llm_requested_but_missing_uses_heuristics() {
    let (_temp, store, topic) = corpus().await;
    let config = AgenticConfig {
        use_llm: true,
        ..AgenticConfig::default()
    };

    let orchestrator = orchestrator(store);
    assert!(!orchestrator.has_llm());

    let result = orchestrator
        .execute_agentic_query(&topic.id, "Compare X and Y", &config, None)
        .await
        .unwrap();

    assert_eq!(result.query_plan.strategy, PlanStrategy::Comparison);
}

#[tokio::test]
async fn test_llm_mode_plans_with_model() {
    let (_temp, store, topic) = corpus().await;
    let llm = ScriptedLlm::new()
        .reply(r#"{"complexity": "simple", "subQueries": [{"query": "X throughput", "reasoning": "core"}]}"#)
        .reply(r#"{"confidence": 0.9, "isComplete": true, "gaps": []}"#)
        .reply(r#"{"confidence": 0.85, "isComplete": true, "gaps": []}"#);
    let orchestrator = orchestrator(store)
        .with_llm(Arc::new(llm), "test-model")
        .unwrap();
    assert!(orchestrator.has_llm());
    let config = AgenticConfig {
        use_llm: true,
        ..AgenticConfig::default()
    };

    let result = orchestrator
        .execute_agentic_query(&topic.id, "What makes X fast?", &config, None)
        .await
        .unwrap();

    assert_eq!(result.query_plan.strategy, PlanStrategy::Llm);
    assert_eq!(result.steps[0].query, "X throughput");
    assert_eq!(result.total_iterations, 1);
    assert_eq!(result.confidence, 0.85);
}

#[tokio::test]
async fn test_decomposition_disabled_uses_single_query() {
    let (_temp, store, topic) = corpus().await;
    let config = AgenticConfig {
        enable_query_decomposition: false,
        ..AgenticConfig::default()
    };

    let result = orchestrator(store)
        .execute_agentic_query(&topic.id, "Compare X and Y", &config, None)
        .await
        .unwrap();

    assert_eq!(result.query_plan.strategy, PlanStrategy::Fallback);
    assert_eq!(result.steps[0].query, "Compare X and Y");
}

#[tokio::test]
async fn test_final_results_unique_sorted_and_capped() {
    let (_temp, store, topic) = corpus().await;
    let config = AgenticConfig {
        retrieval_strategy: "vector".to_string(),
        confidence_threshold: 1.0,
        ..config(5)
    };

    let result = orchestrator(store)
        .execute_agentic_query(&topic.id, "Compare X and Y", &config, None)
        .await
        .unwrap();

    let ids: HashSet<&str> = result
        .final_results
        .iter()
        .map(|r| r.chunk.id.as_str())
        .collect();
    assert_eq!(ids.len(), result.final_results.len());
    assert!(result.final_results.len() <= 10);
    assert!(result
        .final_results
        .windows(2)
        .all(|w| w[0].similarity >= w[1].similarity));
    assert!(result.steps.iter().all(|s| s.strategy == "vector"));
}

#[tokio::test]
async fn test_simple_query_is_plain_vector_search() {
    let (_temp, store, topic) = corpus().await;

    let embedder = Arc::new(StubEmbedder::new(2));

    let results = Orchestrator::new(store, embedder.clone())
        .execute_simple_query(&topic.id, "anything", 3)
        .await
        .unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
    assert_eq!(ids, vec!["c01", "c02", "c03"]);
    assert_eq!(embedder.calls(), 1);
}
