//! Query planning.
//!
//! A planner turns a natural-language query into an ordered [`QueryPlan`] and
//! proposes follow-up queries when evaluation reports gaps. Heuristic and
//! LLM-backed planners share the [`QueryPlanner`] contract; both fall back to
//! the deterministic plans defined here.

pub mod heuristic;
pub mod llm;

pub use heuristic::HeuristicPlanner;
pub use llm::LlmPlanner;

use crate::types::{
    Complexity, FollowUpQuery, PlanStrategy, QueryContext, QueryPlan, SearchResult, SubQuery,
    DEFAULT_TOP_K,
};
use async_trait::async_trait;
use scout_core::AppResult;

#[async_trait]
pub trait QueryPlanner: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Decompose `query` into sub-queries.
    async fn create_plan(&self, query: &str, context: Option<&QueryContext>)
        -> AppResult<QueryPlan>;

    /// Propose a query covering one of `gaps`.
    ///
    /// `Ok(None)` means no further refinement is possible.
    async fn generate_follow_up_query(
        &self,
        original_query: &str,
        existing_results: &[SearchResult],
        gaps: &[String],
    ) -> AppResult<Option<FollowUpQuery>>;

    /// Plan used when decomposition is disabled or planning failed.
    fn fallback_single_query_plan(&self, query: &str) -> QueryPlan {
        single_query_plan(query, PlanStrategy::Fallback)
    }

    /// Follow-up used when follow-up generation failed.
    fn fallback_follow_up_query(&self, query: &str, gaps: &[String]) -> FollowUpQuery {
        match gaps.first() {
            Some(gap) => FollowUpQuery {
                query: format!("{} {}", query, gap),
                reasoning: format!("Fallback refinement targeting gap: {}", gap),
            },
            None => FollowUpQuery {
                query: query.to_string(),
                reasoning: "Fallback refinement repeating the original query".to_string(),
            },
        }
    }
}

/// A plan with one sub-query echoing `query`.
pub(crate) fn single_query_plan(query: &str, strategy: PlanStrategy) -> QueryPlan {
    QueryPlan {
        original_query: query.to_string(),
        sub_queries: vec![SubQuery::new(
            query,
            "Direct search for the original query",
            DEFAULT_TOP_K,
        )],
        strategy,
        complexity: Complexity::Simple,
    }
}
