//! Result evaluation.
//!
//! An evaluator scores a `(query, results)` pair for confidence and
//! completeness and names what is still missing.

pub mod heuristic;
pub mod llm;

pub use heuristic::HeuristicEvaluator;
pub use llm::LlmEvaluator;

use crate::types::{Evaluation, QueryContext, SearchResult};
use async_trait::async_trait;
use scout_core::AppResult;

#[async_trait]
pub trait ResultEvaluator: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Judge `results` against `query`.
    ///
    /// An empty result set must yield [`Evaluation::no_results`], not an error.
    async fn evaluate(
        &self,
        query: &str,
        results: &[SearchResult],
        confidence_threshold: f32,
        context: Option<&QueryContext>,
    ) -> AppResult<Evaluation>;
}
