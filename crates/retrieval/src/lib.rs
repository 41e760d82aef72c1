//! Agentic retrieval over topic-scoped vector stores.
//!
//! A query is planned into sub-queries, each retrieved with a configurable
//! strategy and evaluated for sufficiency; gaps trigger follow-up searches
//! until the evidence is good enough or the iteration budget runs out.

pub mod embeddings;
pub mod evaluator;
pub mod orchestrator;
pub mod planner;
pub mod prompts;
pub mod similarity;
pub mod store;
pub mod strategy;
pub mod types;

#[cfg(test)]
mod tests;

pub use embeddings::{create_provider, EmbeddingProvider};
pub use evaluator::{HeuristicEvaluator, LlmEvaluator, ResultEvaluator};
pub use orchestrator::{deduplicate, Orchestrator};
pub use planner::{HeuristicPlanner, LlmPlanner, QueryPlanner};
pub use similarity::cosine_similarity;
pub use store::{ModelMismatch, VectorStore};
pub use strategy::{HybridStrategy, MmrStrategy, RetrievalStrategy, StrategyRegistry, VectorStrategy};
pub use types::{
    AgenticQueryResult, AgenticSearchStep, Chunk, ChunkMetadata, Complexity, Document, Evaluation,
    FollowUpQuery, PlanStrategy, QueryContext, QueryPlan, SearchResult, SubQuery, Topic,
};
