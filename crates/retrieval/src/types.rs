//! Retrieval data model.
//!
//! Field names serialize in camelCase; the stored-chunk types double as the
//! persisted record format of the vector store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Number of results requested when a sub-query does not say otherwise.
pub const DEFAULT_TOP_K: usize = 5;

/// Positional and structural metadata of a chunk within its document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// Display name of the source document
    pub document_name: String,

    /// Index of the chunk within its document
    pub chunk_index: u32,

    /// Character offset where the chunk starts
    pub start_position: usize,

    /// Character offset where the chunk ends
    pub end_position: usize,

    /// Enclosing headings, outermost first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_path: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_level: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
}

/// A stored text span with its embedding. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub topic_id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// A named, isolated corpus of documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Maintained by the store on document add/delete only
    pub document_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Topic {
    /// Create an empty topic with a fresh id.
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description,
            document_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A source document whose chunks belong to a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub topic_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    pub file_type: String,
    pub chunk_count: u32,
    pub added_at: DateTime<Utc>,
}

/// One ranked hit. The chunk is shared with the store's cached snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub chunk: Arc<Chunk>,
    pub similarity: f32,
    pub document_name: String,
}

impl SearchResult {
    pub fn new(chunk: Arc<Chunk>, similarity: f32) -> Self {
        let document_name = chunk.metadata.document_name.clone();
        Self {
            chunk,
            similarity,
            document_name,
        }
    }

    /// Same hit, different score.
    pub fn rescored(&self, similarity: f32) -> Self {
        Self {
            chunk: Arc::clone(&self.chunk),
            similarity,
            document_name: self.document_name.clone(),
        }
    }
}

/// How involved a query is, as judged by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

/// Which decomposition produced a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStrategy {
    /// Single sub-query for a simple query
    Direct,
    /// Per-entity lookups plus a comparison query
    Comparison,
    /// Primary subject plus effect and/or background queries
    Causal,
    /// Definition plus examples
    Explanatory,
    /// One sub-query per conjunct
    Conjunctive,
    /// Single sub-query after planning was skipped or failed
    Fallback,
    /// Produced by the LLM planner
    Llm,
}

/// One decomposed unit of the original query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubQuery {
    pub query: String,
    pub reasoning: String,
    #[serde(default)]
    pub top_k: usize,
    /// Indices of sub-queries this one builds on. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<usize>>,
}

impl SubQuery {
    pub fn new(query: impl Into<String>, reasoning: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            reasoning: reasoning.into(),
            top_k,
            dependencies: None,
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<usize>) -> Self {
        self.dependencies = Some(dependencies);
        self
    }

    /// Requested result count, with zero meaning the default.
    pub fn effective_top_k(&self) -> usize {
        if self.top_k == 0 {
            DEFAULT_TOP_K
        } else {
            self.top_k
        }
    }
}

/// Ordered set of sub-queries for one top-level query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPlan {
    pub original_query: String,
    pub sub_queries: Vec<SubQuery>,
    pub strategy: PlanStrategy,
    pub complexity: Complexity,
}

/// A refinement query synthesized from evaluation gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpQuery {
    pub query: String,
    pub reasoning: String,
}

/// Audit record of one executed retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgenticSearchStep {
    pub step_number: u32,
    pub query: String,
    pub strategy: String,
    pub results_count: usize,
    pub confidence: f32,
    pub reasoning: String,
}

/// Evaluator verdict on a result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    /// Within [0, 1]
    pub confidence: f32,
    pub is_complete: bool,
    #[serde(default)]
    pub gaps: Vec<String>,
}

impl Evaluation {
    /// Verdict for an empty result set.
    pub fn no_results() -> Self {
        Self {
            confidence: 0.0,
            is_complete: false,
            gaps: vec!["No relevant results found for the query".to_string()],
        }
    }

    /// Whether the orchestrator may stop retrieving.
    pub fn is_sufficient(&self, threshold: f32) -> bool {
        self.is_complete && self.confidence >= threshold
    }
}

/// Caller-supplied context handed to planners and evaluators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_description: Option<String>,
    /// Earlier queries in the same session, oldest first
    #[serde(default)]
    pub previous_queries: Vec<String>,
}

impl QueryContext {
    /// Context describing the topic being searched.
    pub fn for_topic(topic: &Topic) -> Self {
        Self {
            topic_name: Some(topic.name.clone()),
            topic_description: topic.description.clone(),
            previous_queries: Vec::new(),
        }
    }
}

/// Outcome of an agentic query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgenticQueryResult {
    /// Deduplicated, re-ranked, at most ten
    pub final_results: Vec<SearchResult>,
    pub steps: Vec<AgenticSearchStep>,
    pub total_iterations: u32,
    pub query_plan: QueryPlan,
    /// Confidence of the final evaluation over all results
    pub confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_query_serializes_camel_case() {
        let sub = SubQuery::new("Information about X", "entity lookup", 5).with_dependencies(vec![0]);
        let json = serde_json::to_value(&sub).unwrap();

        assert_eq!(json["topK"], 5);
        assert_eq!(json["dependencies"], serde_json::json!([0]));
    }

    #[test]
    fn test_effective_top_k_defaults_zero() {
        assert_eq!(SubQuery::new("q", "r", 0).effective_top_k(), DEFAULT_TOP_K);
        assert_eq!(SubQuery::new("q", "r", 8).effective_top_k(), 8);
    }

    #[test]
    fn test_no_results_evaluation() {
        let evaluation = Evaluation::no_results();
        assert_eq!(evaluation.confidence, 0.0);
        assert!(!evaluation.is_complete);
        assert_eq!(evaluation.gaps.len(), 1);
        assert!(!evaluation.is_sufficient(0.0));
    }

    #[test]
    fn test_complexity_labels() {
        assert_eq!(
            serde_json::to_string(&Complexity::Moderate).unwrap(),
            "\"moderate\""
        );
        assert_eq!(serde_json::to_string(&PlanStrategy::Llm).unwrap(), "\"llm\"");
    }

    #[test]
    fn test_search_result_takes_document_name() {
        let chunk = Arc::new(Chunk {
            id: "c1".to_string(),
            document_id: "d1".to_string(),
            topic_id: "t1".to_string(),
            text: "text".to_string(),
            embedding: vec![1.0, 0.0],
            metadata: ChunkMetadata {
                document_name: "guide.md".to_string(),
                chunk_index: 0,
                start_position: 0,
                end_position: 4,
                heading_path: None,
                heading_level: None,
                section_title: None,
            },
        });

        let result = SearchResult::new(Arc::clone(&chunk), 0.5);
        assert_eq!(result.document_name, "guide.md");
        assert_eq!(result.rescored(0.9).similarity, 0.9);
        assert!(Arc::ptr_eq(&result.rescored(0.9).chunk, &chunk));
    }
}
