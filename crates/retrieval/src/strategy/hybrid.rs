//! Vector retrieval re-ranked with keyword overlap.

use super::{extract_keywords, keyword_score, sort_by_similarity, RetrievalStrategy};
use crate::embeddings::EmbeddingProvider;
use crate::store::VectorStore;
use crate::types::SearchResult;
use async_trait::async_trait;
use scout_core::AppResult;
use std::sync::Arc;

pub const VECTOR_WEIGHT: f32 = 0.7;
pub const KEYWORD_WEIGHT: f32 = 0.3;

/// Weighted blend of vector similarity and keyword score.
pub fn blend(vector_similarity: f32, keyword_score: f32) -> f32 {
    VECTOR_WEIGHT * vector_similarity + KEYWORD_WEIGHT * keyword_score
}

/// Fetches `2 * top_k` vector candidates and re-ranks them by
/// [`blend`]ed score.
pub struct HybridStrategy {
    store: Arc<VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl HybridStrategy {
    pub fn new(store: Arc<VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }
}

#[async_trait]
impl RetrievalStrategy for HybridStrategy {
    fn name(&self) -> &str {
        "hybrid"
    }

    async fn search(
        &self,
        topic_id: &str,
        query: &str,
        top_k: usize,
    ) -> AppResult<Vec<SearchResult>> {
        let embedding = self.embedder.embed(query).await?;
        let candidates = self
            .store
            .search(topic_id, &embedding, top_k.saturating_mul(2))
            .await?;

        let keywords = extract_keywords(query);
        tracing::debug!(
            "Hybrid search: {} candidates, keywords {:?}",
            candidates.len(),
            keywords
        );

        let mut results: Vec<SearchResult> = candidates
            .iter()
            .map(|candidate| {
                let score = blend(
                    candidate.similarity,
                    keyword_score(&keywords, &candidate.chunk.text),
                );
                candidate.rescored(score)
            })
            .collect();

        sort_by_similarity(&mut results);
        results.truncate(top_k);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::{open_store, seed_topic, StubEmbedder};

    #[test]
    fn test_blend_weights() {
        assert!((blend(0.8, 0.5) - 0.71).abs() < 1e-6);
        assert!((blend(1.0, 1.0) - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_keyword_match_outranks_closer_vector() {
        let (_temp, store) = open_store().await;
        let topic = seed_topic(
            &store,
            &[
                ("c1", "Unrelated words about cooking", vec![1.0, 0.0]),
                ("c2", "Rust ownership explained", vec![0.8, 0.6]),
            ],
        )
        .await;
        let embedder = StubEmbedder::new(2).with("rust ownership", vec![1.0, 0.0]);
        let strategy = HybridStrategy::new(store, Arc::new(embedder));

        let results = strategy.search(&topic.id, "rust ownership", 2).await.unwrap();

        assert_eq!(results[0].chunk.id, "c2");
        assert_eq!(results[1].chunk.id, "c1");
        // no keyword hits leaves only the weighted vector part
        assert!((results[1].similarity - 0.7).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_truncates_to_top_k() {
        let (_temp, store) = open_store().await;
        let topic = seed_topic(
            &store,
            &[
                ("c1", "alpha", vec![1.0, 0.0]),
                ("c2", "beta", vec![0.7, 0.7]),
                ("c3", "gamma", vec![0.0, 1.0]),
            ],
        )
        .await;
        let strategy = HybridStrategy::new(store, Arc::new(StubEmbedder::new(2)));

        let results = strategy.search(&topic.id, "alpha", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.id, "c1");
    }
}
