//! Maximal marginal relevance selection.

use super::RetrievalStrategy;
use crate::embeddings::EmbeddingProvider;
use crate::similarity::cosine_similarity;
use crate::store::VectorStore;
use crate::types::SearchResult;
use async_trait::async_trait;
use scout_core::AppResult;
use std::sync::Arc;

/// Trade-off between relevance (1.0) and diversity (0.0).
pub const LAMBDA: f32 = 0.5;

/// Greedily picks results that are relevant to the query but dissimilar to
/// what has already been picked, from a pool of `3 * top_k` candidates.
pub struct MmrStrategy {
    store: Arc<VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    lambda: f32,
}

impl MmrStrategy {
    pub fn new(store: Arc<VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            embedder,
            lambda: LAMBDA,
        }
    }
}

/// MMR selection over candidates sorted by relevance, best first.
///
/// Ties go to the earlier candidate in pool order.
pub fn select_diverse(
    mut pool: Vec<SearchResult>,
    top_k: usize,
    lambda: f32,
) -> AppResult<Vec<SearchResult>> {
    let mut selected: Vec<SearchResult> = Vec::with_capacity(top_k.min(pool.len()));
    if pool.is_empty() || top_k == 0 {
        return Ok(selected);
    }

    selected.push(pool.remove(0));

    while selected.len() < top_k && !pool.is_empty() {
        let mut best: Option<(usize, f32)> = None;

        for (i, candidate) in pool.iter().enumerate() {
            let mut redundancy = f32::NEG_INFINITY;
            for chosen in &selected {
                let sim = cosine_similarity(&candidate.chunk.embedding, &chosen.chunk.embedding)?;
                redundancy = redundancy.max(sim);
            }

            let score = lambda * candidate.similarity - (1.0 - lambda) * redundancy;
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((i, score));
            }
        }

        match best {
            Some((i, _)) => selected.push(pool.remove(i)),
            None => break,
        }
    }

    Ok(selected)
}

#[async_trait]
impl RetrievalStrategy for MmrStrategy {
    fn name(&self) -> &str {
        "mmr"
    }

    async fn search(
        &self,
        topic_id: &str,
        query: &str,
        top_k: usize,
    ) -> AppResult<Vec<SearchResult>> {
        let embedding = self.embedder.embed(query).await?;
        let pool = self
            .store
            .search(topic_id, &embedding, top_k.saturating_mul(3))
            .await?;

        tracing::debug!("MMR selecting {} of {} candidates", top_k, pool.len());
        select_diverse(pool, top_k, self.lambda)
    }
}
