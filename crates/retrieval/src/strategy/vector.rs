//! Plain nearest-neighbour retrieval.

use super::RetrievalStrategy;
use crate::embeddings::EmbeddingProvider;
use crate::store::VectorStore;
use crate::types::SearchResult;
use async_trait::async_trait;
use scout_core::AppResult;
use std::sync::Arc;

/// Embeds the query and returns the store's cosine ranking unchanged.
pub struct VectorStrategy {
    store: Arc<VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl VectorStrategy {
    pub fn new(store: Arc<VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }
}

#[async_trait]
impl RetrievalStrategy for VectorStrategy {
    fn name(&self) -> &str {
        "vector"
    }

    async fn search(
        &self,
        topic_id: &str,
        query: &str,
        top_k: usize,
    ) -> AppResult<Vec<SearchResult>> {
        let embedding = self.embedder.embed(query).await?;
        self.store.search(topic_id, &embedding, top_k).await
    }
}
