//! Command handlers for the Scout CLI.
//!
//! This module organizes all CLI commands into separate submodules, plus the
//! store and embedder setup they share.

pub mod query;
pub mod search;
pub mod topics;

pub use query::QueryCommand;
pub use search::SearchCommand;
pub use topics::TopicsCommand;

use scout_core::{config::AppConfig, AppError, AppResult};
use scout_retrieval::{create_provider, EmbeddingProvider, Topic, VectorStore};
use std::sync::Arc;

/// Open the workspace store and the configured embedder.
///
/// A store built with another embedding model is still opened; the mismatch
/// is logged so that poor rankings can be traced back to it.
pub(crate) async fn open_store(
    config: &AppConfig,
) -> AppResult<(Arc<VectorStore>, Arc<dyn EmbeddingProvider>)> {
    let store = Arc::new(VectorStore::open(config.store_dir()).await?);
    let embedder = create_provider(&config.embedding)?;

    if let Some(mismatch) = store
        .check_model_compatibility(embedder.model_name())
        .await
    {
        tracing::warn!(
            "Store was built with embedding model '{}' but '{}' is configured",
            mismatch.stored,
            mismatch.requested
        );
    }

    Ok((store, embedder))
}

/// Find a topic by id, falling back to an exact name match.
pub(crate) async fn resolve_topic(store: &VectorStore, key: &str) -> AppResult<Topic> {
    match store.get_topic(key).await {
        Ok(topic) => Ok(topic),
        Err(AppError::TopicNotFound(_)) => store
            .list_topics()
            .await
            .into_iter()
            .find(|t| t.name == key)
            .ok_or_else(|| AppError::TopicNotFound(key.to_string())),
        Err(e) => Err(e),
    }
}

pub(crate) fn print_json(value: &serde_json::Value) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Single-line preview of chunk text.
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    }
}
