//! Retrieval strategies.
//!
//! Every strategy maps `(topic_id, query, top_k)` to a ranked result list
//! using the shared [`VectorStore`] and [`EmbeddingProvider`]. The
//! orchestrator looks strategies up by name in a [`StrategyRegistry`].

pub mod hybrid;
pub mod mmr;
pub mod vector;

pub use hybrid::HybridStrategy;
pub use mmr::MmrStrategy;
pub use vector::VectorStrategy;

use crate::embeddings::EmbeddingProvider;
use crate::store::VectorStore;
use crate::types::SearchResult;
use async_trait::async_trait;
use scout_core::{AppError, AppResult};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, LazyLock};

/// A way of ranking a topic's chunks against a query.
#[async_trait]
pub trait RetrievalStrategy: Send + Sync {
    /// Registry key, also recorded in the step trace
    fn name(&self) -> &str;

    /// Ranked results, best first, at most `top_k`.
    async fn search(&self, topic_id: &str, query: &str, top_k: usize)
        -> AppResult<Vec<SearchResult>>;
}

/// Strategies available to the orchestrator, keyed by name.
pub struct StrategyRegistry {
    strategies: BTreeMap<String, Arc<dyn RetrievalStrategy>>,
}

impl StrategyRegistry {
    /// Empty registry.
    pub fn empty() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    /// Registry holding the built-in `vector`, `hybrid` and `mmr` strategies.
    pub fn with_defaults(store: Arc<VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(VectorStrategy::new(
            Arc::clone(&store),
            Arc::clone(&embedder),
        )));
        registry.register(Arc::new(HybridStrategy::new(
            Arc::clone(&store),
            Arc::clone(&embedder),
        )));
        registry.register(Arc::new(MmrStrategy::new(store, embedder)));
        registry
    }

    /// Add or replace a strategy under its own name.
    pub fn register(&mut self, strategy: Arc<dyn RetrievalStrategy>) {
        self.strategies.insert(strategy.name().to_string(), strategy);
    }

    pub fn get(&self, name: &str) -> AppResult<Arc<dyn RetrievalStrategy>> {
        self.strategies
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::UnknownStrategy(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.keys().map(String::as_str).collect()
    }
}

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        // articles and determiners
        "the", "and", "but", "nor", "yet", "this", "that", "these", "those", "its", "any", "all",
        // auxiliary verbs
        "are", "was", "were", "been", "being", "have", "has", "had", "does", "did", "can",
        "could", "should", "would", "will", "shall", "may", "might", "must",
        // prepositions
        "for", "from", "with", "into", "onto", "about", "over", "under", "between", "through",
        "during", "before", "after", "than", "via", "per", "off", "out",
        // wh-words
        "what", "when", "where", "which", "who", "whom", "whose", "why", "how",
    ]
    .into_iter()
    .collect()
});

/// Lowercase whitespace-separated words of `text` with punctuation removed.
///
/// Punctuation inside a word is dropped rather than split on, so
/// "write-ahead" becomes "writeahead" and "don't" becomes "dont".
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|w| w.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Distinct query keywords in first-seen order.
///
/// Tokens of two characters or fewer and stop words are dropped.
pub fn extract_keywords(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(query)
        .into_iter()
        .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w.as_str()))
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Whole-word keyword overlap between `keywords` and `text`, in [0, 1].
///
/// Each occurrence of a keyword is weighted by `ln(len + 1)`; the summed
/// weight is normalized by `ln(10 * keywords + 1)` and capped at 1.
pub fn keyword_score(keywords: &[String], text: &str) -> f32 {
    if keywords.is_empty() {
        return 0.0;
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for token in tokenize(text) {
        *counts.entry(token).or_insert(0) += 1;
    }

    let match_weight: f32 = keywords
        .iter()
        .map(|kw| {
            let occurrences = counts.get(kw).copied().unwrap_or(0) as f32;
            occurrences * (kw.chars().count() as f32 + 1.0).ln()
        })
        .sum();

    if match_weight <= 0.0 {
        return 0.0;
    }

    let normalizer = (10.0 * keywords.len() as f32 + 1.0).ln();
    ((match_weight + 1.0).ln() / normalizer).min(1.0)
}

/// Stable descending sort by similarity.
pub(crate) fn sort_by_similarity(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
