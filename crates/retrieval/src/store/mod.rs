//! Topic-scoped vector store.
//!
//! Chunks are persisted per topic and searched by brute-force cosine
//! similarity. Each topic's chunk set is loaded once into an immutable
//! snapshot and shared through `Arc`, so concurrent queries never observe a
//! half-applied mutation. Mutations are serialized store-wide and replace the
//! cached snapshot of the topic they touch.

pub mod record;

use crate::similarity::cosine_similarity;
use crate::types::{Chunk, Document, SearchResult, Topic};
use chrono::Utc;
use record::{StoreIndex, TopicRecord};
use scout_core::{AppError, AppResult};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Immutable in-memory view of one topic's chunks.
#[derive(Debug)]
pub struct TopicSnapshot {
    pub topic: Topic,
    pub chunks: Vec<Arc<Chunk>>,
    pub embedding_model: Option<String>,
}

impl TopicSnapshot {
    fn from_record(record: TopicRecord) -> Self {
        Self {
            topic: record.topic,
            chunks: record.chunks.into_values().map(Arc::new).collect(),
            embedding_model: record.embedding_model,
        }
    }

    /// Embedding dimension of this topic, if it holds any chunks.
    pub fn dimension(&self) -> Option<usize> {
        self.chunks.first().map(|chunk| chunk.embedding.len())
    }
}

/// Reported when the active embedding model differs from the stored one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelMismatch {
    pub stored: String,
    pub requested: String,
}

/// Persistent, topic-scoped chunk store.
pub struct VectorStore {
    root: PathBuf,
    index: RwLock<StoreIndex>,
    cache: RwLock<HashMap<String, Arc<TopicSnapshot>>>,
    /// Bumped whenever a cached snapshot is replaced or dropped
    generation: AtomicU64,
    write_lock: Mutex<()>,
}

impl VectorStore {
    /// Open (or initialize) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> AppResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(record::topics_dir(&root))
            .await
            .map_err(|e| AppError::Store(format!("Failed to create store at {:?}: {}", root, e)))?;

        let index = record::read_json::<StoreIndex>(&record::index_path(&root))
            .await?
            .unwrap_or_default();

        tracing::debug!(
            "Opened vector store at {:?} with {} topics",
            root,
            index.topics.len()
        );

        Ok(Self {
            root,
            index: RwLock::new(index),
            cache: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All topics, ordered by name.
    pub async fn list_topics(&self) -> Vec<Topic> {
        let index = self.index.read().await;
        let mut topics: Vec<Topic> = index.topics.values().cloned().collect();
        topics.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        topics
    }

    pub async fn get_topic(&self, topic_id: &str) -> AppResult<Topic> {
        self.index
            .read()
            .await
            .topics
            .get(topic_id)
            .cloned()
            .ok_or_else(|| AppError::TopicNotFound(topic_id.to_string()))
    }

    /// Embedding model recorded by the most recent mutation.
    pub async fn embedding_model(&self) -> Option<String> {
        self.index.read().await.embedding_model.clone()
    }

    /// Create an empty topic.
    pub async fn create_topic(
        &self,
        name: impl Into<String>,
        description: Option<String>,
    ) -> AppResult<Topic> {
        let _guard = self.write_lock.lock().await;

        let topic = Topic::new(name, description);
        let record = TopicRecord::new(topic.clone());
        record::write_json(&record::topic_path(&self.root, &topic.id)?, &record).await?;

        self.update_index(|index| {
            index.topics.insert(topic.id.clone(), topic.clone());
        })
        .await?;

        tracing::info!("Created topic '{}' ({})", topic.name, topic.id);
        Ok(topic)
    }

    /// Delete a topic with all its documents and chunks.
    pub async fn delete_topic(&self, topic_id: &str) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;

        self.get_topic(topic_id).await?;
        record::remove_file(&record::topic_path(&self.root, topic_id)?).await?;
        self.invalidate(topic_id).await;

        self.update_index(|index| {
            index.topics.remove(topic_id);
        })
        .await?;

        tracing::info!("Deleted topic {}", topic_id);
        Ok(())
    }

    /// Add a document and its embedded chunks to a topic.
    ///
    /// Re-adding an existing document id replaces its chunks. Fails when the
    /// chunk embeddings disagree with the topic's dimension, or when the topic
    /// already holds chunks embedded by a different model.
    pub async fn add_document(
        &self,
        topic_id: &str,
        mut document: Document,
        chunks: Vec<Chunk>,
        model_name: &str,
    ) -> AppResult<Document> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load_record(topic_id).await?;

        if !record.chunks.is_empty() {
            if let Some(stored) = record.embedding_model.as_deref() {
                if stored != model_name {
                    return Err(AppError::ModelMismatch {
                        stored: stored.to_string(),
                        requested: model_name.to_string(),
                    });
                }
            }
        }

        let replaced = record.documents.contains_key(&document.id);
        if replaced {
            record
                .chunks
                .retain(|_, chunk| chunk.document_id != document.id);
        }

        let mut incoming = HashSet::new();
        for chunk in &chunks {
            if !incoming.insert(chunk.id.as_str()) {
                return Err(AppError::Store(format!(
                    "Chunk id '{}' appears twice in document '{}'",
                    chunk.id, document.id
                )));
            }
            if let Some(owner) = record.chunks.get(&chunk.id) {
                return Err(AppError::Store(format!(
                    "Chunk id '{}' already belongs to document '{}' in topic {}",
                    chunk.id, owner.document_id, topic_id
                )));
            }
        }

        let expected = record
            .dimension()
            .or_else(|| chunks.first().map(|chunk| chunk.embedding.len()));
        if let Some(expected) = expected {
            if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != expected) {
                return Err(AppError::DimensionMismatch {
                    expected,
                    actual: bad.embedding.len(),
                });
            }
        }

        document.topic_id = topic_id.to_string();
        document.chunk_count = chunks.len() as u32;

        for mut chunk in chunks {
            chunk.topic_id = topic_id.to_string();
            chunk.document_id = document.id.clone();
            record.chunks.insert(chunk.id.clone(), chunk);
        }

        record.documents.insert(document.id.clone(), document.clone());
        if !replaced {
            record.topic.document_count += 1;
        }
        record.embedding_model = Some(model_name.to_string());
        record.touch();

        self.commit_record(record, Some(model_name)).await?;

        tracing::info!(
            "Added document '{}' ({} chunks) to topic {}",
            document.name,
            document.chunk_count,
            topic_id
        );
        Ok(document)
    }

    /// Remove a document and its chunks from a topic.
    pub async fn delete_document(&self, topic_id: &str, document_id: &str) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load_record(topic_id).await?;

        if record.documents.remove(document_id).is_none() {
            return Err(AppError::Store(format!(
                "Document '{}' not found in topic {}",
                document_id, topic_id
            )));
        }

        record.chunks.retain(|_, chunk| chunk.document_id != document_id);
        record.topic.document_count = record.topic.document_count.saturating_sub(1);
        record.touch();

        self.commit_record(record, None).await?;

        tracing::info!("Deleted document {} from topic {}", document_id, topic_id);
        Ok(())
    }

    /// Rank a topic's chunks by cosine similarity to `query_embedding`.
    ///
    /// Returns at most `top_k` results, best first. An empty topic yields an
    /// empty list; a dimension mismatch is an error.
    pub async fn search(
        &self,
        topic_id: &str,
        query_embedding: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<SearchResult>> {
        let snapshot = self.snapshot(topic_id).await?;

        if snapshot.chunks.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let mut results = snapshot
            .chunks
            .iter()
            .map(|chunk| {
                cosine_similarity(&chunk.embedding, query_embedding)
                    .map(|score| SearchResult::new(Arc::clone(chunk), score))
            })
            .collect::<AppResult<Vec<_>>>()?;

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);

        tracing::debug!(
            "Vector search in topic {} returned {} of {} chunks",
            topic_id,
            results.len(),
            snapshot.chunks.len()
        );

        Ok(results)
    }

    /// Number of chunks stored for a topic.
    pub async fn topic_chunk_count(&self, topic_id: &str) -> AppResult<usize> {
        Ok(self.snapshot(topic_id).await?.chunks.len())
    }

    /// Compare `model_name` with the model recorded in the index.
    ///
    /// Only reports; resolving a mismatch (re-embedding) is up to the caller.
    pub async fn check_model_compatibility(&self, model_name: &str) -> Option<ModelMismatch> {
        let index = self.index.read().await;
        let has_documents = index.topics.values().any(|t| t.document_count > 0);

        match index.embedding_model.as_deref() {
            Some(stored) if has_documents && stored != model_name => Some(ModelMismatch {
                stored: stored.to_string(),
                requested: model_name.to_string(),
            }),
            _ => None,
        }
    }

    /// Drop a topic's cached snapshot; the next read reloads it from disk.
    pub async fn invalidate(&self, topic_id: &str) {
        let mut cache = self.cache.write().await;
        cache.remove(topic_id);
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Cached snapshot of a topic, loading it on first use.
    pub async fn snapshot(&self, topic_id: &str) -> AppResult<Arc<TopicSnapshot>> {
        if let Some(snapshot) = self.cache.read().await.get(topic_id) {
            return Ok(Arc::clone(snapshot));
        }

        // Disk reads happen without the cache lock; a snapshot loaded while a
        // mutation swapped the cache is returned but not kept
        let generation = self.generation.load(Ordering::Acquire);
        let record = self.load_record(topic_id).await?;
        let snapshot = Arc::new(TopicSnapshot::from_record(record));

        let mut cache = self.cache.write().await;
        if let Some(current) = cache.get(topic_id) {
            return Ok(Arc::clone(current));
        }
        if self.generation.load(Ordering::Acquire) == generation {
            tracing::debug!(
                "Loaded topic {} into cache ({} chunks)",
                topic_id,
                snapshot.chunks.len()
            );
            cache.insert(topic_id.to_string(), Arc::clone(&snapshot));
        }

        Ok(snapshot)
    }

    async fn load_record(&self, topic_id: &str) -> AppResult<TopicRecord> {
        let path = record::topic_path(&self.root, topic_id)?;
        record::read_json::<TopicRecord>(&path)
            .await?
            .ok_or_else(|| AppError::TopicNotFound(topic_id.to_string()))
    }

    /// Persist a mutated topic record, refresh the index and swap the snapshot.
    async fn commit_record(&self, record: TopicRecord, model_name: Option<&str>) -> AppResult<()> {
        let topic_id = record.topic.id.clone();
        record::write_json(&record::topic_path(&self.root, &topic_id)?, &record).await?;

        let topic = record.topic.clone();
        self.update_index(|index| {
            index.topics.insert(topic.id.clone(), topic);
            if let Some(model) = model_name {
                index.embedding_model = Some(model.to_string());
            }
        })
        .await?;

        let snapshot = Arc::new(TopicSnapshot::from_record(record));
        let mut cache = self.cache.write().await;
        cache.insert(topic_id, snapshot);
        self.generation.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn update_index<F>(&self, mutate: F) -> AppResult<()>
    where
        F: FnOnce(&mut StoreIndex),
    {
        let mut index = self.index.write().await;
        mutate(&mut index);
        index.last_updated = Utc::now();
        record::write_json(&record::index_path(&self.root), &*index).await
    }
}
