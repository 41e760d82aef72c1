//! On-disk record formats of the vector store.
//!
//! Layout under the store root:
//! - `index.json`: every topic's summary plus the last embedding model used
//! - `topics/<topicId>.json`: one topic with its documents and chunks

use crate::types::{Chunk, Document, Topic};
use chrono::{DateTime, Utc};
use scout_core::{AppError, AppResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Global index of topics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreIndex {
    pub topics: BTreeMap<String, Topic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl Default for StoreIndex {
    fn default() -> Self {
        Self {
            topics: BTreeMap::new(),
            embedding_model: None,
            last_updated: Utc::now(),
        }
    }
}

/// Everything persisted for one topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicRecord {
    pub topic: Topic,
    #[serde(default)]
    pub documents: BTreeMap<String, Document>,
    #[serde(default)]
    pub chunks: BTreeMap<String, Chunk>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl TopicRecord {
    pub fn new(topic: Topic) -> Self {
        Self {
            topic,
            documents: BTreeMap::new(),
            chunks: BTreeMap::new(),
            embedding_model: None,
            last_updated: Utc::now(),
        }
    }

    /// Embedding dimension shared by every stored chunk, if any are stored.
    pub fn dimension(&self) -> Option<usize> {
        self.chunks.values().next().map(|chunk| chunk.embedding.len())
    }

    pub fn touch(&mut self) {
        let now = Utc::now();
        self.topic.updated_at = now;
        self.last_updated = now;
    }
}

pub fn index_path(root: &Path) -> PathBuf {
    root.join("index.json")
}

pub fn topics_dir(root: &Path) -> PathBuf {
    root.join("topics")
}

/// Path of a topic record. Ids that could escape the topics directory are
/// rejected as unknown topics.
pub fn topic_path(root: &Path, topic_id: &str) -> AppResult<PathBuf> {
    let valid = !topic_id.is_empty()
        && topic_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if !valid {
        return Err(AppError::TopicNotFound(topic_id.to_string()));
    }

    Ok(topics_dir(root).join(format!("{}.json", topic_id)))
}

/// Read a JSON record; `None` when the file does not exist.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> AppResult<Option<T>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(AppError::Store(format!("Failed to read {:?}: {}", path, e)));
        }
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| AppError::Store(format!("Corrupt record {:?}: {}", path, e)))
}

/// Write a JSON record through a temporary file and rename.
pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            AppError::Store(format!("Failed to create directory {:?}: {}", parent, e))
        })?;
    }

    let json = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");

    tokio::fs::write(&tmp, json)
        .await
        .map_err(|e| AppError::Store(format!("Failed to write {:?}: {}", tmp, e)))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| AppError::Store(format!("Failed to replace {:?}: {}", path, e)))?;

    Ok(())
}

/// Remove a record; a missing file is not an error.
pub async fn remove_file(path: &Path) -> AppResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::Store(format!("Failed to remove {:?}: {}", path, e))),
    }
}
