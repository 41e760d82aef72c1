//! Topics command handler.

use super::{open_store, print_json};
use clap::Args;
use futures::future::try_join_all;
use scout_core::{config::AppConfig, AppResult};

/// List topics in the store
#[derive(Args, Debug)]
pub struct TopicsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl TopicsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing topics command");

        let (store, _) = open_store(config).await?;
        let topics = store.list_topics().await;

        let counts =
            try_join_all(topics.iter().map(|topic| store.topic_chunk_count(&topic.id))).await?;
        let rows: Vec<_> = topics.iter().zip(counts).collect();

        if self.json {
            let output: Vec<serde_json::Value> = rows
                .iter()
                .map(|(topic, chunks)| {
                    serde_json::json!({
                        "id": topic.id,
                        "name": topic.name,
                        "description": topic.description,
                        "documentCount": topic.document_count,
                        "chunkCount": chunks,
                        "updatedAt": topic.updated_at,
                    })
                })
                .collect();
            print_json(&serde_json::Value::Array(output))?;
        } else if rows.is_empty() {
            println!("No topics in {}", store.root().display());
        } else {
            for (topic, chunks) in rows {
                println!(
                    "{}  {}  ({} documents, {} chunks)",
                    topic.id, topic.name, topic.document_count, chunks
                );
                if let Some(description) = &topic.description {
                    println!("    {}", description);
                }
            }
        }

        Ok(())
    }
}
