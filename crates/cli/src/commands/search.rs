//! Search command handler.
//!
//! Plain vector search against one topic.

use super::{open_store, preview, print_json, resolve_topic};
use clap::Args;
use scout_core::{config::AppConfig, AppResult};
use scout_retrieval::Orchestrator;

/// Plain vector search without planning
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Topic id or name
    pub topic: String,

    /// Query text
    pub query: String,

    /// Number of chunks to retrieve
    #[arg(short = 'k', long, default_value = "5")]
    pub top_k: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing search command for topic '{}'", self.topic);

        let (store, embedder) = open_store(config).await?;
        let topic = resolve_topic(&store, &self.topic).await?;

        let results = Orchestrator::new(store, embedder)
            .execute_simple_query(&topic.id, &self.query, self.top_k)
            .await?;
        tracing::debug!("Search returned {} results", results.len());

        if self.json {
            let output = serde_json::json!({
                "topic": topic.name,
                "query": self.query,
                "results": results,
            });
            print_json(&output)?;
        } else if results.is_empty() {
            println!("No results in topic '{}'", topic.name);
        } else {
            for (i, hit) in results.iter().enumerate() {
                println!(
                    "{:>2}. {:.3}  {}  {}",
                    i + 1,
                    hit.similarity,
                    hit.document_name,
                    preview(&hit.chunk.text, 160)
                );
            }
        }

        Ok(())
    }
}
