//! Query command handler.
//!
//! Runs an agentic query: plan, retrieve, evaluate and refine.

use super::{open_store, preview, print_json, resolve_topic};
use clap::Args;
use scout_core::{config::AppConfig, AgenticConfig, AppResult};
use scout_llm::create_client;
use scout_retrieval::{AgenticQueryResult, Orchestrator};

const PREVIEW_CHARS: usize = 160;

/// Plan, retrieve, evaluate and refine a query
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// Topic id or name
    pub topic: String,

    /// Query text
    pub query: String,

    /// Maximum number of retrievals
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Confidence at which retrieval stops early (0.0 - 1.0)
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Retrieval strategy (vector, hybrid, mmr)
    #[arg(long)]
    pub strategy: Option<String>,

    /// Run the query as a single sub-query
    #[arg(long)]
    pub no_decompose: bool,

    /// Skip follow-up queries for evaluation gaps
    #[arg(long)]
    pub no_refine: bool,

    /// Use the configured LLM for planning and evaluation
    #[arg(long)]
    pub llm: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryCommand {
    /// Command flags layered over the configured retrieval settings.
    fn agentic_config(&self, base: &AgenticConfig) -> AgenticConfig {
        let mut config = base.clone();

        if let Some(max_iterations) = self.max_iterations {
            config.max_iterations = max_iterations;
        }
        if let Some(threshold) = self.threshold {
            config.confidence_threshold = threshold;
        }
        if let Some(strategy) = &self.strategy {
            config.retrieval_strategy = strategy.clone();
        }
        if self.no_decompose {
            config.enable_query_decomposition = false;
        }
        if self.no_refine {
            config.enable_iterative_refinement = false;
        }
        if self.llm {
            config.use_llm = true;
        }

        config
    }

    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing query command for topic '{}'", self.topic);

        let agentic = self.agentic_config(&config.retrieval);
        agentic.validate()?;
        tracing::debug!("Retrieval settings: {:?}", agentic);

        let (store, embedder) = open_store(config).await?;
        let topic = resolve_topic(&store, &self.topic).await?;

        let mut orchestrator = Orchestrator::new(store, embedder);
        if agentic.use_llm {
            let client = create_client(&config.llm)?;
            if client.is_available().await {
                orchestrator = orchestrator.with_llm(client, config.llm.model.clone())?;
            } else {
                tracing::warn!(
                    "LLM provider '{}' is not reachable, continuing with heuristics",
                    config.llm.provider
                );
            }
        }

        let result = orchestrator
            .execute_agentic_query(&topic.id, &self.query, &agentic, None)
            .await?;

        if self.json {
            print_json(&serde_json::to_value(&result)?)?;
        } else {
            print_report(&topic.name, &result);
        }

        Ok(())
    }
}

fn print_report(topic_name: &str, result: &AgenticQueryResult) {
    let plan = &result.query_plan;
    println!(
        "Plan: {:?} ({:?}, {} sub-queries) on topic '{}'",
        plan.strategy,
        plan.complexity,
        plan.sub_queries.len(),
        topic_name
    );
    println!();

    println!("Steps:");
    for step in &result.steps {
        println!(
            "  {}. [{}] {} -> {} results, confidence {:.2}",
            step.step_number, step.strategy, step.query, step.results_count, step.confidence
        );
        if !step.reasoning.is_empty() {
            println!("     {}", step.reasoning);
        }
    }
    println!();

    if result.final_results.is_empty() {
        println!("Results: (none)");
    } else {
        println!("Results:");
        for (i, hit) in result.final_results.iter().enumerate() {
            println!(
                "  {:>2}. {:.3}  {}  {}",
                i + 1,
                hit.similarity,
                hit.document_name,
                preview(&hit.chunk.text, PREVIEW_CHARS)
            );
        }
    }
    println!();

    println!(
        "Confidence: {:.2} after {} iterations",
        result.confidence, result.total_iterations
    );
}
