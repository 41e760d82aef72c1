//! LLM integration crate for Scout.
//!
//! Provides a provider-agnostic completion client used by the LLM-backed
//! query planner and result evaluator.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//!
//! # Example
//! ```no_run
//! use scout_llm::{LlmClient, LlmRequest, OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! if client.is_available().await {
//!     let request = LlmRequest::new("Split this question into parts", "llama3.2");
//!     let response = client.complete(&request).await?;
//!     println!("{}", response.content);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::OllamaClient;
