//! Embedding providers.
//!
//! Strategies turn query text into vectors through [`EmbeddingProvider`]; the
//! concrete provider is chosen once from configuration by the host.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
