//! Scout Core Library
//!
//! This crate provides the foundational utilities shared by the Scout crates:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management (workspace, retrieval, embedding, LLM settings)

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AgenticConfig, AppConfig, EmbeddingConfig, LlmSettings};
pub use error::{AppError, AppResult};
