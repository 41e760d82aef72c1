//! Error types for Scout.
//!
//! A single error enum covers every component of the retrieval pipeline so
//! that a failure always names the part of the system it came from.

use thiserror::Error;

/// Unified error type for Scout.
///
/// Library functions return `Result<T, AppError>` and never panic on bad
/// input; errors are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector store errors
    #[error("Vector store error: {0}")]
    Store(String),

    /// The requested topic does not exist in the vector store
    #[error("Vector store error: topic '{0}' not found")]
    TopicNotFound(String),

    /// Query and chunk embeddings disagree on dimension
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A topic was embedded with a different model than the one in use
    #[error("Embedding model mismatch: topic uses '{stored}', current model is '{requested}'")]
    ModelMismatch { stored: String, requested: String },

    /// No retrieval strategy is registered under this name
    #[error("Retrieval error: unknown strategy '{0}'")]
    UnknownStrategy(String),

    /// Query planner errors
    #[error("Planner error: {0}")]
    Planner(String),

    /// Result evaluator errors
    #[error("Evaluator error: {0}")]
    Evaluator(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
