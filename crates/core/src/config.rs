//! Configuration management for Scout.
//!
//! Configuration is layered, later sources winning:
//! - Built-in defaults
//! - Config file (`.scout/config.yaml` in the workspace, or `SCOUT_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! The workspace holds all persistent state under `.scout/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Name of the per-workspace state directory.
pub const SCOUT_DIR: &str = ".scout";

/// Options recognized by the agentic query pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgenticConfig {
    /// Hard cap on retrievals (planned sub-queries plus follow-ups)
    pub max_iterations: u32,

    /// Minimum evaluator confidence at which results are considered sufficient
    pub confidence_threshold: f32,

    /// Decompose the query into sub-queries before retrieval
    pub enable_query_decomposition: bool,

    /// Issue follow-up queries when an evaluation reports gaps
    pub enable_iterative_refinement: bool,

    /// Retrieval strategy name ("vector", "hybrid", "mmr")
    pub retrieval_strategy: String,

    /// Prefer the LLM-backed planner and evaluator when available
    #[serde(rename = "useLLM")]
    pub use_llm: bool,
}

impl Default for AgenticConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            confidence_threshold: 0.7,
            enable_query_decomposition: true,
            enable_iterative_refinement: true,
            retrieval_strategy: "hybrid".to_string(),
            use_llm: false,
        }
    }
}

impl AgenticConfig {
    /// Reject option combinations the orchestrator cannot honor.
    pub fn validate(&self) -> AppResult<()> {
        if self.max_iterations == 0 {
            return Err(AppError::Config(
                "maxIterations must be at least 1".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(AppError::Config(format!(
                "confidenceThreshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }

        if self.retrieval_strategy.trim().is_empty() {
            return Err(AppError::Config(
                "retrievalStrategy must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Embedding provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram" or "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Custom endpoint for HTTP providers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
        }
    }
}

/// LLM settings for the LLM-backed planner and evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmSettings {
    /// Provider name (currently "ollama")
    pub provider: String,

    /// Completion model identifier
    pub model: String,

    /// Custom endpoint URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Request timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            endpoint: None,
            timeout_secs: None,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .scout/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Log line format ("pretty" or "json")
    pub log_format: String,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Agentic retrieval options
    pub retrieval: AgenticConfig,

    /// Embedding provider settings
    pub embedding: EmbeddingConfig,

    /// LLM settings
    pub llm: LlmSettings,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    workspace: Option<WorkspaceSection>,
    logging: Option<LoggingSection>,
    retrieval: Option<AgenticConfig>,
    embedding: Option<EmbeddingConfig>,
    llm: Option<LlmSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
    format: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            log_format: "pretty".to_string(),
            verbose: false,
            no_color: false,
            retrieval: AgenticConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file, and the environment.
    ///
    /// Environment variables:
    /// - `SCOUT_WORKSPACE`: Override workspace path
    /// - `SCOUT_CONFIG`: Path to config file
    /// - `SCOUT_LLM_MODEL`: LLM model identifier
    /// - `SCOUT_USE_LLM`: Prefer the LLM planner/evaluator ("1"/"true")
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], with an explicit workspace and config file
    /// taking precedence over `SCOUT_WORKSPACE` and `SCOUT_CONFIG`.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) =
            workspace.or_else(|| std::env::var("SCOUT_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        if let Some(config_file) =
            config_file.or_else(|| std::env::var("SCOUT_CONFIG").ok().map(PathBuf::from))
        {
            config.config_file = Some(config_file);
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.scout_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(model) = std::env::var("SCOUT_LLM_MODEL") {
            config.llm.model = model;
        }

        if let Ok(use_llm) = std::env::var("SCOUT_USE_LLM") {
            config.retrieval.use_llm = parse_flag(&use_llm);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        tracing::debug!("Merging config file {:?}", path);
        Ok(self.merge_file(file))
    }

    fn merge_file(mut self, file: ConfigFile) -> Self {
        if let Some(path) = file.workspace.and_then(|ws| ws.path) {
            self.workspace = PathBuf::from(path);
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
            if let Some(format) = logging.format {
                self.log_format = format;
            }
        }

        if let Some(retrieval) = file.retrieval {
            self.retrieval = retrieval;
        }

        if let Some(embedding) = file.embedding {
            self.embedding = embedding;
        }

        if let Some(llm) = file.llm {
            self.llm = llm;
        }

        self
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over the file and environment.
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .scout directory.
    pub fn scout_dir(&self) -> PathBuf {
        self.workspace.join(SCOUT_DIR)
    }

    /// Root directory of the persisted vector store.
    pub fn store_dir(&self) -> PathBuf {
        self.scout_dir().join("store")
    }

    /// Ensure the .scout directory exists.
    pub fn ensure_scout_dir(&self) -> AppResult<()> {
        let dir = self.scout_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", SCOUT_DIR, e))
            })?;
        }
        Ok(())
    }

    /// Validate the assembled configuration.
    pub fn validate(&self) -> AppResult<()> {
        self.retrieval.validate()?;

        let known_embedders = ["trigram", "ollama"];
        if !known_embedders.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                known_embedders.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }

        let known_llms = ["ollama"];
        if !known_llms.contains(&self.llm.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown LLM provider: {}. Supported: {}",
                self.llm.provider,
                known_llms.join(", ")
            )));
        }

        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
