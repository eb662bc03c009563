use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_OLLAMA_BASE_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_OPENAI_MODEL: &str = "mixtral-8x7b-32768";
const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";

const DEFAULT_CHUNK_SIZE: usize = 3000;
const DEFAULT_CHUNK_OVERLAP: usize = 200;
const DEFAULT_REDUCE_THRESHOLD: usize = 3000;
const DEFAULT_MAX_CONCURRENCY: usize = 4;
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Rusty Digest server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Remote LLM backend used to summarize chunks.
    pub summarization_provider: SummarizationProvider,
    /// Model identifier passed to the provider.
    pub summarization_model: String,
    /// Base URL of the provider API.
    pub summarization_base_url: String,
    /// Bearer token for OpenAI-compatible providers.
    pub summarization_api_key: Option<String>,
    /// Language the summaries are written in.
    pub summary_language: String,
    /// Maximum number of characters per chunk.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
    /// Intermediate length above which a reduction pass runs.
    pub reduce_threshold: usize,
    /// Maximum number of remote calls in flight for one document.
    pub max_concurrency: usize,
    /// Deadline applied to every remote call, in seconds.
    pub call_timeout_secs: u64,
    /// Upper bound for uploaded request bodies.
    pub max_upload_bytes: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported summarization backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarizationProvider {
    /// OpenAI-compatible chat completions API (Groq, OpenAI, vLLM, ...).
    OpenAI,
    /// Local Ollama runtime.
    Ollama,
}

impl SummarizationProvider {
    fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAI => DEFAULT_OPENAI_BASE_URL,
            Self::Ollama => DEFAULT_OLLAMA_BASE_URL,
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            Self::OpenAI => DEFAULT_OPENAI_MODEL,
            Self::Ollama => DEFAULT_OLLAMA_MODEL,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let summarization_provider = match load_env_optional("SUMMARIZATION_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("SUMMARIZATION_PROVIDER".to_string()))?,
            None => SummarizationProvider::OpenAI,
        };
        let summarization_api_key = load_env_optional("SUMMARIZATION_API_KEY")
            .or_else(|| load_env_optional("GROQ_API_KEY"));
        if summarization_provider == SummarizationProvider::OpenAI
            && summarization_api_key.is_none()
        {
            return Err(ConfigError::MissingVariable(
                "SUMMARIZATION_API_KEY".to_string(),
            ));
        }

        let config = Self {
            summarization_provider,
            summarization_model: load_env_optional("SUMMARIZATION_MODEL")
                .unwrap_or_else(|| summarization_provider.default_model().to_string()),
            summarization_base_url: load_env_optional("SUMMARIZATION_BASE_URL")
                .unwrap_or_else(|| summarization_provider.default_base_url().to_string()),
            summarization_api_key,
            summary_language: load_env_optional("SUMMARY_LANGUAGE")
                .unwrap_or_else(|| "Spanish".to_string()),
            chunk_size: parse_env_or("CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            chunk_overlap: parse_env_or("CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?,
            reduce_threshold: parse_env_or("REDUCE_THRESHOLD", DEFAULT_REDUCE_THRESHOLD)?,
            max_concurrency: parse_env_or("SUMMARY_MAX_CONCURRENCY", DEFAULT_MAX_CONCURRENCY)?,
            call_timeout_secs: parse_env_or("SUMMARY_CALL_TIMEOUT_SECS", DEFAULT_CALL_TIMEOUT_SECS)?,
            max_upload_bytes: parse_env_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject chunking parameters the splitter cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue("CHUNK_SIZE".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::InvalidValue("CHUNK_OVERLAP".into()));
        }
        if self.reduce_threshold == 0 {
            return Err(ConfigError::InvalidValue("REDUCE_THRESHOLD".into()));
        }
        if self.call_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("SUMMARY_CALL_TIMEOUT_SECS".into()));
        }
        Ok(())
    }

    /// Per-call deadline as a [`Duration`].
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

impl std::str::FromStr for SummarizationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "groq" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        provider = ?config.summarization_provider,
        model = %config.summarization_model,
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        reduce_threshold = config.reduce_threshold,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
