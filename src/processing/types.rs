//! Core data types and error definitions for the summarization pipeline.

use crate::config::Config;
use crate::extraction::ExtractionError;
use crate::summarization::SummarizationClientError;
use axum::http::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Errors produced while splitting text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// A zero-width window can never make progress.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap must leave room for new text in every window.
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge {
        /// Configured window size.
        chunk_size: usize,
        /// Configured overlap.
        overlap: usize,
    },
}

/// Errors emitted by [`crate::processing::summarize_document`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The document contained no usable text.
    #[error("No text could be extracted from the document")]
    EmptyInput,
    /// Chunking parameters were rejected.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Summarizing one chunk failed; the whole request is aborted.
    #[error("Failed to summarize chunk {chunk_index}: {source}")]
    Summarization {
        /// Index of the chunk whose call failed.
        chunk_index: usize,
        /// Underlying provider failure.
        #[source]
        source: SummarizationClientError,
    },
    /// The reduction pass over the joined partial summaries failed.
    #[error("Failed to condense partial summaries: {source}")]
    Reduction {
        /// Underlying provider failure.
        #[source]
        source: SummarizationClientError,
    },
}

impl PipelineError {
    /// Whether the failure was caused by a remote call exceeding its deadline.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Summarization { source, .. } | Self::Reduction { source } => source.is_timeout(),
            _ => false,
        }
    }
}

/// Errors emitted by the upload-to-summary service.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The uploaded file could not be turned into text.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// Summarizing the extracted text failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// The blocking extraction task panicked or was cancelled.
    #[error("Extraction task failed: {0}")]
    Task(String),
}

impl ProcessingError {
    /// HTTP status describing who is at fault: 4xx for caller input, 5xx otherwise.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Extraction(ExtractionError::UnsupportedFormat(_)) => StatusCode::BAD_REQUEST,
            Self::Extraction(ExtractionError::Corrupt { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Pipeline(PipelineError::EmptyInput) => StatusCode::BAD_REQUEST,
            Self::Pipeline(error) if error.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            Self::Pipeline(PipelineError::Summarization { .. } | PipelineError::Reduction { .. }) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Pipeline(PipelineError::Chunking(_)) | Self::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether the caller can fix the request.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Tunables for one pipeline invocation.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub overlap: usize,
    /// Intermediate length (characters) above which one reduction call runs.
    pub reduce_threshold: usize,
    /// Maximum concurrent remote calls.
    pub max_concurrency: usize,
    /// Deadline for every remote call.
    pub call_timeout: Duration,
    /// Language the summary is written in.
    pub language: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunk_size: 3000,
            overlap: 200,
            reduce_threshold: 3000,
            max_concurrency: 4,
            call_timeout: Duration::from_secs(60),
            language: "Spanish".into(),
        }
    }
}

impl From<&Config> for PipelineOptions {
    fn from(config: &Config) -> Self {
        Self {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
            reduce_threshold: config.reduce_threshold,
            max_concurrency: config.max_concurrency,
            call_timeout: config.call_timeout(),
            language: config.summary_language.clone(),
        }
    }
}

/// Final result of a successful pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOutcome {
    /// Summary returned to the caller.
    pub summary: String,
    /// Number of chunks the document was split into.
    pub chunk_count: usize,
    /// Whether the reduction pass replaced the joined partial summaries.
    pub reduced: bool,
    /// Character length of the joined partial summaries.
    pub intermediate_chars: usize,
}
