//! Summary service coordinating extraction, chunking, and remote summarization.

use crate::{
    config::Config,
    extraction::{self, DocumentFormat},
    metrics::{MetricsSnapshot, SummaryMetrics},
    processing::{
        pipeline::summarize_document,
        types::{PipelineOptions, ProcessingError, SummaryOutcome},
    },
    summarization::SummarizationClient,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Turns uploaded files into summaries.
///
/// The service owns the summarization client, the pipeline tunables, and the metrics registry.
/// Construct it once near process start and share it through an `Arc`.
pub struct SummaryService {
    client: Arc<dyn SummarizationClient>,
    options: PipelineOptions,
    metrics: Arc<SummaryMetrics>,
}

/// Abstraction over the summary service used by the HTTP surface.
#[async_trait]
pub trait SummaryApi: Send + Sync {
    /// Extract `bytes` according to the extension of `filename` and summarize the text.
    async fn summarize_upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<SummaryOutcome, ProcessingError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl SummaryService {
    /// Build a service around an explicit client and options.
    pub fn new(client: Arc<dyn SummarizationClient>, options: PipelineOptions) -> Self {
        Self {
            client,
            options,
            metrics: Arc::new(SummaryMetrics::new()),
        }
    }

    /// Build a service using the tunables from `config`.
    pub fn from_config(client: Arc<dyn SummarizationClient>, config: &Config) -> Self {
        Self::new(client, PipelineOptions::from(config))
    }

    /// Pipeline tunables in use.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Extract and summarize an uploaded file.
    pub async fn summarize_upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<SummaryOutcome, ProcessingError> {
        let result = self.run(filename, bytes).await;
        if let Err(error) = &result {
            self.metrics.record_failure();
            if error.is_client_error() {
                tracing::info!(filename, error = %error, "Rejected upload");
            } else {
                tracing::error!(filename, error = %error, "Summarization failed");
            }
        }
        result
    }

    /// Summarize text that has already been extracted.
    pub async fn summarize_text(&self, text: &str) -> Result<SummaryOutcome, ProcessingError> {
        let outcome = summarize_document(text, self.client.as_ref(), &self.options).await?;
        self.metrics
            .record_document(outcome.chunk_count as u64, outcome.reduced);
        Ok(outcome)
    }

    async fn run(&self, filename: &str, bytes: Vec<u8>) -> Result<SummaryOutcome, ProcessingError> {
        let format = DocumentFormat::from_filename(filename)?;
        tracing::info!(filename, %format, bytes = bytes.len(), "Processing upload");

        let started = Instant::now();
        let text = tokio::task::spawn_blocking(move || extraction::extract_as(&bytes, format))
            .await
            .map_err(|error| ProcessingError::Task(error.to_string()))??;
        let extract_ms = started.elapsed().as_millis() as u64;

        let outcome = self.summarize_text(&text).await?;
        tracing::info!(
            filename,
            %format,
            chunks = outcome.chunk_count,
            reduced = outcome.reduced,
            intermediate_chars = outcome.intermediate_chars,
            summary_chars = outcome.summary.chars().count(),
            extract_ms,
            total_ms = started.elapsed().as_millis() as u64,
            "Document summarized"
        );
        Ok(outcome)
    }

    /// Return the current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl SummaryApi for SummaryService {
    async fn summarize_upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<SummaryOutcome, ProcessingError> {
        SummaryService::summarize_upload(self, filename, bytes).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        SummaryService::metrics_snapshot(self)
    }
}
