use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing summarization activity.
#[derive(Default)]
pub struct SummaryMetrics {
    documents_summarized: AtomicU64,
    chunks_summarized: AtomicU64,
    reductions: AtomicU64,
    failures: AtomicU64,
    last_chunk_count: AtomicU64,
}

impl SummaryMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a summarized document, its chunk count, and whether a reduction pass ran.
    pub fn record_document(&self, chunk_count: u64, reduced: bool) {
        self.documents_summarized.fetch_add(1, Ordering::Relaxed);
        self.chunks_summarized
            .fetch_add(chunk_count, Ordering::Relaxed);
        if reduced {
            self.reductions.fetch_add(1, Ordering::Relaxed);
        }
        self.last_chunk_count.store(chunk_count, Ordering::Relaxed);
    }

    /// Record a request that ended in an error.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let last = self.last_chunk_count.load(Ordering::Relaxed);
        MetricsSnapshot {
            documents_summarized: self.documents_summarized.load(Ordering::Relaxed),
            chunks_summarized: self.chunks_summarized.load(Ordering::Relaxed),
            reductions: self.reductions.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            last_chunk_count: (last > 0).then_some(last),
        }
    }
}

/// Immutable view of summarization counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents summarized successfully since startup.
    pub documents_summarized: u64,
    /// Total chunks sent to the provider across all successful documents.
    pub chunks_summarized: u64,
    /// Documents whose partial summaries needed a reduction pass.
    pub reductions: u64,
    /// Requests that failed during extraction or summarization.
    pub failures: u64,
    /// Chunk count of the most recent successful document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_chunk_count: Option<u64>,
}
