//! Summarization pipeline: chunking, fan-out over the provider, and the reduction pass.

pub mod chunking;
mod pipeline;
pub mod prompts;
mod service;
pub mod types;

pub use chunking::{Chunk, split_text};
pub use pipeline::summarize_document;
pub use service::{SummaryApi, SummaryService};
pub use types::{ChunkingError, PipelineError, PipelineOptions, ProcessingError, SummaryOutcome};
