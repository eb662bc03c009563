#![deny(missing_docs)]

//! Core library for the Rusty Digest summarization server.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Text extraction for uploaded documents.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Summarization metrics helpers.
pub mod metrics;
/// Chunking and map/reduce summarization pipeline.
pub mod processing;
/// Remote summarization providers.
pub mod summarization;
