//! Map/reduce summarization over chunked text.
//!
//! 1. Reject blank input before any remote call.
//! 2. Split the document with [`split_text`].
//! 3. Summarize every chunk through the injected [`SummarizationClient`], at most
//!    `max_concurrency` calls in flight. Each result lands in the slot of its chunk, so the
//!    output order is document order whatever order the calls complete in.
//! 4. Join the partial summaries with a single space.
//! 5. When the joined text is longer than `reduce_threshold` characters, condense its first
//!    `reduce_threshold` characters with exactly one more call. This second pass is fixed at
//!    depth one; it does not re-chunk, so anything past the prefix is not seen by the reducer.
//!
//! The first failing call aborts the run. Dropping the stream cancels the calls still in
//! flight and no partial summary is returned.

use super::chunking::split_text;
use super::prompts::{chunk_instruction, reduce_instruction};
use super::types::{PipelineError, PipelineOptions, SummaryOutcome};
use crate::summarization::{SummarizationClient, SummarizationClientError, SummarizationRequest};
use futures_util::{StreamExt, TryStreamExt, stream};
use std::time::{Duration, Instant};

/// Summarize `text` end to end. See the module docs for the stages.
pub async fn summarize_document(
    text: &str,
    client: &dyn SummarizationClient,
    options: &PipelineOptions,
) -> Result<SummaryOutcome, PipelineError> {
    if text.trim().is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let started = Instant::now();
    let chunks = split_text(text, options.chunk_size, options.overlap)?;
    let chunk_count = chunks.len();
    let concurrency = options.max_concurrency.max(1);
    tracing::debug!(
        chunk_count,
        chunk_size = options.chunk_size,
        overlap = options.overlap,
        concurrency,
        "Summarizing chunks"
    );

    let instruction = chunk_instruction(&options.language);
    let requests: Vec<(usize, SummarizationRequest)> = chunks
        .iter()
        .map(|chunk| {
            (
                chunk.index,
                SummarizationRequest {
                    text: chunk.text.to_string(),
                    instruction: instruction.clone(),
                },
            )
        })
        .collect();
    let call_timeout = options.call_timeout;

    let mut slots: Vec<Option<String>> = vec![None; chunk_count];
    let mut in_flight = stream::iter(requests)
        .map(|(chunk_index, request)| async move {
            call_with_deadline(client, request, call_timeout)
                .await
                .map(|partial| (chunk_index, partial))
                .map_err(|source| PipelineError::Summarization {
                    chunk_index,
                    source,
                })
        })
        .buffer_unordered(concurrency);

    while let Some((chunk_index, partial)) = in_flight.try_next().await.inspect_err(|error| {
        tracing::warn!(error = %error, "Chunk summarization failed; aborting document");
    })? {
        tracing::trace!(
            chunk_index,
            chars = partial.chars().count(),
            "Chunk summarized"
        );
        slots[chunk_index] = Some(partial);
    }

    // Every slot is filled once the stream drains without error.
    let partials: Vec<String> = slots.into_iter().flatten().collect();
    debug_assert_eq!(partials.len(), chunk_count);
    let intermediate = partials.join(" ");
    let intermediate_chars = intermediate.chars().count();

    if intermediate_chars <= options.reduce_threshold {
        tracing::debug!(
            chunk_count,
            intermediate_chars,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Partial summaries fit; skipping reduction"
        );
        return Ok(SummaryOutcome {
            summary: intermediate,
            chunk_count,
            reduced: false,
            intermediate_chars,
        });
    }

    tracing::debug!(
        intermediate_chars,
        reduce_threshold = options.reduce_threshold,
        dropped_chars = intermediate_chars - options.reduce_threshold,
        "Condensing truncated partial summaries"
    );
    let prefix: String = intermediate
        .chars()
        .take(options.reduce_threshold)
        .collect();
    let summary = call_with_deadline(
        client,
        SummarizationRequest {
            text: prefix,
            instruction: reduce_instruction(&options.language),
        },
        options.call_timeout,
    )
    .await
    .map_err(|source| PipelineError::Reduction { source })?;

    tracing::debug!(
        chunk_count,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Reduction pass complete"
    );
    Ok(SummaryOutcome {
        summary,
        chunk_count,
        reduced: true,
        intermediate_chars,
    })
}

async fn call_with_deadline(
    client: &dyn SummarizationClient,
    request: SummarizationRequest,
    deadline: Duration,
) -> Result<String, SummarizationClientError> {
    let text = tokio::time::timeout(deadline, client.summarize(request))
        .await
        .map_err(|_| SummarizationClientError::Timeout(deadline))??;
    if text.trim().is_empty() {
        return Err(SummarizationClientError::EmptyContent);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    type Responder =
        Box<dyn Fn(&SummarizationRequest) -> Result<String, SummarizationClientError> + Send + Sync>;
    type Delay = Box<dyn Fn(&SummarizationRequest) -> Duration + Send + Sync>;

    struct FakeClient {
        respond: Responder,
        delay: Delay,
        calls: Mutex<Vec<SummarizationRequest>>,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
    }

    impl FakeClient {
        fn new(
            respond: impl Fn(&SummarizationRequest) -> Result<String, SummarizationClientError>
            + Send
            + Sync
            + 'static,
        ) -> Self {
            Self {
                respond: Box::new(respond),
                delay: Box::new(|_| Duration::ZERO),
                calls: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
            }
        }

        fn with_delay(
            mut self,
            delay: impl Fn(&SummarizationRequest) -> Duration + Send + Sync + 'static,
        ) -> Self {
            self.delay = Box::new(delay);
            self
        }

        async fn recorded_calls(&self) -> Vec<SummarizationRequest> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl SummarizationClient for FakeClient {
        async fn summarize(
            &self,
            request: SummarizationRequest,
        ) -> Result<String, SummarizationClientError> {
            self.calls.lock().await.push(request.clone());
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
            let delay = (self.delay)(&request);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            (self.respond)(&request)
        }
    }

    /// "00000 11111 22222 33333 44444" splits into one chunk per digit group at size 6.
    const DIGITS: &str = "00000 11111 22222 33333 44444";

    fn digit_of(request: &SummarizationRequest) -> u64 {
        request
            .text
            .trim()
            .chars()
            .next()
            .and_then(|c| c.to_digit(10))
            .map(u64::from)
            .expect("digit chunk")
    }

    fn options(chunk_size: usize, overlap: usize, reduce_threshold: usize) -> PipelineOptions {
        PipelineOptions {
            chunk_size,
            overlap,
            reduce_threshold,
            max_concurrency: 4,
            call_timeout: Duration::from_secs(5),
            language: "Spanish".into(),
        }
    }

    #[tokio::test]
    async fn empty_input_never_calls_provider() {
        let client = FakeClient::new(|_| Ok("unused".into()));
        for text in ["", "   \n\t "] {
            let error = summarize_document(text, &client, &options(10, 2, 100))
                .await
                .expect_err("blank input");
            assert!(matches!(error, PipelineError::EmptyInput));
        }
        assert!(client.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn partial_summaries_keep_document_order() {
        let client = FakeClient::new(|request| Ok(format!("S{}", digit_of(request))))
            .with_delay(|request| Duration::from_millis((5 - digit_of(request)) * 15));

        let outcome = summarize_document(DIGITS, &client, &options(6, 0, 1000))
            .await
            .expect("summary");

        assert_eq!(outcome.summary, "S0 S1 S2 S3 S4");
        assert_eq!(outcome.chunk_count, 5);
        assert!(!outcome.reduced);
        let calls = client.recorded_calls().await;
        assert_eq!(calls.len(), 5);
        assert!(
            calls
                .iter()
                .all(|call| call.instruction == chunk_instruction("Spanish"))
        );
    }

    #[tokio::test]
    async fn failing_chunk_fails_whole_document() {
        let client = FakeClient::new(|request| match digit_of(request) {
            2 => Err(SummarizationClientError::GenerationFailed("boom".into())),
            digit => Ok(format!("S{digit}")),
        })
        .with_delay(|request| {
            if digit_of(request) == 2 {
                Duration::ZERO
            } else {
                Duration::from_millis(40)
            }
        });

        let error = summarize_document(DIGITS, &client, &options(6, 0, 1000))
            .await
            .expect_err("chunk 2 fails");

        match error {
            PipelineError::Summarization {
                chunk_index,
                source: SummarizationClientError::GenerationFailed(message),
            } => {
                assert_eq!(chunk_index, 2);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let calls = client.recorded_calls().await;
        assert!(
            calls
                .iter()
                .all(|call| call.instruction != reduce_instruction("Spanish"))
        );
    }

    #[tokio::test]
    async fn late_failure_discards_chunks_that_already_succeeded() {
        let client = FakeClient::new(|request| match digit_of(request) {
            2 => Err(SummarizationClientError::GenerationFailed("late".into())),
            digit => Ok(format!("S{digit}")),
        })
        .with_delay(|request| {
            if digit_of(request) == 2 {
                Duration::from_millis(80)
            } else {
                Duration::ZERO
            }
        });

        let result = summarize_document(DIGITS, &client, &options(6, 0, 1000)).await;

        let error = match result {
            Ok(outcome) => panic!("expected failure, got {outcome:?}"),
            Err(error) => error,
        };
        assert!(matches!(
            error,
            PipelineError::Summarization {
                chunk_index: 2,
                source: SummarizationClientError::GenerationFailed(_)
            }
        ));
        // Chunks 3 and 4 were summarized before chunk 2 failed.
        let calls = client.recorded_calls().await;
        let mut digits: Vec<u64> = calls.iter().map(digit_of).collect();
        digits.sort_unstable();
        assert_eq!(digits, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn short_intermediate_is_returned_verbatim() {
        let client = FakeClient::new(|request| Ok(format!("S{}", digit_of(request))));
        // "S0 S1 S2 S3 S4" is exactly 14 characters.
        let outcome = summarize_document(DIGITS, &client, &options(6, 0, 14))
            .await
            .expect("summary");

        assert_eq!(outcome.summary, "S0 S1 S2 S3 S4");
        assert_eq!(outcome.intermediate_chars, 14);
        assert!(!outcome.reduced);
        assert_eq!(client.recorded_calls().await.len(), 5);
    }

    #[tokio::test]
    async fn long_intermediate_triggers_one_reduction_over_prefix() {
        let reduce = reduce_instruction("Spanish");
        let reduce_for_client = reduce.clone();
        let client = FakeClient::new(move |request| {
            if request.instruction == reduce_for_client {
                Ok("condensed".into())
            } else {
                Ok(format!("S{}", digit_of(request)))
            }
        });

        let outcome = summarize_document(DIGITS, &client, &options(6, 0, 8))
            .await
            .expect("summary");

        assert_eq!(outcome.summary, "condensed");
        assert!(outcome.reduced);
        assert_eq!(outcome.intermediate_chars, 14);
        let calls = client.recorded_calls().await;
        assert_eq!(calls.len(), 6);
        let reductions: Vec<_> = calls
            .iter()
            .filter(|call| call.instruction == reduce)
            .collect();
        assert_eq!(reductions.len(), 1);
        assert_eq!(reductions[0].text, "S0 S1 S2");
    }

    #[tokio::test]
    async fn reduction_failure_is_reported_separately() {
        let reduce = reduce_instruction("Spanish");
        let client = FakeClient::new(move |request| {
            if request.instruction == reduce {
                Err(SummarizationClientError::ProviderUnavailable("down".into()))
            } else {
                Ok("partial summary text".into())
            }
        });

        let error = summarize_document(DIGITS, &client, &options(6, 0, 10))
            .await
            .expect_err("reduction fails");
        assert!(matches!(error, PipelineError::Reduction { .. }));
    }

    #[tokio::test]
    async fn slow_call_times_out() {
        let client = FakeClient::new(|_| Ok("late".into()))
            .with_delay(|_| Duration::from_millis(500));
        let mut opts = options(100, 10, 1000);
        opts.call_timeout = Duration::from_millis(20);

        let error = summarize_document("a short document", &client, &opts)
            .await
            .expect_err("timeout");

        assert!(error.is_timeout());
        assert!(matches!(
            error,
            PipelineError::Summarization {
                chunk_index: 0,
                source: SummarizationClientError::Timeout(_)
            }
        ));
    }

    #[tokio::test]
    async fn blank_provider_answer_is_a_failure() {
        let client = FakeClient::new(|_| Ok("   ".into()));
        let error = summarize_document("some text", &client, &options(100, 10, 1000))
            .await
            .expect_err("empty content");
        assert!(matches!(
            error,
            PipelineError::Summarization {
                source: SummarizationClientError::EmptyContent,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn in_flight_calls_respect_concurrency_cap() {
        let client = FakeClient::new(|_| Ok("ok".into())).with_delay(|_| Duration::from_millis(20));
        let text = "word ".repeat(40);
        let mut opts = options(10, 2, 10_000);
        opts.max_concurrency = 2;

        let outcome = summarize_document(&text, &client, &opts)
            .await
            .expect("summary");

        assert!(outcome.chunk_count > 2);
        let peak = client.peak_in_flight.load(Ordering::SeqCst);
        assert!((1..=2).contains(&peak), "peak in flight was {peak}");
    }

    #[tokio::test]
    async fn invalid_chunking_parameters_surface_before_calls() {
        let client = FakeClient::new(|_| Ok("unused".into()));
        let error = summarize_document("text", &client, &options(4, 4, 100))
            .await
            .expect_err("overlap too large");
        assert!(matches!(error, PipelineError::Chunking(_)));
        assert!(client.recorded_calls().await.is_empty());
    }
}
