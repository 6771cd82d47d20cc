//! Bounded-concurrency fan-out of chunks to the analysis engine.

use crate::analyzer::{ChunkAnalyzer, EngineOutput};
use crate::report::ScanResult;
use futures::stream::{FuturesUnordered, StreamExt};
use sweep_core::CodeChunk;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Analyze every chunk with at most `max_concurrency` requests in flight.
///
/// Results come back in chunk order regardless of completion order. A chunk
/// whose analysis fails yields an error result rather than aborting the
/// batch, so one bad chunk never loses the rest of the scan. All in-flight
/// work is owned by the returned future: dropping it cancels every pending
/// engine call.
pub async fn dispatch(
    chunks: &[CodeChunk],
    analyzer: &dyn ChunkAnalyzer,
    max_concurrency: usize,
) -> Vec<ScanResult> {
    let semaphore = Semaphore::new(max_concurrency.max(1));

    let mut tasks: FuturesUnordered<_> = chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| {
            let semaphore = &semaphore;
            async move {
                // Semaphore closes only on drop, so acquisition cannot fail here.
                let _permit = semaphore.acquire().await.ok();
                (index, analyze_chunk(chunk, analyzer).await)
            }
        })
        .collect();

    let mut slots: Vec<Option<ScanResult>> = (0..chunks.len()).map(|_| None).collect();
    while let Some((index, result)) = tasks.next().await {
        slots[index] = Some(result);
    }

    debug!("dispatched {} chunks", chunks.len());
    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| {
                let chunk = &chunks[index];
                ScanResult::errored(
                    chunk.chunk_index,
                    chunk.file_path.clone(),
                    "chunk analysis did not complete".to_string(),
                )
            })
        })
        .collect()
}

async fn analyze_chunk(chunk: &CodeChunk, analyzer: &dyn ChunkAnalyzer) -> ScanResult {
    match analyzer.analyze(&chunk.annotated_text).await {
        Ok(EngineOutput::Structured(findings)) => {
            ScanResult::completed(chunk.chunk_index, chunk.file_path.clone(), findings)
        }
        Ok(EngineOutput::RawText(_)) => {
            warn!(
                "engine returned unstructured text for {} chunk {}",
                chunk.file_path, chunk.chunk_index
            );
            ScanResult::completed(chunk.chunk_index, chunk.file_path.clone(), Vec::new())
        }
        Err(err) => {
            warn!(
                "analysis failed for {} chunk {}: {}",
                chunk.file_path, chunk.chunk_index, err
            );
            ScanResult::errored(chunk.chunk_index, chunk.file_path.clone(), err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::AnalyzeError;
    use crate::report::{Finding, ScanStatus, Severity};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn chunk(index: u32) -> CodeChunk {
        CodeChunk {
            file_path: "src/app.py".to_string(),
            chunk_index: index + 1,
            start_line: index * 10 + 1,
            end_line: index * 10 + 10,
            annotated_text: format!("### FILE: src/app.py\n### LINES: ...\n# chunk {index}"),
        }
    }

    struct ScriptedAnalyzer {
        fail_on: Option<u32>,
    }

    #[async_trait]
    impl ChunkAnalyzer for ScriptedAnalyzer {
        async fn analyze(&self, annotated_text: &str) -> Result<EngineOutput, AnalyzeError> {
            let index: u32 = annotated_text
                .rsplit(' ')
                .next()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            if self.fail_on == Some(index) {
                return Err(AnalyzeError::EmptyResponse);
            }
            Ok(EngineOutput::Structured(vec![Finding {
                vulnerability_type: format!("issue in chunk {index}"),
                severity: Severity::Medium,
                description: "d".to_string(),
                ..Finding::default()
            }]))
        }
    }

    struct GaugedAnalyzer {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ChunkAnalyzer for GaugedAnalyzer {
        async fn analyze(&self, _: &str) -> Result<EngineOutput, AnalyzeError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(EngineOutput::Structured(Vec::new()))
        }
    }

    struct SlowAnalyzer {
        completed: AtomicUsize,
    }

    #[async_trait]
    impl ChunkAnalyzer for SlowAnalyzer {
        async fn analyze(&self, _: &str) -> Result<EngineOutput, AnalyzeError> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.completed.fetch_add(1, Ordering::SeqCst);
            Ok(EngineOutput::Structured(Vec::new()))
        }
    }

    #[tokio::test]
    async fn test_results_keep_chunk_order_despite_failures() {
        let chunks: Vec<CodeChunk> = (0..3).map(chunk).collect();
        let analyzer = ScriptedAnalyzer { fail_on: Some(1) };

        let results = dispatch(&chunks, &analyzer, 2).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].status, ScanStatus::Completed);
        assert_eq!(results[1].status, ScanStatus::Error);
        assert_eq!(results[2].status, ScanStatus::Completed);
        assert_eq!(results[0].chunk_index, 1);
        assert_eq!(results[2].findings[0].vulnerability_type, "issue in chunk 2");
        assert!(results[1].error_message.is_some());
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_cap() {
        let chunks: Vec<CodeChunk> = (0..12).map(chunk).collect();
        let analyzer = GaugedAnalyzer {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };

        let results = dispatch(&chunks, &analyzer, 3).await;

        assert_eq!(results.len(), 12);
        assert!(analyzer.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_dropping_dispatch_cancels_in_flight_analysis() {
        let chunks: Vec<CodeChunk> = (0..4).map(chunk).collect();
        let analyzer = SlowAnalyzer {
            completed: AtomicUsize::new(0),
        };

        tokio::select! {
            _ = dispatch(&chunks, &analyzer, 4) => {
                panic!("dispatch finished before cancellation");
            }
            _ = tokio::time::sleep(Duration::from_millis(10)) => {}
        }

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(analyzer.completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_chunk_list() {
        let analyzer = ScriptedAnalyzer { fail_on: None };
        let results = dispatch(&[], &analyzer, 4).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_zero_concurrency_clamped_to_one() {
        let chunks = vec![chunk(0)];
        let analyzer = ScriptedAnalyzer { fail_on: None };
        let results = dispatch(&chunks, &analyzer, 0).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, ScanStatus::Completed);
    }
}
