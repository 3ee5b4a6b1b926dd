//! Polling loop for the server-side author backfill.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::api::CatalogApi;
use crate::harvest::{BatchImportState, BatchSnapshot, ProgressReporter};

/// Default pause between batch calls while work remains.
const DEFAULT_BATCH_DELAY: Duration = Duration::from_secs(5);

/// Repeatedly invokes the catalog's fixed-size batch action until a target
/// count is reached.
///
/// Pacing between calls is a deliberate throughput cap against the
/// rate-limited service behind the batch action. Unlike the page-fetch
/// loop, a single failed batch call ends the whole run: the action mutates
/// server-side state, so blindly re-issuing it risks double-processing.
#[derive(Debug)]
pub struct BatchImportController {
    catalog: Arc<dyn CatalogApi>,
    batch_delay: Duration,
    reporter: ProgressReporter<BatchSnapshot>,
}

impl BatchImportController {
    pub fn new(catalog: Arc<dyn CatalogApi>) -> Self {
        let (reporter, _rx) = ProgressReporter::channel();
        Self {
            catalog,
            batch_delay: DEFAULT_BATCH_DELAY,
            reporter,
        }
    }

    /// Override the inter-batch pause
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    /// Subscribe to run snapshots
    pub fn snapshots(&self) -> tokio::sync::watch::Receiver<BatchSnapshot> {
        self.reporter.subscribe()
    }

    /// Run batches until `target_count` items are processed or a call
    /// fails. Always resolves to a terminal state; errors are recorded in
    /// it rather than propagated.
    pub async fn run(&mut self, target_count: u64, batch_size: u32) -> BatchImportState {
        let mut state = BatchImportState::new(target_count);
        let mut calls: u32 = 0;

        if target_count == 0 {
            state.completed = true;
            self.reporter.publish(BatchSnapshot { state: state.clone(), calls });
            return state;
        }

        loop {
            calls += 1;
            match self.catalog.process_author_batch(batch_size).await {
                Ok(outcome) if outcome.success => {
                    tracing::debug!(
                        call = calls,
                        processed = outcome.processed,
                        errors = outcome.errors.len(),
                        "batch call finished"
                    );
                    state.batch_succeeded(outcome.processed, outcome.errors);
                    self.reporter.publish(BatchSnapshot { state: state.clone(), calls });

                    if state.completed {
                        break;
                    }
                    // A batch that makes no progress would loop forever
                    if outcome.processed == 0 {
                        state.completed = true;
                        self.reporter.publish(BatchSnapshot { state: state.clone(), calls });
                        break;
                    }
                    sleep(self.batch_delay).await;
                }
                Ok(outcome) => {
                    let message = outcome
                        .error
                        .unwrap_or_else(|| "batch processing failed".to_string());
                    tracing::warn!(call = calls, error = %message, "batch call reported failure");
                    state.batch_failed(message);
                    self.reporter.publish(BatchSnapshot { state: state.clone(), calls });
                    break;
                }
                Err(err) => {
                    tracing::warn!(call = calls, error = %err, "batch call failed");
                    state.batch_failed(err.to_string());
                    self.reporter.publish(BatchSnapshot { state: state.clone(), calls });
                    break;
                }
            }
        }

        tracing::info!(
            processed = state.total_processed,
            failed = state.total_failed,
            calls,
            "backfill finished"
        );
        state
    }
}
