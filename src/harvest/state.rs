//! Explicit run-state value types for the harvest and backfill loops.
//!
//! These are plain values mutated only by their owning controller and
//! published to observers as copies, never shared mutably.

use serde::{Deserialize, Serialize};

/// State of one multi-page harvest run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunState {
    /// Pages fetched successfully so far
    pub pages_fetched: u32,

    /// Pages given up on after exhausting their retries
    pub pages_skipped: u32,

    /// Transient failures since the last successful page
    pub consecutive_errors: u32,

    /// Total matches reported by the server (from the latest page)
    pub total_reported: u64,

    /// Whether the run ended early on a fatal condition
    pub aborted: bool,

    /// Why the run aborted, when it did
    pub abort_reason: Option<String>,

    /// Why the run stopped normally (page limit, record cap, exhausted
    /// results)
    pub stop_reason: Option<String>,
}

impl RunState {
    /// Record a successfully fetched page
    pub fn page_succeeded(&mut self, total_reported: u64) {
        self.pages_fetched += 1;
        self.consecutive_errors = 0;
        self.total_reported = total_reported;
    }

    /// Record one transient failure
    pub fn transient_failure(&mut self) {
        self.consecutive_errors += 1;
    }

    /// Give up on the current page
    pub fn page_skipped(&mut self) {
        self.pages_skipped += 1;
    }

    /// Terminate the run fatally, keeping whatever was gathered
    pub fn abort(&mut self, reason: impl Into<String>) {
        self.aborted = true;
        self.abort_reason = Some(reason.into());
    }

    /// Terminate the run normally
    pub fn stop(&mut self, reason: impl Into<String>) {
        self.stop_reason = Some(reason.into());
    }

    /// Whether the run has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        self.aborted || self.stop_reason.is_some()
    }
}

/// State of one batch-backfill run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchImportState {
    /// Items the run is trying to process in total
    pub total_target: u64,

    /// Items processed across all batch calls so far (monotone)
    pub total_processed: u64,

    /// Items that failed across all batch calls so far
    pub total_failed: u64,

    /// Error messages gathered across batch calls, in order
    pub errors: Vec<String>,

    /// Whether the run has finished (target reached or hard failure)
    pub completed: bool,
}

impl BatchImportState {
    pub fn new(total_target: u64) -> Self {
        Self {
            total_target,
            ..Default::default()
        }
    }

    /// Fold in the result of one successful batch call
    pub fn batch_succeeded(&mut self, processed: u64, errors: Vec<String>) {
        self.total_processed += processed;
        self.total_failed += errors.len() as u64;
        self.errors.extend(errors);
        if self.total_processed >= self.total_target {
            self.completed = true;
        }
    }

    /// Terminate the run on a hard failure
    pub fn batch_failed(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.total_failed += 1;
        self.completed = true;
    }
}
