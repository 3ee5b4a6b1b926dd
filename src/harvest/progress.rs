//! Read-only progress snapshots for observers.
//!
//! Controllers publish a fresh snapshot after every state transition over a
//! `tokio::sync::watch` channel. Observers (the CLI progress bar, tests)
//! hold the receiving end and never touch controller state directly. A
//! snapshot is published even on abort, carrying the partial tally, so the
//! caller can decide what to do with what was gathered.

use serde::Serialize;
use tokio::sync::watch;

use crate::harvest::{BatchImportState, RunState};

/// One observable moment of a harvest run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HarvestSnapshot {
    /// Run state at publication time
    pub state: RunState,

    /// Records accumulated so far
    pub accumulated: usize,

    /// Duplicates dropped within this run so far
    pub duplicates: usize,

    /// Candidates dropped because the catalog already had them
    pub existing_filtered: usize,

    /// Non-fatal warnings gathered so far
    pub warnings: Vec<String>,
}

/// One observable moment of a backfill run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSnapshot {
    /// Batch state at publication time
    pub state: BatchImportState,

    /// Batch calls issued so far
    pub calls: u32,
}

impl BatchSnapshot {
    /// Completion ratio in percent, measured from actual batch results
    pub fn percent(&self) -> f64 {
        if self.state.total_target == 0 {
            return 100.0;
        }
        (self.state.total_processed as f64 / self.state.total_target as f64 * 100.0).min(100.0)
    }
}

/// Publishing side of a snapshot channel.
#[derive(Debug)]
pub struct ProgressReporter<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone + Default> ProgressReporter<T> {
    /// Create a reporter and the receiver observers subscribe with.
    pub fn channel() -> (Self, watch::Receiver<T>) {
        let (tx, rx) = watch::channel(T::default());
        (Self { tx }, rx)
    }

    /// Publish a snapshot. Lagging or absent observers are fine; only the
    /// latest snapshot is retained.
    pub fn publish(&self, snapshot: T) {
        let _ = self.tx.send(snapshot);
    }

    /// Subscribe a new observer.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}
