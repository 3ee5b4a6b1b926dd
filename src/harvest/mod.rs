//! The fetch-accumulate-dedupe controller and its collaborators.
//!
//! One run of [`HarvestController`] walks a paginated search, filters each
//! page against the catalog, folds the remainder into a run-level
//! [`Accumulator`], and lets a [`RetryScheduler`] decide what happens after
//! every page outcome. [`BatchImportController`] is the sibling polling
//! loop for the server-side author backfill. Both publish read-only
//! snapshots through [`ProgressReporter`] after every state transition.

mod accumulator;
mod batch;
mod controller;
mod filter;
mod progress;
mod scheduler;
mod state;

pub use accumulator::{Accumulator, AppendResult};
pub use batch::BatchImportController;
pub use controller::{CancelHandle, HarvestController, HarvestReport};
pub use filter::{ExistingRecordFilter, FilterOutcome};
pub use progress::{BatchSnapshot, HarvestSnapshot, ProgressReporter};
pub use scheduler::{Action, FixedDelayScheduler, RetryScheduler, SchedulerConfig};
pub use state::{BatchImportState, RunState};
