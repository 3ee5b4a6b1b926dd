//! The paginated fetch-accumulate-dedupe loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::time::sleep;

use crate::api::{ApiError, CatalogApi, SearchApi};
use crate::harvest::{
    Accumulator, Action, ExistingRecordFilter, FixedDelayScheduler, HarvestSnapshot,
    ProgressReporter, RetryScheduler, RunState,
};
use crate::models::{BookRecord, HarvestQuery, MAX_PAGES_CEILING};

/// Requests a stop between loop iterations. In-flight requests are not
/// interrupted; they are bounded by the HTTP client timeout instead.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Terminal result of one harvest run.
///
/// Every termination mode resolves to a report; the run never propagates
/// service errors past its boundary. Partial results survive aborts.
#[derive(Debug)]
pub struct HarvestReport {
    /// Records gathered, in first-seen order
    pub records: Vec<BookRecord>,

    /// Final run state
    pub state: RunState,

    /// Duplicates dropped within the run
    pub duplicates: usize,

    /// Candidates dropped because the catalog already had them
    pub existing_filtered: usize,

    /// Non-fatal warnings (degraded existence checks)
    pub warnings: Vec<String>,
}

/// Drives one multi-page harvest: fetch, filter against the catalog,
/// accumulate with run-level dedup, and let the scheduler decide between
/// pages. Pages are fetched strictly one at a time.
#[derive(Debug)]
pub struct HarvestController {
    search: Arc<dyn SearchApi>,
    filter: ExistingRecordFilter,
    scheduler: Box<dyn RetryScheduler>,
    reporter: ProgressReporter<HarvestSnapshot>,
    cancel: CancelHandle,
}

impl HarvestController {
    pub fn new(search: Arc<dyn SearchApi>, catalog: Arc<dyn CatalogApi>) -> Self {
        let (reporter, _rx) = ProgressReporter::channel();
        Self {
            search,
            filter: ExistingRecordFilter::new(catalog),
            scheduler: Box::new(FixedDelayScheduler::default()),
            reporter,
            cancel: CancelHandle::default(),
        }
    }

    /// Replace the retry/pacing policy
    pub fn with_scheduler(mut self, scheduler: Box<dyn RetryScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Subscribe to run snapshots
    pub fn snapshots(&self) -> tokio::sync::watch::Receiver<HarvestSnapshot> {
        self.reporter.subscribe()
    }

    /// Handle for stopping the run between iterations
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Run one harvest to completion.
    ///
    /// The only error returned is the precondition violation (blank
    /// subject), raised before any network call. Everything else resolves
    /// to a [`HarvestReport`] whose `state` says how the run ended.
    pub async fn run(&mut self, query: &HarvestQuery) -> Result<HarvestReport, ApiError> {
        if !query.is_valid() {
            return Err(ApiError::InvalidRequest(
                "subject must not be empty".to_string(),
            ));
        }
        let max_pages = query.max_pages.clamp(1, MAX_PAGES_CEILING);

        let mut accumulator = Accumulator::new();
        let mut state = RunState::default();
        let mut duplicates = 0usize;
        let mut existing_filtered = 0usize;
        let mut warnings: Vec<String> = Vec::new();

        let mut page: u32 = 1;
        let mut pace_before_fetch = false;

        loop {
            if self.cancel.is_cancelled() {
                state.stop("cancelled");
                self.publish(&state, &accumulator, duplicates, existing_filtered, &warnings);
                break;
            }

            // Throughput cap between successful pages, not a reaction to
            // any error signal.
            if pace_before_fetch {
                sleep(self.scheduler.inter_page_delay()).await;
                pace_before_fetch = false;
            }

            match self.search.fetch_page(query, page).await {
                Ok(fetched_page) => {
                    let fetched = fetched_page.books.len();
                    state.page_succeeded(fetched_page.total);
                    tracing::debug!(page, fetched, total = fetched_page.total, "page fetched");

                    let outcome = self.filter.filter_new(fetched_page.books).await;
                    existing_filtered += outcome.existing_filtered;
                    if let Some(warning) = outcome.warning {
                        warnings.push(warning);
                    }

                    let appended = accumulator.append(outcome.records);
                    duplicates += appended.duplicates;

                    self.publish(&state, &accumulator, duplicates, existing_filtered, &warnings);

                    if fetched == 0 {
                        state.stop("no more results");
                        self.publish(&state, &accumulator, duplicates, existing_filtered, &warnings);
                        break;
                    }

                    match self.scheduler.on_success(&state, accumulator.len(), max_pages) {
                        Action::Continue => {
                            page += 1;
                            pace_before_fetch = true;
                        }
                        Action::WaitThenRetry(delay) => {
                            sleep(delay).await;
                        }
                        Action::Stop(reason) => {
                            state.stop(reason);
                            self.publish(
                                &state,
                                &accumulator,
                                duplicates,
                                existing_filtered,
                                &warnings,
                            );
                            break;
                        }
                        Action::Abort(reason) => {
                            state.abort(reason);
                            self.publish(
                                &state,
                                &accumulator,
                                duplicates,
                                existing_filtered,
                                &warnings,
                            );
                            break;
                        }
                    }
                }
                Err(err) => {
                    if err.is_transient() {
                        state.transient_failure();
                    }
                    tracing::warn!(page, error = %err, "page fetch failed");

                    match self.scheduler.on_error(&err, &state) {
                        Action::WaitThenRetry(delay) => {
                            self.publish(
                                &state,
                                &accumulator,
                                duplicates,
                                existing_filtered,
                                &warnings,
                            );
                            sleep(delay).await;
                        }
                        Action::Continue => {
                            // Retry budget for this page is spent; move on
                            // rather than failing the whole run.
                            state.page_skipped();
                            tracing::warn!(page, "page skipped after repeated failures");
                            if state.pages_fetched + state.pages_skipped >= max_pages {
                                state.stop("limit reached");
                            }
                            self.publish(
                                &state,
                                &accumulator,
                                duplicates,
                                existing_filtered,
                                &warnings,
                            );
                            if state.is_terminal() {
                                break;
                            }
                            page += 1;
                        }
                        Action::Abort(reason) => {
                            state.abort(reason);
                            self.publish(
                                &state,
                                &accumulator,
                                duplicates,
                                existing_filtered,
                                &warnings,
                            );
                            break;
                        }
                        Action::Stop(reason) => {
                            state.stop(reason);
                            self.publish(
                                &state,
                                &accumulator,
                                duplicates,
                                existing_filtered,
                                &warnings,
                            );
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!(
            pages = state.pages_fetched,
            skipped = state.pages_skipped,
            accumulated = accumulator.len(),
            duplicates,
            existing_filtered,
            aborted = state.aborted,
            "harvest finished"
        );

        Ok(HarvestReport {
            records: accumulator.into_records(),
            state,
            duplicates,
            existing_filtered,
            warnings,
        })
    }

    fn publish(
        &self,
        state: &RunState,
        accumulator: &Accumulator,
        duplicates: usize,
        existing_filtered: usize,
        warnings: &[String],
    ) {
        self.reporter.publish(HarvestSnapshot {
            state: state.clone(),
            accumulated: accumulator.len(),
            duplicates,
            existing_filtered,
            warnings: warnings.to_vec(),
        });
    }
}
