//! Retry and pacing policy for the page-fetch loop.
//!
//! The policy is a strategy seam: the controller only ever asks "what
//! next?" after each page outcome, so a different implementation (adaptive
//! backoff, token bucket) can replace [`FixedDelayScheduler`] without
//! touching the loop.

use std::time::Duration;

use crate::api::ApiError;
use crate::harvest::RunState;

/// What the controller should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Move on to the next page (on failure this skips the current page)
    Continue,

    /// Sleep, then fetch the same page again
    WaitThenRetry(Duration),

    /// Terminate the run fatally, keeping partial results
    Abort(String),

    /// Terminate the run normally
    Stop(String),
}

/// Policy seam for retry, skip, and pacing decisions.
pub trait RetryScheduler: Send + std::fmt::Debug {
    /// Decide after a successful page. `state` already reflects the page.
    fn on_success(&mut self, state: &RunState, accumulated: usize, max_pages: u32) -> Action;

    /// Decide after a failed fetch. `state` already reflects the failure.
    fn on_error(&mut self, error: &ApiError, state: &RunState) -> Action;

    /// Fixed delay between successful pages (never before the first).
    fn inter_page_delay(&self) -> Duration;
}

/// Tuning knobs for [`FixedDelayScheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Delay between successful pages
    pub page_delay: Duration,

    /// Delay before retrying a transient failure
    pub transient_delay: Duration,

    /// Delay for a rate limit with no Retry-After header
    pub rate_limit_fallback: Duration,

    /// Transient failures in a row before the run aborts
    pub max_consecutive_errors: u32,

    /// Retries per page before the page is skipped
    pub retries_per_page: u32,

    /// Accumulated-record cap for the whole run
    pub max_records: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            page_delay: Duration::from_secs(2),
            transient_delay: Duration::from_secs(5),
            rate_limit_fallback: Duration::from_secs(60),
            max_consecutive_errors: 5,
            retries_per_page: 2,
            max_records: 5000,
        }
    }
}

/// Fixed-delay policy.
///
/// - success: continue, or stop at the page limit / record cap
/// - rate limit: wait the advertised delay and retry, indefinitely
/// - quota exhausted: abort
/// - transient: abort after `max_consecutive_errors` in a row (the counter
///   survives page skips and resets only on success); otherwise retry the
///   page up to `retries_per_page` times, then skip it
#[derive(Debug)]
pub struct FixedDelayScheduler {
    config: SchedulerConfig,
    attempts_on_page: u32,
}

impl FixedDelayScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            attempts_on_page: 0,
        }
    }
}

impl Default for FixedDelayScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl RetryScheduler for FixedDelayScheduler {
    fn on_success(&mut self, state: &RunState, accumulated: usize, max_pages: u32) -> Action {
        self.attempts_on_page = 0;
        // Skipped pages consume page budget too; a run over pages 1..=M
        // never walks past page M no matter how individual pages fared.
        if state.pages_fetched + state.pages_skipped >= max_pages {
            return Action::Stop("limit reached".to_string());
        }
        if accumulated >= self.config.max_records {
            return Action::Stop("limit reached".to_string());
        }
        Action::Continue
    }

    fn on_error(&mut self, error: &ApiError, state: &RunState) -> Action {
        match error {
            ApiError::RateLimited { retry_after } => {
                Action::WaitThenRetry(retry_after.unwrap_or(self.config.rate_limit_fallback))
            }
            ApiError::QuotaExceeded => Action::Abort("daily quota exceeded".to_string()),
            ApiError::InvalidRequest(msg) => Action::Abort(format!("invalid request: {}", msg)),
            _ => {
                if state.consecutive_errors >= self.config.max_consecutive_errors {
                    return Action::Abort("too many consecutive errors".to_string());
                }
                self.attempts_on_page += 1;
                if self.attempts_on_page > self.config.retries_per_page {
                    self.attempts_on_page = 0;
                    return Action::Continue;
                }
                Action::WaitThenRetry(self.config.transient_delay)
            }
        }
    }

    fn inter_page_delay(&self) -> Duration {
        self.config.page_delay
    }
}
