//! Scripted in-memory doubles for the search and catalog services.
//!
//! Outcomes are queued per call; every call is recorded (with the tokio
//! clock reading) so tests can assert call counts, page numbers, and the
//! pacing delays between calls.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::api::{ApiError, BatchOutcome, CatalogApi, ImportSummary, Page, SearchApi};
use crate::models::{BookRecord, HarvestQuery};

/// A search service double that replays a queue of page outcomes.
#[derive(Debug, Default)]
pub struct MockSearchApi {
    script: Mutex<VecDeque<Result<Page, ApiError>>>,
    calls: Mutex<Vec<(u32, Instant)>>,
}

impl MockSearchApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful page
    pub fn push_page(&self, total: u64, books: Vec<BookRecord>) {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(Page { total, books }));
    }

    /// Queue a failure
    pub fn push_error(&self, err: ApiError) {
        self.script.lock().unwrap().push_back(Err(err));
    }

    /// Number of fetch calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Page numbers requested, in call order
    pub fn pages_requested(&self) -> Vec<u32> {
        self.calls.lock().unwrap().iter().map(|(p, _)| *p).collect()
    }

    /// Clock readings at each call, in call order
    pub fn call_instants(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

#[async_trait]
impl SearchApi for MockSearchApi {
    async fn fetch_page(&self, _query: &HarvestQuery, page: u32) -> Result<Page, ApiError> {
        self.calls.lock().unwrap().push((page, Instant::now()));
        match self.script.lock().unwrap().pop_front() {
            Some(outcome) => outcome,
            None => Ok(Page::default()),
        }
    }
}

/// A catalog double with a configurable existing-ISBN set and a scripted
/// batch-action queue.
#[derive(Debug, Default)]
pub struct MockCatalog {
    existing: Mutex<HashSet<String>>,
    fail_existence_check: AtomicBool,
    check_calls: Mutex<Vec<Vec<String>>>,
    imported: Mutex<Vec<BookRecord>>,
    batch_script: Mutex<VecDeque<Result<BatchOutcome, ApiError>>>,
    batch_calls: Mutex<Vec<Instant>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark ISBNs as already present in the catalog
    pub fn seed_existing<I: IntoIterator<Item = S>, S: Into<String>>(&self, isbns: I) {
        let mut existing = self.existing.lock().unwrap();
        existing.extend(isbns.into_iter().map(Into::into));
    }

    /// Make every existence check fail (exercises the fail-open path)
    pub fn fail_existence_checks(&self, fail: bool) {
        self.fail_existence_check.store(fail, Ordering::SeqCst);
    }

    /// Queue a batch-action outcome
    pub fn push_batch_outcome(&self, outcome: Result<BatchOutcome, ApiError>) {
        self.batch_script.lock().unwrap().push_back(outcome);
    }

    /// ISBN batches sent to the existence check, in call order
    pub fn check_calls(&self) -> Vec<Vec<String>> {
        self.check_calls.lock().unwrap().clone()
    }

    /// Records handed to the bulk-import endpoint so far
    pub fn imported(&self) -> Vec<BookRecord> {
        self.imported.lock().unwrap().clone()
    }

    /// Clock readings at each batch-action call, in call order
    pub fn batch_call_instants(&self) -> Vec<Instant> {
        self.batch_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogApi for MockCatalog {
    async fn existing_isbns(&self, isbns: &[String]) -> Result<HashSet<String>, ApiError> {
        self.check_calls.lock().unwrap().push(isbns.to_vec());
        if self.fail_existence_check.load(Ordering::SeqCst) {
            return Err(ApiError::Network("existence check unavailable".to_string()));
        }
        let existing = self.existing.lock().unwrap();
        Ok(isbns
            .iter()
            .filter(|isbn| existing.contains(*isbn))
            .cloned()
            .collect())
    }

    async fn import_books(&self, records: &[BookRecord]) -> Result<ImportSummary, ApiError> {
        self.imported.lock().unwrap().extend_from_slice(records);
        Ok(ImportSummary {
            total: records.len() as u64,
            stored: records.len() as u64,
            duplicates: 0,
            errors: Vec::new(),
        })
    }

    async fn process_author_batch(&self, _batch_size: u32) -> Result<BatchOutcome, ApiError> {
        self.batch_calls.lock().unwrap().push(Instant::now());
        match self.batch_script.lock().unwrap().pop_front() {
            Some(outcome) => outcome,
            None => Ok(BatchOutcome {
                success: true,
                processed: 0,
                errors: Vec::new(),
                error: None,
            }),
        }
    }
}

/// Build a record with distinct ISBN-13/ISBN-10 keys derived from a seed.
pub fn make_book(seed: u32) -> BookRecord {
    BookRecord::new(format!("Book {}", seed))
        .isbn13(format!("978{:010}", seed))
        .isbn(format!("{:09}X", seed))
}
