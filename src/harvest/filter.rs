//! Filtering candidates against records the catalog already holds.

use std::sync::Arc;

use crate::api::CatalogApi;
use crate::models::{BookRecord, IsbnKeySet};

/// Outcome of one filtering pass.
///
/// When the existence check itself fails the filter fails open: the
/// original list comes back unfiltered with a warning attached, because
/// filtering is an optimization and must never block a run.
#[derive(Debug)]
pub struct FilterOutcome {
    /// Candidates not yet present in the catalog
    pub records: Vec<BookRecord>,

    /// Candidates dropped because the catalog already has them
    pub existing_filtered: usize,

    /// Non-fatal degradation notice, set when the check failed
    pub warning: Option<String>,
}

/// Drops candidates whose ISBN keys are already in the catalog.
#[derive(Debug, Clone)]
pub struct ExistingRecordFilter {
    catalog: Arc<dyn CatalogApi>,
}

impl ExistingRecordFilter {
    pub fn new(catalog: Arc<dyn CatalogApi>) -> Self {
        Self { catalog }
    }

    /// Check all candidate keys in one batched request and keep only the
    /// records with no key match.
    pub async fn filter_new(&self, records: Vec<BookRecord>) -> FilterOutcome {
        let mut all_keys: Vec<String> = Vec::new();
        for record in &records {
            all_keys.extend(IsbnKeySet::of(record).into_keys());
        }

        if all_keys.is_empty() {
            return FilterOutcome {
                records,
                existing_filtered: 0,
                warning: None,
            };
        }

        let existing = match self.catalog.existing_isbns(&all_keys).await {
            Ok(existing) => existing,
            Err(err) => {
                tracing::warn!(error = %err, "existence check failed, continuing unfiltered");
                return FilterOutcome {
                    records,
                    existing_filtered: 0,
                    warning: Some(format!("existence check failed, showing all books: {}", err)),
                };
            }
        };

        let before = records.len();
        let records: Vec<BookRecord> = records
            .into_iter()
            .filter(|record| !IsbnKeySet::of(record).intersects(&existing))
            .collect();
        let existing_filtered = before - records.len();

        if existing_filtered > 0 {
            tracing::debug!(existing_filtered, "dropped candidates already in catalog");
        }

        FilterOutcome {
            records,
            existing_filtered,
            warning: None,
        }
    }
}
