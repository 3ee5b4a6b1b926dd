//! Run-level accumulation with ISBN-key deduplication.
//!
//! The search service does not guarantee overlap-free pagination, so the
//! same book can arrive on more than one page. The accumulator keeps every
//! key it has admitted and drops later records whose key set intersects one
//! already seen, preserving first-seen order.

use std::collections::HashSet;

use crate::models::{BookRecord, IsbnKeySet};

/// Outcome of one append call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendResult {
    /// Records admitted by this call
    pub added: usize,

    /// Records dropped as duplicates within this run
    pub duplicates: usize,
}

/// Ordered, append-only collection of the records gathered in one run.
#[derive(Debug, Default)]
pub struct Accumulator {
    records: Vec<BookRecord>,
    seen_keys: HashSet<String>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append candidates, dropping any whose key set intersects a key
    /// already admitted. Records with no valid ISBN have nothing to match
    /// on and are always admitted.
    pub fn append(&mut self, records: Vec<BookRecord>) -> AppendResult {
        let mut result = AppendResult::default();

        for record in records {
            let keys = IsbnKeySet::of(&record);
            if keys.intersects(&self.seen_keys) {
                result.duplicates += 1;
                continue;
            }
            self.seen_keys.extend(keys.into_keys());
            self.records.push(record);
            result.added += 1;
        }

        result
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[BookRecord] {
        &self.records
    }

    /// Consume the accumulator, yielding the gathered records in
    /// first-seen order.
    pub fn into_records(self) -> Vec<BookRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::make_book;

    #[test]
    fn test_first_occurrence_wins() {
        let mut acc = Accumulator::new();

        let result = acc.append(vec![make_book(1), make_book(2), make_book(1)]);
        assert_eq!(result, AppendResult { added: 2, duplicates: 1 });
        assert_eq!(acc.len(), 2);
        assert_eq!(acc.records()[0].title, "Book 1");
        assert_eq!(acc.records()[1].title, "Book 2");
    }

    #[test]
    fn test_intersection_on_any_key_is_a_duplicate() {
        let mut acc = Accumulator::new();
        acc.append(vec![make_book(7)]);

        // Same ISBN-10 as book 7, different ISBN-13
        let overlapping = BookRecord::new("Reissue")
            .isbn13("9789999999990")
            .isbn("000000007X");
        let result = acc.append(vec![overlapping]);
        assert_eq!(result.duplicates, 1);
        assert_eq!(acc.len(), 1);
    }

    #[test]
    fn test_cross_page_duplicates_dropped() {
        let mut acc = Accumulator::new();
        acc.append((1..=5).map(make_book).collect());

        // Page 2 re-sends 4 and 5 alongside new records
        let result = acc.append(vec![make_book(4), make_book(5), make_book(6)]);
        assert_eq!(result, AppendResult { added: 1, duplicates: 2 });
        assert_eq!(acc.len(), 6);
    }

    #[test]
    fn test_keyless_records_always_admitted() {
        let mut acc = Accumulator::new();
        let result = acc.append(vec![
            BookRecord::new("No ISBN yet"),
            BookRecord::new("Also no ISBN"),
        ]);
        assert_eq!(result.added, 2);
    }
}
