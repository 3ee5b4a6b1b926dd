//! ISBN normalization and natural-key derivation.
//!
//! Two records refer to the same book when any of their normalized ISBN
//! candidates intersect. Candidates are derived, never stored: the `isbn13`
//! field when 13-shaped, the `isbn` field when it is itself 13-shaped, and
//! the `isbn` field when 10-shaped.

use std::collections::HashSet;

use crate::models::BookRecord;

/// Strip hyphens and whitespace and uppercase the check character.
pub fn normalize_isbn(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Whether a normalized string is ISBN-10 shaped: nine digits followed by a
/// digit or `X`.
pub fn is_isbn10(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes[..9].iter().all(|b| b.is_ascii_digit())
        && (bytes[9].is_ascii_digit() || bytes[9] == b'X')
}

/// Whether a normalized string is ISBN-13 shaped: exactly thirteen digits.
pub fn is_isbn13(s: &str) -> bool {
    s.len() == 13 && s.bytes().all(|b| b.is_ascii_digit())
}

/// The set of natural keys identifying one record.
///
/// Records with no validly shaped ISBN produce an empty key set; such
/// records can never match anything and pass through deduplication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IsbnKeySet {
    keys: Vec<String>,
}

impl IsbnKeySet {
    /// Derive the key set for a record.
    pub fn of(record: &BookRecord) -> Self {
        let mut keys = Vec::new();

        let isbn13 = normalize_isbn(&record.isbn13);
        if is_isbn13(&isbn13) {
            keys.push(isbn13);
        }

        let isbn = normalize_isbn(&record.isbn);
        if is_isbn13(&isbn) || is_isbn10(&isbn) {
            if !keys.contains(&isbn) {
                keys.push(isbn);
            }
        }

        Self { keys }
    }

    /// Whether any key is already present in `seen`.
    pub fn intersects(&self, seen: &HashSet<String>) -> bool {
        self.keys.iter().any(|k| seen.contains(k))
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|k| k.as_str())
    }

    /// Consume the set, yielding the owned keys.
    pub fn into_keys(self) -> Vec<String> {
        self.keys
    }
}
