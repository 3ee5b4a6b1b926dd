//! Core data models shared across the library.

mod book;
mod isbn;
mod query;

pub use book::BookRecord;
pub use isbn::{is_isbn10, is_isbn13, normalize_isbn, IsbnKeySet};
pub use query::{HarvestQuery, PageSize, MAX_PAGES_CEILING};
