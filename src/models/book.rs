//! Book record model representing a candidate book from the external source.

use serde::{Deserialize, Serialize};

/// A book record as returned by the bibliographic search API
///
/// This struct provides a standardized format for candidate books before they
/// are imported into the catalog. Field names follow the wire format of the
/// search service, so records can be round-tripped to the bulk-import
/// endpoint unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookRecord {
    /// Book title
    pub title: String,

    /// Extended title, when the source distinguishes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_long: Option<String>,

    /// ISBN-10 (may also hold a 13-digit ISBN for some sources)
    #[serde(default)]
    pub isbn: String,

    /// ISBN-13
    #[serde(default)]
    pub isbn13: String,

    /// Author names
    #[serde(default)]
    pub authors: Vec<String>,

    /// Publisher name
    #[serde(default)]
    pub publisher: String,

    /// Publication date (ISO format or year, as provided by the source)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_published: Option<String>,

    /// Cover image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Synopsis text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,

    /// Language code (e.g. "en")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Page count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,

    /// Binding (hardcover, paperback, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<String>,

    /// Subjects/categories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subjects: Option<Vec<String>>,
}

impl BookRecord {
    /// Create a new record with the required fields
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the ISBN-10 field
    pub fn isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = isbn.into();
        self
    }

    /// Set the ISBN-13 field
    pub fn isbn13(mut self, isbn13: impl Into<String>) -> Self {
        self.isbn13 = isbn13.into();
        self
    }

    /// Set the authors
    pub fn authors(mut self, authors: Vec<String>) -> Self {
        self.authors = authors;
        self
    }

    /// Set the publisher
    pub fn publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = publisher.into();
        self
    }

    /// Set the publication date
    pub fn date_published(mut self, date: impl Into<String>) -> Self {
        self.date_published = Some(date.into());
        self
    }

    /// Authors joined for display
    pub fn author_line(&self) -> String {
        self.authors.join(", ")
    }
}
