//! Harvest query parameters.

use serde::{Deserialize, Serialize};

/// Hard ceiling on pages per run, regardless of what the caller asks for.
pub const MAX_PAGES_CEILING: u32 = 50;

/// Results-per-page granularities supported by the search service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum PageSize {
    Ten,
    Twenty,
    Fifty,
    Hundred,
}

impl PageSize {
    pub fn as_u32(self) -> u32 {
        match self {
            PageSize::Ten => 10,
            PageSize::Twenty => 20,
            PageSize::Fifty => 50,
            PageSize::Hundred => 100,
        }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::Twenty
    }
}

impl TryFrom<u32> for PageSize {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            10 => Ok(PageSize::Ten),
            20 => Ok(PageSize::Twenty),
            50 => Ok(PageSize::Fifty),
            100 => Ok(PageSize::Hundred),
            other => Err(format!(
                "page size must be one of 10, 20, 50, 100 (got {})",
                other
            )),
        }
    }
}

impl From<PageSize> for u32 {
    fn from(value: PageSize) -> Self {
        value.as_u32()
    }
}

/// Parameters for one harvest run. Immutable once the run starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestQuery {
    /// Subject to search for (required, non-empty)
    pub subject: String,

    /// Optional publication-year filter
    pub year: Option<String>,

    /// Results per page
    pub page_size: PageSize,

    /// Maximum pages to fetch in this run (clamped to [`MAX_PAGES_CEILING`])
    pub max_pages: u32,
}

impl HarvestQuery {
    /// Create a query for a subject with default paging
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            year: None,
            page_size: PageSize::default(),
            max_pages: 1,
        }
    }

    /// Set the year filter
    pub fn year(mut self, year: impl Into<String>) -> Self {
        self.year = Some(year.into());
        self
    }

    /// Set the page size
    pub fn page_size(mut self, size: PageSize) -> Self {
        self.page_size = size;
        self
    }

    /// Set the page limit (clamped to the hard ceiling, floor of 1)
    pub fn max_pages(mut self, pages: u32) -> Self {
        self.max_pages = pages.clamp(1, MAX_PAGES_CEILING);
        self
    }

    /// Whether the query satisfies the preconditions for a run
    pub fn is_valid(&self) -> bool {
        !self.subject.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_round_trip() {
        assert_eq!(PageSize::try_from(50).unwrap(), PageSize::Fifty);
        assert_eq!(u32::from(PageSize::Hundred), 100);
        assert!(PageSize::try_from(30).is_err());
    }

    #[test]
    fn test_max_pages_clamped() {
        assert_eq!(HarvestQuery::new("fiction").max_pages(500).max_pages, 50);
        assert_eq!(HarvestQuery::new("fiction").max_pages(0).max_pages, 1);
    }

    #[test]
    fn test_blank_subject_is_invalid() {
        assert!(!HarvestQuery::new("   ").is_valid());
        assert!(HarvestQuery::new("history").is_valid());
    }
}
