//! Page-number pagination.

use serde::Serialize;

/// A validated page request.
///
/// Construct with [`PageRequest::clamped`], which never fails: out-of-range
/// input is pulled back into range instead of being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    page_number: u32,
    page_size: u32,
}

impl PageRequest {
    /// Page size used when none (or a non-positive one) is requested.
    pub const DEFAULT_PAGE_SIZE: u32 = 10;
    /// Largest page size a caller may request.
    pub const MAX_PAGE_SIZE: u32 = 100;

    /// Build a page request from raw query values.
    ///
    /// - page number: missing or `< 1` becomes 1
    /// - page size: missing or `< 1` becomes 10, `> 100` becomes 100
    #[must_use]
    pub fn clamped(page_number: Option<i64>, page_size: Option<i64>) -> Self {
        let page_number = page_number
            .filter(|n| *n >= 1)
            .map_or(1, |n| u32::try_from(n).unwrap_or(u32::MAX));

        let page_size = match page_size {
            Some(size) if size > i64::from(Self::MAX_PAGE_SIZE) => Self::MAX_PAGE_SIZE,
            Some(size) if size >= 1 => u32::try_from(size).unwrap_or(Self::MAX_PAGE_SIZE),
            _ => Self::DEFAULT_PAGE_SIZE,
        };

        Self {
            page_number,
            page_size,
        }
    }

    /// 1-based page number.
    #[must_use]
    pub const fn page_number(&self) -> u32 {
        self.page_number
    }

    /// Number of rows per page.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Rows to skip before this page.
    #[must_use]
    pub fn offset(&self) -> i64 {
        (i64::from(self.page_number) - 1) * i64::from(self.page_size)
    }

    /// Rows on this page (SQL `LIMIT`).
    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    /// Number of pages needed to hold `total_count` rows (ceiling division).
    #[must_use]
    pub fn total_pages(&self, total_count: i64) -> i64 {
        if total_count <= 0 {
            return 0;
        }
        let size = i64::from(self.page_size);
        (total_count + size - 1) / size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::clamped(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let page = PageRequest::default();
        assert_eq!(page.page_number(), 1);
        assert_eq!(page.page_size(), 10);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_oversized_page_clamps_to_max() {
        let page = PageRequest::clamped(Some(1), Some(500));
        assert_eq!(page.page_size(), 100);
    }

    #[test]
    fn test_page_zero_clamps_to_first_page() {
        let page = PageRequest::clamped(Some(0), Some(20));
        assert_eq!(page.page_number(), 1);
        assert_eq!(page.page_size(), 20);
    }

    #[test]
    fn test_non_positive_size_uses_default() {
        assert_eq!(PageRequest::clamped(None, Some(0)).page_size(), 10);
        assert_eq!(PageRequest::clamped(None, Some(-5)).page_size(), 10);
    }

    #[test]
    fn test_offset() {
        let page = PageRequest::clamped(Some(3), Some(25));
        assert_eq!(page.offset(), 50);
        assert_eq!(page.limit(), 25);
    }

    #[test]
    fn test_huge_page_number_does_not_overflow() {
        let page = PageRequest::clamped(Some(i64::MAX), Some(100));
        assert_eq!(page.page_number(), u32::MAX);
        assert!(page.offset() > 0);
    }

    #[test]
    fn test_total_pages_ceiling() {
        let page = PageRequest::clamped(None, Some(10));
        assert_eq!(page.total_pages(0), 0);
        assert_eq!(page.total_pages(1), 1);
        assert_eq!(page.total_pages(10), 1);
        assert_eq!(page.total_pages(11), 2);
        assert_eq!(page.total_pages(95), 10);
    }
}
