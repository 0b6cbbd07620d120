//! Page requests and paginated API results.

use serde::{Deserialize, Serialize};

/// A clamped page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    /// Build a request, clamping `page` to at least 1 and `limit` to 1..=100.
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results as returned by list endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    /// An empty first page.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            limit: PageRequest::DEFAULT_LIMIT,
        }
    }

    /// Number of pages, at least 1.
    #[must_use]
    pub fn total_pages(&self) -> u32 {
        if self.limit == 0 || self.total == 0 {
            return 1;
        }
        let pages = self.total.div_ceil(u64::from(self.limit));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Transform the items, keeping pagination metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps() {
        assert_eq!(PageRequest::new(Some(0), Some(0)), PageRequest { page: 1, limit: 1 });
        assert_eq!(
            PageRequest::new(None, Some(500)),
            PageRequest { page: 1, limit: 100 }
        );
        assert_eq!(PageRequest::default().limit, 20);
    }

    #[test]
    fn test_total_pages() {
        let page: Page<u8> = Page {
            items: vec![],
            total: 41,
            page: 2,
            limit: 20,
        };
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
        assert!(page.has_prev());
    }

    #[test]
    fn test_empty_page_has_one_page() {
        let page: Page<u8> = Page::empty();
        assert_eq!(page.total_pages(), 1);
        assert!(!page.has_next());
        assert!(!page.has_prev());
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = Page {
            items: vec![1, 2],
            total: 2,
            page: 1,
            limit: 20,
        };
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20]);
        assert_eq!(mapped.total, 2);
    }
}
