//! Offset pagination over in-memory, already-sorted result sets.
use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: u64 = 20;
pub const MAX_LIMIT: u64 = 100;

/// `?page=&limit=` query. Missing or zero values fall back to defaults.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct PageRequest {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PageRequest {
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }
    pub fn page(&self) -> u64 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }
    pub fn limit(&self, default_limit: u64) -> u64 {
        self.limit
            .filter(|l| *l > 0)
            .unwrap_or(default_limit)
            .min(MAX_LIMIT)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub total: u64,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn from_sorted(items: Vec<T>, request: PageRequest, default_limit: u64) -> Self {
        let page = request.page();
        let limit = request.limit(default_limit);
        let total = items.len() as u64;
        let total_pages = total.div_ceil(limit);
        let skip = (page - 1).saturating_mul(limit);

        let items = items
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(limit as usize)
            .collect();

        Self {
            items,
            page,
            limit,
            total_pages,
            total,
            has_more: page < total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_requested_page() {
        let page = Page::from_sorted((1..=45).collect::<Vec<_>>(), PageRequest::new(3, 20), DEFAULT_LIMIT);

        assert_eq!(page.items, (41..=45).collect::<Vec<_>>());
        assert_eq!(page.total, 45);
        assert_eq!(page.total_pages, 3);
        assert!(!page.has_more);
    }

    #[test]
    fn defaults_and_caps() {
        let request = PageRequest {
            page: Some(0),
            limit: Some(10_000),
        };
        assert_eq!(request.page(), 1);
        assert_eq!(request.limit(DEFAULT_LIMIT), MAX_LIMIT);
        assert_eq!(PageRequest::default().limit(10), 10);
    }

    #[test]
    fn empty_set() {
        let page: Page<u8> = Page::from_sorted(vec![], PageRequest::default(), DEFAULT_LIMIT);
        assert_eq!(page.total_pages, 0);
        assert!(page.items.is_empty());
        assert!(!page.has_more);
    }
}
