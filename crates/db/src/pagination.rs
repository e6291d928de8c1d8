use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub const DEFAULT_PER_PAGE: i64 = 15;
pub const MAX_PER_PAGE: i64 = 100;

/// Page selection as it arrives in a query string. Pages are 1-based.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct PageRequest {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
}

impl PageRequest {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            search: None,
        }
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.per_page()
    }

    /// Search term wrapped for a `LIKE` comparison, or `None` when blank.
    pub fn like_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub last_page: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: &PageRequest) -> Self {
        let per_page = request.per_page();
        let last_page = ((total + per_page - 1) / per_page).max(1);
        Self {
            items,
            total,
            page: request.page(),
            per_page,
            last_page,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            last_page: self.last_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_clamping() {
        let request = PageRequest::default();
        assert_eq!(request.page(), 1);
        assert_eq!(request.per_page(), DEFAULT_PER_PAGE);
        assert_eq!(request.offset(), 0);

        let request = PageRequest::new(0, 1000);
        assert_eq!(request.page(), 1);
        assert_eq!(request.per_page(), MAX_PER_PAGE);
    }

    #[test]
    fn test_last_page() {
        let request = PageRequest::new(2, 10);
        assert_eq!(request.offset(), 10);
        assert_eq!(Page::new(Vec::<i32>::new(), 0, &request).last_page, 1);
        assert_eq!(Page::new(Vec::<i32>::new(), 10, &request).last_page, 1);
        assert_eq!(Page::new(Vec::<i32>::new(), 11, &request).last_page, 2);
    }

    #[test]
    fn test_like_pattern_ignores_blank_search() {
        let mut request = PageRequest::default();
        assert_eq!(request.like_pattern(), None);
        request.search = Some("   ".to_string());
        assert_eq!(request.like_pattern(), None);
        request.search = Some(" honda ".to_string());
        assert_eq!(request.like_pattern().as_deref(), Some("%honda%"));
    }
}
