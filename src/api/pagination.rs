use serde::Serialize;

/// Offset/limit window for list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    /// Builds a window from raw query values. Pages start at 1; limits are
    /// clamped to `1..=max_limit`.
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: u32, max_limit: u32) -> Self {
        let max_limit = max_limit.max(1);
        let page = page.unwrap_or(1).clamp(1, u32::MAX as i64) as u32;
        let limit = limit
            .unwrap_or(default_limit as i64)
            .clamp(1, max_limit as i64) as u32;
        Self { page, limit }
    }

    pub fn skip(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }

    /// Applies the window to an already filtered and ordered sequence
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(self.skip() as usize)
            .take(self.limit as usize)
            .cloned()
            .collect()
    }
}

/// List response body: `{page, limit, total, items}`
#[derive(Debug, Clone, Serialize)]
pub struct Page<T: Serialize> {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub items: Vec<T>,
}

impl<T: Serialize> Page<T> {
    pub fn new(pagination: Pagination, total: i64, items: Vec<T>) -> Self {
        Self {
            page: pagination.page,
            limit: pagination.limit,
            total,
            items,
        }
    }

    pub fn map<U: Serialize>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            page: self.page,
            limit: self.limit,
            total: self.total,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_skip() {
        let p = Pagination::new(None, None, 20, 100);
        assert_eq!((p.page, p.limit, p.skip()), (1, 20, 0));

        let p = Pagination::new(Some(3), Some(10), 20, 100);
        assert_eq!(p.skip(), 20);
    }

    #[test]
    fn clamps_out_of_range_values() {
        let p = Pagination::new(Some(0), Some(0), 20, 100);
        assert_eq!((p.page, p.limit), (1, 1));

        let p = Pagination::new(Some(-4), Some(5000), 20, 100);
        assert_eq!((p.page, p.limit), (1, 100));
    }

    #[test]
    fn slice_windows_items() {
        let items: Vec<u32> = (1..=7).collect();
        let p = Pagination::new(Some(2), Some(3), 20, 100);
        assert_eq!(p.slice(&items), vec![4, 5, 6]);

        let p = Pagination::new(Some(4), Some(3), 20, 100);
        assert!(p.slice(&items).is_empty());
    }

    #[test]
    fn page_serializes_flat() {
        let page = Page::new(Pagination::new(Some(1), Some(2), 20, 100), 5, vec!["a", "b"]);
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["page"], 1);
        assert_eq!(value["limit"], 2);
        assert_eq!(value["total"], 5);
        assert_eq!(value["items"].as_array().unwrap().len(), 2);
    }
}
