use serde::{Deserialize, Serialize};

const DEFAULT_PAGE_SIZE: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pagination {
    /// One-based page index.
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn next(self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total_count: u64,
}

impl<T> Page<T> {
    pub fn has_more(&self, pagination: Pagination) -> bool {
        u64::from(pagination.page) * u64::from(pagination.page_size) < self.total_count
    }
}
