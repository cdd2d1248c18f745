use super::settings::{DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT};
use golem_rust::Schema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self::with_default_limit(page, limit, DEFAULT_LIMIT)
    }

    pub fn with_default_limit(page: Option<u32>, limit: Option<u32>, default_limit: u32) -> Self {
        Self::bounded(page, limit, default_limit, MAX_LIMIT)
    }

    pub fn bounded(
        page: Option<u32>,
        limit: Option<u32>,
        default_limit: u32,
        max_limit: u32,
    ) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(DEFAULT_PAGE);
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(default_limit)
            .min(max_limit.max(1));

        PageRequest { page, limit }
    }

    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize).saturating_mul(self.limit as usize)
    }

    pub fn pagination(&self, total_items: u64) -> Pagination {
        Pagination::new(self.page, self.limit, total_items)
    }
}

#[derive(Schema, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub items_per_page: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(current_page: u32, items_per_page: u32, total_items: u64) -> Self {
        let total_pages = if items_per_page == 0 {
            0
        } else {
            total_items.div_ceil(items_per_page as u64) as u32
        };

        Pagination {
            current_page,
            total_pages,
            total_items,
            items_per_page,
            has_next_page: current_page < total_pages,
            has_prev_page: current_page > 1,
        }
    }
}

/// Slices an already ordered collection into the requested page.
pub fn paginate<T: Clone>(items: &[T], request: &PageRequest) -> (Vec<T>, Pagination) {
    let page_items = items
        .iter()
        .skip(request.offset())
        .take(request.limit as usize)
        .cloned()
        .collect();

    (page_items, request.pagination(items.len() as u64))
}
