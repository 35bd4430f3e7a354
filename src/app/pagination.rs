use serde::Serialize;

/// Position of one page within a listing of `total` rows.
///
/// Page numbers start at 1. An empty listing still has one (empty) page;
/// anything outside `1..=num_pages` is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub per_page: i64,
    pub num_pages: i64,
    pub total: i64,
}

impl PageWindow {
    pub fn resolve(page: i64, per_page: i64, total: i64) -> Option<Self> {
        if per_page < 1 || total < 0 {
            return None;
        }
        let num_pages = ((total + per_page - 1) / per_page).max(1);
        if page < 1 || page > num_pages {
            return None;
        }
        Some(Self {
            page,
            per_page,
            num_pages,
            total,
        })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn has_next(&self) -> bool {
        self.page < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub num_pages: i64,
    pub total: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow) -> Self {
        Self {
            items,
            page: window.page,
            num_pages: window.num_pages,
            total: window.total,
            has_next: window.has_next(),
            has_previous: window.has_previous(),
        }
    }
}
