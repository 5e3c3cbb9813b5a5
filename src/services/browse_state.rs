//! Filter/sort/page state
//!
//! Single source of truth for the active query. Every accepted mutation
//! yields a new [`QueryParams`]; changing what is being listed (search term,
//! category, sort) always returns to page 1.
//!
//! Search and category are alternative filters: the search endpoint cannot
//! narrow by category, so setting one clears the other.

use std::num::NonZeroU32;

use crate::error::CatalogError;
use crate::models::query::{QueryParams, SortField, SortOrder};
use crate::services::pagination;

#[derive(Debug, Clone)]
pub struct BrowseState {
    search_term: String,
    sort_field: SortField,
    sort_order: SortOrder,
    category: Option<String>,
    current_page: u32,
    page_size: NonZeroU32,
    /// Known once a result for the current filters has arrived
    total_pages: Option<u32>,
}

impl BrowseState {
    pub fn new(page_size: u32) -> Result<Self, CatalogError> {
        let page_size = NonZeroU32::new(page_size).ok_or_else(|| {
            CatalogError::InvalidParams("page size must be at least 1".to_string())
        })?;
        Ok(Self {
            search_term: String::new(),
            sort_field: SortField::default(),
            sort_order: SortOrder::default(),
            category: None,
            current_page: 1,
            page_size,
            total_pages: None,
        })
    }

    pub fn set_search_term(&mut self, term: &str) -> QueryParams {
        let term = term.trim();
        if term != self.search_term {
            self.search_term = term.to_string();
            // Different result set, old total no longer applies
            self.total_pages = None;
        }
        if !term.is_empty() && self.category.take().is_some() {
            self.total_pages = None;
        }
        self.current_page = 1;
        self.params()
    }

    pub fn set_sort(&mut self, field: SortField, order: SortOrder) -> QueryParams {
        self.sort_field = field;
        self.sort_order = order;
        self.current_page = 1;
        self.params()
    }

    pub fn set_sort_field(&mut self, field: SortField) -> QueryParams {
        self.set_sort(field, self.sort_order)
    }

    pub fn set_sort_order(&mut self, order: SortOrder) -> QueryParams {
        self.set_sort(self.sort_field, order)
    }

    pub fn set_category(&mut self, category: Option<String>) -> QueryParams {
        let category = category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        if category != self.category {
            self.category = category;
            self.total_pages = None;
        }
        if self.category.is_some() && !self.search_term.is_empty() {
            self.search_term.clear();
            self.total_pages = None;
        }
        self.current_page = 1;
        self.params()
    }

    /// Move to page `n`; returns `None` when the page is out of range
    ///
    /// While the total is unknown any positive page is accepted provisionally.
    pub fn set_page(&mut self, n: u32) -> Option<QueryParams> {
        if n < 1 {
            return None;
        }
        // Offset must fit the wire type, known total or not
        self.skip_for(n)?;
        if let Some(total) = self.total_pages {
            if n > total.max(1) {
                return None;
            }
        }
        self.current_page = n;
        Some(self.params())
    }

    pub fn next_page(&mut self) -> Option<QueryParams> {
        let next = self.current_page.checked_add(1)?;
        self.set_page(next)
    }

    pub fn prev_page(&mut self) -> Option<QueryParams> {
        let prev = self.current_page.checked_sub(1)?;
        self.set_page(prev)
    }

    /// Record a server-reported total for the current filters
    ///
    /// Clamps the current page into the new range and returns the new params
    /// when the page had to move.
    pub fn apply_total(&mut self, total_count: u64) -> Option<QueryParams> {
        let total = pagination::total_pages(total_count, self.page_size.get());
        self.total_pages = Some(total);

        let clamped = pagination::clamp_page(self.current_page, total);
        if clamped != self.current_page {
            self.current_page = clamped;
            return Some(self.params());
        }
        None
    }

    fn skip_for(&self, page: u32) -> Option<u32> {
        page.checked_sub(1)?.checked_mul(self.page_size.get())
    }

    pub fn params(&self) -> QueryParams {
        // current_page only ever holds pages accepted by set_page or clamped down
        let skip = self.skip_for(self.current_page).unwrap_or(u32::MAX);
        QueryParams::default()
            .with_skip(skip)
            .with_limit(self.page_size)
            .with_search_term(&self.search_term)
            .with_sort(self.sort_field, self.sort_order)
            .with_category(self.category.clone())
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        pagination::has_prev(self.current_page)
    }

    pub fn has_next(&self) -> bool {
        match self.total_pages {
            Some(total) => pagination::has_next(self.current_page, total),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_on_page(page: u32) -> BrowseState {
        let mut state = BrowseState::new(10).unwrap();
        state.apply_total(200);
        state.set_page(page).unwrap();
        state
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(BrowseState::new(0).is_err());
    }

    #[test]
    fn test_params_from_state() {
        let state = state_on_page(4);
        let params = state.params();

        assert_eq!(params.skip(), 30);
        assert_eq!(params.limit(), 10);
        assert_eq!(params.page(), 4);
    }

    #[test]
    fn test_search_resets_page() {
        for term in ["a", "ab", "ab", ""] {
            let mut state = state_on_page(7);
            let params = state.set_search_term(term);
            assert_eq!(state.current_page(), 1);
            assert_eq!(params.skip(), 0);
            assert_eq!(params.search_term(), term);
        }
    }

    #[test]
    fn test_sort_resets_page() {
        let mut state = state_on_page(5);
        state.set_sort(SortField::Price, SortOrder::Desc);
        assert_eq!(state.current_page(), 1);

        state.set_page(3).unwrap();
        let params = state.set_sort_order(SortOrder::Asc);
        assert_eq!(state.current_page(), 1);
        assert_eq!(params.sort_field(), SortField::Price);
        assert_eq!(params.sort_order(), SortOrder::Asc);

        state.set_page(2).unwrap();
        state.set_sort_field(SortField::Rating);
        assert_eq!(state.current_page(), 1);
        // Sorting keeps the same result set, so the total stays known
        assert_eq!(state.total_pages(), Some(20));
    }

    #[test]
    fn test_set_page_bounds() {
        let mut state = BrowseState::new(10).unwrap();

        // Unknown total: accepted provisionally
        assert!(state.set_page(50).is_some());
        assert!(state.set_page(0).is_none());

        state.set_page(1).unwrap();
        state.apply_total(25);
        assert_eq!(state.total_pages(), Some(3));
        assert!(state.set_page(4).is_none());
        assert_eq!(state.current_page(), 1);
        assert!(state.set_page(3).is_some());
    }

    #[test]
    fn test_apply_total_clamps_page() {
        let mut state = BrowseState::new(10).unwrap();
        state.set_page(9).unwrap();

        let moved = state.apply_total(35).unwrap();
        assert_eq!(state.current_page(), 4);
        assert_eq!(moved.skip(), 30);

        assert!(state.apply_total(35).is_none());
    }

    #[test]
    fn test_empty_total_clamps_to_first_page() {
        let mut state = BrowseState::new(10).unwrap();
        state.set_page(2).unwrap();
        state.apply_total(0);

        assert_eq!(state.current_page(), 1);
        assert!(!state.has_prev());
        assert!(!state.has_next());
        assert!(state.set_page(1).is_some());
        assert!(state.set_page(2).is_none());
    }

    #[test]
    fn test_next_prev() {
        let mut state = BrowseState::new(10).unwrap();
        state.apply_total(30);

        assert!(state.prev_page().is_none());
        assert_eq!(state.next_page().unwrap().page(), 2);
        assert_eq!(state.next_page().unwrap().page(), 3);
        assert!(state.next_page().is_none());
        assert_eq!(state.prev_page().unwrap().page(), 2);
    }

    #[test]
    fn test_page_with_overflowing_offset_rejected() {
        let mut state = BrowseState::new(10).unwrap();

        assert!(state.set_page(500_000_000).is_none());
        assert_eq!(state.current_page(), 1);

        // Largest page whose offset still fits
        let params = state.set_page(429_496_730).unwrap();
        assert_eq!(params.skip(), 4_294_967_290);
        assert_eq!(params.page(), state.current_page());
        assert!(state.next_page().is_none());
    }

    #[test]
    fn test_search_and_category_exclusive() {
        let mut state = BrowseState::new(10).unwrap();

        state.set_category(Some("laptops".to_string()));
        let params = state.set_search_term("phone");
        assert_eq!(params.category(), None);
        assert_eq!(params.search_term(), "phone");

        let params = state.set_category(Some("laptops".to_string()));
        assert_eq!(params.search_term(), "");
        assert_eq!(params.category(), Some("laptops"));
        assert!(!params.is_search());

        // Clearing the search box keeps the category
        let params = state.set_search_term("");
        assert_eq!(params.category(), Some("laptops"));
    }

    #[test]
    fn test_search_forgets_total() {
        let mut state = BrowseState::new(10).unwrap();
        state.apply_total(30);
        state.set_search_term("phone");
        assert_eq!(state.total_pages(), None);

        state.apply_total(30);
        state.set_category(Some("laptops".to_string()));
        assert_eq!(state.total_pages(), None);
        assert_eq!(state.params().category(), Some("laptops"));
    }
}
