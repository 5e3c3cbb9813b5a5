//! Pagination window calculator
//!
//! Derives the page indicators shown under the product grid: first page,
//! last page, the current page with one neighbour on each side, and a gap
//! marker wherever pages are elided.

use crate::models::view::PageIndicator;

/// Number of pages needed for `total_count` items (`ceil(total / size)`)
pub fn total_pages(total_count: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let pages = total_count.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Clamp `page` into `[1, max(1, total_pages)]`
pub fn clamp_page(page: u32, total_pages: u32) -> u32 {
    page.clamp(1, total_pages.max(1))
}

pub fn has_prev(current_page: u32) -> bool {
    current_page > 1
}

pub fn has_next(current_page: u32, total_pages: u32) -> bool {
    total_pages > 1 && current_page < total_pages
}

/// Ordered page indicators for the pagination bar
///
/// `current_page` must already be clamped with [`clamp_page`]. Page numbers
/// in the output are strictly increasing.
pub fn compute_window(current_page: u32, total_pages: u32) -> Vec<PageIndicator> {
    if total_pages <= 1 {
        return vec![PageIndicator::Page(1)];
    }

    let mut candidates = vec![
        1,
        current_page.saturating_sub(1),
        current_page,
        current_page.saturating_add(1),
        total_pages,
    ];
    candidates.retain(|page| (1..=total_pages).contains(page));
    candidates.sort_unstable();
    candidates.dedup();

    let mut window = Vec::with_capacity(7);
    let mut previous: Option<u32> = None;
    for page in candidates {
        if previous.is_some_and(|prev| page - prev > 1) {
            window.push(PageIndicator::Gap);
        }
        window.push(PageIndicator::Page(page));
        previous = Some(page);
    }

    window
}

#[cfg(test)]
mod tests {
    use super::*;
    use PageIndicator::{Gap, Page};

    fn pages(window: &[PageIndicator]) -> Vec<u32> {
        window
            .iter()
            .filter_map(|indicator| match indicator {
                Page(n) => Some(*n),
                Gap => None,
            })
            .collect()
    }

    #[test]
    fn test_middle_page_window() {
        assert_eq!(
            compute_window(5, 10),
            vec![Page(1), Gap, Page(4), Page(5), Page(6), Gap, Page(10)]
        );
    }

    #[test]
    fn test_small_window_has_no_gaps() {
        assert_eq!(compute_window(1, 3), vec![Page(1), Page(2), Page(3)]);
    }

    #[test]
    fn test_edges() {
        assert_eq!(compute_window(1, 10), vec![Page(1), Page(2), Gap, Page(10)]);
        assert_eq!(compute_window(10, 10), vec![Page(1), Gap, Page(9), Page(10)]);
        // Distance of exactly two from page 1 still gets a gap marker
        assert_eq!(
            compute_window(4, 10),
            vec![Page(1), Gap, Page(3), Page(4), Page(5), Gap, Page(10)]
        );
        assert_eq!(
            compute_window(3, 10),
            vec![Page(1), Page(2), Page(3), Page(4), Gap, Page(10)]
        );
    }

    #[test]
    fn test_single_or_empty_total() {
        for total in [0, 1] {
            assert_eq!(compute_window(1, total), vec![Page(1)]);
            assert!(!has_prev(1));
            assert!(!has_next(1, total));
        }
    }

    #[test]
    fn test_window_strictly_increasing() {
        for total in 1..=25 {
            for current in 1..=total {
                let window = compute_window(current, total);
                let numbers = pages(&window);

                assert!(numbers.windows(2).all(|w| w[0] < w[1]));
                assert_eq!(numbers.first(), Some(&1));
                assert_eq!(numbers.last(), Some(&total));
                assert!(numbers.contains(&current));
                assert_eq!(window, compute_window(current, total));
                // No two gaps in a row, never leading or trailing
                assert!(!window.windows(2).any(|w| w == [Gap, Gap]));
                assert_ne!(window.first(), Some(&Gap));
                assert_ne!(window.last(), Some(&Gap));
            }
        }
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(194, 10), 20);
    }

    #[test]
    fn test_clamp_page() {
        assert_eq!(clamp_page(0, 5), 1);
        assert_eq!(clamp_page(7, 5), 5);
        assert_eq!(clamp_page(3, 0), 1);
        assert_eq!(clamp_page(3, 5), 3);
    }
}
