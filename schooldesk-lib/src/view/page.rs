//! Pagination over a sorted view

/// One page of a sorted view.
#[derive(Debug, Clone, PartialEq)]
pub struct PageWindow<T> {
    pub items: Vec<T>,
    /// 1-based page number as requested.
    pub page: usize,
    pub total_pages: usize,
}

/// Number of pages needed for `count` items. Always at least 1.
///
/// A `page_size` of zero is treated as one.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1)).max(1)
}

/// Pulls `page` into `1..=total_pages`.
pub fn clamp_page(page: usize, count: usize, page_size: usize) -> usize {
    page.clamp(1, total_pages(count, page_size))
}

/// Slices out one page. An out-of-range page yields an empty window
/// rather than being clamped.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> PageWindow<T> {
    let size = page_size.max(1);
    let start = page.saturating_sub(1).saturating_mul(size);
    let window = items
        .get(start..)
        .map(|rest| rest.iter().take(size).cloned().collect())
        .unwrap_or_default();

    PageWindow {
        items: window,
        page,
        total_pages: total_pages(items.len(), size),
    }
}
