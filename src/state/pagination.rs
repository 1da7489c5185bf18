//! Page bookkeeping for list views

use std::ops::Range;

/// Default number of rows per page
pub const DEFAULT_ITEMS_PER_PAGE: usize = 10;

/// Entry in the pager strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(usize),
    Ellipsis,
}

/// Pagination state for a list of `total_items` rows.
///
/// Pages are 1-indexed. The current page is corrected whenever the inputs
/// change, so reads never observe an out-of-range page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    total_items: usize,
    items_per_page: usize,
    current_page: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(0, DEFAULT_ITEMS_PER_PAGE)
    }
}

impl Pagination {
    pub fn new(total_items: usize, items_per_page: usize) -> Self {
        Self {
            total_items,
            items_per_page: items_per_page.max(1),
            current_page: 1,
        }
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Number of pages; zero for an empty list
    pub fn total_pages(&self) -> usize {
        self.total_items.div_ceil(self.items_per_page)
    }

    /// Highest page that may be selected (1 even when the list is empty)
    fn last_page(&self) -> usize {
        self.total_pages().max(1)
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }

    /// Jump to `page`, clamped to the valid range
    pub fn go_to_page(&mut self, page: usize) {
        self.current_page = page.clamp(1, self.last_page());
    }

    pub fn next_page(&mut self) {
        if self.has_next() {
            self.current_page += 1;
        }
    }

    pub fn prev_page(&mut self) {
        if self.has_prev() {
            self.current_page -= 1;
        }
    }

    pub fn first_page(&mut self) {
        self.current_page = 1;
    }

    pub fn last(&mut self) {
        self.current_page = self.last_page();
    }

    /// Change the page size; restarts at page 1
    pub fn set_items_per_page(&mut self, items_per_page: usize) {
        self.items_per_page = items_per_page.max(1);
        self.current_page = 1;
    }

    /// Update the row count, pulling the current page back into range
    pub fn set_total_items(&mut self, total_items: usize) {
        self.total_items = total_items;
        if self.current_page > self.last_page() {
            self.current_page = self.last_page();
        }
    }

    /// Index range of the rows on the current page
    pub fn range(&self) -> Range<usize> {
        let start = (self.current_page - 1) * self.items_per_page;
        let start = start.min(self.total_items);
        let end = (start + self.items_per_page).min(self.total_items);
        start..end
    }

    /// Slice of `items` on the current page
    pub fn paginate<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let range = self.range();
        let end = range.end.min(items.len());
        let start = range.start.min(end);
        &items[start..end]
    }

    /// Page numbers for the pager strip: first, last, and `siblings` pages
    /// either side of the current one, with gaps collapsed into ellipses.
    pub fn page_window(&self, siblings: usize) -> Vec<PageItem> {
        let total = self.total_pages();
        // first + last + current + siblings on both sides + two ellipses
        if total <= 5 + siblings * 2 {
            return (1..=total).map(PageItem::Page).collect();
        }

        let left = self.current_page.saturating_sub(siblings).max(1);
        let right = (self.current_page + siblings).min(total);
        let show_left_gap = left > 2;
        let show_right_gap = right < total - 1;

        let mut items = Vec::new();
        match (show_left_gap, show_right_gap) {
            (false, true) => {
                let count = 3 + siblings * 2;
                items.extend((1..=count).map(PageItem::Page));
                items.push(PageItem::Ellipsis);
                items.push(PageItem::Page(total));
            }
            (true, false) => {
                let count = 3 + siblings * 2;
                items.push(PageItem::Page(1));
                items.push(PageItem::Ellipsis);
                items.extend((total + 1 - count..=total).map(PageItem::Page));
            }
            _ => {
                items.push(PageItem::Page(1));
                items.push(PageItem::Ellipsis);
                items.extend((left..=right).map(PageItem::Page));
                items.push(PageItem::Ellipsis);
                items.push(PageItem::Page(total));
            }
        }
        items
    }
}
