//! Reusable UI widget helpers

use crate::state::{PageItem, Pagination};
use crate::ui::Theme;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Table, TableState},
    Frame,
};

/// Render a table that keeps the selected row visible.
pub fn render_scrollable_table(frame: &mut Frame, area: Rect, table: Table, selected_index: usize) {
    let mut table_state = TableState::default().with_selected(Some(selected_index));
    frame.render_stateful_widget(table, area, &mut table_state);
}

/// Pager strip such as `‹ 1 … 4 [5] 6 … 12 ›`
pub fn pager_line<'a>(pagination: &Pagination, theme: &Theme) -> Line<'a> {
    let mut spans = vec![Span::styled(
        "‹ ",
        if pagination.has_prev() {
            theme.key()
        } else {
            theme.hint()
        },
    )];

    for item in pagination.page_window(1) {
        match item {
            PageItem::Page(page) if page == pagination.current_page() => {
                spans.push(Span::styled(format!("[{page}] "), theme.title()));
            }
            PageItem::Page(page) => spans.push(Span::raw(format!("{page} "))),
            PageItem::Ellipsis => spans.push(Span::styled("… ", theme.hint())),
        }
    }

    spans.push(Span::styled(
        "›",
        if pagination.has_next() {
            theme.key()
        } else {
            theme.hint()
        },
    ));
    spans.push(Span::styled(
        format!("  {} data", pagination.total_items()),
        theme.hint(),
    ));
    Line::from(spans)
}
