//! Sidebar drawing functions

use super::SIDEBAR_ITEMS;
use crate::app::App;
use crate::ui::components::{render_sidebar_button, BUTTON_HEIGHT};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    Frame,
};

/// Draw the sidebar with boxed buttons, centered vertically
pub fn draw_sidebar(frame: &mut Frame, area: Rect, app: &App) {
    let mut constraints = vec![Constraint::Min(0)];
    constraints.extend(SIDEBAR_ITEMS.iter().map(|_| Constraint::Length(BUTTON_HEIGHT)));
    constraints.push(Constraint::Min(0));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    let selected = app.state.current_view.sidebar_index();
    for (idx, label) in SIDEBAR_ITEMS.iter().enumerate() {
        render_sidebar_button(
            frame,
            chunks[idx + 1],
            &(idx + 1).to_string(),
            label,
            idx == selected,
            &app.theme,
        );
    }
}
