//! UI module for rendering the TUI

mod announcements;
mod components;
mod config_panel;
mod dashboard;
mod export;
mod forms;
mod layout;
mod sidebar;
mod students;
mod teachers;
mod theme;
mod widgets;

pub use theme::Theme;

use crate::app::App;
use crate::state::View;
use ratatui::Frame;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Draw the main layout with sidebar
    let (sidebar_area, main_area) = layout::create_layout(area);

    sidebar::draw_sidebar(frame, sidebar_area, app);

    // Draw main content based on current view
    match &app.state.current_view {
        View::Dashboard => dashboard::draw(frame, main_area, app),
        View::Students => students::draw_list(frame, main_area, app),
        View::StudentDetail => students::draw_detail(frame, main_area, app),
        View::Teachers => teachers::draw(frame, main_area, app),
        View::Announcements => announcements::draw_list(frame, main_area, app),
        View::AnnouncementCreate => forms::draw_announcement_create(frame, main_area, app),
        View::Export => export::draw(frame, main_area, app),
        View::Config => config_panel::draw(frame, main_area, app),
    }

    layout::draw_status_bar(frame, app);

    // Error dialog goes on top of everything
    if let Some(message) = app.state.current_error() {
        components::render_error_dialog(frame, message, app.can_retry_load(), &app.theme);
    }
}
