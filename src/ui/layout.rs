//! Layout components (sidebar split, status bar)

use crate::app::App;
use crate::state::View;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Sidebar width in columns
pub const SIDEBAR_WIDTH: u16 = 22;

/// Create the main layout with sidebar
pub fn create_layout(area: Rect) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(SIDEBAR_WIDTH), // Sidebar
            Constraint::Min(0),                // Main content
        ])
        .split(area);

    // Reserve bottom line for status bar
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(chunks[1]);

    let sidebar_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Sidebar content
            Constraint::Length(1), // Status bar continuation
        ])
        .split(chunks[0]);

    (sidebar_chunks[0], main_chunks[0])
}

/// Draw the status bar
pub fn draw_status_bar(frame: &mut Frame, app: &App) {
    let theme = &app.theme;
    let area = frame.area();
    let status_area = Rect {
        x: 0,
        y: area.height.saturating_sub(1),
        width: area.width,
        height: 1,
    };

    let mut spans = vec![];

    // Connection status
    let conn_status = if app.state.backend_connected {
        Span::styled(" ● ", Style::default().fg(theme.success))
    } else {
        Span::styled(" ○ ", Style::default().fg(theme.error))
    };
    spans.push(conn_status);

    if app.state.is_loading {
        spans.push(Span::styled(
            format!("{} Memuat  ", super::components::spinner_frame(app.tick)),
            Style::default().fg(theme.warning),
        ));
    }

    spans.push(Span::styled(
        view_hints(&app.state.current_view),
        theme.hint(),
    ));

    if let Some(msg) = &app.state.status_message {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(msg, Style::default().fg(theme.success)));
    }

    let quit_hint = " ^C:keluar ";

    let status = Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.status_bg));
    frame.render_widget(status, status_area);

    let quit_area = Rect {
        x: area.width.saturating_sub(quit_hint.len() as u16),
        y: area.height.saturating_sub(1),
        width: quit_hint.len() as u16,
        height: 1,
    };
    let quit_widget = Paragraph::new(quit_hint).style(Style::default().bg(theme.status_bg));
    frame.render_widget(quit_widget, quit_area);
}

/// Keyboard hints for the current view
fn view_hints(view: &View) -> String {
    match view {
        View::Dashboard => "1-6:menu  r:muat ulang".to_string(),
        View::Students => "j/k:pilih  h/l:halaman  c:kelas  Enter:detail  r:muat ulang".to_string(),
        View::StudentDetail => "j/k:gulir  Esc:kembali".to_string(),
        View::Teachers => "j/k:pilih  h/l:halaman  r:muat ulang".to_string(),
        View::Announcements => "n:baru  r:muat ulang".to_string(),
        View::AnnouncementCreate => format!(
            "Tab:berikut  Spasi:ubah  {}:kirim  Esc:batal",
            crate::platform::SUBMIT_SHORTCUT
        ),
        View::Export => "c:kelas  Enter:ekspor  Esc:batalkan".to_string(),
        View::Config => "j/k:gulir".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_layout_reserves_sidebar_and_status_bar() {
        let (sidebar, main) = create_layout(Rect::new(0, 0, 100, 30));
        assert_eq!(sidebar.width, SIDEBAR_WIDTH);
        assert_eq!(main.x, SIDEBAR_WIDTH);
        assert_eq!(main.height, 29);
    }

    #[test]
    fn test_form_hint_shows_submit_shortcut() {
        assert!(view_hints(&View::AnnouncementCreate).contains("Ctrl+S"));
    }
}
