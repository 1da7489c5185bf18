//! Announcement list view

use crate::app::App;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

/// Draw the announcement list, pinned entries first
pub fn draw_list(frame: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let block = Block::default()
        .title(" Pengumuman ")
        .borders(Borders::ALL)
        .border_style(theme.border(true));

    if app.state.announcements.is_empty() {
        let message = if app.state.is_loading {
            "Memuat pengumuman..."
        } else {
            "Belum ada pengumuman.\nTekan 'n' untuk membuat pengumuman baru."
        };
        frame.render_widget(
            Paragraph::new(message).style(theme.hint()).block(block),
            area,
        );
        return;
    }

    let mut announcements: Vec<_> = app.state.announcements.iter().collect();
    announcements.sort_by_key(|a| !a.pinned);

    let items: Vec<ListItem> = announcements
        .into_iter()
        .map(|a| {
            let mut header = vec![Span::styled(
                format!("{} ", a.created_at.format("%d-%m-%Y %H:%M")),
                theme.label(),
            )];
            if a.pinned {
                header.push(Span::styled("[Disematkan] ", Style::default().fg(theme.warning)));
            }
            header.push(Span::styled(a.title.clone(), theme.title()));
            header.push(Span::styled(format!("  untuk {}", a.audience.label()), theme.hint()));

            let mut lines = vec![Line::from(header)];
            let preview: String = a.content.lines().next().unwrap_or_default().chars().take(100).collect();
            lines.push(Line::from(format!("  {preview}")));
            if let Some(url) = &a.attachment_url {
                lines.push(Line::from(Span::styled(format!("  Lampiran: {url}"), theme.hint())));
            }
            ListItem::new(lines)
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}
