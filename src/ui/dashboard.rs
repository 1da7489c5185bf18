//! Dashboard view

use crate::app::App;
use crate::ui::Theme;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

/// Draw the dashboard: headline counts over the latest announcements
pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(0)])
        .split(area);

    let stats = &app.state.stats;
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(chunks[0]);

    let counters = [
        ("Siswa", stats.student_count),
        ("Guru", stats.teacher_count),
        ("Kelas", stats.class_count),
        ("Pengumuman", stats.announcement_count),
    ];
    for ((label, count), card) in counters.iter().zip(cards.iter()) {
        draw_counter(frame, *card, label, *count, &app.theme);
    }

    draw_latest_announcements(frame, chunks[1], app);
}

fn draw_counter(frame: &mut Frame, area: Rect, label: &str, count: u32, theme: &Theme) {
    let content = vec![
        Line::from(Span::styled(
            count.to_string(),
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(label.to_string(), theme.label())),
    ];
    let card = Paragraph::new(content).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border(false)),
    );
    frame.render_widget(card, area);
}

fn draw_latest_announcements(frame: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let block = Block::default()
        .title(" Pengumuman Terbaru ")
        .borders(Borders::ALL)
        .border_style(theme.border(true));

    if app.state.announcements.is_empty() {
        let message = if app.state.is_loading {
            "Memuat..."
        } else {
            "Belum ada pengumuman."
        };
        frame.render_widget(
            Paragraph::new(Span::styled(message, theme.hint())).block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = app
        .state
        .announcements
        .iter()
        .map(|a| {
            let mut spans = vec![Span::styled(
                format!("{} ", a.created_at.format("%d-%m-%Y")),
                theme.label(),
            )];
            if a.pinned {
                spans.push(Span::styled("[Disematkan] ", Style::default().fg(theme.warning)));
            }
            spans.push(Span::raw(a.title.clone()));
            spans.push(Span::styled(format!("  ({})", a.audience.label()), theme.hint()));
            ListItem::new(Line::from(spans))
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}
