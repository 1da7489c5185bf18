//! Teacher list view

use super::widgets::{pager_line, render_scrollable_table};
use crate::app::App;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    widgets::{Block, Borders, Paragraph, Row, Table},
    Frame,
};

pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let block = Block::default()
        .title(" Guru ")
        .borders(Borders::ALL)
        .border_style(theme.border(true));

    let teachers = app.state.visible_teachers();
    if teachers.is_empty() {
        let message = if app.state.is_loading {
            "Memuat data guru..."
        } else {
            "Tidak ada guru."
        };
        frame.render_widget(
            Paragraph::new(message).style(theme.hint()).block(block),
            area,
        );
        return;
    }

    let inner = block.inner(area);
    frame.render_widget(block, area);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(inner);

    let rows = teachers.iter().map(|t| {
        Row::new(vec![
            t.nip.clone(),
            t.name.clone(),
            t.subject.clone(),
            t.email.clone(),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Length(20),
            Constraint::Min(20),
            Constraint::Length(18),
            Constraint::Min(16),
        ],
    )
    .header(Row::new(vec!["NIP", "Nama", "Mata Pelajaran", "Email"]).style(theme.title()))
    .row_highlight_style(theme.selected())
    .highlight_symbol("▸ ");

    render_scrollable_table(frame, chunks[0], table, app.state.selected_index);
    frame.render_widget(
        Paragraph::new(pager_line(&app.state.teacher_pagination, theme)),
        chunks[1],
    );
}
