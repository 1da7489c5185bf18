//! Field rendering utilities for forms

use crate::state::FieldState;
use crate::ui::components::spinner_frame;
use crate::ui::Theme;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// How a field is edited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Multiline,
    /// Cycled with Space; `display` is the label of the current option
    Select,
    Switch,
}

/// Everything needed to draw one field
pub struct FieldView<'a> {
    pub label: &'a str,
    pub state: &'a FieldState,
    pub kind: FieldKind,
    /// Overrides the raw value, e.g. an option label
    pub display: Option<String>,
    pub required: bool,
    pub is_active: bool,
}

/// Rows a field occupies, including its message line
pub fn field_height(kind: FieldKind) -> u16 {
    match kind {
        FieldKind::Multiline => 7,
        _ => 4,
    }
}

/// Draw a field box with its validation message underneath
pub fn draw_field(frame: &mut Frame, area: Rect, field: FieldView, theme: &Theme, tick: usize) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let has_error = field.state.touched && !field.state.error.is_empty();
    let border_style = if has_error {
        theme.error_text()
    } else {
        theme.border(field.is_active)
    };

    let value = field
        .display
        .clone()
        .unwrap_or_else(|| field.state.value.to_string());
    let cursor = if field.is_active { "▌" } else { "" };
    let cursor_style = Style::default().fg(theme.accent);

    let content = match field.kind {
        FieldKind::Switch => {
            let mark = if field.state.value.as_bool() { "[x] Ya" } else { "[ ] Tidak" };
            Paragraph::new(Line::from(mark))
        }
        FieldKind::Select => Paragraph::new(Line::from(vec![
            Span::raw(value),
            Span::styled("  ‹Spasi›", theme.hint()),
        ])),
        FieldKind::Multiline => {
            let mut lines: Vec<Line> = value.lines().map(|l| Line::from(l.to_string())).collect();
            match lines.last_mut() {
                Some(last) if !value.ends_with('\n') => {
                    last.spans.push(Span::styled(cursor, cursor_style));
                }
                _ => lines.push(Line::from(Span::styled(cursor, cursor_style))),
            }
            Paragraph::new(lines)
        }
        FieldKind::Text => {
            if value.is_empty() && !field.is_active {
                Paragraph::new(Span::styled("(kosong)", theme.hint()))
            } else {
                Paragraph::new(Line::from(vec![
                    Span::raw(value),
                    Span::styled(cursor, cursor_style),
                ]))
            }
        }
    };

    let title = if field.required {
        format!(" {} * ", field.label)
    } else {
        format!(" {} ", field.label)
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);
    frame.render_widget(content.wrap(Wrap { trim: false }).block(block), chunks[0]);

    let message = if field.state.validating {
        Line::from(Span::styled(
            format!(" {} Memeriksa...", spinner_frame(tick)),
            Style::default().fg(theme.warning),
        ))
    } else if has_error {
        Line::from(Span::styled(format!(" {}", field.state.error), theme.error_text()))
    } else {
        Line::from("")
    };
    frame.render_widget(Paragraph::new(message), chunks[1]);
}
