//! Button component for TUI

use crate::ui::Theme;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Button height in rows (top border + content + bottom border)
pub const BUTTON_HEIGHT: u16 = 3;

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// Spinner frame for a tick counter
pub fn spinner_frame(tick: usize) -> &'static str {
    SPINNER[tick % SPINNER.len()]
}

/// Visual state of a button
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonState {
    pub selected: bool,
    pub enabled: bool,
    /// Replace the label with a spinner and `loading_label`
    pub loading: bool,
}

/// Render a generic button with border
pub fn render_button(
    frame: &mut Frame,
    area: Rect,
    content: &str,
    state: ButtonState,
    theme: &Theme,
) {
    render_button_with_spinner(frame, area, content, state, theme, 0, "");
}

/// Render a button that shows a spinner while loading
pub fn render_button_with_spinner(
    frame: &mut Frame,
    area: Rect,
    content: &str,
    state: ButtonState,
    theme: &Theme,
    tick: usize,
    loading_label: &str,
) {
    let border_style = theme.border(state.selected);

    let text_style = if state.loading {
        Style::default().fg(theme.warning)
    } else if state.selected {
        Style::default()
            .fg(theme.accent)
            .add_modifier(Modifier::BOLD)
    } else if !state.enabled {
        Style::default().fg(theme.muted)
    } else {
        Style::default()
    };

    let text = if state.loading {
        format!(" {} {loading_label} ", spinner_frame(tick))
    } else {
        format!(" {content} ")
    };

    let paragraph = Paragraph::new(text).style(text_style);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);

    frame.render_widget(paragraph.block(block), area);
}

/// Render a sidebar button with key and label
pub fn render_sidebar_button(
    frame: &mut Frame,
    area: Rect,
    key: &str,
    label: &str,
    is_selected: bool,
    theme: &Theme,
) {
    let content = format!("{key} {label}");
    render_button(
        frame,
        area,
        &content,
        ButtonState {
            selected: is_selected,
            enabled: true,
            loading: false,
        },
        theme,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_cycles() {
        assert_eq!(spinner_frame(0), "|");
        assert_eq!(spinner_frame(5), "/");
    }
}
