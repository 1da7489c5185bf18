//! Error dialog component

use super::base::{render_dialog, DialogConfig};
use crate::ui::Theme;
use ratatui::{text::Span, Frame};

/// Render an error dialog overlay centered on the screen. `can_retry`
/// adds the key that runs the failed load again.
pub fn render_error_dialog(frame: &mut Frame, error_message: &str, can_retry: bool, theme: &Theme) {
    let mut hint = vec![
        Span::raw("Tekan "),
        Span::styled("Enter", theme.key()),
        Span::raw(" atau "),
        Span::styled("Esc", theme.key()),
        Span::raw(" untuk menutup"),
    ];
    if can_retry {
        hint.push(Span::raw(", "));
        hint.push(Span::styled("r", theme.key()));
        hint.push(Span::raw(" coba lagi"));
    }

    render_dialog(
        frame,
        DialogConfig {
            title: "Terjadi Kesalahan",
            title_color: theme.error,
            border_color: theme.error,
            background: theme.dialog_bg,
            message: error_message,
            hint: Some(hint),
            max_width: 60,
        },
    );
}
