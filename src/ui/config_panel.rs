//! Configuration panel view

use crate::app::App;
use crate::config::PortalConfig;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Draw the effective configuration
pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let config = &app.config;
    let policy = config.retry_policy();

    let entries = [
        ("Alamat backend", app.backend_address().to_string()),
        ("Nama sekolah", config.school_name().to_string()),
        (
            "Semester",
            config.semester.clone().unwrap_or_else(|| "-".to_string()),
        ),
        ("Data per halaman", config.items_per_page().to_string()),
        (
            "Jeda validasi",
            format!("{} ms", config.validation_debounce().as_millis()),
        ),
        ("Batas pengumuman", config.announcement_limit().to_string()),
        ("Percobaan ulang", policy.max_retries.to_string()),
        (
            "Jeda percobaan",
            format!("{} ms", policy.retry_delay.as_millis()),
        ),
        ("Pengali jeda", format!("{}", policy.backoff_multiplier)),
        ("Folder ekspor", config.export_dir().display().to_string()),
    ];

    let mut content = vec![
        Line::from(Span::styled("Konfigurasi Aktif", theme.title())),
        Line::from(""),
    ];
    content.extend(entries.into_iter().map(|(label, value)| {
        Line::from(vec![
            Span::styled(format!("{label:<18}"), theme.label()),
            Span::raw(value),
        ])
    }));

    content.push(Line::from(""));
    let path = PortalConfig::config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(tidak tersedia)".to_string());
    content.push(Line::from(vec![
        Span::styled("Berkas: ", theme.hint()),
        Span::styled(path, theme.hint()),
    ]));

    let paragraph = Paragraph::new(content)
        .block(
            Block::default()
                .title(" Konfigurasi ")
                .borders(Borders::ALL)
                .border_style(theme.border(true)),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.state.detail_scroll, 0));

    frame.render_widget(paragraph, area);
}
