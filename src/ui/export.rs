//! Report export view

use crate::app::App;
use crate::state::ExportStatus;
use crate::ui::components::{render_button_with_spinner, ButtonState, BUTTON_HEIGHT};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let block = Block::default()
        .title(" Ekspor Rapor ")
        .borders(Borders::ALL)
        .border_style(theme.border(true));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(BUTTON_HEIGHT),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(inner);

    let class_label = app
        .state
        .selected_class()
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "(belum dipilih, tekan 'c')".to_string());
    let semester = app.config.semester.as_deref().unwrap_or("semua semester");
    let info = vec![
        Line::from(vec![
            Span::styled("Sekolah:  ", theme.label()),
            Span::raw(app.config.school_name().to_string()),
        ]),
        Line::from(vec![
            Span::styled("Kelas:    ", theme.label()),
            Span::raw(class_label),
        ]),
        Line::from(vec![
            Span::styled("Semester: ", theme.label()),
            Span::raw(semester.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Folder:   ", theme.label()),
            Span::raw(app.config.export_dir().display().to_string()),
        ]),
    ];
    frame.render_widget(Paragraph::new(info), chunks[0]);

    let running = matches!(app.state.export_status, ExportStatus::Running { .. });
    let button_area = Rect {
        width: chunks[1].width.min(28),
        ..chunks[1]
    };
    render_button_with_spinner(
        frame,
        button_area,
        "Ekspor PDF",
        ButtonState {
            selected: true,
            enabled: app.state.selected_class().is_some(),
            loading: running,
        },
        theme,
        app.tick,
        "Mengekspor...",
    );

    match &app.state.export_status {
        ExportStatus::Idle => {}
        ExportStatus::Running { completed, total } => {
            let ratio = if *total == 0 {
                0.0
            } else {
                *completed as f64 / *total as f64
            };
            let gauge = Gauge::default()
                .block(Block::default().borders(Borders::ALL).border_style(theme.border(false)))
                .gauge_style(Style::default().fg(theme.accent))
                .ratio(ratio.clamp(0.0, 1.0))
                .label(format!("{completed}/{total} siswa"));
            frame.render_widget(gauge, chunks[2]);
        }
        ExportStatus::Finished { path, pages } => {
            let message = Paragraph::new(vec![
                Line::from(Span::styled(
                    format!("Selesai: {pages} halaman"),
                    Style::default().fg(theme.success),
                )),
                Line::from(Span::raw(path.clone())),
            ])
            .wrap(Wrap { trim: false });
            frame.render_widget(message, chunks[2]);
        }
        ExportStatus::Failed(error) => {
            let message = Paragraph::new(Span::styled(error.clone(), theme.error_text()))
                .wrap(Wrap { trim: false });
            frame.render_widget(message, chunks[2]);
        }
    }
}
