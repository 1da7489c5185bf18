//! Announcement create form

use super::field_renderer::{draw_field, field_height, FieldKind, FieldView};
use crate::app::App;
use crate::retry::{UploadState, UploadStatus};
use crate::state::{AnnouncementForm, Audience, ANNOUNCEMENT_FIELDS, ANNOUNCEMENT_SUBMIT_ROW};
use crate::ui::components::{render_button_with_spinner, ButtonState, BUTTON_HEIGHT};
use crate::ui::Theme;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

fn field_meta(name: &str) -> (&'static str, FieldKind) {
    match name {
        "title" => ("Judul", FieldKind::Text),
        "content" => ("Isi", FieldKind::Multiline),
        "audience" => ("Sasaran", FieldKind::Select),
        "pinned" => ("Sematkan", FieldKind::Switch),
        _ => ("Lampiran (path file)", FieldKind::Text),
    }
}

/// Draw the announcement create view
pub fn draw_announcement_create(frame: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let block = Block::default()
        .title(" Pengumuman Baru ")
        .borders(Borders::ALL)
        .border_style(theme.border(true));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let upload = app.upload_state();
    match &app.state.announcement_form {
        Some(form) => draw_form(frame, inner, form, upload.as_ref(), app),
        None if app.state.announcement_submitting => {
            draw_submitting(frame, inner, upload.as_ref(), theme, app.tick)
        }
        None => {
            frame.render_widget(
                Paragraph::new(Span::styled("Formulir tidak tersedia.", theme.hint())),
                inner,
            );
        }
    }
}

fn draw_form(
    frame: &mut Frame,
    area: Rect,
    form: &AnnouncementForm,
    upload: Option<&UploadState>,
    app: &App,
) {
    let theme = &app.theme;
    let mut constraints: Vec<Constraint> = ANNOUNCEMENT_FIELDS
        .iter()
        .map(|name| Constraint::Length(field_height(field_meta(name).1)))
        .collect();
    constraints.push(Constraint::Length(BUTTON_HEIGHT));
    constraints.push(Constraint::Length(2));
    constraints.push(Constraint::Min(0));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (index, name) in ANNOUNCEMENT_FIELDS.iter().enumerate() {
        let Some(state) = form.validator.field(name) else {
            continue;
        };
        let (label, kind) = field_meta(name);
        let display = (*name == "audience")
            .then(|| Audience::parse(state.value.as_text()).label().to_string());
        draw_field(
            frame,
            chunks[index],
            FieldView {
                label,
                state,
                kind,
                display,
                required: form
                    .validator
                    .rules_for(name)
                    .is_some_and(|rules| rules.is_required()),
                is_active: form.active_field_index == index,
            },
            theme,
            app.tick,
        );
    }

    let button_area = Rect {
        width: chunks[ANNOUNCEMENT_SUBMIT_ROW].width.min(24),
        ..chunks[ANNOUNCEMENT_SUBMIT_ROW]
    };
    render_button_with_spinner(
        frame,
        button_area,
        "Terbitkan",
        ButtonState {
            selected: form.is_submit_row_active(),
            enabled: !form.validator.is_validating(),
            loading: form.validator.is_submitting(),
        },
        theme,
        app.tick,
        "Mengirim...",
    );

    let status_area = chunks[ANNOUNCEMENT_SUBMIT_ROW + 1];
    if let Some(error) = form.validator.submit_error() {
        frame.render_widget(
            Paragraph::new(Span::styled(error, theme.error_text())),
            status_area,
        );
    } else if let Some(upload) = upload.filter(|u| u.status == UploadStatus::Error) {
        let message = upload
            .error
            .as_ref()
            .map(|e| e.user_message())
            .unwrap_or_default();
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled("Lampiran: ", theme.label()),
                Span::styled(message, theme.error_text()),
            ])),
            status_area,
        );
    }
}

fn draw_submitting(
    frame: &mut Frame,
    area: Rect,
    upload: Option<&UploadState>,
    theme: &Theme,
    tick: usize,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    frame.render_widget(
        Paragraph::new(Span::styled(
            format!("{} Mengirim pengumuman...", crate::ui::components::spinner_frame(tick)),
            Style::default().fg(theme.warning),
        )),
        chunks[0],
    );

    if let Some(upload) = upload.filter(|u| u.status != UploadStatus::Idle) {
        let gauge = Gauge::default()
            .block(
                Block::default()
                    .title(format!(" Lampiran: {} ", upload.status.label()))
                    .borders(Borders::ALL)
                    .border_style(theme.border(false)),
            )
            .gauge_style(Style::default().fg(theme.accent))
            .percent(u16::from(upload.progress.min(100)));
        frame.render_widget(gauge, chunks[1]);
    }

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Esc", theme.key()),
            Span::styled(" batalkan unggahan", theme.hint()),
        ])),
        chunks[2],
    );
}
