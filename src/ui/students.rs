//! Student list and detail views

use super::widgets::{pager_line, render_scrollable_table};
use crate::app::App;
use crate::export::{summarize_grades, AttendanceTally};
use crate::state::{Student, StudentRecords};
use crate::ui::Theme;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Table, Wrap},
    Frame,
};

/// Draw the paginated student table
pub fn draw_list(frame: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let class_label = app
        .state
        .selected_class()
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "Semua kelas".to_string());

    let block = Block::default()
        .title(format!(" Siswa - {class_label} "))
        .borders(Borders::ALL)
        .border_style(theme.border(true));

    let students = app.state.visible_students();
    if students.is_empty() {
        let message = if app.state.is_loading {
            "Memuat data siswa..."
        } else {
            "Tidak ada siswa.\nTekan 'c' untuk memilih kelas lain."
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

    let rows = students.iter().map(|s| {
        Row::new(vec![
            s.nis.clone(),
            s.name.clone(),
            s.class_name.clone(),
            s.gender.clone(),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Min(20),
            Constraint::Length(10),
            Constraint::Length(4),
        ],
    )
    .header(Row::new(vec!["NIS", "Nama", "Kelas", "L/P"]).style(theme.title()))
    .row_highlight_style(theme.selected())
    .highlight_symbol("▸ ");

    render_scrollable_table(frame, chunks[0], table, app.state.selected_index);
    frame.render_widget(
        Paragraph::new(pager_line(&app.state.student_pagination, theme)),
        chunks[1],
    );
}

/// Draw the detail view of the selected student
pub fn draw_detail(frame: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let student = app
        .state
        .view_params
        .student_id
        .as_deref()
        .and_then(|id| app.state.students.iter().find(|s| s.id == id));

    let Some(student) = student else {
        frame.render_widget(
            Paragraph::new("Siswa tidak ditemukan.").style(theme.hint()).block(
                Block::default()
                    .title(" Detail Siswa ")
                    .borders(Borders::ALL),
            ),
            area,
        );
        return;
    };

    let content = match &app.state.student_records {
        Some(records) => detail_lines(student, records, theme),
        None => {
            let mut lines = header_lines(student, theme);
            lines.push(Line::from(Span::styled("Memuat data...", theme.hint())));
            lines
        }
    };

    let paragraph = Paragraph::new(content)
        .block(
            Block::default()
                .title(format!(" {} ", student.name))
                .borders(Borders::ALL)
                .border_style(theme.border(true)),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.state.detail_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn header_lines<'a>(student: &Student, theme: &Theme) -> Vec<Line<'a>> {
    let birth_date = student
        .birth_date
        .map(|d| d.format("%d-%m-%Y").to_string())
        .unwrap_or_else(|| "-".to_string());
    vec![
        Line::from(vec![
            Span::styled("NIS: ", theme.label()),
            Span::raw(student.nis.clone()),
            Span::styled("   Kelas: ", theme.label()),
            Span::raw(student.class_name.clone()),
        ]),
        Line::from(vec![
            Span::styled("Jenis kelamin: ", theme.label()),
            Span::raw(student.gender.clone()),
            Span::styled("   Tanggal lahir: ", theme.label()),
            Span::raw(birth_date),
        ]),
        Line::from(""),
    ]
}

fn detail_lines<'a>(student: &Student, records: &StudentRecords, theme: &Theme) -> Vec<Line<'a>> {
    let mut lines = header_lines(student, theme);

    lines.push(Line::from(Span::styled("Nilai", theme.title())));
    let subjects = summarize_grades(&records.grades);
    if subjects.is_empty() {
        lines.push(Line::from(Span::styled("  Belum ada nilai.", theme.hint())));
    }
    for subject in &subjects {
        lines.push(Line::from(vec![
            Span::raw(format!("  {:<24}", subject.subject)),
            Span::raw(format!("{:>6.1}  ", subject.average)),
            Span::styled(subject.letter(), theme.key()),
            Span::styled(format!("  ({} penilaian)", subject.assessments), theme.hint()),
        ]));
    }
    lines.push(Line::from(""));

    lines.push(Line::from(Span::styled("Kehadiran", theme.title())));
    let tally = AttendanceTally::from_records(&records.attendance);
    let summary = tally
        .rows()
        .iter()
        .map(|(label, count)| format!("{label}: {count}"))
        .collect::<Vec<_>>()
        .join("  ");
    lines.push(Line::from(format!("  {summary}")));
    lines.push(Line::from(""));

    lines.push(Line::from(Span::styled("Pelanggaran", theme.title())));
    if records.violations.is_empty() {
        lines.push(Line::from(Span::styled("  Tidak ada pelanggaran.", theme.hint())));
    }
    for violation in &records.violations {
        lines.push(Line::from(vec![
            Span::styled(format!("  {} ", violation.date.format("%d-%m-%Y")), theme.label()),
            Span::raw(violation.description.clone()),
            Span::styled(format!(" ({} poin)", violation.points), theme.error_text()),
        ]));
    }

    lines
}
