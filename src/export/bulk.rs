//! Bulk report export across a class roster

use super::renderer::{DocumentRenderer, PdfRenderer};
use super::report::StudentReport;
use super::ExportError;
use crate::backend::BackendClientTrait;
use crate::state::{Student, StudentRecords};
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};

/// Fixed content of every page in an export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub school_name: String,
    pub class_name: String,
    /// Limit grades to one semester
    pub semester: Option<String>,
    /// Homeroom teacher note printed at the end of each page
    pub teacher_note: Option<String>,
    pub generated_on: NaiveDate,
}

/// Reported after each student completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportProgress {
    pub completed: usize,
    pub total: usize,
    pub student: String,
}

/// Result of an export written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub students: usize,
    pub pages: usize,
}

/// Render one page per student, in roster order.
///
/// Records are fetched student by student; the first fetch error aborts the
/// export. Returns the number of students rendered.
pub async fn export_students<B, R, P>(
    backend: &mut B,
    students: &[Student],
    options: &ExportOptions,
    renderer: &mut R,
    mut on_progress: P,
) -> Result<usize, ExportError>
where
    B: BackendClientTrait + ?Sized,
    R: DocumentRenderer + ?Sized,
    P: FnMut(ExportProgress),
{
    if students.is_empty() {
        return Err(ExportError::EmptyRoster);
    }

    let total = students.len();
    for (index, student) in students.iter().enumerate() {
        let records = fetch_records(backend, student, options.semester.clone()).await?;
        let report = StudentReport::build(student.clone(), records);

        if index > 0 {
            renderer.start_page();
        }
        render_report(renderer, &report, options);

        tracing::debug!("Exported report {}/{total} ({})", index + 1, student.name);
        on_progress(ExportProgress {
            completed: index + 1,
            total,
            student: student.name.clone(),
        });
    }

    Ok(total)
}

/// Export a class to a PDF file in `dir`
pub async fn export_class_to_file<B, P>(
    backend: &mut B,
    students: &[Student],
    options: &ExportOptions,
    dir: &Path,
    on_progress: P,
) -> Result<ExportSummary, ExportError>
where
    B: BackendClientTrait + ?Sized,
    P: FnMut(ExportProgress),
{
    let title = format!("Rapor {}", options.class_name);
    let mut renderer = PdfRenderer::new(&title);
    let count = export_students(backend, students, options, &mut renderer, on_progress).await?;
    let bytes = renderer.finish()?;

    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(export_file_name(&options.class_name));
    tokio::fs::write(&path, bytes).await?;

    tracing::info!("Wrote {} student reports to {}", count, path.display());
    Ok(ExportSummary {
        path,
        students: count,
        pages: renderer.page_count(),
    })
}

async fn fetch_records<B>(
    backend: &mut B,
    student: &Student,
    semester: Option<String>,
) -> Result<StudentRecords, ExportError>
where
    B: BackendClientTrait + ?Sized,
{
    let fetch_error = |cause: anyhow::Error| ExportError::Fetch {
        student: student.name.clone(),
        cause,
    };

    let grades = backend
        .list_grades(&student.id, semester)
        .await
        .map_err(fetch_error)?;
    let attendance = backend
        .list_attendance(&student.id)
        .await
        .map_err(fetch_error)?;
    let violations = backend
        .list_violations(&student.id)
        .await
        .map_err(fetch_error)?;

    Ok(StudentRecords {
        grades,
        attendance,
        violations,
    })
}

fn render_report<R: DocumentRenderer + ?Sized>(
    renderer: &mut R,
    report: &StudentReport,
    options: &ExportOptions,
) {
    let student = &report.student;

    renderer.heading(&options.school_name, 1);
    match &options.semester {
        Some(semester) => renderer.text(&format!("Laporan Hasil Belajar Semester {semester}")),
        None => renderer.text("Laporan Hasil Belajar"),
    }
    renderer.spacer(4.0);

    renderer.heading("Data Siswa", 2);
    renderer.table(
        &["Nama", "NIS", "Kelas", "Jenis Kelamin"],
        vec![vec![
            student.name.clone(),
            student.nis.clone(),
            options.class_name.clone(),
            student.gender.clone(),
        ]],
    );
    renderer.spacer(4.0);

    renderer.heading("Nilai", 2);
    if report.subjects.is_empty() {
        renderer.text("Belum ada nilai.");
    } else {
        let rows = report
            .subjects
            .iter()
            .map(|s| {
                vec![
                    s.subject.clone(),
                    s.assessments.to_string(),
                    format!("{:.1}", s.average),
                    s.letter().to_string(),
                ]
            })
            .collect();
        renderer.table(&["Mata Pelajaran", "Penilaian", "Rata-rata", "Predikat"], rows);
        if let Some(average) = report.overall_average() {
            renderer.text(&format!("Rata-rata keseluruhan: {average:.1}"));
        }
    }
    renderer.spacer(4.0);

    renderer.heading("Kehadiran", 2);
    let mut rows: Vec<Vec<String>> = report
        .attendance
        .rows()
        .iter()
        .map(|(label, count)| vec![label.to_string(), count.to_string()])
        .collect();
    rows.push(vec!["Total".to_string(), report.attendance.total().to_string()]);
    renderer.table(&["Status", "Jumlah"], rows);
    renderer.spacer(4.0);

    renderer.heading("Pelanggaran", 2);
    if report.violations.is_empty() {
        renderer.text("Tidak ada pelanggaran.");
    } else {
        let rows = report
            .violations
            .iter()
            .map(|v| {
                vec![
                    v.date.format("%d-%m-%Y").to_string(),
                    v.description.clone(),
                    v.points.to_string(),
                ]
            })
            .collect();
        renderer.table(&["Tanggal", "Keterangan", "Poin"], rows);
        renderer.text(&format!("Total poin: {}", report.violation_points()));
    }

    if let Some(note) = options.teacher_note.as_deref().filter(|n| !n.trim().is_empty()) {
        renderer.spacer(4.0);
        renderer.heading("Catatan Wali Kelas", 2);
        renderer.text(note);
    }

    renderer.spacer(8.0);
    renderer.text(&format!(
        "Dicetak pada {}",
        options.generated_on.format("%d-%m-%Y")
    ));
}

fn export_file_name(class_name: &str) -> String {
    let slug: String = class_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    format!(
        "rapor-{}-{}.pdf",
        slug.trim_matches('-'),
        Local::now().format("%Y%m%d-%H%M%S")
    )
}
