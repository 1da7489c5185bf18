//! Report card export
//!
//! Aggregates each student's grades, attendance and violations and renders
//! one page per student into a single document.

mod bulk;
mod renderer;
mod report;

pub use bulk::{
    export_class_to_file, export_students, ExportOptions, ExportProgress, ExportSummary,
};
pub use renderer::{Block, DocumentRenderer, PdfRenderer};
pub use report::{letter_grade, summarize_grades, AttendanceTally, StudentReport, SubjectSummary};

use crate::retry::user_friendly_error;

/// Export error types
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Tidak ada siswa untuk diekspor")]
    EmptyRoster,

    #[error("Gagal mengambil data {student}: {cause:#}")]
    Fetch {
        student: String,
        cause: anyhow::Error,
    },

    #[error("Gagal membuat PDF: {0}")]
    Render(String),

    #[error("Gagal menyimpan file: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    /// Message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            ExportError::Fetch { student, cause } => {
                format!("Gagal mengambil data {student}. {}", user_friendly_error(cause))
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fetch_error_message_is_classified() {
        let err = ExportError::Fetch {
            student: "Budi".to_string(),
            cause: anyhow!("Failed to fetch"),
        };
        assert_eq!(
            err.user_message(),
            "Gagal mengambil data Budi. Tidak dapat terhubung ke server. Periksa koneksi internet Anda."
        );
        assert_eq!(
            ExportError::EmptyRoster.user_message(),
            "Tidak ada siswa untuk diekspor"
        );
    }
}
