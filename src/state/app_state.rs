//! Application state definitions

use super::forms::AnnouncementForm;
use super::pagination::Pagination;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Current view in the application
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Dashboard,
    Students,
    StudentDetail,
    Teachers,
    Announcements,
    AnnouncementCreate,
    Export,
    Config,
}

impl View {
    /// Check if this view is a form view
    pub fn is_form_view(&self) -> bool {
        matches!(self, View::AnnouncementCreate)
    }

    /// Index of the sidebar entry that owns this view
    pub fn sidebar_index(&self) -> usize {
        match self {
            View::Dashboard => 0,
            View::Students | View::StudentDetail => 1,
            View::Teachers => 2,
            View::Announcements | View::AnnouncementCreate => 3,
            View::Export => 4,
            View::Config => 5,
        }
    }
}

/// View parameters for navigation
#[derive(Debug, Clone, Default)]
pub struct ViewParams {
    pub student_id: Option<String>,
}

/// A class (rombongan belajar)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolClass {
    pub id: String,
    pub name: String,
    pub grade_level: u32,
    pub homeroom_teacher: Option<String>,
}

/// Student record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    /// Nomor Induk Siswa
    pub nis: String,
    pub name: String,
    pub class_id: String,
    pub class_name: String,
    pub gender: String,
    pub birth_date: Option<NaiveDate>,
}

/// Teacher record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: String,
    /// Nomor Induk Pegawai
    pub nip: String,
    pub name: String,
    pub subject: String,
    pub email: String,
}

/// Announcement audience
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Audience {
    #[default]
    All,
    Teachers,
    Students,
    Parents,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Teachers => "teachers",
            Self::Students => "students",
            Self::Parents => "parents",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "Semua",
            Self::Teachers => "Guru",
            Self::Students => "Siswa",
            Self::Parents => "Orang Tua",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "teachers" => Self::Teachers,
            "students" => Self::Students,
            "parents" => Self::Parents,
            _ => Self::All,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Self::All => Self::Teachers,
            Self::Teachers => Self::Students,
            Self::Students => Self::Parents,
            Self::Parents => Self::All,
        }
    }
}

/// Announcement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: String,
    pub title: String,
    pub content: String,
    pub audience: Audience,
    pub pinned: bool,
    pub attachment_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Single assessment score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub subject: String,
    pub assessment: String,
    pub score: f64,
    pub semester: String,
}

/// Attendance status codes stored by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Sick,
    Excused,
    Absent,
    Other,
}

impl AttendanceStatus {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "hadir" | "present" => Self::Present,
            "sakit" | "sick" => Self::Sick,
            "izin" | "excused" => Self::Excused,
            "alpa" | "alpha" | "absent" => Self::Absent,
            _ => Self::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Present => "Hadir",
            Self::Sick => "Sakit",
            Self::Excused => "Izin",
            Self::Absent => "Alpa",
            Self::Other => "Lainnya",
        }
    }
}

/// Attendance entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub note: Option<String>,
}

/// Disciplinary violation entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub date: NaiveDate,
    pub description: String,
    pub points: u32,
}

/// Dashboard counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub student_count: u32,
    pub teacher_count: u32,
    pub class_count: u32,
    pub announcement_count: u32,
}

/// Records shown on the student detail view
#[derive(Debug, Clone, Default)]
pub struct StudentRecords {
    pub grades: Vec<GradeRecord>,
    pub attendance: Vec<AttendanceRecord>,
    pub violations: Vec<ViolationRecord>,
}

/// Progress of a running (or finished) bulk export
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ExportStatus {
    #[default]
    Idle,
    Running { completed: usize, total: usize },
    Finished { path: String, pages: usize },
    Failed(String),
}

/// Main application state
#[derive(Default)]
pub struct AppState {
    // Navigation
    pub current_view: View,
    pub view_params: ViewParams,
    pub view_history: Vec<(View, ViewParams)>,

    // Backend
    pub backend_connected: bool,
    pub is_loading: bool,

    // Dashboard
    pub stats: DashboardStats,

    // Classes and students
    pub classes: Vec<SchoolClass>,
    /// Index into `classes`; `None` shows every class
    pub class_filter: Option<usize>,
    pub students: Vec<Student>,
    pub student_pagination: Pagination,
    pub selected_index: usize,
    pub student_records: Option<StudentRecords>,
    pub detail_scroll: u16,

    // Teachers
    pub teachers: Vec<Teacher>,
    pub teacher_pagination: Pagination,

    // Announcements
    pub announcements: Vec<Announcement>,
    pub announcement_form: Option<AnnouncementForm>,
    /// Set while a submitted form is away being published
    pub announcement_submitting: bool,

    // Export
    pub export_status: ExportStatus,

    // Error queue shown as modal dialogs
    pub error_queue: Vec<String>,

    /// Transient feedback shown in the status bar
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(items_per_page: usize) -> Self {
        Self {
            student_pagination: Pagination::new(0, items_per_page),
            teacher_pagination: Pagination::new(0, items_per_page),
            ..Default::default()
        }
    }

    /// Selected class, if a filter is active
    pub fn selected_class(&self) -> Option<&SchoolClass> {
        self.class_filter.and_then(|idx| self.classes.get(idx))
    }

    /// Cycle the class filter: all → first class → ... → last class → all
    pub fn cycle_class_filter(&mut self) {
        self.class_filter = match self.class_filter {
            None if !self.classes.is_empty() => Some(0),
            Some(idx) if idx + 1 < self.classes.len() => Some(idx + 1),
            _ => None,
        };
    }

    /// Replace the student list and keep pagination in range
    pub fn set_students(&mut self, students: Vec<Student>) {
        self.students = students;
        self.student_pagination.set_total_items(self.students.len());
        self.selected_index = 0;
    }

    /// Replace the teacher list and keep pagination in range
    pub fn set_teachers(&mut self, teachers: Vec<Teacher>) {
        self.teachers = teachers;
        self.teacher_pagination.set_total_items(self.teachers.len());
        self.selected_index = 0;
    }

    /// Students on the current page
    pub fn visible_students(&self) -> &[Student] {
        self.student_pagination.paginate(&self.students)
    }

    /// Teachers on the current page
    pub fn visible_teachers(&self) -> &[Teacher] {
        self.teacher_pagination.paginate(&self.teachers)
    }

    /// Student under the cursor on the current page
    pub fn selected_student(&self) -> Option<&Student> {
        self.visible_students().get(self.selected_index)
    }

    /// Move the list cursor down within the current page
    pub fn select_next(&mut self, page_len: usize) {
        if page_len > 0 {
            self.selected_index = (self.selected_index + 1).min(page_len - 1);
        }
    }

    /// Move the list cursor up within the current page
    pub fn select_prev(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    /// Queue an error message for display
    pub fn push_error(&mut self, message: String) {
        self.error_queue.push(message);
    }

    /// Check whether any error is waiting to be shown
    pub fn has_errors(&self) -> bool {
        !self.error_queue.is_empty()
    }

    /// Current (oldest) error message
    pub fn current_error(&self) -> Option<&str> {
        self.error_queue.first().map(String::as_str)
    }

    /// Dismiss the current error
    pub fn dismiss_error(&mut self) {
        if !self.error_queue.is_empty() {
            self.error_queue.remove(0);
        }
    }
}
