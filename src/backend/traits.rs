//! Trait abstraction for the backend client to enable mocking in tests

use crate::state::{
    Announcement, AttendanceRecord, DashboardStats, GradeRecord, SchoolClass, Student, Teacher,
    ViolationRecord,
};
use anyhow::Result;
use async_trait::async_trait;

/// Announcement to be created on the backend
#[derive(Debug, Clone, PartialEq)]
pub struct CreateAnnouncement {
    pub title: String,
    pub content: String,
    pub audience: String,
    pub pinned: bool,
    pub attachment_url: Option<String>,
}

/// Trait for backend operations, enabling mocking in tests
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackendClientTrait: Send + Sync {
    /// Check if the backend is reachable
    async fn check_connection(&self) -> bool;

    /// Headline counts for the dashboard
    async fn get_dashboard_stats(&mut self) -> Result<DashboardStats>;

    async fn list_classes(&mut self) -> Result<Vec<SchoolClass>>;

    /// List students, optionally limited to one class
    async fn list_students(&mut self, class_id: Option<String>) -> Result<Vec<Student>>;

    async fn list_teachers(&mut self) -> Result<Vec<Teacher>>;

    /// Latest announcements, newest first
    async fn list_announcements(&mut self, limit: u32) -> Result<Vec<Announcement>>;

    /// Create an announcement and return its id
    async fn create_announcement(&mut self, announcement: CreateAnnouncement) -> Result<String>;

    async fn announcement_title_exists(&mut self, title: &str) -> Result<bool>;

    /// Grades of a student, optionally limited to one semester
    async fn list_grades(
        &mut self,
        student_id: &str,
        semester: Option<String>,
    ) -> Result<Vec<GradeRecord>>;

    async fn list_attendance(&mut self, student_id: &str) -> Result<Vec<AttendanceRecord>>;

    async fn list_violations(&mut self, student_id: &str) -> Result<Vec<ViolationRecord>>;

    /// Store a file and return its public URL
    async fn upload_file(
        &mut self,
        bucket: &str,
        path: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<String>;
}
