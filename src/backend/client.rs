//! gRPC client for communicating with the Portal Guru backend
//!
//! Wraps the generated tonic client and maps proto messages onto the
//! domain records in `crate::state`.

use super::traits::{BackendClientTrait, CreateAnnouncement};
use crate::state::{
    Announcement, AttendanceRecord, AttendanceStatus, Audience, DashboardStats, GradeRecord,
    SchoolClass, Student, Teacher, ViolationRecord,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

// Include the generated proto types
pub mod proto {
    tonic::include_proto!("portal");
}

use proto::portal_backend_client::PortalBackendClient;

/// Default backend address
pub const DEFAULT_ADDRESS: &str = "http://127.0.0.1:50061";

/// Environment variable overriding the configured address
pub const ADDRESS_ENV: &str = "PORTAL_GURU_BACKEND_ADDRESS";

/// Client for communicating with the backend
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Option<PortalBackendClient<tonic::transport::Channel>>,
    address: String,
}

impl BackendClient {
    /// Create a client, trying to connect right away. An unreachable backend
    /// is not an error; the connection is retried on the next call.
    pub async fn new(configured_address: Option<&str>) -> Result<Self> {
        let address = std::env::var(ADDRESS_ENV)
            .ok()
            .or_else(|| configured_address.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());

        let client = match PortalBackendClient::connect(address.clone()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!("Backend at {address} not reachable: {e}");
                None
            }
        };

        Ok(Self { client, address })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Ensure connection is established
    async fn ensure_connected(
        &mut self,
    ) -> Result<&mut PortalBackendClient<tonic::transport::Channel>> {
        if self.client.is_none() {
            self.client = Some(
                PortalBackendClient::connect(self.address.clone())
                    .await
                    .map_err(|e| anyhow!("Failed to connect to backend: {}", e))?,
            );
        }
        self.client.as_mut().ok_or_else(|| anyhow!("Client not connected"))
    }
}

#[async_trait]
impl BackendClientTrait for BackendClient {
    async fn check_connection(&self) -> bool {
        self.client.is_some()
    }

    async fn get_dashboard_stats(&mut self) -> Result<DashboardStats> {
        let client = self.ensure_connected().await?;

        let stats = client
            .get_dashboard_stats(proto::GetDashboardStatsRequest {})
            .await
            .context("Failed to load dashboard stats")?
            .into_inner();

        Ok(DashboardStats {
            student_count: stats.student_count,
            teacher_count: stats.teacher_count,
            class_count: stats.class_count,
            announcement_count: stats.announcement_count,
        })
    }

    async fn list_classes(&mut self) -> Result<Vec<SchoolClass>> {
        let client = self.ensure_connected().await?;

        let response = client
            .list_classes(proto::ListClassesRequest {})
            .await
            .context("Failed to list classes")?;

        let classes = response
            .into_inner()
            .classes
            .into_iter()
            .map(|c| SchoolClass {
                id: c.id,
                name: c.name,
                grade_level: c.grade_level,
                homeroom_teacher: non_empty(c.homeroom_teacher),
            })
            .collect();

        Ok(classes)
    }

    async fn list_students(&mut self, class_id: Option<String>) -> Result<Vec<Student>> {
        let client = self.ensure_connected().await?;

        let request = tonic::Request::new(proto::ListStudentsRequest {
            class_id: class_id.unwrap_or_default(),
        });

        let response = client
            .list_students(request)
            .await
            .context("Failed to list students")?;

        let students = response
            .into_inner()
            .students
            .into_iter()
            .map(|s| Student {
                birth_date: parse_date(&s.birth_date),
                id: s.id,
                nis: s.nis,
                name: s.name,
                class_id: s.class_id,
                class_name: s.class_name,
                gender: s.gender,
            })
            .collect();

        Ok(students)
    }

    async fn list_teachers(&mut self) -> Result<Vec<Teacher>> {
        let client = self.ensure_connected().await?;

        let response = client
            .list_teachers(proto::ListTeachersRequest {})
            .await
            .context("Failed to list teachers")?;

        let teachers = response
            .into_inner()
            .teachers
            .into_iter()
            .map(|t| Teacher {
                id: t.id,
                nip: t.nip,
                name: t.name,
                subject: t.subject,
                email: t.email,
            })
            .collect();

        Ok(teachers)
    }

    async fn list_announcements(&mut self, limit: u32) -> Result<Vec<Announcement>> {
        let client = self.ensure_connected().await?;

        let response = client
            .list_announcements(proto::ListAnnouncementsRequest { limit })
            .await
            .context("Failed to list announcements")?;

        let announcements = response
            .into_inner()
            .announcements
            .into_iter()
            .map(|a| Announcement {
                audience: Audience::parse(&a.audience),
                created_at: parse_timestamp(&a.created_at),
                attachment_url: non_empty(a.attachment_url),
                id: a.id,
                title: a.title,
                content: a.content,
                pinned: a.pinned,
            })
            .collect();

        Ok(announcements)
    }

    async fn create_announcement(&mut self, announcement: CreateAnnouncement) -> Result<String> {
        let client = self.ensure_connected().await?;

        let request = tonic::Request::new(proto::CreateAnnouncementRequest {
            title: announcement.title,
            content: announcement.content,
            audience: announcement.audience,
            pinned: announcement.pinned,
            attachment_url: announcement.attachment_url.unwrap_or_default(),
        });

        let response = client
            .create_announcement(request)
            .await
            .context("Failed to create announcement")?;

        Ok(response.into_inner().id)
    }

    async fn announcement_title_exists(&mut self, title: &str) -> Result<bool> {
        let client = self.ensure_connected().await?;

        let request = tonic::Request::new(proto::AnnouncementTitleExistsRequest {
            title: title.to_string(),
        });

        let response = client
            .announcement_title_exists(request)
            .await
            .context("Failed to check announcement title")?;

        Ok(response.into_inner().exists)
    }

    async fn list_grades(
        &mut self,
        student_id: &str,
        semester: Option<String>,
    ) -> Result<Vec<GradeRecord>> {
        let client = self.ensure_connected().await?;

        let request = tonic::Request::new(proto::ListGradesRequest {
            student_id: student_id.to_string(),
            semester: semester.unwrap_or_default(),
        });

        let response = client
            .list_grades(request)
            .await
            .with_context(|| format!("Failed to list grades of {student_id}"))?;

        let grades = response
            .into_inner()
            .grades
            .into_iter()
            .map(|g| GradeRecord {
                subject: g.subject,
                assessment: g.assessment,
                score: g.score,
                semester: g.semester,
            })
            .collect();

        Ok(grades)
    }

    async fn list_attendance(&mut self, student_id: &str) -> Result<Vec<AttendanceRecord>> {
        let client = self.ensure_connected().await?;

        let request = tonic::Request::new(proto::ListAttendanceRequest {
            student_id: student_id.to_string(),
        });

        let response = client
            .list_attendance(request)
            .await
            .with_context(|| format!("Failed to list attendance of {student_id}"))?;

        let records = response
            .into_inner()
            .records
            .into_iter()
            .filter_map(|r| {
                let Some(date) = parse_date(&r.date) else {
                    tracing::warn!("Skipping attendance record with bad date {:?}", r.date);
                    return None;
                };
                Some(AttendanceRecord {
                    date,
                    status: AttendanceStatus::parse(&r.status),
                    note: non_empty(r.note),
                })
            })
            .collect();

        Ok(records)
    }

    async fn list_violations(&mut self, student_id: &str) -> Result<Vec<ViolationRecord>> {
        let client = self.ensure_connected().await?;

        let request = tonic::Request::new(proto::ListViolationsRequest {
            student_id: student_id.to_string(),
        });

        let response = client
            .list_violations(request)
            .await
            .with_context(|| format!("Failed to list violations of {student_id}"))?;

        let violations = response
            .into_inner()
            .violations
            .into_iter()
            .filter_map(|v| {
                let Some(date) = parse_date(&v.date) else {
                    tracing::warn!("Skipping violation record with bad date {:?}", v.date);
                    return None;
                };
                Some(ViolationRecord {
                    date,
                    description: v.description,
                    points: v.points,
                })
            })
            .collect();

        Ok(violations)
    }

    async fn upload_file(
        &mut self,
        bucket: &str,
        path: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<String> {
        let client = self.ensure_connected().await?;

        let request = tonic::Request::new(proto::UploadFileRequest {
            bucket: bucket.to_string(),
            path: path.to_string(),
            content_type: content_type.to_string(),
            data,
        });

        let response = client
            .upload_file(request)
            .await
            .with_context(|| format!("Failed to upload {path}"))?;

        Ok(response.into_inner().public_url)
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Parse a `YYYY-MM-DD` date, also accepting a full RFC 3339 timestamp
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

/// Parse an ISO timestamp string to DateTime<Utc>
fn parse_timestamp(s: &str) -> DateTime<Utc> {
    if s.is_empty() {
        return Utc::now();
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
