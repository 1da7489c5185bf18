//! Per-student report aggregation

use crate::state::{
    AttendanceRecord, AttendanceStatus, GradeRecord, Student, StudentRecords, ViolationRecord,
};
use std::collections::BTreeMap;

/// Letter grade for an average score
pub fn letter_grade(score: f64) -> &'static str {
    match score {
        s if s >= 90.0 => "A",
        s if s >= 80.0 => "B",
        s if s >= 70.0 => "C",
        s if s >= 60.0 => "D",
        _ => "E",
    }
}

/// Average of all assessments in one subject
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectSummary {
    pub subject: String,
    pub average: f64,
    pub assessments: usize,
}

impl SubjectSummary {
    pub fn letter(&self) -> &'static str {
        letter_grade(self.average)
    }
}

/// Group grades by subject, sorted alphabetically
pub fn summarize_grades(grades: &[GradeRecord]) -> Vec<SubjectSummary> {
    let mut by_subject: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for grade in grades {
        let entry = by_subject.entry(grade.subject.as_str()).or_default();
        entry.0 += grade.score;
        entry.1 += 1;
    }

    by_subject
        .into_iter()
        .map(|(subject, (total, count))| SubjectSummary {
            subject: subject.to_string(),
            average: total / count as f64,
            assessments: count,
        })
        .collect()
}

/// Attendance counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttendanceTally {
    pub present: usize,
    pub sick: usize,
    pub excused: usize,
    pub absent: usize,
    pub other: usize,
}

impl AttendanceTally {
    pub fn from_records(records: &[AttendanceRecord]) -> Self {
        let mut tally = Self::default();
        for record in records {
            match record.status {
                AttendanceStatus::Present => tally.present += 1,
                AttendanceStatus::Sick => tally.sick += 1,
                AttendanceStatus::Excused => tally.excused += 1,
                AttendanceStatus::Absent => tally.absent += 1,
                AttendanceStatus::Other => tally.other += 1,
            }
        }
        tally
    }

    pub fn total(&self) -> usize {
        self.present + self.sick + self.excused + self.absent + self.other
    }

    /// `(label, count)` rows in display order
    pub fn rows(&self) -> [(&'static str, usize); 5] {
        [
            (AttendanceStatus::Present.label(), self.present),
            (AttendanceStatus::Sick.label(), self.sick),
            (AttendanceStatus::Excused.label(), self.excused),
            (AttendanceStatus::Absent.label(), self.absent),
            (AttendanceStatus::Other.label(), self.other),
        ]
    }
}

/// Everything printed on one student's page
#[derive(Debug, Clone, PartialEq)]
pub struct StudentReport {
    pub student: Student,
    pub subjects: Vec<SubjectSummary>,
    pub attendance: AttendanceTally,
    pub violations: Vec<ViolationRecord>,
}

impl StudentReport {
    pub fn build(student: Student, records: StudentRecords) -> Self {
        let mut violations = records.violations;
        violations.sort_by_key(|v| v.date);
        Self {
            subjects: summarize_grades(&records.grades),
            attendance: AttendanceTally::from_records(&records.attendance),
            violations,
            student,
        }
    }

    pub fn violation_points(&self) -> u32 {
        self.violations.iter().map(|v| v.points).sum()
    }

    /// Mean of the subject averages, `None` without grades
    pub fn overall_average(&self) -> Option<f64> {
        if self.subjects.is_empty() {
            return None;
        }
        let total: f64 = self.subjects.iter().map(|s| s.average).sum();
        Some(total / self.subjects.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn grade(subject: &str, score: f64) -> GradeRecord {
        GradeRecord {
            subject: subject.to_string(),
            assessment: "UH".to_string(),
            score,
            semester: "Ganjil".to_string(),
        }
    }

    fn attendance(status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            date: NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
            status,
            note: None,
        }
    }

    #[test]
    fn test_letter_grade_boundaries() {
        assert_eq!(letter_grade(90.0), "A");
        assert_eq!(letter_grade(89.99), "B");
        assert_eq!(letter_grade(80.0), "B");
        assert_eq!(letter_grade(70.0), "C");
        assert_eq!(letter_grade(60.0), "D");
        assert_eq!(letter_grade(59.9), "E");
        assert_eq!(letter_grade(0.0), "E");
    }

    #[test]
    fn test_summarize_grades_groups_and_sorts() {
        let summary = summarize_grades(&[
            grade("Matematika", 80.0),
            grade("Bahasa Indonesia", 92.0),
            grade("Matematika", 90.0),
        ]);

        assert_eq!(
            summary,
            vec![
                SubjectSummary {
                    subject: "Bahasa Indonesia".to_string(),
                    average: 92.0,
                    assessments: 1,
                },
                SubjectSummary {
                    subject: "Matematika".to_string(),
                    average: 85.0,
                    assessments: 2,
                },
            ]
        );
        assert_eq!(summary[1].letter(), "B");
    }

    #[test]
    fn test_attendance_tally() {
        let tally = AttendanceTally::from_records(&[
            attendance(AttendanceStatus::Present),
            attendance(AttendanceStatus::Present),
            attendance(AttendanceStatus::Sick),
            attendance(AttendanceStatus::Other),
        ]);
        assert_eq!(tally.present, 2);
        assert_eq!(tally.sick, 1);
        assert_eq!(tally.other, 1);
        assert_eq!(tally.total(), 4);
        assert_eq!(tally.rows()[0], ("Hadir", 2));
    }

    #[test]
    fn test_report_totals() {
        let student = Student {
            id: "s1".to_string(),
            nis: "1001".to_string(),
            name: "Ani".to_string(),
            class_id: "7a".to_string(),
            class_name: "7A".to_string(),
            gender: "P".to_string(),
            birth_date: None,
        };
        let records = StudentRecords {
            grades: vec![grade("IPA", 70.0), grade("IPS", 90.0)],
            attendance: Vec::new(),
            violations: vec![
                ViolationRecord {
                    date: NaiveDate::from_ymd_opt(2024, 9, 2).unwrap(),
                    description: "Terlambat".to_string(),
                    points: 5,
                },
                ViolationRecord {
                    date: NaiveDate::from_ymd_opt(2024, 8, 5).unwrap(),
                    description: "Atribut tidak lengkap".to_string(),
                    points: 3,
                },
            ],
        };

        let report = StudentReport::build(student, records);
        assert_eq!(report.violation_points(), 8);
        assert_eq!(report.overall_average(), Some(80.0));
        assert_eq!(report.violations[0].description, "Atribut tidak lengkap");
    }
}
