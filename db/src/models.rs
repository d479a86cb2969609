use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u32,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password: String,
    pub kind: UserKind,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub enum UserKind {
    Administrator,
    Lecturer(LecturerInformations),
    Student(StudentInformations),
}

impl UserKind {
    pub fn is_administrator(&self) -> bool {
        matches!(self, Self::Administrator)
    }

    pub fn is_lecturer(&self) -> bool {
        matches!(self, Self::Lecturer(_))
    }

    pub fn is_student(&self) -> bool {
        matches!(self, Self::Student(_))
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LecturerInformations {
    pub phone_number: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct StudentInformations {
    pub student_number: String,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Room {
    pub id: u32,
    pub name: String,
    pub capacity: u16,
    pub location: Option<GeoPoint>,
    pub radius_meters: f64,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeminarType {
    Proposal,
    Results,
    Comprehensive,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SeminarStatus {
    Draft,
    PendingVerification,
    Approved,
    Scheduled,
    Finished,
    NeedsRevision,
    Cancelled,
}

impl SeminarStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingVerification => "pending-verification",
            Self::Approved => "approved",
            Self::Scheduled => "scheduled",
            Self::Finished => "finished",
            Self::NeedsRevision => "needs-revision",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Seminar {
    pub id: u32,
    pub student_id: u32,
    pub advisor1_id: u32,
    pub advisor2_id: u32,
    pub examiner_id: u32,
    pub title: String,
    pub seminar_type: SeminarType,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub status: SeminarStatus,
    pub created_at: DateTime<Utc>,
    /// Set when all three approvals are in, which queues the seminar for verification
    pub approved_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<u32>,
    pub cancellation: Option<Cancellation>,
}

impl Seminar {
    /// Lecturer ids, in role order
    pub fn lecturers(&self) -> [(ApprovalRole, u32); 3] {
        [
            (ApprovalRole::Advisor1, self.advisor1_id),
            (ApprovalRole::Advisor2, self.advisor2_id),
            (ApprovalRole::Examiner, self.examiner_id),
        ]
    }

    pub fn is_assigned(&self, lecturer_id: u32) -> bool {
        self.lecturers().iter().any(|(_, id)| *id == lecturer_id)
    }

    pub fn involves(&self, user_id: u32) -> bool {
        self.student_id == user_id || self.is_assigned(user_id)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Cancellation {
    pub cancelled_at: DateTime<Utc>,
    pub reason: String,
    pub cancelled_by: u32,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum ApprovalRole {
    #[serde(rename = "advisor-1")]
    Advisor1,
    #[serde(rename = "advisor-2")]
    Advisor2,
    #[serde(rename = "examiner")]
    Examiner,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Approval {
    pub id: u32,
    pub seminar_id: u32,
    pub lecturer_id: u32,
    pub role: ApprovalRole,
    pub status: ApprovalStatus,
    pub available_dates: Vec<NaiveDate>,
    pub comment: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    Planned,
    Finished,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Schedule {
    pub id: u32,
    pub seminar_id: u32,
    pub room_id: u32,
    pub start: DateTime<Utc>,
    pub duration_minutes: u32,
    pub status: ScheduleStatus,
    pub token: Uuid,
}

impl Schedule {
    pub fn end(&self) -> DateTime<Utc> {
        self.start + chrono::Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && start < self.end()
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AttendanceMethod {
    QrScan,
    Manual,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Lateness {
    OnTime,
    Late,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Attendance {
    pub id: u32,
    pub schedule_id: u32,
    pub attendee_id: u32,
    pub recorded_at: DateTime<Utc>,
    pub method: AttendanceMethod,
    pub lateness: Option<Lateness>,
    pub distance_meters: Option<f64>,
    pub override_reason: Option<String>,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RevisionStatus {
    Open,
    Submitted,
    Validated,
}

impl RevisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Submitted => "submitted",
            Self::Validated => "validated",
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct RevisionItem {
    pub id: u32,
    pub seminar_id: u32,
    pub lecturer_id: u32,
    pub description: String,
    pub status: RevisionStatus,
    pub student_response: Option<String>,
    pub lecturer_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub validated_at: Option<DateTime<Utc>>,
}
