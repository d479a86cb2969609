use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

pub mod attendance;
mod json;
pub mod lifecycle;
pub mod models;
pub mod password;
mod seed;

pub use json::JSONDatabase;

use attendance::AttendanceRejection;
use lifecycle::LifecycleError;
use models::{
    Approval, ApprovalStatus, Attendance, GeoPoint, RevisionItem, RevisionStatus, Room, Schedule,
    Seminar, SeminarStatus, SeminarType, User, UserKind,
};

pub const PAGE_SIZE: usize = 10;

/// Default attendance radius around a room, in meters
pub const DEFAULT_ROOM_RADIUS: f64 = 100.0;

pub type Db = Arc<Mutex<JSONDatabase>>;

/// Opens (or seeds) the database stored in `filename`
pub fn new_db(filename: String) -> Result<Db, DbError> {
    Ok(Arc::new(Mutex::new(JSONDatabase::new(filename)?)))
}

/// Seeded database that never touches the disk
pub fn new_memory_db() -> Result<Db, DbError> {
    Ok(Arc::new(Mutex::new(JSONDatabase::in_memory()?)))
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("not allowed to act on this {0}")]
    NotAllowed(&'static str),
    #[error("invalid request: {0}")]
    Invalid(&'static str),
    #[error("operation not allowed while the seminar is {}", .0.as_str())]
    SeminarStatus(SeminarStatus),
    #[error("approval was already decided")]
    AlreadyDecided,
    #[error("seminar was already verified")]
    AlreadyVerified,
    #[error("seminar has not been verified by an administrator")]
    NotVerified,
    #[error("seminar is already scheduled")]
    AlreadyScheduled,
    #[error("{0} is not a date on which all three lecturers are available")]
    DateNotAvailable(NaiveDate),
    #[error("room is already occupied at that time")]
    RoomOccupied,
    #[error("attendance already recorded")]
    AlreadyRecorded,
    #[error("attendance refused: {0}")]
    AttendanceRejected(#[from] AttendanceRejection),
    #[error("the three assigned lecturers must be distinct lecturers")]
    InvalidAssignment,
    #[error("{0} is still referenced")]
    InUse(&'static str),
    #[error("revision item is {}", .0.as_str())]
    RevisionStatus(RevisionStatus),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error("could not hash password: {0}")]
    Hash(String),
    #[error("could not save database: {0}")]
    Persist(#[from] std::io::Error),
    #[error("could not serialize database: {0}")]
    Serialize(#[from] serde_json::Error),
}

// While the trait is not used at runtime, it allows checking that the impls are complete
pub trait Database {
    fn reset(&mut self) -> Result<(), DbError>;
    fn seed(
        &mut self,
        users: impl Iterator<Item = NewUser>,
        rooms: impl Iterator<Item = NewRoom>,
    ) -> Result<(), DbError>;
    fn dump_as_json(&self) -> Result<String, serde_json::Error>;

    fn auth_login(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<Option<(&User, String)>, DbError>;
    fn auth_logout(&mut self, token: &str) -> Result<bool, DbError>;
    fn auth_get_user(&self, token: &str) -> Option<&User>;

    fn user_add(&mut self, user: NewUser) -> Result<&User, DbError>;
    fn user_get(&self, id: u32) -> Option<&User>;
    fn user_get_by_username(&self, username: &str) -> Option<&User>;
    fn user_set_password(&mut self, id: u32, password: &str) -> Result<(), DbError>;
    fn user_list(
        &self,
        page: Option<usize>,
        query: Option<&str>,
        filter: impl Fn(&User) -> bool,
    ) -> (usize, Vec<&User>);
    fn user_remove(&mut self, users: &[u32]) -> Result<(), DbError>;

    fn user_get_lecturer(&self, id: u32) -> Option<&User> {
        self.user_get(id).filter(|u| u.kind.is_lecturer())
    }

    fn user_get_student(&self, id: u32) -> Option<&User> {
        self.user_get(id).filter(|u| u.kind.is_student())
    }

    fn room_list(&self, page: Option<usize>, query: Option<&str>) -> (usize, Vec<&Room>);
    fn room_get(&self, id: u32) -> Option<&Room>;
    fn room_add(&mut self, room: NewRoom) -> Result<&Room, DbError>;
    fn room_update(&mut self, id: u32, update: RoomUpdate) -> Result<UpdateStatus, DbError>;
    fn room_remove(&mut self, rooms: &[u32]) -> Result<(), DbError>;

    fn seminar_add(
        &mut self,
        student_id: u32,
        seminar: NewSeminar,
        now: DateTime<Utc>,
    ) -> Result<&Seminar, DbError>;
    fn seminar_get(&self, id: u32) -> Option<&Seminar>;
    fn seminar_list(
        &self,
        page: Option<usize>,
        query: Option<&str>,
        filter: impl Fn(&Seminar) -> bool,
    ) -> (usize, Vec<&Seminar>);
    fn seminar_submit(&mut self, id: u32, student_id: u32) -> Result<&Seminar, DbError>;
    fn seminar_approvals(&self, id: u32) -> Vec<&Approval>;
    fn seminar_availability(&self, id: u32) -> Result<Vec<NaiveDate>, DbError>;
    fn seminar_verify(
        &mut self,
        id: u32,
        admin_id: u32,
        now: DateTime<Utc>,
    ) -> Result<&Seminar, DbError>;
    fn seminar_schedule(&mut self, id: u32, schedule: NewSchedule) -> Result<&Schedule, DbError>;
    fn seminar_finish(&mut self, id: u32) -> Result<&Seminar, DbError>;
    fn seminar_cancel(
        &mut self,
        id: u32,
        actor_id: u32,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<&Seminar, DbError>;

    fn approval_get(&self, id: u32) -> Option<&Approval>;
    fn approval_list(&self, lecturer_id: u32) -> Vec<&Approval>;
    fn approval_decide(
        &mut self,
        seminar_id: u32,
        lecturer_id: u32,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> Result<SeminarStatus, DbError>;
    fn approval_override(
        &mut self,
        id: u32,
        update: ApprovalOverride,
        now: DateTime<Utc>,
    ) -> Result<SeminarStatus, DbError>;

    fn schedule_get(&self, id: u32) -> Option<&Schedule>;
    fn schedule_get_by_seminar(&self, seminar_id: u32) -> Option<&Schedule>;
    fn schedule_regenerate_token(&mut self, id: u32) -> Result<&Schedule, DbError>;

    fn attendance_scan(
        &mut self,
        attendee_id: u32,
        scan: Scan,
        now: DateTime<Utc>,
    ) -> Result<&Attendance, DbError>;
    fn attendance_manual(
        &mut self,
        schedule_id: u32,
        entry: ManualAttendance,
        now: DateTime<Utc>,
    ) -> Result<&Attendance, DbError>;
    fn attendance_list(&self, schedule_id: u32) -> Vec<&Attendance>;

    fn revision_add(
        &mut self,
        seminar_id: u32,
        lecturer_id: u32,
        description: String,
        now: DateTime<Utc>,
    ) -> Result<&RevisionItem, DbError>;
    fn revision_get(&self, id: u32) -> Option<&RevisionItem>;
    fn revision_list(&self, seminar_id: u32) -> Vec<&RevisionItem>;
    fn revision_submit(
        &mut self,
        id: u32,
        student_id: u32,
        response: String,
        now: DateTime<Utc>,
    ) -> Result<&RevisionItem, DbError>;
    fn revision_validate(
        &mut self,
        id: u32,
        lecturer_id: u32,
        validation: RevisionValidation,
        now: DateTime<Utc>,
    ) -> Result<&RevisionItem, DbError>;
}

pub fn username_from_name(first_name: &str, last_name: &str) -> String {
    unidecode::unidecode(&format!("{} {}", last_name, first_name))
        .to_ascii_lowercase()
        .replace(' ', ".")
}

pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub kind: UserKind,
}

#[derive(Deserialize)]
pub struct NewRoom {
    pub name: String,
    pub capacity: u16,
    pub location: Option<GeoPoint>,
    pub radius_meters: Option<f64>,
}

#[derive(Deserialize)]
pub struct RoomUpdate {
    pub name: Option<String>,
    pub capacity: Option<u16>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub location: Option<Option<GeoPoint>>,
    pub radius_meters: Option<f64>,
}

pub struct UpdateStatus {
    pub found: bool,
    pub updated: bool,
}

#[derive(Deserialize)]
pub struct NewSeminar {
    pub title: String,
    pub seminar_type: SeminarType,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    pub advisor1_id: u32,
    pub advisor2_id: u32,
    pub examiner_id: u32,
    #[serde(default)]
    pub draft: bool,
}

/// A lecturer's answer on a seminar they are assigned to
#[derive(Deserialize, Debug)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum Decision {
    Approve {
        available_dates: Vec<NaiveDate>,
        comment: Option<String>,
    },
    Reject {
        comment: String,
    },
}

/// Administrative correction of an approval record
#[derive(Deserialize, Debug)]
pub struct ApprovalOverride {
    pub status: ApprovalStatus,
    #[serde(default)]
    pub available_dates: Vec<NaiveDate>,
    pub comment: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct NewSchedule {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: u32,
    pub room_id: u32,
}

#[derive(Deserialize, Debug)]
pub struct Scan {
    pub token: uuid::Uuid,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub override_reason: Option<String>,
}

impl Scan {
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct ManualAttendance {
    pub attendee_id: u32,
    pub reason: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct RevisionValidation {
    pub accepted: bool,
    pub note: Option<String>,
}

pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
