use db::{attendance::AttendanceRejection, models::SeminarStatus, DbError};
use serde::{Deserialize, Serialize};
use warp::{
    http::StatusCode,
    reply::{Json, WithStatus},
};

/// Every handler answers with a JSON body and an explicit status
pub type Response = WithStatus<Json>;

#[derive(Serialize)]
pub struct FailureResponse<'a> {
    status: &'static str,
    code: ErrorCode,
    message: &'a str,
}

impl<'a> FailureResponse<'a> {
    pub fn new(code: ErrorCode, message: &'a str) -> Self {
        Self {
            status: "error",
            code,
            message,
        }
    }
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidCredentials,
    InsufficientAuthorization,
    MalformedData,
    MethodNotAllowed,
    InvalidOldPassword,
    PasswordTooSimple,
    InvalidID,
    NotAllowed,
    InvalidRequest,
    InvalidSeminarStatus,
    AlreadyDecided,
    AlreadyVerified,
    NotVerified,
    AlreadyScheduled,
    DateNotAvailable,
    RoomOccupied,
    AlreadyRecorded,
    TooEarly,
    TooLate,
    OutsideRadius,
    InvalidAssignment,
    StillReferenced,
    InvalidRevisionStatus,
    IntegrityError,
    InternalServerError,
    NotFound,
}

pub fn success<T: Serialize>(body: &T) -> Response {
    warp::reply::with_status(warp::reply::json(body), StatusCode::OK)
}

pub fn failure(code: ErrorCode, status: StatusCode, message: &str) -> Response {
    warp::reply::with_status(
        warp::reply::json(&FailureResponse::new(code, message)),
        status,
    )
}

pub fn invalid_id(entity: &str) -> Response {
    failure(
        ErrorCode::InvalidID,
        StatusCode::NOT_FOUND,
        &format!("{} not found", entity),
    )
}

pub fn not_allowed(entity: &str) -> Response {
    failure(
        ErrorCode::NotAllowed,
        StatusCode::FORBIDDEN,
        &format!("not allowed to act on this {}", entity),
    )
}

/// Turns a refused database operation into its error response
pub fn db_failure(error: DbError) -> Response {
    let unprocessable = StatusCode::UNPROCESSABLE_ENTITY;

    let (code, status) = match &error {
        DbError::NotFound(_) => (ErrorCode::InvalidID, StatusCode::NOT_FOUND),
        DbError::NotAllowed(_) => (ErrorCode::NotAllowed, StatusCode::FORBIDDEN),
        DbError::Invalid(_) => (ErrorCode::InvalidRequest, unprocessable),
        DbError::SeminarStatus(_) => (ErrorCode::InvalidSeminarStatus, unprocessable),
        DbError::AlreadyDecided => (ErrorCode::AlreadyDecided, unprocessable),
        DbError::AlreadyVerified => (ErrorCode::AlreadyVerified, unprocessable),
        DbError::NotVerified => (ErrorCode::NotVerified, unprocessable),
        DbError::AlreadyScheduled => (ErrorCode::AlreadyScheduled, unprocessable),
        DbError::DateNotAvailable(_) => (ErrorCode::DateNotAvailable, unprocessable),
        DbError::RoomOccupied => (ErrorCode::RoomOccupied, unprocessable),
        DbError::AlreadyRecorded => (ErrorCode::AlreadyRecorded, unprocessable),
        DbError::AttendanceRejected(rejection) => match rejection {
            AttendanceRejection::TooEarly => (ErrorCode::TooEarly, unprocessable),
            AttendanceRejection::TooLate => (ErrorCode::TooLate, unprocessable),
            AttendanceRejection::OutsideRadius { .. } => {
                (ErrorCode::OutsideRadius, unprocessable)
            }
        },
        DbError::InvalidAssignment => (ErrorCode::InvalidAssignment, unprocessable),
        DbError::InUse(_) => (ErrorCode::StillReferenced, unprocessable),
        DbError::RevisionStatus(_) => (ErrorCode::InvalidRevisionStatus, unprocessable),
        DbError::Lifecycle(_) => (ErrorCode::IntegrityError, StatusCode::INTERNAL_SERVER_ERROR),
        DbError::Hash(_) | DbError::Persist(_) | DbError::Serialize(_) => (
            ErrorCode::InternalServerError,
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    };

    if status.is_server_error() {
        log::error!("{}", error);
    } else {
        log::debug!("refused: {}", error);
    }

    failure(code, status, &error.to_string())
}

#[derive(Serialize)]
pub struct SimpleSuccessResponse {
    status: &'static str,
}

impl SimpleSuccessResponse {
    pub fn new() -> Self {
        Self { status: "success" }
    }
}

#[derive(Deserialize, Debug)]
pub struct PaginatedQueryableListRequest {
    pub query: Option<String>,
    pub page: Option<usize>,
}

impl PaginatedQueryableListRequest {
    /// Checks that the page number is valid, and if its not it returns 1
    pub fn normalized_page_number(&self) -> usize {
        self.page
            .map(|v| if v >= 1 { v } else { 1 })
            .unwrap_or(1usize)
    }
}

#[derive(Deserialize, Debug)]
pub struct SeminarListRequest {
    pub query: Option<String>,
    pub page: Option<usize>,
    pub status: Option<SeminarStatus>,
}

#[derive(Serialize)]
pub struct AccountCreatedResponse<'a> {
    pub status: &'static str,
    pub id: u32,
    pub username: &'a str,
    pub password: &'a str,
}
