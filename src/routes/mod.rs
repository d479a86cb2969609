use serde::Serialize;
use std::convert::Infallible;
use warp::{http::StatusCode, Filter, Rejection, Reply};

use db::{
    models::{User, UserKind},
    Db,
};
use filters::{Forbidden, Unauthorized};

mod approvals;
mod attendance;
mod auth;
mod globals;
mod lecturers;
mod profile;
mod revisions;
mod rooms;
mod schedules;
mod scheduling;
mod seminars;
mod students;

#[cfg(test)]
mod tests;

pub use globals::{failure, ErrorCode};

pub fn routes(db: &Db) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    auth::routes(db)
        .or(profile::routes(db))
        .or(students::routes(db))
        .or(lecturers::routes(db))
        .or(rooms::routes(db))
        .or(seminars::routes(db))
        .or(scheduling::routes(db))
        .or(approvals::routes(db))
        .or(schedules::routes(db))
        .or(attendance::routes(db))
        .or(revisions::routes(db))
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, status, message) = if err.is_not_found() {
        (ErrorCode::NotFound, StatusCode::NOT_FOUND, "not found")
    } else if err.find::<Forbidden>().is_some() {
        (
            ErrorCode::InvalidCredentials,
            StatusCode::UNAUTHORIZED,
            "missing or invalid credentials",
        )
    } else if err.find::<Unauthorized>().is_some() {
        (
            ErrorCode::InsufficientAuthorization,
            StatusCode::FORBIDDEN,
            "insufficient authorization",
        )
    } else if err.find::<warp::filters::body::BodyDeserializeError>().is_some()
        || err.find::<warp::reject::InvalidQuery>().is_some()
        || err.find::<warp::reject::PayloadTooLarge>().is_some()
        || err.find::<warp::reject::LengthRequired>().is_some()
        || err.find::<warp::reject::UnsupportedMediaType>().is_some()
    {
        (
            ErrorCode::MalformedData,
            StatusCode::BAD_REQUEST,
            "malformed request",
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            ErrorCode::MethodNotAllowed,
            StatusCode::METHOD_NOT_ALLOWED,
            "method not allowed",
        )
    } else {
        log::error!("unhandled rejection: {:?}", err);

        (
            ErrorCode::InternalServerError,
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error",
        )
    };

    Ok(failure(code, status, message))
}

pub(crate) fn kind_name(kind: &UserKind) -> &'static str {
    match kind {
        UserKind::Administrator => "administrator",
        UserKind::Lecturer(_) => "lecturer",
        UserKind::Student(_) => "student",
    }
}

/// Public view of an account, without its password hash
#[derive(Serialize)]
pub(crate) struct UserDetails<'a> {
    id: u32,
    first_name: &'a str,
    last_name: &'a str,
    username: &'a str,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone_number: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    student_number: Option<&'a str>,
}

impl<'a> From<&'a User> for UserDetails<'a> {
    fn from(user: &'a User) -> Self {
        let (email, phone_number, student_number) = match &user.kind {
            UserKind::Administrator => (None, None, None),
            UserKind::Lecturer(informations) => (
                informations.email.as_deref(),
                informations.phone_number.as_deref(),
                None,
            ),
            UserKind::Student(informations) => {
                (None, None, Some(informations.student_number.as_str()))
            }
        };

        Self {
            id: user.id,
            first_name: &user.first_name,
            last_name: &user.last_name,
            username: &user.username,
            kind: kind_name(&user.kind),
            email,
            phone_number,
            student_number,
        }
    }
}
