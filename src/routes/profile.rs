use serde::{Deserialize, Serialize};
use warp::{http::StatusCode, Filter, Rejection, Reply};

use super::globals::{db_failure, failure, invalid_id, success, ErrorCode, SimpleSuccessResponse};
use super::UserDetails;
use db::{password::verify_password, Database, Db};
use filters::{authed, with_db, Caller};

/// Shortest password accepted when a user changes theirs
const MIN_PASSWORD_LENGTH: usize = 8;

pub fn routes(db: &Db) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let get_profile_route = warp::path!("api" / "profile")
        .and(warp::get())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and_then(get_profile)
        .boxed();

    let put_profile_route = warp::path!("api" / "profile")
        .and(warp::put())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(put_profile)
        .boxed();

    get_profile_route.or(put_profile_route)
}

#[derive(Serialize)]
struct ProfileResponse<'a> {
    status: &'static str,
    user: UserDetails<'a>,
}

async fn get_profile(caller: Caller, db: Db) -> Result<impl warp::Reply, warp::Rejection> {
    let db = db.lock().await;

    Ok(match db.user_get(caller.id) {
        Some(user) => success(&ProfileResponse {
            status: "success",
            user: UserDetails::from(user),
        }),
        None => invalid_id("user"),
    })
}

#[derive(Deserialize)]
struct UpdateRequest {
    old_password: String,
    password: String,
}

async fn put_profile(
    caller: Caller,
    db: Db,
    request: UpdateRequest,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;

    let user = match db.user_get(caller.id) {
        Some(user) => user,
        None => return Ok(invalid_id("user")),
    };

    if !verify_password(&request.old_password, &user.password) {
        return Ok(failure(
            ErrorCode::InvalidOldPassword,
            StatusCode::FORBIDDEN,
            "old password does not match",
        ));
    }

    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Ok(failure(
            ErrorCode::PasswordTooSimple,
            StatusCode::UNPROCESSABLE_ENTITY,
            "password must be at least 8 characters long",
        ));
    }

    Ok(match db.user_set_password(caller.id, &request.password) {
        Ok(()) => success(&SimpleSuccessResponse::new()),
        Err(e) => db_failure(e),
    })
}
