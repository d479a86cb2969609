use serde::{Deserialize, Serialize};
use warp::{Filter, Rejection, Reply};

use super::globals::{db_failure, success, SimpleSuccessResponse};
use super::kind_name;
use db::{Database, Db};
use filters::{with_db, Forbidden};

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse<'a> {
    status: &'a str,
    token: &'a str,
    user: LoginResponseUser<'a>,
}

#[derive(Serialize)]
struct LoginResponseUser<'a> {
    id: u32,
    first_name: &'a str,
    last_name: &'a str,
    kind: &'a str,
}

pub fn routes(db: &Db) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let post_session_route = warp::path!("api" / "session")
        .and(warp::post())
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and(with_db(db.clone()))
        .and_then(post_session)
        .boxed();

    let delete_session_route = warp::path!("api" / "session")
        .and(warp::delete())
        .and(warp::header::optional::<String>("Authorization"))
        .and(with_db(db.clone()))
        .and_then(delete_session)
        .boxed();

    post_session_route.or(delete_session_route)
}

async fn post_session(request: LoginRequest, db: Db) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;

    match db.auth_login(&request.username, &request.password) {
        Ok(Some((user, token))) => {
            log::info!("{} logged in", user.username);

            Ok(success(&LoginResponse {
                status: "success",
                token: &token,
                user: LoginResponseUser {
                    id: user.id,
                    first_name: &user.first_name,
                    last_name: &user.last_name,
                    kind: kind_name(&user.kind),
                },
            }))
        }
        Ok(None) => {
            log::debug!("failed login attempt for {}", request.username);
            Err(warp::reject::custom(Forbidden))
        }
        Err(e) => Ok(db_failure(e)),
    }
}

async fn delete_session(
    authorization: Option<String>,
    db: Db,
) -> Result<impl warp::Reply, warp::Rejection> {
    let authorization = authorization.ok_or_else(|| warp::reject::custom(Forbidden))?;

    let (auth_type, token) = {
        let mut parts = authorization.splitn(2, ' ');
        (parts.next().unwrap_or(""), parts.next().unwrap_or(""))
    };

    if !auth_type.eq_ignore_ascii_case("bearer") {
        return Err(warp::reject::custom(Forbidden));
    }

    let mut db = db.lock().await;

    match db.auth_logout(token) {
        Ok(true) => Ok(success(&SimpleSuccessResponse::new())),
        Ok(false) => Err(warp::reject::custom(Forbidden)),
        Err(e) => Ok(db_failure(e)),
    }
}
