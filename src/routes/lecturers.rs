use serde::{Deserialize, Serialize};
use warp::{Filter, Rejection, Reply};

use super::globals::{
    db_failure, invalid_id, success, AccountCreatedResponse, PaginatedQueryableListRequest,
    SimpleSuccessResponse,
};
use super::UserDetails;
use db::{
    models::{LecturerInformations, UserKind},
    password::generate_password,
    Database, Db, NewUser,
};
use filters::{authed_is_of_kind, with_db, Caller, Role};

pub fn routes(db: &Db) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    // Students need the list to pick their advisors and examiner
    let list_route = warp::path!("api" / "lecturers")
        .and(warp::get())
        .and(authed_is_of_kind(
            db,
            &[Role::Administrator, Role::Lecturer, Role::Student],
        ))
        .and(with_db(db.clone()))
        .and(warp::query::<PaginatedQueryableListRequest>())
        .and_then(list)
        .boxed();

    let create_route = warp::path!("api" / "lecturers")
        .and(warp::post())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(create)
        .boxed();

    let delete_route = warp::path!("api" / "lecturers")
        .and(warp::delete())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(delete)
        .boxed();

    let get_route = warp::path!("api" / "lecturers" / u32)
        .and(warp::get())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and_then(get)
        .boxed();

    list_route.or(create_route).or(delete_route).or(get_route)
}

#[derive(Serialize)]
struct ListResponse<'a> {
    status: &'static str,
    total: usize,
    lecturers: Vec<Lecturer<'a>>,
}

#[derive(Serialize)]
struct Lecturer<'a> {
    id: u32,
    first_name: &'a str,
    last_name: &'a str,
    email: Option<&'a str>,
}

async fn list(
    _caller: Caller,
    db: Db,
    request: PaginatedQueryableListRequest,
) -> Result<impl warp::Reply, warp::Rejection> {
    let db = db.lock().await;

    let page = request.page.map(|_| request.normalized_page_number());
    let (total, users) = db.user_list(page, request.query.as_deref(), |u| u.kind.is_lecturer());

    let lecturers = users
        .into_iter()
        .filter_map(|u| match &u.kind {
            UserKind::Lecturer(informations) => Some(Lecturer {
                id: u.id,
                first_name: &u.first_name,
                last_name: &u.last_name,
                email: informations.email.as_deref(),
            }),
            UserKind::Administrator | UserKind::Student(_) => None,
        })
        .collect();

    Ok(success(&ListResponse {
        status: "success",
        total,
        lecturers,
    }))
}

#[derive(Deserialize)]
struct NewLecturer {
    first_name: String,
    last_name: String,
    email: Option<String>,
    phone_number: Option<String>,
}

async fn create(
    _caller: Caller,
    db: Db,
    request: NewLecturer,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;
    let password = generate_password();

    let user = NewUser {
        first_name: request.first_name,
        last_name: request.last_name,
        password: password.clone(),
        kind: UserKind::Lecturer(LecturerInformations {
            phone_number: request.phone_number,
            email: request.email,
        }),
    };

    Ok(match db.user_add(user) {
        Ok(user) => {
            log::info!("lecturer account {} created", user.username);

            success(&AccountCreatedResponse {
                status: "success",
                id: user.id,
                username: &user.username,
                password: &password,
            })
        }
        Err(e) => db_failure(e),
    })
}

async fn delete(
    _caller: Caller,
    db: Db,
    request: Vec<u32>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;

    let all_lecturers = request
        .iter()
        .all(|id| db.user_get_lecturer(*id).is_some());

    if !all_lecturers {
        return Ok(invalid_id("lecturer"));
    }

    Ok(match db.user_remove(&request) {
        Ok(()) => success(&SimpleSuccessResponse::new()),
        Err(e) => db_failure(e),
    })
}

#[derive(Serialize)]
struct GetResponse<'a> {
    status: &'static str,
    lecturer: UserDetails<'a>,
}

async fn get(id: u32, _caller: Caller, db: Db) -> Result<impl warp::Reply, warp::Rejection> {
    let db = db.lock().await;

    Ok(match db.user_get_lecturer(id) {
        Some(user) => success(&GetResponse {
            status: "success",
            lecturer: UserDetails::from(user),
        }),
        None => invalid_id("lecturer"),
    })
}
