use serde::{Deserialize, Serialize};
use warp::{Filter, Rejection, Reply};

use super::globals::{
    db_failure, invalid_id, success, AccountCreatedResponse, PaginatedQueryableListRequest,
    SimpleSuccessResponse,
};
use super::UserDetails;
use db::{
    models::{StudentInformations, UserKind},
    password::generate_password,
    Database, Db, NewUser,
};
use filters::{authed_is_of_kind, with_db, Caller, Role};

pub fn routes(db: &Db) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list_route = warp::path!("api" / "students")
        .and(warp::get())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and(warp::query::<PaginatedQueryableListRequest>())
        .and_then(list)
        .boxed();

    let create_route = warp::path!("api" / "students")
        .and(warp::post())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(create)
        .boxed();

    let delete_route = warp::path!("api" / "students")
        .and(warp::delete())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(delete)
        .boxed();

    let get_route = warp::path!("api" / "students" / u32)
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
    students: Vec<Student<'a>>,
}

#[derive(Serialize)]
struct Student<'a> {
    id: u32,
    first_name: &'a str,
    last_name: &'a str,
    student_number: &'a str,
}

async fn list(
    _caller: Caller,
    db: Db,
    request: PaginatedQueryableListRequest,
) -> Result<impl warp::Reply, warp::Rejection> {
    let db = db.lock().await;

    let page = request.page.map(|_| request.normalized_page_number());
    let (total, users) = db.user_list(page, request.query.as_deref(), |u| u.kind.is_student());

    let students = users
        .into_iter()
        .filter_map(|u| match &u.kind {
            UserKind::Student(informations) => Some(Student {
                id: u.id,
                first_name: &u.first_name,
                last_name: &u.last_name,
                student_number: &informations.student_number,
            }),
            UserKind::Administrator | UserKind::Lecturer(_) => None,
        })
        .collect();

    Ok(success(&ListResponse {
        status: "success",
        total,
        students,
    }))
}

#[derive(Deserialize)]
struct NewStudent {
    first_name: String,
    last_name: String,
    student_number: String,
}

async fn create(
    _caller: Caller,
    db: Db,
    request: NewStudent,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;
    let password = generate_password();

    let user = NewUser {
        first_name: request.first_name,
        last_name: request.last_name,
        password: password.clone(),
        kind: UserKind::Student(StudentInformations {
            student_number: request.student_number,
        }),
    };

    Ok(match db.user_add(user) {
        Ok(user) => {
            log::info!("student account {} created", user.username);

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

    let all_students = request
        .iter()
        .all(|id| db.user_get_student(*id).is_some());

    if !all_students {
        return Ok(invalid_id("student"));
    }

    Ok(match db.user_remove(&request) {
        Ok(()) => success(&SimpleSuccessResponse::new()),
        Err(e) => db_failure(e),
    })
}

#[derive(Serialize)]
struct GetResponse<'a> {
    status: &'static str,
    student: UserDetails<'a>,
}

async fn get(id: u32, _caller: Caller, db: Db) -> Result<impl warp::Reply, warp::Rejection> {
    let db = db.lock().await;

    Ok(match db.user_get_student(id) {
        Some(user) => success(&GetResponse {
            status: "success",
            student: UserDetails::from(user),
        }),
        None => invalid_id("student"),
    })
}
