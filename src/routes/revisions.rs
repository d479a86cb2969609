use chrono::Utc;
use serde::{Deserialize, Serialize};
use warp::{Filter, Rejection, Reply};

use super::globals::{db_failure, invalid_id, not_allowed, success};
use super::seminars::can_view;
use db::{models::RevisionItem, Database, Db, RevisionValidation};
use filters::{authed, authed_is_of_kind, with_db, Caller, Role};

pub fn routes(db: &Db) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let create_route = warp::path!("api" / "seminars" / u32 / "revisions")
        .and(warp::post())
        .and(authed_is_of_kind(db, &[Role::Lecturer]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(create)
        .boxed();

    let list_route = warp::path!("api" / "seminars" / u32 / "revisions")
        .and(warp::get())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and_then(list)
        .boxed();

    let submit_route = warp::path!("api" / "revisions" / u32 / "submit")
        .and(warp::put())
        .and(authed_is_of_kind(db, &[Role::Student]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(submit)
        .boxed();

    let validate_route = warp::path!("api" / "revisions" / u32 / "validate")
        .and(warp::put())
        .and(authed_is_of_kind(db, &[Role::Lecturer]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(validate)
        .boxed();

    create_route
        .or(list_route)
        .or(submit_route)
        .or(validate_route)
}

#[derive(Serialize)]
struct RevisionResponse<'a> {
    status: &'static str,
    revision: &'a RevisionItem,
}

#[derive(Deserialize)]
struct NewRevision {
    description: String,
}

async fn create(
    seminar_id: u32,
    caller: Caller,
    db: Db,
    request: NewRevision,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;

    Ok(
        match db.revision_add(seminar_id, caller.id, request.description, Utc::now()) {
            Ok(revision) => success(&RevisionResponse {
                status: "success",
                revision,
            }),
            Err(e) => db_failure(e),
        },
    )
}

#[derive(Serialize)]
struct ListResponse<'a> {
    status: &'static str,
    revisions: Vec<&'a RevisionItem>,
}

async fn list(
    seminar_id: u32,
    caller: Caller,
    db: Db,
) -> Result<impl warp::Reply, warp::Rejection> {
    let db = db.lock().await;

    let seminar = match db.seminar_get(seminar_id) {
        Some(seminar) => seminar,
        None => return Ok(invalid_id("seminar")),
    };

    if !can_view(&caller, seminar) {
        return Ok(not_allowed("seminar"));
    }

    Ok(success(&ListResponse {
        status: "success",
        revisions: db.revision_list(seminar_id),
    }))
}

#[derive(Deserialize)]
struct RevisionSubmission {
    response: String,
}

async fn submit(
    id: u32,
    caller: Caller,
    db: Db,
    request: RevisionSubmission,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;

    Ok(
        match db.revision_submit(id, caller.id, request.response, Utc::now()) {
            Ok(revision) => success(&RevisionResponse {
                status: "success",
                revision,
            }),
            Err(e) => db_failure(e),
        },
    )
}

async fn validate(
    id: u32,
    caller: Caller,
    db: Db,
    request: RevisionValidation,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;

    Ok(
        match db.revision_validate(id, caller.id, request, Utc::now()) {
            Ok(revision) => success(&RevisionResponse {
                status: "success",
                revision,
            }),
            Err(e) => db_failure(e),
        },
    )
}
