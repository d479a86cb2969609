use chrono::Utc;
use serde::{Deserialize, Serialize};
use warp::{Filter, Rejection, Reply};

use super::globals::{db_failure, success};
use db::{
    models::{Approval, ApprovalStatus, SeminarStatus},
    ApprovalOverride, Database, Db, Decision,
};
use filters::{authed_is_of_kind, with_db, Caller, Role};

pub fn routes(db: &Db) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list_route = warp::path!("api" / "approvals")
        .and(warp::get())
        .and(authed_is_of_kind(db, &[Role::Lecturer]))
        .and(with_db(db.clone()))
        .and(warp::query::<ApprovalListRequest>())
        .and_then(list)
        .boxed();

    let decide_route = warp::path!("api" / "seminars" / u32 / "approval")
        .and(warp::put())
        .and(authed_is_of_kind(db, &[Role::Lecturer]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(decide)
        .boxed();

    let override_route = warp::path!("api" / "approvals" / u32)
        .and(warp::put())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(override_approval)
        .boxed();

    list_route.or(decide_route).or(override_route)
}

#[derive(Deserialize, Debug)]
struct ApprovalListRequest {
    status: Option<ApprovalStatus>,
}

#[derive(Serialize)]
struct ListResponse<'a> {
    status: &'static str,
    approvals: Vec<ApprovalListElement<'a>>,
}

#[derive(Serialize)]
struct ApprovalListElement<'a> {
    #[serde(flatten)]
    approval: &'a Approval,
    seminar_title: Option<&'a str>,
    seminar_status: Option<SeminarStatus>,
}

async fn list(
    caller: Caller,
    db: Db,
    request: ApprovalListRequest,
) -> Result<impl warp::Reply, warp::Rejection> {
    let db = db.lock().await;

    let approvals = db
        .approval_list(caller.id)
        .into_iter()
        .filter(|a| request.status.map_or(true, |status| a.status == status))
        .map(|approval| {
            let seminar = db.seminar_get(approval.seminar_id);

            ApprovalListElement {
                approval,
                seminar_title: seminar.map(|s| s.title.as_str()),
                seminar_status: seminar.map(|s| s.status),
            }
        })
        .collect();

    Ok(success(&ListResponse {
        status: "success",
        approvals,
    }))
}

#[derive(Serialize)]
struct DecisionResponse {
    status: &'static str,
    seminar_status: SeminarStatus,
}

async fn decide(
    seminar_id: u32,
    caller: Caller,
    db: Db,
    request: Decision,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;

    Ok(
        match db.approval_decide(seminar_id, caller.id, request, Utc::now()) {
            Ok(seminar_status) => success(&DecisionResponse {
                status: "success",
                seminar_status,
            }),
            Err(e) => db_failure(e),
        },
    )
}

async fn override_approval(
    id: u32,
    _caller: Caller,
    db: Db,
    request: ApprovalOverride,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;

    Ok(match db.approval_override(id, request, Utc::now()) {
        Ok(seminar_status) => success(&DecisionResponse {
            status: "success",
            seminar_status,
        }),
        Err(e) => db_failure(e),
    })
}
