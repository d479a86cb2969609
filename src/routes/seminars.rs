use chrono::Utc;
use serde::{Deserialize, Serialize};
use warp::{Filter, Rejection, Reply};

use super::globals::{db_failure, invalid_id, not_allowed, success, SeminarListRequest};
use super::schedules::ScheduleView;
use db::{
    models::{Approval, Seminar},
    Database, Db, NewSeminar,
};
use filters::{authed, authed_is_of_kind, with_db, Caller, Role};

pub fn routes(db: &Db) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list_route = warp::path!("api" / "seminars")
        .and(warp::get())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and(warp::query::<SeminarListRequest>())
        .and_then(list)
        .boxed();

    let create_route = warp::path!("api" / "seminars")
        .and(warp::post())
        .and(authed_is_of_kind(db, &[Role::Student]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(create)
        .boxed();

    let get_route = warp::path!("api" / "seminars" / u32)
        .and(warp::get())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and_then(get)
        .boxed();

    let submit_route = warp::path!("api" / "seminars" / u32 / "submit")
        .and(warp::post())
        .and(authed_is_of_kind(db, &[Role::Student]))
        .and(with_db(db.clone()))
        .and_then(submit)
        .boxed();

    let cancel_route = warp::path!("api" / "seminars" / u32 / "cancel")
        .and(warp::post())
        .and(authed_is_of_kind(db, &[Role::Administrator, Role::Student]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(cancel)
        .boxed();

    list_route
        .or(create_route)
        .or(get_route)
        .or(submit_route)
        .or(cancel_route)
}

/// Administrators see every seminar, others only the ones they take part in
pub fn can_view(caller: &Caller, seminar: &Seminar) -> bool {
    caller.is(Role::Administrator) || seminar.involves(caller.id)
}

#[derive(Serialize)]
pub struct SeminarView<'a> {
    #[serde(flatten)]
    seminar: &'a Seminar,
    approvals: Vec<&'a Approval>,
    schedule: Option<ScheduleView<'a>>,
}

impl<'a> SeminarView<'a> {
    pub fn new<D: Database>(db: &'a D, seminar: &'a Seminar, caller: &Caller) -> Self {
        Self {
            seminar,
            approvals: db.seminar_approvals(seminar.id),
            schedule: db
                .schedule_get_by_seminar(seminar.id)
                .map(|schedule| ScheduleView::new(db, schedule, caller)),
        }
    }
}

#[derive(Serialize)]
struct SeminarResponse<'a> {
    status: &'static str,
    seminar: SeminarView<'a>,
}

#[derive(Serialize)]
struct ListResponse<'a> {
    status: &'static str,
    total: usize,
    seminars: Vec<&'a Seminar>,
}

async fn list(
    caller: Caller,
    db: Db,
    request: SeminarListRequest,
) -> Result<impl warp::Reply, warp::Rejection> {
    let db = db.lock().await;

    let page = request.page.map(|page| page.max(1));
    let wanted = request.status;

    let (total, seminars) = db.seminar_list(page, request.query.as_deref(), |s| {
        wanted.map_or(true, |status| s.status == status) && can_view(&caller, s)
    });

    Ok(success(&ListResponse {
        status: "success",
        total,
        seminars,
    }))
}

async fn create(
    caller: Caller,
    db: Db,
    request: NewSeminar,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;

    let id = match db.seminar_add(caller.id, request, Utc::now()) {
        Ok(seminar) => seminar.id,
        Err(e) => return Ok(db_failure(e)),
    };

    Ok(match db.seminar_get(id) {
        Some(seminar) => success(&SeminarResponse {
            status: "success",
            seminar: SeminarView::new(&*db, seminar, &caller),
        }),
        None => invalid_id("seminar"),
    })
}

async fn get(id: u32, caller: Caller, db: Db) -> Result<impl warp::Reply, warp::Rejection> {
    let db = db.lock().await;

    let seminar = match db.seminar_get(id) {
        Some(seminar) => seminar,
        None => return Ok(invalid_id("seminar")),
    };

    if !can_view(&caller, seminar) {
        return Ok(not_allowed("seminar"));
    }

    Ok(success(&SeminarResponse {
        status: "success",
        seminar: SeminarView::new(&*db, seminar, &caller),
    }))
}

async fn submit(id: u32, caller: Caller, db: Db) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;

    if let Err(e) = db.seminar_submit(id, caller.id) {
        return Ok(db_failure(e));
    }

    Ok(match db.seminar_get(id) {
        Some(seminar) => success(&SeminarResponse {
            status: "success",
            seminar: SeminarView::new(&*db, seminar, &caller),
        }),
        None => invalid_id("seminar"),
    })
}

#[derive(Deserialize)]
struct CancelRequest {
    reason: String,
}

async fn cancel(
    id: u32,
    caller: Caller,
    db: Db,
    request: CancelRequest,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;

    if let Err(e) = db.seminar_cancel(id, caller.id, request.reason, Utc::now()) {
        return Ok(db_failure(e));
    }

    Ok(match db.seminar_get(id) {
        Some(seminar) => success(&SeminarResponse {
            status: "success",
            seminar: SeminarView::new(&*db, seminar, &caller),
        }),
        None => invalid_id("seminar"),
    })
}
