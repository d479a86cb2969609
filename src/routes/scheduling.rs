use chrono::{NaiveDate, Utc};
use serde::Serialize;
use warp::{Filter, Rejection, Reply};

use super::globals::{db_failure, invalid_id, success};
use super::schedules::{ScheduleResponse, ScheduleView};
use db::{models::Seminar, Database, Db, NewSchedule};
use filters::{authed_is_of_kind, with_db, Caller, Role};

pub fn routes(db: &Db) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let availability_route = warp::path!("api" / "seminars" / u32 / "availability")
        .and(warp::get())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and_then(availability)
        .boxed();

    let verify_route = warp::path!("api" / "seminars" / u32 / "verify")
        .and(warp::post())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and_then(verify)
        .boxed();

    let schedule_route = warp::path!("api" / "seminars" / u32 / "schedule")
        .and(warp::post())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(schedule)
        .boxed();

    let finish_route = warp::path!("api" / "seminars" / u32 / "finish")
        .and(warp::post())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and_then(finish)
        .boxed();

    availability_route
        .or(verify_route)
        .or(schedule_route)
        .or(finish_route)
}

#[derive(Serialize)]
struct AvailabilityResponse {
    status: &'static str,
    dates: Vec<NaiveDate>,
}

async fn availability(
    id: u32,
    _caller: Caller,
    db: Db,
) -> Result<impl warp::Reply, warp::Rejection> {
    let db = db.lock().await;

    Ok(match db.seminar_availability(id) {
        Ok(dates) => success(&AvailabilityResponse {
            status: "success",
            dates,
        }),
        Err(e) => db_failure(e),
    })
}

#[derive(Serialize)]
struct SeminarResponse<'a> {
    status: &'static str,
    seminar: &'a Seminar,
}

async fn verify(id: u32, caller: Caller, db: Db) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;

    Ok(match db.seminar_verify(id, caller.id, Utc::now()) {
        Ok(seminar) => success(&SeminarResponse {
            status: "success",
            seminar,
        }),
        Err(e) => db_failure(e),
    })
}

async fn schedule(
    id: u32,
    caller: Caller,
    db: Db,
    request: NewSchedule,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;

    let schedule_id = match db.seminar_schedule(id, request) {
        Ok(schedule) => schedule.id,
        Err(e) => return Ok(db_failure(e)),
    };

    Ok(match db.schedule_get(schedule_id) {
        Some(schedule) => success(&ScheduleResponse {
            status: "success",
            schedule: ScheduleView::new(&*db, schedule, &caller),
        }),
        None => invalid_id("schedule"),
    })
}

async fn finish(id: u32, _caller: Caller, db: Db) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;

    Ok(match db.seminar_finish(id) {
        Ok(seminar) => success(&SeminarResponse {
            status: "success",
            seminar,
        }),
        Err(e) => db_failure(e),
    })
}
