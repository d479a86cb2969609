use chrono::Utc;
use serde::Serialize;
use warp::{Filter, Rejection, Reply};

use super::globals::{db_failure, invalid_id, not_allowed, success};
use db::{models::Attendance, Database, Db, ManualAttendance, Scan};
use filters::{authed_is_of_kind, with_db, Caller, Role};

pub fn routes(db: &Db) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let scan_route = warp::path!("api" / "attendance")
        .and(warp::post())
        .and(authed_is_of_kind(db, &[Role::Student, Role::Lecturer]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(scan)
        .boxed();

    let manual_route = warp::path!("api" / "schedules" / u32 / "attendance")
        .and(warp::post())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(manual)
        .boxed();

    let list_route = warp::path!("api" / "schedules" / u32 / "attendance")
        .and(warp::get())
        .and(authed_is_of_kind(db, &[Role::Administrator, Role::Lecturer]))
        .and(with_db(db.clone()))
        .and_then(list)
        .boxed();

    scan_route.or(manual_route).or(list_route)
}

#[derive(Serialize)]
struct AttendanceResponse<'a> {
    status: &'static str,
    attendance: &'a Attendance,
}

async fn scan(caller: Caller, db: Db, request: Scan) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;

    Ok(match db.attendance_scan(caller.id, request, Utc::now()) {
        Ok(attendance) => success(&AttendanceResponse {
            status: "success",
            attendance,
        }),
        Err(e) => db_failure(e),
    })
}

async fn manual(
    schedule_id: u32,
    caller: Caller,
    db: Db,
    request: ManualAttendance,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;

    log::info!(
        "administrator {} records attendance of {} manually",
        caller.id,
        request.attendee_id
    );

    Ok(match db.attendance_manual(schedule_id, request, Utc::now()) {
        Ok(attendance) => success(&AttendanceResponse {
            status: "success",
            attendance,
        }),
        Err(e) => db_failure(e),
    })
}

#[derive(Serialize)]
struct ListResponse<'a> {
    status: &'static str,
    attendances: Vec<AttendanceListElement<'a>>,
}

#[derive(Serialize)]
struct AttendanceListElement<'a> {
    #[serde(flatten)]
    attendance: &'a Attendance,
    attendee_name: Option<String>,
}

async fn list(
    schedule_id: u32,
    caller: Caller,
    db: Db,
) -> Result<impl warp::Reply, warp::Rejection> {
    let db = db.lock().await;

    let seminar = match db
        .schedule_get(schedule_id)
        .and_then(|schedule| db.seminar_get(schedule.seminar_id))
    {
        Some(seminar) => seminar,
        None => return Ok(invalid_id("schedule")),
    };

    // Lecturers only see the attendance of seminars they are assigned to
    if caller.is(Role::Lecturer) && !seminar.is_assigned(caller.id) {
        return Ok(not_allowed("schedule"));
    }

    let attendances = db
        .attendance_list(schedule_id)
        .into_iter()
        .map(|attendance| AttendanceListElement {
            attendance,
            attendee_name: db.user_get(attendance.attendee_id).map(|u| u.full_name()),
        })
        .collect();

    Ok(success(&ListResponse {
        status: "success",
        attendances,
    }))
}
