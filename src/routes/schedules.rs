use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use warp::{Filter, Rejection, Reply};

use super::globals::{db_failure, invalid_id, not_allowed, success};
use super::seminars::can_view;
use db::{
    models::{Room, Schedule, ScheduleStatus},
    Database, Db,
};
use filters::{authed, authed_is_of_kind, with_db, Caller, Role};

pub fn routes(db: &Db) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let get_route = warp::path!("api" / "schedules" / u32)
        .and(warp::get())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and_then(get)
        .boxed();

    let regenerate_token_route = warp::path!("api" / "schedules" / u32 / "token")
        .and(warp::post())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and_then(regenerate_token)
        .boxed();

    get_route.or(regenerate_token_route)
}

/// Schedule as shown to users; the QR token is only disclosed to administrators
#[derive(Serialize)]
pub struct ScheduleView<'a> {
    id: u32,
    seminar_id: u32,
    room: Option<&'a Room>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    duration_minutes: u32,
    status: ScheduleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<Uuid>,
}

impl<'a> ScheduleView<'a> {
    pub fn new<D: Database>(db: &'a D, schedule: &'a Schedule, caller: &Caller) -> Self {
        Self {
            id: schedule.id,
            seminar_id: schedule.seminar_id,
            room: db.room_get(schedule.room_id),
            start: schedule.start,
            end: schedule.end(),
            duration_minutes: schedule.duration_minutes,
            status: schedule.status,
            token: if caller.is(Role::Administrator) {
                Some(schedule.token)
            } else {
                None
            },
        }
    }
}

#[derive(Serialize)]
pub struct ScheduleResponse<'a> {
    pub status: &'static str,
    pub schedule: ScheduleView<'a>,
}

async fn get(id: u32, caller: Caller, db: Db) -> Result<impl warp::Reply, warp::Rejection> {
    let db = db.lock().await;

    let schedule = match db.schedule_get(id) {
        Some(schedule) => schedule,
        None => return Ok(invalid_id("schedule")),
    };

    let visible = db
        .seminar_get(schedule.seminar_id)
        .map_or(false, |seminar| can_view(&caller, seminar));

    if !visible {
        return Ok(not_allowed("schedule"));
    }

    Ok(success(&ScheduleResponse {
        status: "success",
        schedule: ScheduleView::new(&*db, schedule, &caller),
    }))
}

async fn regenerate_token(
    id: u32,
    caller: Caller,
    db: Db,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;

    if let Err(e) = db.schedule_regenerate_token(id) {
        return Ok(db_failure(e));
    }

    Ok(match db.schedule_get(id) {
        Some(schedule) => success(&ScheduleResponse {
            status: "success",
            schedule: ScheduleView::new(&*db, schedule, &caller),
        }),
        None => invalid_id("schedule"),
    })
}
