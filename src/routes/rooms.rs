use serde::Serialize;
use warp::{http::StatusCode, Filter, Rejection, Reply};

use super::globals::{
    db_failure, invalid_id, success, PaginatedQueryableListRequest, SimpleSuccessResponse,
};
use db::{models::Room, Database, Db, NewRoom, RoomUpdate};
use filters::{authed, authed_is_of_kind, with_db, Caller, Role};

pub fn routes(db: &Db) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list_route = warp::path!("api" / "rooms")
        .and(warp::get())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and(warp::query::<PaginatedQueryableListRequest>())
        .and_then(list)
        .boxed();

    let create_route = warp::path!("api" / "rooms")
        .and(warp::post())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(create)
        .boxed();

    let delete_route = warp::path!("api" / "rooms")
        .and(warp::delete())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(delete)
        .boxed();

    let get_route = warp::path!("api" / "rooms" / u32)
        .and(warp::get())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and_then(get)
        .boxed();

    let update_route = warp::path!("api" / "rooms" / u32)
        .and(warp::put())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(update)
        .boxed();

    list_route
        .or(create_route)
        .or(delete_route)
        .or(get_route)
        .or(update_route)
}

#[derive(Serialize)]
struct ListResponse<'a> {
    status: &'static str,
    total: usize,
    rooms: Vec<&'a Room>,
}

async fn list(
    _caller: Caller,
    db: Db,
    request: PaginatedQueryableListRequest,
) -> Result<impl warp::Reply, warp::Rejection> {
    let db = db.lock().await;

    let page = request.page.map(|_| request.normalized_page_number());
    let (total, rooms) = db.room_list(page, request.query.as_deref());

    Ok(success(&ListResponse {
        status: "success",
        total,
        rooms,
    }))
}

#[derive(Serialize)]
struct RoomResponse<'a> {
    status: &'static str,
    room: &'a Room,
}

async fn create(
    _caller: Caller,
    db: Db,
    request: NewRoom,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;

    Ok(match db.room_add(request) {
        Ok(room) => success(&RoomResponse {
            status: "success",
            room,
        }),
        Err(e) => db_failure(e),
    })
}

async fn delete(
    _caller: Caller,
    db: Db,
    request: Vec<u32>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;

    Ok(match db.room_remove(&request) {
        Ok(()) => success(&SimpleSuccessResponse::new()),
        Err(e) => db_failure(e),
    })
}

async fn get(id: u32, _caller: Caller, db: Db) -> Result<impl warp::Reply, warp::Rejection> {
    let db = db.lock().await;

    Ok(match db.room_get(id) {
        Some(room) => success(&RoomResponse {
            status: "success",
            room,
        }),
        None => invalid_id("room"),
    })
}

async fn update(
    id: u32,
    _caller: Caller,
    db: Db,
    request: RoomUpdate,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;

    let status = match db.room_update(id, request) {
        Ok(status) => status,
        Err(e) => return Ok(db_failure(e)),
    };

    if !status.found {
        return Ok(invalid_id("room"));
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&SimpleSuccessResponse::new()),
        if status.updated {
            StatusCode::OK
        } else {
            StatusCode::NO_CONTENT
        },
    ))
}
