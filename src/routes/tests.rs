use super::*;
use chrono::{Duration, Utc};
use db::new_memory_db;
use serde_json::{json, Value};

async fn call(
    db: &Db,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let filter = routes(db).recover(handle_rejection);
    let mut request = warp::test::request().method(method).path(path);

    if let Some(token) = token {
        request = request.header("Authorization", format!("Bearer {}", token));
    }

    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.reply(&filter).await;
    let body = serde_json::from_slice(response.body()).unwrap_or(Value::Null);
    (response.status(), body)
}

async fn login(db: &Db, username: &str) -> String {
    let (status, body) = call(
        db,
        "POST",
        "/api/session",
        None,
        Some(json!({ "username": username, "password": username })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    body["token"].as_str().unwrap().to_string()
}

/// A start time a few minutes in the past, so that a scan right now is on time
fn start() -> (String, String) {
    let start = Utc::now() - Duration::minutes(5);
    (
        start.date_naive().format("%Y-%m-%d").to_string(),
        start.time().format("%H:%M:%S").to_string(),
    )
}

async fn create_seminar(db: &Db, student: &str) -> u64 {
    let (status, body) = call(
        db,
        "POST",
        "/api/seminars",
        Some(student),
        Some(json!({
            "title": "Consensus under partial synchrony",
            "seminar_type": "results",
            "abstract": "We revisit leader election.",
            "advisor1_id": 2,
            "advisor2_id": 3,
            "examiner_id": 4
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["seminar"]["status"], "pending-verification");
    body["seminar"]["id"].as_u64().unwrap()
}

async fn approve(db: &Db, lecturer: &str, seminar_id: u64, date: &str) -> (StatusCode, Value) {
    let token = login(db, lecturer).await;

    call(
        db,
        "PUT",
        &format!("/api/seminars/{}/approval", seminar_id),
        Some(&token),
        Some(json!({ "decision": "approve", "available_dates": [date] })),
    )
    .await
}

/// Runs a seminar through approval, verification and scheduling in the auditorium
async fn scheduled_seminar(db: &Db, student: &str, admin: &str) -> (u64, Value) {
    let (date, time) = start();
    let id = create_seminar(db, student).await;

    for lecturer in &["lovelace.ada", "turing.alan"] {
        let (status, body) = approve(db, lecturer, id, &date).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["seminar_status"], "pending-verification");
    }

    let (_, body) = approve(db, "hopper.grace", id, &date).await;
    assert_eq!(body["seminar_status"], "approved");

    let (status, body) = call(
        db,
        "GET",
        &format!("/api/seminars/{}/availability", id),
        Some(admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dates"], json!([date]));

    let (status, _) = call(
        db,
        "POST",
        &format!("/api/seminars/{}/verify", id),
        Some(admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        db,
        "POST",
        &format!("/api/seminars/{}/schedule", id),
        Some(admin),
        Some(json!({
            "date": date,
            "start_time": time,
            "duration_minutes": 90,
            "room_id": 2
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    (id, body["schedule"].clone())
}

#[tokio::test]
async fn login_and_logout() {
    let db = new_memory_db().unwrap();

    let (status, body) = call(
        &db,
        "POST",
        "/api/session",
        None,
        Some(json!({ "username": "user.admin", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "InvalidCredentials");

    let token = login(&db, "user.admin").await;

    let (status, body) = call(&db, "GET", "/api/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["kind"], "administrator");
    assert!(body["user"].get("password").is_none());

    let (status, _) = call(&db, "DELETE", "/api/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&db, "GET", "/api/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn password_change() {
    let db = new_memory_db().unwrap();
    let token = login(&db, "user.student").await;

    let (status, body) = call(
        &db,
        "PUT",
        "/api/profile",
        Some(&token),
        Some(json!({ "old_password": "wrong", "password": "correct horse battery" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "InvalidOldPassword");

    let (status, _) = call(
        &db,
        "PUT",
        "/api/profile",
        Some(&token),
        Some(json!({ "old_password": "user.student", "password": "correct horse battery" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        &db,
        "POST",
        "/api/session",
        None,
        Some(json!({ "username": "user.student", "password": "correct horse battery" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn role_guards() {
    let db = new_memory_db().unwrap();
    let student = login(&db, "user.student").await;

    let (status, body) = call(&db, "GET", "/api/students", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");

    let (status, body) = call(&db, "GET", "/api/students", Some(&student), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "InsufficientAuthorization");

    // Students pick their lecturers from this list
    let (status, body) = call(&db, "GET", "/api/lecturers", Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 4);

    let (status, _) = call(
        &db,
        "POST",
        "/api/rooms",
        Some(&student),
        Some(json!({ "name": "Lab 4", "capacity": 20 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_and_unknown_requests() {
    let db = new_memory_db().unwrap();
    let student = login(&db, "user.student").await;

    let (status, body) = call(
        &db,
        "POST",
        "/api/seminars",
        Some(&student),
        Some(json!({ "title": "Missing everything else" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MalformedData");

    let (status, _) = call(&db, "GET", "/api/nothing-here", Some(&student), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&db, "PATCH", "/api/session", None, None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["code"], "MethodNotAllowed");
}

#[tokio::test]
async fn account_creation() {
    let db = new_memory_db().unwrap();
    let admin = login(&db, "user.admin").await;

    let (status, body) = call(
        &db,
        "POST",
        "/api/students",
        Some(&admin),
        Some(json!({ "first_name": "Margaret", "last_name": "Hamilton", "student_number": "21009999" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "hamilton.margaret");

    let password = body["password"].as_str().unwrap();
    let (status, _) = call(
        &db,
        "POST",
        "/api/session",
        None,
        Some(json!({ "username": "hamilton.margaret", "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&db, "GET", "/api/students?query=hamil&page=1", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["students"][0]["student_number"], "21009999");
}

#[tokio::test]
async fn seminar_to_attendance() {
    let db = new_memory_db().unwrap();
    let admin = login(&db, "user.admin").await;
    let student = login(&db, "user.student").await;

    let (id, schedule) = scheduled_seminar(&db, &student, &admin).await;
    let schedule_id = schedule["id"].as_u64().unwrap();
    let token = schedule["token"].as_str().unwrap().to_string();

    // Only administrators get to see the QR token
    let (status, body) = call(&db, "GET", &format!("/api/seminars/{}", id), Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seminar"]["status"], "scheduled");
    assert_eq!(body["seminar"]["approvals"].as_array().unwrap().len(), 3);
    assert!(body["seminar"]["schedule"].get("token").is_none());

    let attendee = login(&db, "torvalds.linus").await;
    let scan = json!({ "token": token });

    let (status, body) = call(&db, "POST", "/api/attendance", Some(&attendee), Some(scan.clone())).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["attendance"]["lateness"], "on-time");
    assert_eq!(body["attendance"]["method"], "qr-scan");

    let (status, body) = call(&db, "POST", "/api/attendance", Some(&attendee), Some(scan)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "AlreadyRecorded");

    let (status, body) = call(
        &db,
        "GET",
        &format!("/api/schedules/{}/attendance", schedule_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["attendances"].as_array().unwrap().len(), 1);
    assert_eq!(body["attendances"][0]["attendee_name"], "Linus Torvalds");

    // Lecturer User is not assigned to this seminar
    let outsider = login(&db, "user.lecturer").await;
    let (status, _) = call(
        &db,
        "GET",
        &format!("/api/schedules/{}/attendance", schedule_id),
        Some(&outsider),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn rejection_needs_revision() {
    let db = new_memory_db().unwrap();
    let student = login(&db, "user.student").await;
    let (date, _) = start();

    let id = create_seminar(&db, &student).await;
    let examiner = login(&db, "hopper.grace").await;

    let (status, body) = call(
        &db,
        "PUT",
        &format!("/api/seminars/{}/approval", id),
        Some(&examiner),
        Some(json!({ "decision": "reject", "comment": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "InvalidRequest");

    let (status, body) = call(
        &db,
        "PUT",
        &format!("/api/seminars/{}/approval", id),
        Some(&examiner),
        Some(json!({ "decision": "reject", "comment": "The evaluation is missing" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seminar_status"], "needs-revision");

    let (status, body) = approve(&db, "hopper.grace", id, &date).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "AlreadyDecided");

    let (status, body) = approve(&db, "lovelace.ada", id, &date).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "InvalidSeminarStatus");

    // Logging in again replaced the previous session
    let examiner = login(&db, "hopper.grace").await;
    let (_, body) = call(&db, "GET", "/api/approvals?status=rejected", Some(&examiner), None).await;
    assert_eq!(body["approvals"].as_array().unwrap().len(), 1);
    assert_eq!(body["approvals"][0]["seminar_status"], "needs-revision");
}

#[tokio::test]
async fn cancellation_drops_the_schedule() {
    let db = new_memory_db().unwrap();
    let admin = login(&db, "user.admin").await;
    let student = login(&db, "user.student").await;

    let (id, schedule) = scheduled_seminar(&db, &student, &admin).await;
    let schedule_id = schedule["id"].as_u64().unwrap();

    let other = login(&db, "torvalds.linus").await;
    let (status, _) = call(
        &db,
        "POST",
        &format!("/api/seminars/{}/cancel", id),
        Some(&other),
        Some(json!({ "reason": "Not my seminar" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &db,
        "POST",
        &format!("/api/seminars/{}/cancel", id),
        Some(&student),
        Some(json!({ "reason": "Data collection fell through" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seminar"]["status"], "cancelled");
    assert!(body["seminar"]["schedule"].is_null());

    let (status, _) = call(
        &db,
        "GET",
        &format!("/api/schedules/{}", schedule_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn revisions_after_the_seminar() {
    let db = new_memory_db().unwrap();
    let admin = login(&db, "user.admin").await;
    let student = login(&db, "user.student").await;

    let (id, _) = scheduled_seminar(&db, &student, &admin).await;

    let (status, _) = call(&db, "POST", &format!("/api/seminars/{}/finish", id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let advisor = login(&db, "lovelace.ada").await;
    let (status, body) = call(
        &db,
        "POST",
        &format!("/api/seminars/{}/revisions", id),
        Some(&advisor),
        Some(json!({ "description": "Clarify the threat model" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let revision_id = body["revision"]["id"].as_u64().unwrap();

    let (status, body) = call(
        &db,
        "PUT",
        &format!("/api/revisions/{}/submit", revision_id),
        Some(&student),
        Some(json!({ "response": "Added section 2.3" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revision"]["status"], "submitted");

    let (status, body) = call(
        &db,
        "PUT",
        &format!("/api/revisions/{}/validate", revision_id),
        Some(&advisor),
        Some(json!({ "accepted": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revision"]["status"], "validated");

    let (_, body) = call(&db, "GET", &format!("/api/seminars/{}/revisions", id), Some(&student), None).await;
    assert_eq!(body["revisions"].as_array().unwrap().len(), 1);
}
