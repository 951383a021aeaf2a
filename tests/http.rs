use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use exam_scheduler::server::{router, AppState, ErrorBody, ScheduleSummary, OWNER_HEADER};
use exam_scheduler::store::{MemoryStore, ScheduleRecord};
use exam_scheduler::{Scheduler, SchedulingReport};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    router(AppState::new(Arc::new(MemoryStore::new()), Scheduler::default()))
}

fn request(
    method: &str,
    uri: &str,
    owner: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(owner) = owner {
        builder = builder.header(OWNER_HEADER, owner);
    }
    match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

fn parse<T: DeserializeOwned>(bytes: &[u8]) -> T {
    serde_json::from_slice(bytes).unwrap()
}

fn dataset() -> serde_json::Value {
    json!({
        "exams": [
            { "id": "calc", "studentsCount": 80 },
            { "id": "algebra", "studentsCount": 30 },
            { "id": "huge", "studentsCount": 500 }
        ],
        "rooms": [
            { "id": "hall", "capacity": 100 },
            { "id": "lab", "capacity": 30 }
        ],
        "timeslots": [
            { "id": "mon", "date": "2025-06-02", "startTime": "09:00", "endTime": "12:00" }
        ]
    })
}

#[tokio::test]
async fn health_check_answers() {
    let (status, body) = send(&app(), request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn solve_returns_a_report() {
    let input = json!({
        "exams": [{ "id": "e1", "studentsCount": 30 }],
        "rooms": [{ "id": "r1", "capacity": 30 }],
        "timeslots": [{ "id": "t1" }]
    });
    let req = request("POST", "/v1/schedule/solve", None, Some(input));
    let (status, body) = send(&app(), req).await;
    assert_eq!(status, StatusCode::OK);

    let report: SchedulingReport = parse(&body);
    assert_eq!(report.scheduled_count(), 1);
    assert_eq!(report.assignments[0].room_id, "r1");
}

#[tokio::test]
async fn solve_rejects_duplicate_rooms() {
    let input = json!({
        "exams": [{ "id": "e1", "studentsCount": 10 }],
        "rooms": [{ "id": "r1", "capacity": 30 }, { "id": "r1", "capacity": 40 }],
        "timeslots": [{ "id": "t1" }]
    });
    let req = request("POST", "/v1/schedule/solve", None, Some(input));
    let (status, body) = send(&app(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorBody = parse(&body);
    assert!(error.error.contains("r1"));
}

#[tokio::test]
async fn optimize_requires_an_owner() {
    let (status, body) = send(&app(), request("POST", "/v1/schedule/optimize", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let error: ErrorBody = parse(&body);
    assert_eq!(error.error, "not authenticated");
}

#[tokio::test]
async fn optimize_without_dataset_is_not_found() {
    let (status, _) = send(
        &app(),
        request("POST", "/v1/schedule/optimize", Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn optimize_persists_owner_schedules() {
    let app = app();
    let req = request("PUT", "/v1/dataset", Some("alice"), Some(dataset()));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        request("POST", "/v1/schedule/optimize", Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let summary: ScheduleSummary = parse(&body);
    assert!(summary.success);
    assert_eq!(summary.scheduled, 2);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].exam_id, "huge");

    let (_, body) = send(&app, request("GET", "/v1/schedules", Some("alice"), None)).await;
    let records: Vec<ScheduleRecord> = parse(&body);
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.owner_id == "alice"));

    let (_, body) = send(&app, request("GET", "/v1/schedules", Some("bob"), None)).await;
    let records: Vec<ScheduleRecord> = parse(&body);
    assert!(records.is_empty());
}

#[tokio::test]
async fn incremental_mode_keeps_earlier_assignments() {
    let app = app();
    send(&app, request("PUT", "/v1/dataset", Some("alice"), Some(dataset()))).await;
    send(&app, request("POST", "/v1/schedule/optimize", Some("alice"), None)).await;
    let (_, body) = send(&app, request("GET", "/v1/schedules", Some("alice"), None)).await;
    let before: Vec<ScheduleRecord> = parse(&body);

    let mut grown = dataset();
    grown["exams"]
        .as_array_mut()
        .unwrap()
        .push(json!({ "id": "late", "studentsCount": 20 }));
    grown["timeslots"]
        .as_array_mut()
        .unwrap()
        .push(json!({
            "id": "tue",
            "date": "2025-06-03",
            "startTime": "09:00",
            "endTime": "12:00"
        }));
    send(&app, request("PUT", "/v1/dataset", Some("alice"), Some(grown))).await;

    let (status, body) = send(
        &app,
        request("POST", "/v1/schedule/optimize?mode=incremental", Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let summary: ScheduleSummary = parse(&body);
    assert_eq!(summary.scheduled, 3);
    assert_eq!(summary.total, 4);

    let (_, body) = send(&app, request("GET", "/v1/schedules", Some("alice"), None)).await;
    let after: Vec<ScheduleRecord> = parse(&body);
    assert_eq!(after.len(), 3);
    assert!(before.iter().all(|record| after.contains(record)));
    let late = after.iter().find(|r| r.exam_id == "late").unwrap();
    assert_eq!(late.timeslot_id, "tue");
}

#[tokio::test]
async fn incremental_mode_validates_kept_exams() {
    let app = app();
    send(&app, request("PUT", "/v1/dataset", Some("alice"), Some(dataset()))).await;
    send(&app, request("POST", "/v1/schedule/optimize", Some("alice"), None)).await;

    let mut duplicated = dataset();
    duplicated["exams"]
        .as_array_mut()
        .unwrap()
        .push(json!({ "id": "calc", "studentsCount": 10 }));
    send(&app, request("PUT", "/v1/dataset", Some("alice"), Some(duplicated))).await;

    let (status, body) = send(
        &app,
        request("POST", "/v1/schedule/optimize?mode=incremental", Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorBody = parse(&body);
    assert_eq!(error.error, "duplicate exam identifier 'calc'");

    let (_, body) = send(&app, request("GET", "/v1/schedules", Some("alice"), None)).await;
    let records: Vec<ScheduleRecord> = parse(&body);
    assert_eq!(records.len(), 2);
}
