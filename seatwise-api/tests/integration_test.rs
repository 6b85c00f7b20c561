use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use futures_util::future::join_all;
use serde_json::{json, Value};
use tower::ServiceExt;

use seatwise_api::{app, AppState};
use seatwise_core::{messages, FastCache};
use seatwise_reservation::CacheLock;
use seatwise_store::{app_config::Config, MemoryCache, MemoryIdempotencyStore, MemoryStore};

fn test_app() -> Router {
    let cache: Arc<dyn FastCache> = Arc::new(MemoryCache::new());
    let state = AppState::new(
        &Config::default(),
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryIdempotencyStore::new()),
        cache.clone(),
        Arc::new(CacheLock::new(cache)),
    );
    app(state)
}

struct TestResponse {
    status: StatusCode,
    replayed: bool,
    raw: Vec<u8>,
    body: Value,
}

async fn send(app: &Router, method: &str, uri: &str, key: Option<&str>, body: Option<Value>) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = key {
        builder = builder.header("Idempotency-Key", key);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let replayed = response
        .headers()
        .get("idempotent-replayed")
        .map(|v| v == "true")
        .unwrap_or(false);
    let raw = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
    let body = serde_json::from_slice(&raw).unwrap_or(Value::Null);

    TestResponse { status, replayed, raw, body }
}

async fn create_seat(app: &Router, number: &str) -> String {
    let res = send(
        app,
        "POST",
        "/api/seats",
        None,
        Some(json!({ "seat_number": number, "row": &number[..1], "price": 4500 })),
    )
    .await;
    assert_eq!(res.status, StatusCode::CREATED);
    res.body["data"]["id"].as_str().unwrap().to_string()
}

async fn reserve(app: &Router, seat_id: &str, user: &str, key: &str) -> TestResponse {
    send(
        app,
        "POST",
        "/api/seats/reserve",
        Some(key),
        Some(json!({ "seat_id": seat_id, "user_id": user })),
    )
    .await
}

#[tokio::test]
async fn test_reserve_and_replay() {
    let app = test_app();
    let seat_id = create_seat(&app, "A1").await;

    let first = reserve(&app, &seat_id, "user-1", "key-1").await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert!(!first.replayed);
    assert_eq!(first.body["success"], true);
    assert_eq!(first.body["message"], "Seat reserved successfully");
    assert_eq!(first.body["data"]["reservation"]["status"], "PENDING");
    assert_eq!(first.body["data"]["seat"]["status"], "RESERVED");
    assert_eq!(first.body["data"]["seat"]["version"], 1);

    let second = reserve(&app, &seat_id, "user-1", "key-1").await;
    assert_eq!(second.status, StatusCode::CREATED);
    assert!(second.replayed);
    assert_eq!(second.raw, first.raw);
}

#[tokio::test]
async fn test_idempotency_key_is_required() {
    let app = test_app();
    let seat_id = create_seat(&app, "A1").await;

    let res = send(
        &app,
        "POST",
        "/api/seats/reserve",
        None,
        Some(json!({ "seat_id": seat_id, "user_id": "user-1" })),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.body["error"], messages::IDEMPOTENCY_KEY_REQUIRED);

    let long_key = "k".repeat(256);
    let res = reserve(&app, &seat_id, "user-1", &long_key).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], messages::IDEMPOTENCY_KEY_TOO_LONG);

    let seat = send(&app, "GET", &format!("/api/seats/{}", seat_id), None, None).await;
    assert_eq!(seat.body["data"]["status"], "AVAILABLE");
}

#[tokio::test]
async fn test_second_user_gets_conflict() {
    let app = test_app();
    let seat_id = create_seat(&app, "A1").await;

    assert_eq!(reserve(&app, &seat_id, "user-1", "key-1").await.status, StatusCode::CREATED);
    let res = reserve(&app, &seat_id, "user-2", "key-2").await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["error"], messages::SEAT_NOT_AVAILABLE);
}

#[tokio::test]
async fn test_unknown_seat_is_not_found() {
    let app = test_app();
    let res = reserve(&app, &uuid::Uuid::new_v4().to_string(), "user-1", "key-1").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["error"], messages::SEAT_NOT_FOUND);
}

#[tokio::test]
async fn test_confirm_flow() {
    let app = test_app();
    let seat_id = create_seat(&app, "A1").await;
    let reserved = reserve(&app, &seat_id, "user-1", "reserve-1").await;
    let reservation_id = reserved.body["data"]["reservation"]["id"].as_str().unwrap().to_string();

    let confirm = |user: &'static str, key: &'static str| {
        let app = app.clone();
        let reservation_id = reservation_id.clone();
        async move {
            send(
                &app,
                "POST",
                "/api/reservations/confirm",
                Some(key),
                Some(json!({ "reservation_id": reservation_id, "user_id": user })),
            )
            .await
        }
    };

    let stranger = confirm("user-2", "confirm-2").await;
    assert_eq!(stranger.status, StatusCode::FORBIDDEN);

    let confirmed = confirm("user-1", "confirm-1").await;
    assert_eq!(confirmed.status, StatusCode::OK);
    assert_eq!(confirmed.body["data"]["reservation"]["status"], "CONFIRMED");
    assert_eq!(confirmed.body["data"]["seat"]["status"], "CONFIRMED");
    assert_eq!(confirmed.body["data"]["seat"]["version"], 2);

    let replay = confirm("user-1", "confirm-1").await;
    assert!(replay.replayed);
    assert_eq!(replay.raw, confirmed.raw);

    let again = confirm("user-1", "confirm-3").await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.body["error"], messages::RESERVATION_ALREADY_CONFIRMED);

    let missing_key = send(
        &app,
        "POST",
        "/api/reservations/confirm",
        None,
        Some(json!({ "reservation_id": reservation_id, "user_id": "user-1" })),
    )
    .await;
    assert_eq!(missing_key.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cancel_flow() {
    let app = test_app();
    let seat_id = create_seat(&app, "A1").await;
    let reserved = reserve(&app, &seat_id, "user-1", "reserve-1").await;
    let reservation_id = reserved.body["data"]["reservation"]["id"].as_str().unwrap().to_string();

    let cancel = |user: &'static str| {
        let app = app.clone();
        let reservation_id = reservation_id.clone();
        async move {
            send(
                &app,
                "POST",
                "/api/reservations/cancel",
                None,
                Some(json!({ "reservation_id": reservation_id, "user_id": user })),
            )
            .await
        }
    };

    let stranger = cancel("user-2").await;
    assert_eq!(stranger.status, StatusCode::NOT_FOUND);

    let cancelled = cancel("user-1").await;
    assert_eq!(cancelled.status, StatusCode::OK);
    assert_eq!(cancelled.body["message"], "Reservation cancelled successfully");
    assert_eq!(cancelled.body["data"]["reservation"]["status"], "CANCELLED");
    assert_eq!(cancelled.body["data"]["seat"]["status"], "AVAILABLE");

    let twice = cancel("user-1").await;
    assert_eq!(twice.status, StatusCode::CONFLICT);

    // The seat is back on sale
    let res = reserve(&app, &seat_id, "user-2", "reserve-2").await;
    assert_eq!(res.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_concurrent_reserves_have_one_winner() {
    let app = test_app();
    let seat_id = create_seat(&app, "A1").await;

    let attempts = (0..20).map(|i| {
        let app = app.clone();
        let seat_id = seat_id.clone();
        async move {
            reserve(&app, &seat_id, &format!("user-{}", i), &format!("key-{}", i))
                .await
                .status
        }
    });
    let statuses = join_all(attempts).await;

    let created = statuses.iter().filter(|s| **s == StatusCode::CREATED).count();
    let conflicts = statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count();
    assert_eq!(created, 1);
    assert_eq!(conflicts, 19);

    let reservations = send(&app, "GET", "/api/reservations?status=PENDING", None, None).await;
    assert_eq!(reservations.body["data"]["total"], 1);
}

#[tokio::test]
async fn test_seat_reads_and_stats() {
    let app = test_app();
    let seat_id = create_seat(&app, "A1").await;
    create_seat(&app, "B2").await;
    reserve(&app, &seat_id, "user-1", "key-1").await;

    let seats = send(&app, "GET", "/api/seats?row=a", None, None).await;
    assert_eq!(seats.status, StatusCode::OK);
    assert_eq!(seats.body["data"]["total"], 1);
    assert_eq!(seats.body["data"]["items"][0]["seat_number"], "A1");
    assert!(seats.body["data"]["items"][0]["remaining_seconds"].as_i64().unwrap() > 0);

    let by_number = send(&app, "GET", "/api/seats/number/b2", None, None).await;
    assert_eq!(by_number.status, StatusCode::OK);
    assert_eq!(by_number.body["data"]["status"], "AVAILABLE");

    let stats = send(&app, "GET", "/api/seats/stats", None, None).await;
    assert_eq!(stats.body["data"]["available"], 1);
    assert_eq!(stats.body["data"]["reserved"], 1);
    assert_eq!(stats.body["data"]["total"], 2);

    let missing = send(&app, "GET", &format!("/api/seats/{}", uuid::Uuid::new_v4()), None, None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let mine = send(&app, "GET", "/api/reservations?user_id=user-1", None, None).await;
    assert_eq!(mine.body["data"]["total"], 1);
    let reservation_id = mine.body["data"]["items"][0]["id"].as_str().unwrap();
    let single = send(&app, "GET", &format!("/api/reservations/{}", reservation_id), None, None).await;
    assert_eq!(single.status, StatusCode::OK);
    assert_eq!(single.body["data"]["seat_id"], seat_id.as_str());
}

#[tokio::test]
async fn test_admin_seat_management() {
    let app = test_app();
    let seat_id = create_seat(&app, "A1").await;

    let duplicate = send(
        &app,
        "POST",
        "/api/seats",
        None,
        Some(json!({ "seat_number": "a1", "row": "A" })),
    )
    .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let not_sold = send(&app, "POST", &format!("/api/seats/{}/reset", seat_id), None, None).await;
    assert_eq!(not_sold.status, StatusCode::CONFLICT);

    let reserved = reserve(&app, &seat_id, "user-1", "reserve-1").await;
    let reservation_id = reserved.body["data"]["reservation"]["id"].as_str().unwrap().to_string();
    let confirmed = send(
        &app,
        "POST",
        "/api/reservations/confirm",
        Some("confirm-1"),
        Some(json!({ "reservation_id": reservation_id, "user_id": "user-1" })),
    )
    .await;
    assert_eq!(confirmed.status, StatusCode::OK);

    let reset = send(&app, "POST", &format!("/api/seats/{}/reset", seat_id), None, None).await;
    assert_eq!(reset.status, StatusCode::OK);
    assert_eq!(reset.body["data"]["status"], "AVAILABLE");
    assert_eq!(reset.body["data"]["version"], 3);
}

#[tokio::test]
async fn test_expiration_stats_and_health() {
    let app = test_app();

    let stats = send(&app, "GET", "/api/expiration/stats", None, None).await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(stats.body["data"]["pending_expired"], 0);

    let health = send(&app, "GET", "/health", None, None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["data"]["status"], "ok");
}
