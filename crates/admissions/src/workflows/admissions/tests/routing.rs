use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::admissions::audit::InMemoryAuditSink;
use crate::workflows::admissions::domain::BatchStatus;
use crate::workflows::admissions::rate_limit::{InMemoryRateLimiter, RateLimitPolicy};
use crate::workflows::admissions::router::admissions_router;
use crate::workflows::admissions::service::{AdmissionsService, RateLimitSettings};

fn build_router() -> (axum::Router, Arc<MemoryRepository>) {
    build_router_with_limits(RateLimitSettings::default())
}

fn build_router_with_limits(limits: RateLimitSettings) -> (axum::Router, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    repository.seed_course(course());
    repository.seed_batch(batch(3, BatchStatus::Upcoming));
    let service = Arc::new(AdmissionsService::new(
        repository.clone(),
        Arc::new(MemoryNotifier::default()),
        Arc::new(InMemoryRateLimiter::new()),
        Arc::new(InMemoryAuditSink::new()),
        limits,
    ));
    (admissions_router(service), repository)
}

fn submit_request() -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/admissions/applications")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_vec(&submission()).expect("serialize submission"),
        ))
        .expect("request")
}

fn admin_patch(uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method("PATCH")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-actor-id", "admin-1")
        .header("x-actor-name", "Mahbub Alam")
        .header("x-actor-role", "ADMIN")
        .body(Body::from(payload.to_string()))
        .expect("request")
}

async fn read_json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[tokio::test]
async fn post_applications_returns_a_receipt() {
    let (router, _) = build_router();

    let response = router.oneshot(submit_request()).await.expect("dispatch");
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let payload = read_json_body(response).await;
    assert!(payload.get("application_id").is_some());
    assert!(payload
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .contains("Application received"));
}

#[tokio::test]
async fn invalid_submissions_map_to_unprocessable_entity() {
    let (router, _) = build_router();
    let mut bad = submission();
    bad.applicant_phone = "1234".to_string();

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/admissions/applications")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&bad).expect("serialize")))
        .expect("request");

    let response = router.oneshot(request).await.expect("dispatch");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let payload = read_json_body(response).await;
    assert_eq!(
        payload.get("field").and_then(Value::as_str),
        Some("applicant_phone")
    );
}

#[tokio::test]
async fn status_updates_without_credentials_are_forbidden() {
    let (router, _) = build_router();

    let submit = router
        .clone()
        .oneshot(submit_request())
        .await
        .expect("dispatch");
    let receipt = read_json_body(submit).await;
    let id = receipt["application_id"].as_str().expect("id").to_string();

    let request = Request::builder()
        .method("PATCH")
        .uri(format!("/api/v1/admissions/applications/{id}/status"))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "status": "ACCEPTED" }).to_string()))
        .expect("request");

    let response = router.oneshot(request).await.expect("dispatch");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn full_admission_flow_over_http() {
    let (router, repository) = build_router();

    let submit = router
        .clone()
        .oneshot(submit_request())
        .await
        .expect("dispatch");
    assert_eq!(submit.status(), StatusCode::ACCEPTED);
    let receipt = read_json_body(submit).await;
    let id = receipt["application_id"].as_str().expect("id").to_string();

    let accept = router
        .clone()
        .oneshot(admin_patch(
            &format!("/api/v1/admissions/applications/{id}/status"),
            json!({ "status": "ACCEPTED", "notes": "strong interview" }),
        ))
        .await
        .expect("dispatch");
    assert_eq!(accept.status(), StatusCode::OK);

    let enroll_request = Request::builder()
        .method("POST")
        .uri(format!("/api/v1/admissions/applications/{id}/enroll"))
        .header("x-actor-id", "admin-1")
        .header("x-actor-role", "ADMIN")
        .body(Body::empty())
        .expect("request");
    let enroll = router
        .clone()
        .oneshot(enroll_request)
        .await
        .expect("dispatch");
    assert_eq!(enroll.status(), StatusCode::CREATED);
    let enrollment = read_json_body(enroll).await;
    assert!(enrollment.get("enrollment_id").is_some());
    assert!(enrollment
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .contains("batch 3"));

    let list_request = Request::builder()
        .method("GET")
        .uri("/api/v1/admissions/enrollments?course_id=c1")
        .header("x-actor-id", "admin-1")
        .header("x-actor-role", "ADMIN")
        .body(Body::empty())
        .expect("request");
    let list = router.oneshot(list_request).await.expect("dispatch");
    assert_eq!(list.status(), StatusCode::OK);
    let items = read_json_body(list).await;
    assert_eq!(items.as_array().map(Vec::len), Some(1));
    assert_eq!(items[0]["status"].as_str(), Some("ENROLLED"));
    assert_eq!(items[0]["progress"].as_u64(), Some(0));

    assert_eq!(repository.user_count(), 1);
}

#[tokio::test]
async fn throttled_submissions_carry_a_retry_after_header() {
    let limits = RateLimitSettings {
        submission: RateLimitPolicy::per_window(1, 600),
        ..RateLimitSettings::default()
    };
    let (router, _) = build_router_with_limits(limits);

    let first = router
        .clone()
        .oneshot(submit_request())
        .await
        .expect("dispatch");
    assert_eq!(first.status(), StatusCode::ACCEPTED);

    let second = router.oneshot(submit_request()).await.expect("dispatch");
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after = second
        .headers()
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .expect("retry-after header");
    assert!(retry_after > 0);
}

#[tokio::test]
async fn unknown_application_maps_to_not_found() {
    let (router, _) = build_router();

    let response = router
        .oneshot(admin_patch(
            "/api/v1/admissions/applications/app-nope/status",
            json!({ "status": "ACCEPTED" }),
        ))
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn application_listing_supports_status_filter_and_paging() {
    let (router, _) = build_router();

    let submit = router
        .clone()
        .oneshot(submit_request())
        .await
        .expect("dispatch");
    assert_eq!(submit.status(), StatusCode::ACCEPTED);

    let anonymous = Request::builder()
        .method("GET")
        .uri("/api/v1/admissions/applications")
        .body(Body::empty())
        .expect("request");
    let forbidden = router
        .clone()
        .oneshot(anonymous)
        .await
        .expect("dispatch");
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let request = Request::builder()
        .method("GET")
        .uri("/api/v1/admissions/applications?status=PENDING&page=1&page_size=10")
        .header("x-actor-id", "admin-1")
        .header("x-actor-role", "ADMIN")
        .body(Body::empty())
        .expect("request");
    let response = router.oneshot(request).await.expect("dispatch");
    assert_eq!(response.status(), StatusCode::OK);

    let payload = read_json_body(response).await;
    assert_eq!(payload["total"].as_u64(), Some(1));
    assert_eq!(payload["pages"].as_u64(), Some(1));
    assert_eq!(
        payload["items"][0]["status"].as_str(),
        Some("PENDING"),
        "status must round-trip in its wire form"
    );
}
