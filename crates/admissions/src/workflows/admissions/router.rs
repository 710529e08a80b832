use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{Actor, ApplicationId, CourseId, EnrollmentId, Role, UserId};
use super::notify::NotificationPublisher;
use super::repository::{AdmissionsRepository, RepositoryError};
use super::service::{AdmissionsError, AdmissionsService};

/// Router builder exposing the workflow over HTTP. The authenticated
/// caller identity, when present, arrives in `x-actor-*` headers set by the
/// surrounding authentication layer.
pub fn admissions_router<R, N>(service: Arc<AdmissionsService<R, N>>) -> Router
where
    R: AdmissionsRepository + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/admissions/applications",
            post(submit_handler::<R, N>).get(list_applications_handler::<R, N>),
        )
        .route(
            "/api/v1/admissions/applications/:application_id/status",
            patch(update_status_handler::<R, N>),
        )
        .route(
            "/api/v1/admissions/applications/:application_id/enroll",
            post(enroll_handler::<R, N>),
        )
        .route(
            "/api/v1/admissions/enrollments",
            get(list_enrollments_handler::<R, N>),
        )
        .route(
            "/api/v1/admissions/enrollments/:enrollment_id",
            patch(update_enrollment_handler::<R, N>),
        )
        .with_state(service)
}

/// Caller identity from the `x-actor-id`, `x-actor-name`, and
/// `x-actor-role` headers; absent or incomplete headers mean an anonymous
/// caller.
fn actor_from_headers(headers: &HeaderMap) -> Option<Actor> {
    let id = headers.get("x-actor-id")?.to_str().ok()?.trim();
    if id.is_empty() {
        return None;
    }
    let role = Role::parse(headers.get("x-actor-role")?.to_str().ok()?.trim())?;
    let name = headers
        .get("x-actor-name")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| id.to_string());

    Some(Actor {
        id: UserId(id.to_string()),
        name,
        role,
    })
}

fn error_response(error: AdmissionsError) -> Response {
    match error {
        AdmissionsError::Validation(err) => {
            let payload = json!({ "error": err.to_string(), "field": err.field() });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        AdmissionsError::Unauthorized => {
            let payload = json!({ "error": "not authorized" });
            (StatusCode::FORBIDDEN, axum::Json(payload)).into_response()
        }
        AdmissionsError::RateLimited {
            retry_after_seconds,
        } => {
            let payload = json!({
                "error": "too many requests",
                "retry_after_seconds": retry_after_seconds,
            });
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after_seconds.to_string())],
                axum::Json(payload),
            )
                .into_response()
        }
        AdmissionsError::Conflict(reason) => {
            let payload = json!({ "error": reason.to_string() });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        AdmissionsError::Repository(RepositoryError::NotFound) => {
            let payload = json!({ "error": "record not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        AdmissionsError::Repository(err) => {
            error!(error = %err, "admissions operation failed");
            let payload = json!({ "error": "internal error" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn submit_handler<R, N>(
    State(service): State<Arc<AdmissionsService<R, N>>>,
    headers: HeaderMap,
    axum::Json(submission): axum::Json<super::domain::ApplicationSubmission>,
) -> Response
where
    R: AdmissionsRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let session_user = actor_from_headers(&headers).map(|actor| actor.id);
    match service.submit_application(submission, session_user) {
        Ok(receipt) => (StatusCode::ACCEPTED, axum::Json(receipt)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApplicationsQuery {
    status: Option<String>,
    page: Option<u32>,
    page_size: Option<u32>,
}

pub(crate) async fn list_applications_handler<R, N>(
    State(service): State<Arc<AdmissionsService<R, N>>>,
    headers: HeaderMap,
    Query(query): Query<ApplicationsQuery>,
) -> Response
where
    R: AdmissionsRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = actor_from_headers(&headers);
    match service.applications(
        actor.as_ref(),
        query.status.as_deref(),
        query.page.unwrap_or(1),
        query.page_size.unwrap_or(20),
    ) {
        Ok(page) => (StatusCode::OK, axum::Json(page)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusUpdateRequest {
    status: String,
    #[serde(default)]
    notes: Option<String>,
}

pub(crate) async fn update_status_handler<R, N>(
    State(service): State<Arc<AdmissionsService<R, N>>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<StatusUpdateRequest>,
) -> Response
where
    R: AdmissionsRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = actor_from_headers(&headers);
    let id = ApplicationId(application_id);
    match service.update_application_status(actor.as_ref(), &id, &request.status, request.notes) {
        Ok(()) => {
            let payload = json!({ "application_id": id.0, "status": request.status });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn enroll_handler<R, N>(
    State(service): State<Arc<AdmissionsService<R, N>>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: AdmissionsRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = actor_from_headers(&headers);
    let id = ApplicationId(application_id);
    match service.enroll_student(actor.as_ref(), &id) {
        Ok(receipt) => (StatusCode::CREATED, axum::Json(receipt)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnrollmentsQuery {
    course_id: Option<String>,
}

pub(crate) async fn list_enrollments_handler<R, N>(
    State(service): State<Arc<AdmissionsService<R, N>>>,
    headers: HeaderMap,
    Query(query): Query<EnrollmentsQuery>,
) -> Response
where
    R: AdmissionsRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = actor_from_headers(&headers);
    let course_id = query.course_id.map(CourseId);
    match service.enrollments(actor.as_ref(), course_id.as_ref()) {
        Ok(items) => (StatusCode::OK, axum::Json(items)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnrollmentUpdateRequest {
    status: String,
    #[serde(default)]
    progress: Option<u16>,
}

pub(crate) async fn update_enrollment_handler<R, N>(
    State(service): State<Arc<AdmissionsService<R, N>>>,
    Path(enrollment_id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<EnrollmentUpdateRequest>,
) -> Response
where
    R: AdmissionsRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = actor_from_headers(&headers);
    let id = EnrollmentId(enrollment_id);
    match service.update_enrollment_status(actor.as_ref(), &id, &request.status, request.progress) {
        Ok(()) => {
            let payload = json!({ "enrollment_id": id.0, "status": request.status });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}
