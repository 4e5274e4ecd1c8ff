//! Tests for [`HttpStatusClient`] against a throwaway HTTP server.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use datastory_core::status::{JobStage, JobStatus};
use datastory_poller::{HttpStatusClient, PollError, StatusClient};
use serde_json::json;
use tokio::net::TcpListener;

const TOKEN: &str = "poller-test-token";

/// Serve `app` on an ephemeral port and return its base URL.
async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: &str) -> HttpStatusClient {
    HttpStatusClient::new(base_url, TOKEN, Duration::from_secs(5)).unwrap()
}

fn authorized(headers: &HeaderMap) -> bool {
    let expected = format!("Bearer {TOKEN}");
    headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(expected.as_str())
}

#[tokio::test]
async fn get_status_unwraps_data_envelope_with_bearer_token() {
    let app = Router::new().route(
        "/api/v1/jobs/{id}",
        get(|Path(id): Path<String>, headers: HeaderMap| async move {
            if !authorized(&headers) {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "Missing token", "code": "UNAUTHORIZED" })),
                );
            }
            let mut view =
                serde_json::to_value(common::processing(JobStage::GeneratingNarrative, 70))
                    .unwrap();
            view["jobId"] = json!(id);
            (StatusCode::OK, Json(json!({ "data": view })))
        }),
    );
    let base = serve(app).await;

    let view = client(&base).get_status(common::job_id()).await.unwrap();
    assert_eq!(view.job_id, common::job_id());
    assert_eq!(view.status, JobStatus::Processing);
    assert_eq!(view.progress, 70);
}

#[tokio::test]
async fn error_body_is_mapped_to_status_error() {
    let app = Router::new().route(
        "/api/v1/jobs/{id}",
        get(|| async {
            (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "You do not have access to this job", "code": "FORBIDDEN" })),
            )
        }),
    );
    let base = serve(app).await;

    let err = client(&base).get_status(common::job_id()).await.unwrap_err();
    assert!(err.ends_session());
    assert_matches!(
        err,
        PollError::Status { status: 403, code: Some(code), message }
            if code == "FORBIDDEN" && message.contains("access")
    );
}

#[tokio::test]
async fn retry_posts_and_returns_requeued_view() {
    let app = Router::new().route(
        "/api/v1/jobs/{id}/retry",
        post(|| async { Json(json!({ "data": common::queued() })) }),
    );
    let base = serve(app).await;

    let view = client(&base).retry(common::job_id()).await.unwrap();
    assert_eq!(view.status, JobStatus::Queued);
    assert_eq!(view.progress, 0);
}

#[tokio::test]
async fn rejected_retry_keeps_code() {
    let app = Router::new().route(
        "/api/v1/jobs/{id}/retry",
        post(|| async {
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "error": "Retry available in 8s", "code": "RATE_LIMITED" })),
            )
        }),
    );
    let base = serve(app).await;

    let err = client(&base).retry(common::job_id()).await.unwrap_err();
    assert!(!err.ends_session());
    assert_matches!(
        err,
        PollError::Status { status: 429, code: Some(code), .. } if code == "RATE_LIMITED"
    );
}

#[tokio::test]
async fn non_envelope_body_is_a_decode_error() {
    let app = Router::new().route(
        "/api/v1/jobs/{id}",
        get(|| async { Json(json!({ "status": "processing" })) }),
    );
    let base = serve(app).await;

    let err = client(&base).get_status(common::job_id()).await.unwrap_err();
    assert_matches!(err, PollError::Decode(_));
}

#[tokio::test]
async fn unreachable_api_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}"))
        .get_status(common::job_id())
        .await
        .unwrap_err();
    assert_matches!(err, PollError::Transport(_));
    assert!(!err.ends_session());
}
