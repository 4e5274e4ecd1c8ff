#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use datastory_analysis::{AnalysisError, AnalysisService, AnalyzeRequest, AnalyzeResponse};
use datastory_api::auth::jwt::{generate_access_token, JwtConfig};
use datastory_api::config::ServerConfig;
use datastory_api::router::build_app_router;
use datastory_api::state::AppState;
use datastory_core::roles::{ROLE_ADMIN, ROLE_USER};
use datastory_core::story::{Chart, ChartType, Narrative};
use datastory_core::types::UserId;
use datastory_db::{MemoryStore, Store};
use datastory_pipeline::{JobDispatcher, Orchestrator};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

pub const OWNER: UserId = 11;
pub const STRANGER: UserId = 12;
pub const ADMIN: UserId = 1;

/// Build a test `ServerConfig` with safe defaults and no retry cooldown.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        database_url: None,
        jwt: JwtConfig {
            secret: "datastory-api-test-secret".to_string(),
            access_token_expiry_mins: 15,
        },
        analysis_service_url: "http://127.0.0.1:9".to_string(),
        analysis_timeout_secs: 5,
        job_max_attempts: 3,
        retry_cooldown_secs: 0,
        max_charts: 6,
    }
}

// ---------------------------------------------------------------------------
// Analysis stub
// ---------------------------------------------------------------------------

/// Answers `analyze` from a script; falls back to a success once the
/// script runs out.
#[derive(Default)]
pub struct StubAnalysis {
    script: Mutex<VecDeque<Result<AnalyzeResponse, AnalysisError>>>,
    unhealthy: AtomicBool,
}

impl StubAnalysis {
    pub fn scripted(
        script: impl IntoIterator<Item = Result<AnalyzeResponse, AnalysisError>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            unhealthy: AtomicBool::new(false),
        })
    }

    pub fn set_unhealthy(&self) {
        self.unhealthy.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AnalysisService for StubAnalysis {
    async fn analyze(&self, _request: &AnalyzeRequest) -> Result<AnalyzeResponse, AnalysisError> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(success()))
    }

    async fn health(&self) -> Result<(), AnalysisError> {
        if self.unhealthy.load(Ordering::SeqCst) {
            Err(AnalysisError::Server {
                status: 503,
                message: "warming up".into(),
            })
        } else {
            Ok(())
        }
    }
}

pub fn success() -> AnalyzeResponse {
    AnalyzeResponse {
        narratives: Narrative {
            summary: "Revenue grew 12% quarter over quarter.".into(),
            key_findings: "Enterprise accounts drove most of the growth.".into(),
            recommendations: "Expand the enterprise sales team.".into(),
        },
        charts: vec![Chart {
            chart_type: ChartType::Line,
            title: "Revenue by quarter".into(),
            data: json!({ "labels": ["Q1", "Q2"], "values": [100, 112] }),
            config: json!({}),
            insight: "Steady growth".into(),
            score: Some(0.8),
        }],
        statistics: json!({ "rowCount": 1200 }),
    }
}

pub fn transient() -> AnalysisError {
    AnalysisError::Server {
        status: 502,
        message: "Bad gateway".into(),
    }
}

pub fn rejection() -> AnalysisError {
    AnalysisError::Rejected {
        status: 400,
        code: None,
        message: "File has no rows".into(),
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Wait until every dispatched attempt has finished.
    pub async fn settle(&self) {
        self.state.dispatcher.wait_idle().await;
    }
}

/// Build the full application router with all middleware layers over an
/// in-memory store and the given analysis stub.
pub fn build_test_app(analysis: Arc<StubAnalysis>) -> TestApp {
    build_test_app_with(test_config(), analysis)
}

pub fn build_test_app_with(config: ServerConfig, analysis: Arc<StubAnalysis>) -> TestApp {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&store),
        analysis.clone(),
        config.orchestrator_config(),
    ));
    let state = AppState {
        store,
        dispatcher: Arc::new(JobDispatcher::new(orchestrator)),
        analysis,
        config: Arc::new(config.clone()),
    };

    TestApp {
        router: build_app_router(state.clone(), &config),
        state,
    }
}

pub fn token_for(user_id: UserId) -> String {
    let role = if user_id == ADMIN { ROLE_ADMIN } else { ROLE_USER };
    generate_access_token(user_id, role, &test_config().jwt).unwrap()
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str, token: Option<&str>) -> Response<Body> {
    send(app, request(Method::GET, uri, token, Body::empty())).await
}

pub async fn post_json(app: Router, uri: &str, token: Option<&str>, body: Value) -> Response<Body> {
    let mut req = request(Method::POST, uri, token, Body::from(body.to_string()));
    req.headers_mut().insert(
        axum::http::header::CONTENT_TYPE,
        "application/json".parse().unwrap(),
    );
    send(app, req).await
}

pub async fn post_empty(app: Router, uri: &str, token: Option<&str>) -> Response<Body> {
    send(app, request(Method::POST, uri, token, Body::empty())).await
}

pub async fn delete(app: Router, uri: &str, token: Option<&str>) -> Response<Body> {
    send(app, request(Method::DELETE, uri, token, Body::empty())).await
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(body).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn create_body() -> Value {
    json!({
        "fileUrl": "s3://datasets/q3_revenue.csv",
        "options": { "audienceLevel": "executive" },
        "metadata": {
            "originalFilename": "q3_revenue.csv",
            "storageKey": "uploads/11/q3_revenue.csv",
            "sizeBytes": 48_213,
            "rowCount": 1200,
            "columnCount": 9
        }
    })
}

/// Create a job as `user_id` through the API and return its id.
pub async fn create_job(test: &TestApp, user_id: UserId, body: Value) -> String {
    let response = post_json(test.app(), "/api/v1/jobs", Some(&token_for(user_id)), body).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    body_json(response).await["data"]["jobId"]
        .as_str()
        .unwrap()
        .to_string()
}
