use std::net::SocketAddr;
use std::sync::Arc;

use datastory_analysis::AnalysisApi;
use datastory_api::config::ServerConfig;
use datastory_api::router::build_app_router;
use datastory_api::state::AppState;
use datastory_db::{MemoryStore, PgStore, Store};
use datastory_pipeline::{JobDispatcher, Orchestrator};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "datastory_api=debug,datastory_pipeline=debug,tower_http=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Store ---
    let store: Arc<dyn Store> = match &config.database_url {
        Some(database_url) => {
            let pool = datastory_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            datastory_db::health_check(&pool)
                .await
                .expect("Database health check failed");

            datastory_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory job store");
            Arc::new(MemoryStore::new())
        }
    };

    // --- Analysis service ---
    let analysis = Arc::new(
        AnalysisApi::new(&config.analysis_service_url, config.analysis_timeout())
            .expect("Failed to build analysis service client"),
    );
    tracing::info!(
        url = %config.analysis_service_url,
        timeout_secs = config.analysis_timeout_secs,
        "Analysis service client configured",
    );

    // --- Orchestrator ---
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&store),
        analysis.clone(),
        config.orchestrator_config(),
    ));
    let dispatcher = Arc::new(JobDispatcher::new(orchestrator));

    match dispatcher.recover_interrupted().await {
        Ok(report) => tracing::info!(
            interrupted = report.interrupted,
            requeued = report.requeued,
            "Recovered jobs from previous run",
        ),
        Err(e) => tracing::error!(error = %e, "Job recovery failed"),
    }

    // --- App state ---
    let state = AppState {
        store,
        dispatcher: Arc::clone(&dispatcher),
        analysis,
        config: Arc::new(config.clone()),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, draining attempts");
    dispatcher.shutdown(config.shutdown_timeout()).await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
