pub mod health;
pub mod jobs;
pub mod stories;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /jobs                       list, create
/// /jobs/{id}                  status
/// /jobs/{id}/retry            user retry
/// /stories                    list
/// /stories/{id}               get, delete
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/jobs", jobs::router())
        .nest("/stories", stories::router())
}
