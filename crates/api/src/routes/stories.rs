//! Route definitions for the `/stories` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::stories;
use crate::state::AppState;

/// Routes mounted at `/stories`.
///
/// ```text
/// GET    /                -> list_stories
/// GET    /{id}            -> get_story
/// DELETE /{id}            -> delete_story
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(stories::list_stories))
        .route("/{id}", get(stories::get_story).delete(stories::delete_story))
}
