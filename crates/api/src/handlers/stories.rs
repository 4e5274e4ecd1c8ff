//! Handlers for `/api/v1/stories`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use datastory_core::error::CoreError;
use datastory_core::story::Story;
use datastory_core::types::StoryId;
use datastory_db::models::story::StoryListQuery;
use datastory_db::{Store, StoreError};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

async fn find_and_authorize(
    store: &dyn Store,
    story_id: StoryId,
    auth: &AuthUser,
) -> AppResult<Story> {
    let story = store
        .get_story(story_id)
        .await?
        .ok_or(StoreError::StoryNotFound(story_id))?;

    if !auth.can_access(story.user_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "You do not have access to this story".into(),
        )));
    }
    Ok(story)
}

/// GET /api/v1/stories
pub async fn list_stories(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<StoryListQuery>,
) -> AppResult<impl IntoResponse> {
    let stories = state
        .store
        .list_stories_for_user(auth.user_id, &params)
        .await?;
    Ok(Json(DataResponse { data: stories }))
}

/// GET /api/v1/stories/{id}
pub async fn get_story(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(story_id): Path<StoryId>,
) -> AppResult<impl IntoResponse> {
    let story = find_and_authorize(state.store.as_ref(), story_id, &auth).await?;
    Ok(Json(DataResponse { data: story }))
}

/// DELETE /api/v1/stories/{id}
///
/// The job that produced the story keeps its `storyId`.
pub async fn delete_story(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(story_id): Path<StoryId>,
) -> AppResult<StatusCode> {
    find_and_authorize(state.store.as_ref(), story_id, &auth).await?;

    if !state.store.delete_story(story_id).await? {
        return Err(StoreError::StoryNotFound(story_id).into());
    }
    tracing::info!(story_id = %story_id, user_id = auth.user_id, "Story deleted");
    Ok(StatusCode::NO_CONTENT)
}
