//! Repository for the `stories` table.

use datastory_core::story::Story;
use datastory_core::types::{StoryId, UserId};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use crate::error::StoreError;
use crate::models::page;
use crate::models::story::{StoryListQuery, StoryRow, COLUMNS};

/// SQL for the `stories` table.
pub struct StoryRepo;

impl StoryRepo {
    /// Insert a story inside the caller's transaction.
    pub async fn insert(conn: &mut PgConnection, story: &Story) -> Result<Story, StoreError> {
        let query = format!(
            "INSERT INTO stories \
                 (id, job_id, user_id, title, narrative, charts, statistics, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, StoryRow>(&query)
            .bind(story.story_id)
            .bind(story.job_id)
            .bind(story.user_id)
            .bind(&story.title)
            .bind(Json(&story.narrative))
            .bind(Json(&story.charts))
            .bind(&story.statistics)
            .bind(story.created_at)
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.into())
    }

    pub async fn find_by_id(pool: &PgPool, id: StoryId) -> Result<Option<Story>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM stories WHERE id = $1");
        let row = sqlx::query_as::<_, StoryRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Story::from))
    }

    pub async fn list_by_user(
        pool: &PgPool,
        user_id: UserId,
        params: &StoryListQuery,
    ) -> Result<Vec<Story>, StoreError> {
        let (limit, offset) = page(params.limit, params.offset);
        let query = format!(
            "SELECT {COLUMNS} FROM stories \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, StoryRow>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(Story::from).collect())
    }

    /// Delete a story. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: StoryId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM stories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
