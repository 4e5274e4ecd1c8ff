//! Row mapping for the `stories` table.

use datastory_core::story::{Chart, Narrative, Story};
use datastory_core::types::{DbId, Timestamp};
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Column list for `stories` queries.
pub const COLUMNS: &str =
    "id, job_id, user_id, title, narrative, charts, statistics, created_at";

/// A row from the `stories` table.
#[derive(Debug, Clone, FromRow)]
pub struct StoryRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub user_id: DbId,
    pub title: String,
    pub narrative: Json<Narrative>,
    pub charts: Json<Vec<Chart>>,
    pub statistics: serde_json::Value,
    pub created_at: Timestamp,
}

impl From<StoryRow> for Story {
    fn from(row: StoryRow) -> Self {
        Story {
            story_id: row.id,
            job_id: row.job_id,
            user_id: row.user_id,
            title: row.title,
            narrative: row.narrative.0,
            charts: row.charts.0,
            statistics: row.statistics,
            created_at: row.created_at,
        }
    }
}

/// Query parameters for `GET /api/v1/stories`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoryListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
