//! Story artifacts produced by a successful job.

use serde::{Deserialize, Serialize};

use crate::types::{JobId, StoryId, Timestamp, UserId};

/// The three narrative sections written by the analysis service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Narrative {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_findings: String,
    #[serde(default)]
    pub recommendations: String,
}

impl Narrative {
    /// Names of the sections that are empty or whitespace-only.
    pub fn missing_sections(&self) -> Vec<&'static str> {
        [
            ("summary", &self.summary),
            ("keyFindings", &self.key_findings),
            ("recommendations", &self.recommendations),
        ]
        .into_iter()
        .filter(|(_, text)| text.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Chart kinds the analysis service selects from.
///
/// Kinds this crate does not know are kept verbatim in [`ChartType::Other`]
/// and serialized back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChartType {
    Line,
    Bar,
    Scatter,
    Pie,
    Histogram,
    Heatmap,
    Combination,
    Other(String),
}

impl ChartType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Line => "line",
            Self::Bar => "bar",
            Self::Scatter => "scatter",
            Self::Pie => "pie",
            Self::Histogram => "histogram",
            Self::Heatmap => "heatmap",
            Self::Combination => "combination",
            Self::Other(kind) => kind.as_str(),
        }
    }
}

impl From<String> for ChartType {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "line" => Self::Line,
            "bar" => Self::Bar,
            "scatter" => Self::Scatter,
            "pie" => Self::Pie,
            "histogram" => Self::Histogram,
            "heatmap" => Self::Heatmap,
            "combination" => Self::Combination,
            _ => Self::Other(kind),
        }
    }
}

impl From<ChartType> for String {
    fn from(kind: ChartType) -> Self {
        match kind {
            ChartType::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ChartType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chart descriptor. `data` and `config` are rendered by the
/// frontend and are kept opaque here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub title: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub insight: String,
    /// Relevance score assigned by the service; higher is more relevant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Order charts by descending score (unscored last, stable otherwise)
/// and keep at most `max_charts`.
pub fn rank_charts(mut charts: Vec<Chart>, max_charts: usize) -> Vec<Chart> {
    charts.sort_by(|a, b| {
        let a = a.score.unwrap_or(f64::NEG_INFINITY);
        let b = b.score.unwrap_or(f64::NEG_INFINITY);
        b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
    });
    charts.truncate(max_charts);
    charts
}

/// Input for persisting a story at job completion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStory {
    pub job_id: JobId,
    pub user_id: UserId,
    pub title: String,
    pub narrative: Narrative,
    pub charts: Vec<Chart>,
    pub statistics: serde_json::Value,
}

/// A persisted story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub story_id: StoryId,
    pub job_id: JobId,
    pub user_id: UserId,
    pub title: String,
    pub narrative: Narrative,
    pub charts: Vec<Chart>,
    pub statistics: serde_json::Value,
    pub created_at: Timestamp,
}

impl Story {
    pub fn from_new(story_id: StoryId, new: NewStory, created_at: Timestamp) -> Self {
        Self {
            story_id,
            job_id: new.job_id,
            user_id: new.user_id,
            title: new.title,
            narrative: new.narrative,
            charts: new.charts,
            statistics: new.statistics,
            created_at,
        }
    }
}
