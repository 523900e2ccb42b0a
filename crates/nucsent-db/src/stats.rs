//! Read-only aggregate queries over items and units.

use chrono::{DateTime, Utc};
use nucsent_core::SourceId;
use sqlx::SqlitePool;

use crate::{db_timestamp, DbError};

/// Unit counts per label. `pending` counts units not yet labeled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct LabelCounts {
    pub negative: i64,
    pub neutral: i64,
    pub positive: i64,
    pub pending: i64,
}

/// One unit with its parent's publication time, as needed for bucketing.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UnitObservation {
    pub unit_id: i64,
    pub item_id: i64,
    pub published_at: DateTime<Utc>,
    pub label: Option<String>,
    pub text: String,
}

/// Mean engagement over all items of a source. `None` when no item reports
/// the metric. `verified_percent` is the share of verified authors among
/// items whose verification is known, from 0 to 100.
#[derive(Debug, Clone, Copy, Default, PartialEq, sqlx::FromRow)]
pub struct EngagementAverages {
    pub items: i64,
    pub avg_likes: Option<f64>,
    pub avg_comments: Option<f64>,
    pub avg_reposts: Option<f64>,
    pub verified_percent: Option<f64>,
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn label_counts(pool: &SqlitePool, source: SourceId) -> Result<LabelCounts, DbError> {
    let sql = format!(
        "SELECT \
             COALESCE(SUM(CASE WHEN label = 'negative' THEN 1 ELSE 0 END), 0) AS negative, \
             COALESCE(SUM(CASE WHEN label = 'neutral' THEN 1 ELSE 0 END), 0) AS neutral, \
             COALESCE(SUM(CASE WHEN label = 'positive' THEN 1 ELSE 0 END), 0) AS positive, \
             COALESCE(SUM(CASE WHEN label IS NULL THEN 1 ELSE 0 END), 0) AS pending \
         FROM {}",
        source.spec().units_table
    );
    let counts = sqlx::query_as::<_, LabelCounts>(&sql)
        .fetch_one(pool)
        .await?;
    Ok(counts)
}

/// List every unit whose parent was published in `[start, end)`, labeled or not.
///
/// Results are ordered by parent `published_at` then unit `id`, which is the
/// order terms are first encountered in.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_unit_observations(
    pool: &SqlitePool,
    source: SourceId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<UnitObservation>, DbError> {
    let spec = source.spec();
    let sql = format!(
        "SELECT u.id AS unit_id, u.item_id, i.published_at, u.label, u.text \
         FROM {units} u \
         JOIN {items} i ON i.id = u.item_id \
         WHERE i.published_at >= ? AND i.published_at < ? \
         ORDER BY i.published_at, u.id",
        units = spec.units_table,
        items = spec.items_table,
    );
    let rows = sqlx::query_as::<_, UnitObservation>(&sql)
        .bind(db_timestamp(start))
        .bind(db_timestamp(end))
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn engagement_averages(
    pool: &SqlitePool,
    source: SourceId,
) -> Result<EngagementAverages, DbError> {
    let sql = format!(
        "SELECT COUNT(*) AS items, \
             AVG(like_count) AS avg_likes, \
             AVG(comment_count) AS avg_comments, \
             AVG(repost_count) AS avg_reposts, \
             AVG(author_verified) * 100.0 AS verified_percent \
         FROM {}",
        source.spec().items_table
    );
    let averages = sqlx::query_as::<_, EngagementAverages>(&sql)
        .fetch_one(pool)
        .await?;
    Ok(averages)
}
