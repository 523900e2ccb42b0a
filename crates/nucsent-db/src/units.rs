//! Database operations for the per-source `<source>_units` tables.

use chrono::{DateTime, Utc};
use nucsent_core::{SentimentLabel, SourceId};
use sqlx::SqlitePool;

use crate::{db_timestamp, DbError};

/// A row from a `<source>_units` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UnitRow {
    pub id: i64,
    pub item_id: i64,
    pub text: String,
    pub label: Option<String>,
    pub score: Option<f64>,
    pub labeled_at: Option<DateTime<Utc>>,
}

const UNIT_COLUMNS: &str = "id, item_id, text, label, score, labeled_at";

/// Write a label and confidence onto a unit that has none yet.
///
/// Returns `false` when the unit already carries a label (or does not
/// exist); a set label is never overwritten. `score` is clamped to `[0, 1]`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn set_unit_label(
    pool: &SqlitePool,
    source: SourceId,
    unit_id: i64,
    label: SentimentLabel,
    score: f64,
    labeled_at: DateTime<Utc>,
) -> Result<bool, DbError> {
    let sql = format!(
        "UPDATE {} SET label = ?, score = ?, labeled_at = ? \
         WHERE id = ? AND label IS NULL",
        source.spec().units_table
    );
    let score = if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let updated = sqlx::query(&sql)
        .bind(label.as_str())
        .bind(score)
        .bind(db_timestamp(labeled_at))
        .bind(unit_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(updated == 1)
}

/// List units without a label whose `id` is greater than `after_id`,
/// oldest first. Pass `0` to start from the beginning.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_unlabeled_units(
    pool: &SqlitePool,
    source: SourceId,
    after_id: i64,
    limit: i64,
) -> Result<Vec<UnitRow>, DbError> {
    let sql = format!(
        "SELECT {UNIT_COLUMNS} FROM {} WHERE label IS NULL AND id > ? ORDER BY id LIMIT ?",
        source.spec().units_table
    );
    let rows = sqlx::query_as::<_, UnitRow>(&sql)
        .bind(after_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_units_for_item(
    pool: &SqlitePool,
    source: SourceId,
    item_id: i64,
) -> Result<Vec<UnitRow>, DbError> {
    let sql = format!(
        "SELECT {UNIT_COLUMNS} FROM {} WHERE item_id = ? ORDER BY id",
        source.spec().units_table
    );
    let rows = sqlx::query_as::<_, UnitRow>(&sql)
        .bind(item_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_unlabeled_units(pool: &SqlitePool, source: SourceId) -> Result<i64, DbError> {
    let sql = format!(
        "SELECT COUNT(*) FROM {} WHERE label IS NULL",
        source.spec().units_table
    );
    let count: i64 = sqlx::query_scalar(&sql).fetch_one(pool).await?;
    Ok(count)
}
