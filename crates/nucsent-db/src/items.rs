//! Database operations for the per-source `<source>_items` tables.

use chrono::{DateTime, Utc};
use nucsent_core::{natural_key, ItemStatus, NewRawItem, SourceId};
use sqlx::SqlitePool;

use crate::{db_timestamp, parse_db_timestamp, DbError};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from a `<source>_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ItemRow {
    pub id: i64,
    pub natural_key: String,
    pub external_id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub section: Option<String>,
    pub published_at: DateTime<Utc>,
    pub body: String,
    pub word_count: Option<i64>,
    pub like_count: Option<i64>,
    pub comment_count: Option<i64>,
    pub repost_count: Option<i64>,
    pub author_verified: Option<bool>,
    pub status: String,
    pub fetched_at: DateTime<Utc>,
}

impl ItemRow {
    /// Parsed processing status.
    ///
    /// # Errors
    ///
    /// Returns [`nucsent_core::CoreError::UnknownStatus`] if the column holds
    /// a value outside the status vocabulary.
    pub fn status(&self) -> Result<ItemStatus, nucsent_core::CoreError> {
        self.status.parse()
    }
}

/// Result of an idempotent insert keyed on the natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    /// An item with the same natural key already exists; nothing was written.
    Duplicate,
    /// The record lacks the fields its source's natural key needs.
    MissingKey,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PurgeStats {
    pub items: u64,
    pub units: u64,
}

const ITEM_COLUMNS: &str = "id, natural_key, external_id, title, author, url, section, \
     published_at, body, word_count, like_count, comment_count, repost_count, author_verified, \
     status, fetched_at";

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Insert `item` unless an item with the same natural key exists.
///
/// Each call is its own statement, so every successful insert is committed
/// independently of later failures.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_item_if_absent(
    pool: &SqlitePool,
    source: SourceId,
    item: &NewRawItem,
    fetched_at: DateTime<Utc>,
) -> Result<InsertOutcome, DbError> {
    let Some(key) = natural_key(source, item) else {
        return Ok(InsertOutcome::MissingKey);
    };

    let sql = format!(
        "INSERT INTO {} \
             (natural_key, external_id, title, author, url, section, published_at, body, \
              word_count, like_count, comment_count, repost_count, author_verified, fetched_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT (natural_key) DO NOTHING \
         RETURNING id",
        source.spec().items_table
    );

    let id: Option<i64> = sqlx::query_scalar(&sql)
        .bind(key)
        .bind(item.external_id.as_deref())
        .bind(item.title.as_deref())
        .bind(item.author.as_deref())
        .bind(item.url.as_deref())
        .bind(item.section.as_deref())
        .bind(db_timestamp(item.published_at))
        .bind(&item.body)
        .bind(item.word_count)
        .bind(item.engagement.likes)
        .bind(item.engagement.comments)
        .bind(item.engagement.reposts)
        .bind(item.engagement.author_verified)
        .bind(db_timestamp(fetched_at))
        .fetch_optional(pool)
        .await?;

    Ok(id.map_or(InsertOutcome::Duplicate, InsertOutcome::Inserted))
}

/// Store the extracted units for an item and settle its status, atomically.
///
/// An empty `units` slice marks the item `no_relevant_content`. Duplicate
/// unit texts for the same item are ignored.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the item does not exist or is no longer
/// `unprocessed` (nothing is written in that case), or [`DbError::Sqlx`] if
/// a statement fails.
pub async fn record_extraction(
    pool: &SqlitePool,
    source: SourceId,
    item_id: i64,
    units: &[String],
) -> Result<ItemStatus, DbError> {
    let spec = source.spec();
    let status = if units.is_empty() {
        ItemStatus::NoRelevantContent
    } else {
        ItemStatus::Processed
    };

    let mut tx = pool.begin().await?;

    let update_sql = format!(
        "UPDATE {} SET status = ? WHERE id = ? AND status = 'unprocessed'",
        spec.items_table
    );
    let updated = sqlx::query(&update_sql)
        .bind(status.as_str())
        .bind(item_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if updated == 0 {
        tx.rollback().await?;
        return Err(DbError::NotFound);
    }

    let insert_sql = format!(
        "INSERT INTO {} (item_id, text) VALUES (?, ?) \
         ON CONFLICT (item_id, text) DO NOTHING",
        spec.units_table
    );
    for text in units {
        sqlx::query(&insert_sql)
            .bind(item_id)
            .bind(text)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(status)
}

/// Delete items whose body, or units whose text, exactly matches one of the
/// placeholder strings (surrounding whitespace ignored). Units of deleted
/// items go with them.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a delete fails.
pub async fn delete_placeholders(
    pool: &SqlitePool,
    source: SourceId,
    placeholders: &[String],
) -> Result<PurgeStats, DbError> {
    let spec = source.spec();
    let items_sql = format!("DELETE FROM {} WHERE trim(body) = ?", spec.items_table);
    let units_sql = format!("DELETE FROM {} WHERE trim(text) = ?", spec.units_table);

    let mut stats = PurgeStats::default();
    for placeholder in placeholders {
        let needle = placeholder.trim();
        stats.items += sqlx::query(&items_sql)
            .bind(needle)
            .execute(pool)
            .await?
            .rows_affected();
        stats.units += sqlx::query(&units_sql)
            .bind(needle)
            .execute(pool)
            .await?
            .rows_affected();
    }
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// The newest `published_at` in the source's item table, or `None` when empty.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or [`DbError::InvalidTimestamp`]
/// if the stored value is not RFC 3339.
pub async fn latest_published_at(
    pool: &SqlitePool,
    source: SourceId,
) -> Result<Option<DateTime<Utc>>, DbError> {
    let sql = format!("SELECT MAX(published_at) FROM {}", source.spec().items_table);
    let raw: Option<String> = sqlx::query_scalar(&sql).fetch_one(pool).await?;
    raw.as_deref().map(parse_db_timestamp).transpose()
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_items(pool: &SqlitePool, source: SourceId) -> Result<i64, DbError> {
    let sql = format!("SELECT COUNT(*) FROM {}", source.spec().items_table);
    let count: i64 = sqlx::query_scalar(&sql).fetch_one(pool).await?;
    Ok(count)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no item has `id`, or [`DbError::Sqlx`]
/// if the query fails.
pub async fn get_item(pool: &SqlitePool, source: SourceId, id: i64) -> Result<ItemRow, DbError> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM {} WHERE id = ?",
        source.spec().items_table
    );
    sqlx::query_as::<_, ItemRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// List items in `status` with `id > after_id`, oldest insert first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_items_by_status(
    pool: &SqlitePool,
    source: SourceId,
    status: ItemStatus,
    after_id: i64,
    limit: i64,
) -> Result<Vec<ItemRow>, DbError> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM {} WHERE status = ? AND id > ? ORDER BY id LIMIT ?",
        source.spec().items_table
    );
    let rows = sqlx::query_as::<_, ItemRow>(&sql)
        .bind(status.as_str())
        .bind(after_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// List the newest items by publication time.
///
/// Results are ordered by `published_at DESC` then `id DESC`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_items(
    pool: &SqlitePool,
    source: SourceId,
    limit: i64,
) -> Result<Vec<ItemRow>, DbError> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM {} ORDER BY published_at DESC, id DESC LIMIT ?",
        source.spec().items_table
    );
    let rows = sqlx::query_as::<_, ItemRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}
