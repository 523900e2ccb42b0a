//! Ingestion boundaries derived from the store.
//!
//! There is no cursor table: the newest stored `published_at` is the
//! boundary between what has been ingested and what has not.

use chrono::{DateTime, Duration, Months, NaiveTime, Utc};
use nucsent_core::SourceSettings;
use nucsent_db::DbError;
use serde::Serialize;
use sqlx::SqlitePool;

/// The half-open interval `(from, to]` a run should fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl FetchWindow {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.from >= self.to
    }
}

/// Lower bound used when the store is empty: the configured epoch, or
/// `window_months` before `now`.
#[must_use]
pub fn epoch_default(settings: &SourceSettings, now: DateTime<Utc>) -> DateTime<Utc> {
    match settings.epoch {
        Some(date) => date.and_time(NaiveTime::MIN).and_utc(),
        None => now
            .checked_sub_months(Months::new(settings.window_months))
            .unwrap_or(DateTime::<Utc>::MIN_UTC),
    }
}

/// Newest stored `published_at` for the source, or [`epoch_default`].
///
/// # Errors
///
/// Returns [`DbError`] if the store cannot be read.
pub async fn latest_boundary(
    pool: &SqlitePool,
    settings: &SourceSettings,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, DbError> {
    let latest = nucsent_db::latest_published_at(pool, settings.id).await?;
    Ok(latest.unwrap_or_else(|| epoch_default(settings, now)))
}

/// The window after `boundary`. The upper bound never precedes the boundary,
/// so repeated runs only move forward.
#[must_use]
pub fn fetch_window(boundary: DateTime<Utc>, now: DateTime<Utc>) -> FetchWindow {
    FetchWindow {
        from: boundary,
        to: now.max(boundary),
    }
}

/// `true` when the newest stored item is younger than `interval`.
#[must_use]
pub fn is_fresh(latest: Option<DateTime<Utc>>, now: DateTime<Utc>, interval: Duration) -> bool {
    latest.is_some_and(|ts| now.signed_duration_since(ts) < interval)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};
    use nucsent_core::{BucketWidth, SourceId};

    use super::*;

    fn settings(epoch: Option<NaiveDate>) -> SourceSettings {
        SourceSettings {
            id: SourceId::Guardian,
            enabled: true,
            queries: vec!["Nuclear energy".to_string()],
            section: None,
            page_cap: 100,
            bucket: BucketWidth::Months(1),
            window_months: 12,
            epoch,
            model_extraction: false,
            placeholders: Vec::new(),
        }
    }

    #[test]
    fn epoch_default_prefers_configured_date() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        assert_eq!(
            epoch_default(&settings(NaiveDate::from_ymd_opt(2020, 1, 1)), now),
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            epoch_default(&settings(None), now),
            Utc.with_ymd_and_hms(2023, 6, 15, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn window_upper_bound_never_moves_backwards() {
        let boundary = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let earlier_now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let window = fetch_window(boundary, earlier_now);
        assert_eq!(window.to, boundary);
        assert!(window.is_empty());
    }

    #[test]
    fn freshness_uses_strict_interval() {
        let now = Utc.with_ymd_and_hms(2024, 6, 4, 0, 0, 0).unwrap();
        let interval = Duration::hours(72);
        assert!(!is_fresh(None, now, interval));
        assert!(is_fresh(Some(now - Duration::hours(71)), now, interval));
        assert!(!is_fresh(Some(now - Duration::hours(72)), now, interval));
    }
}
