//! Period-bucketed label counts.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, Utc};
use nucsent_core::{BucketWidth, SentimentLabel};
use nucsent_db::UnitObservation;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketCounts {
    pub start: DateTime<Utc>,
    /// Exclusive.
    pub end: DateTime<Utc>,
    pub negative: i64,
    pub neutral: i64,
    pub positive: i64,
    /// Labeled units only.
    pub total: i64,
    pub pending: i64,
    /// Distinct parent items with at least one unit in the bucket.
    pub items: i64,
}

impl BucketCounts {
    pub(crate) fn empty(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            negative: 0,
            neutral: 0,
            positive: 0,
            total: 0,
            pending: 0,
            items: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSeries {
    pub bucket: BucketWidth,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub buckets: Vec<BucketCounts>,
}

/// Consecutive `[start, end)` bucket bounds from `start`; the last bucket
/// is clipped to `end`. Empty when `end <= start`.
#[must_use]
pub fn bucket_bounds(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    width: BucketWidth,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut bounds = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let next = width.advance(cursor);
        if next <= cursor {
            break;
        }
        bounds.push((cursor, next.min(end)));
        cursor = next;
    }
    bounds
}

/// Bucket `observations` by their parent's timestamp. Every bucket in the
/// window is emitted, including empty ones; observations outside
/// `[start, end)` are ignored.
#[must_use]
pub fn aggregate(
    observations: &[UnitObservation],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    width: BucketWidth,
) -> TimeSeries {
    let bounds = bucket_bounds(start, end, width);
    let mut buckets: Vec<BucketCounts> = bounds
        .iter()
        .map(|&(s, e)| BucketCounts::empty(s, e))
        .collect();
    let mut item_sets: Vec<HashSet<i64>> = vec![HashSet::new(); buckets.len()];

    for obs in observations {
        if obs.published_at < start || obs.published_at >= end {
            continue;
        }
        let idx = bounds.partition_point(|&(s, _)| s <= obs.published_at);
        let Some(bucket) = idx.checked_sub(1).and_then(|i| buckets.get_mut(i)) else {
            continue;
        };
        match obs.label.as_deref().map(str::parse::<SentimentLabel>) {
            None => bucket.pending += 1,
            Some(Ok(label)) => {
                match label {
                    SentimentLabel::Negative => bucket.negative += 1,
                    SentimentLabel::Neutral => bucket.neutral += 1,
                    SentimentLabel::Positive => bucket.positive += 1,
                }
                bucket.total += 1;
            }
            Some(Err(e)) => {
                tracing::warn!(unit_id = obs.unit_id, error = %e, "ignoring unit with unknown label");
                continue;
            }
        }
        item_sets[idx - 1].insert(obs.item_id);
    }

    for (bucket, items) in buckets.iter_mut().zip(&item_sets) {
        bucket.items = i64::try_from(items.len()).unwrap_or(i64::MAX);
    }

    TimeSeries {
        bucket: width,
        start,
        end,
        buckets,
    }
}

fn month_start(date: NaiveDate) -> DateTime<Utc> {
    date.with_day(1)
        .unwrap_or(date)
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// `[start, now)` where `start` is the first day of the month `months - 1`
/// months before the current one. `months = 12` covers this month and the
/// eleven before it.
#[must_use]
pub fn trailing_window(now: DateTime<Utc>, months: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let this_month = month_start(now.date_naive());
    let start = this_month
        .checked_sub_months(Months::new(months.saturating_sub(1)))
        .unwrap_or(this_month);
    (start, now)
}

/// The calendar month `offset` months before the current one. The current
/// month (`offset = 0`) ends at `now`.
#[must_use]
pub fn month_window(now: DateTime<Utc>, offset: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let this_month = month_start(now.date_naive());
    let start = this_month
        .checked_sub_months(Months::new(offset))
        .unwrap_or(this_month);
    let end = if offset == 0 {
        now
    } else {
        start
            .checked_add_months(Months::new(1))
            .unwrap_or(this_month)
    };
    (start, end)
}
