//! Pulls new items from a provider and stores them idempotently.
//!
//! The next run's window starts at the newest stored timestamp, so a row may
//! only be stored once everything older than it in the window has been
//! listed. Queries are therefore listed first and their items inserted
//! oldest-first, up to the point every query has reached without a gap.

use chrono::{DateTime, Utc};
use nucsent_core::{NewRawItem, SourceSettings};
use nucsent_db::InsertOutcome;
use nucsent_providers::{ContentProvider, ListingOrder, PageRequest, ProviderError};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::PipelineError;
use crate::freshness::FetchWindow;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchStats {
    pub pages: usize,
    pub seen: usize,
    pub inserted: usize,
    pub duplicates: usize,
    /// Records the provider returned without a timestamp, body or identity.
    pub skipped: usize,
    /// Listed items newer than the gap-free point; the next run lists them
    /// again.
    pub deferred: usize,
}

/// One query's listing and how far through the window it is complete.
struct QueryListing {
    items: Vec<NewRawItem>,
    covered_until: DateTime<Utc>,
    failure: Option<ProviderError>,
}

/// Fetch every configured query for `window` and insert what is new.
///
/// Pages are exhausted per query until the provider reports no further
/// cursor or `page_cap` items have been seen. An oldest-first listing cut
/// short by the cap or a failure is complete up to its newest item. A
/// newest-first listing cut short by the cap keeps the newest items; one cut
/// short by a failure covers nothing. Each insert commits on its own; an
/// existing natural key is not an error.
///
/// # Errors
///
/// Returns [`PipelineError::ProviderUnavailable`] when a page request fails
/// (the gap-free part listed before the failure is stored first), or
/// [`PipelineError::Db`] when an insert fails.
pub async fn fetch(
    pool: &SqlitePool,
    provider: &dyn ContentProvider,
    settings: &SourceSettings,
    window: FetchWindow,
) -> Result<FetchStats, PipelineError> {
    let source = provider.source();
    let mut stats = FetchStats::default();
    if window.is_empty() {
        tracing::debug!(source = %source, from = %window.from, "empty fetch window");
        return Ok(stats);
    }

    let mut buffered = Vec::new();
    let mut covered_until = window.to;
    let mut failure = None;
    for (index, query) in settings.queries.iter().enumerate() {
        let listing = list_query(provider, settings, query, window, &mut stats).await;
        buffered.extend(listing.items);
        covered_until = covered_until.min(listing.covered_until);
        if let Some(cause) = listing.failure {
            if index + 1 < settings.queries.len() {
                // later queries were never listed
                covered_until = window.from;
            }
            failure = Some(cause);
            break;
        }
    }

    buffered.sort_by_key(|item| item.published_at);
    let fetched_at = Utc::now();
    for item in &buffered {
        if item.published_at > covered_until {
            stats.deferred += 1;
            continue;
        }
        match nucsent_db::insert_item_if_absent(pool, source, item, fetched_at).await? {
            InsertOutcome::Inserted(_) => stats.inserted += 1,
            InsertOutcome::Duplicate => stats.duplicates += 1,
            InsertOutcome::MissingKey => stats.skipped += 1,
        }
    }

    if let Some(cause) = failure {
        tracing::warn!(
            source = %source,
            covered_until = %covered_until,
            inserted = stats.inserted,
            deferred = stats.deferred,
            "fetch failed; stored the gap-free part of the window"
        );
        return Err(PipelineError::ProviderUnavailable {
            source_id: source,
            cause,
        });
    }

    tracing::info!(
        source = %source,
        from = %window.from,
        to = %window.to,
        pages = stats.pages,
        inserted = stats.inserted,
        duplicates = stats.duplicates,
        skipped = stats.skipped,
        deferred = stats.deferred,
        "fetch complete"
    );
    Ok(stats)
}

async fn list_query(
    provider: &dyn ContentProvider,
    settings: &SourceSettings,
    query: &str,
    window: FetchWindow,
    stats: &mut FetchStats,
) -> QueryListing {
    let order = provider.order();
    let mut items: Vec<NewRawItem> = Vec::new();
    let mut cursor: Option<String> = None;

    let complete = loop {
        let request = PageRequest {
            query,
            from: window.from,
            to: window.to,
            cursor: cursor.as_deref(),
        };
        let page = match provider.fetch_page(&request).await {
            Ok(page) => page,
            Err(cause) => {
                let covered_until = match order {
                    ListingOrder::OldestFirst => newest(&items).unwrap_or(window.from),
                    ListingOrder::NewestFirst => window.from,
                };
                return QueryListing {
                    items,
                    covered_until,
                    failure: Some(cause),
                };
            }
        };
        stats.pages += 1;
        stats.skipped += page.skipped;
        stats.seen += page.items.len();
        items.extend(page.items);

        if items.len() >= settings.page_cap {
            tracing::debug!(source = %provider.source(), query = %query, "page cap reached");
            break false;
        }
        match page.next_cursor {
            Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
            _ => break true,
        }
    };

    let covered_until = match (complete, order) {
        (true, _) | (false, ListingOrder::NewestFirst) => window.to,
        (false, ListingOrder::OldestFirst) => newest(&items).unwrap_or(window.from),
    };
    QueryListing {
        items,
        covered_until,
        failure: None,
    }
}

fn newest(items: &[NewRawItem]) -> Option<DateTime<Utc>> {
    items.iter().map(|item| item.published_at).max()
}
