//! Client for a Mastodon instance's public hashtag timeline.
//!
//! There is no server-side date filter. Status ids are snowflakes whose high
//! bits are the creation time in milliseconds, so the listing starts from a
//! `min_id` derived from the window start and walks forward one page at a
//! time, stopping once a page reaches past the end of the window.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nucsent_core::{Engagement, NewRawItem, SourceId};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::ProviderError;
use crate::http::{build_client, get_json, parse_base_url, HttpSettings};
use crate::normalize::{non_blank, parse_timestamp, strip_html};
use crate::retry::RetryPolicy;
use crate::{ContentProvider, ListingOrder, Page, PageRequest};

const PAGE_SIZE: usize = 40;
const PROVIDER: &str = "mastodon";

pub struct MastodonProvider {
    client: Client,
    base_url: Url,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct Status {
    id: String,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    account: Option<Account>,
    #[serde(default)]
    replies_count: Option<i64>,
    #[serde(default)]
    reblogs_count: Option<i64>,
    #[serde(default)]
    favourites_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Account {
    #[serde(default)]
    acct: Option<String>,
    #[serde(default)]
    fields: Vec<ProfileField>,
}

/// A profile link; `verified_at` is set once the instance has confirmed the
/// author controls the linked site.
#[derive(Debug, Deserialize)]
struct ProfileField {
    #[serde(default)]
    verified_at: Option<String>,
}

impl MastodonProvider {
    /// Mastodon's public timelines need no credential; the instance is the
    /// only setting.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the HTTP client cannot be built, or
    /// [`ProviderError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(base_url: &str, http: &HttpSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(http)?,
            base_url: parse_base_url(base_url)?,
            retry: http.retry,
        })
    }

    fn build_url(&self, tag: &str, min_id: &str) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ProviderError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(["api", "v1", "timelines", "tag", tag.trim_start_matches('#')]);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("limit", &PAGE_SIZE.to_string());
            pairs.append_pair("min_id", min_id);
        }
        Ok(url)
    }
}

/// Smallest snowflake id that can belong to a status created at `at`.
fn snowflake_floor(at: DateTime<Utc>) -> String {
    let millis = u64::try_from(at.timestamp_millis()).unwrap_or(0);
    millis.saturating_mul(1 << 16).to_string()
}

/// Ids are decimal strings of varying width; a longer id is a larger one.
fn newest_id(statuses: &[Status]) -> Option<&str> {
    statuses
        .iter()
        .map(|s| s.id.as_str())
        .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
}

fn normalize(status: &Status) -> Option<(DateTime<Utc>, NewRawItem)> {
    let published_at = parse_timestamp(status.created_at.as_deref()?)?;
    let body = non_blank(status.content.as_deref().map(strip_html).as_deref())?;
    let identity = non_blank(status.uri.as_deref()).or_else(|| non_blank(Some(status.id.as_str())))?;
    let item = NewRawItem {
        external_id: Some(identity),
        title: None,
        author: status.account.as_ref().and_then(|a| non_blank(a.acct.as_deref())),
        url: non_blank(status.url.as_deref()),
        section: None,
        published_at,
        body,
        word_count: None,
        engagement: Engagement {
            likes: status.favourites_count,
            comments: status.replies_count,
            reposts: status.reblogs_count,
            author_verified: status
                .account
                .as_ref()
                .map(|a| a.fields.iter().any(|f| f.verified_at.is_some())),
        },
    };
    Some((published_at, item))
}

#[async_trait]
impl ContentProvider for MastodonProvider {
    fn source(&self) -> SourceId {
        SourceId::Mastodon
    }

    fn order(&self) -> ListingOrder {
        ListingOrder::OldestFirst
    }

    async fn fetch_page(&self, request: &PageRequest<'_>) -> Result<Page, ProviderError> {
        let min_id = match request.cursor {
            Some(cursor) => cursor.to_owned(),
            None => snowflake_floor(request.from),
        };
        let url = self.build_url(request.query, &min_id)?;
        let statuses: Vec<Status> = get_json(&self.client, PROVIDER, &url, self.retry).await?;

        let mut page = Page::default();
        let mut reached_window_end = false;
        // Within a page the server still sorts newest-first.
        for status in statuses.iter().rev() {
            let Some((published_at, item)) = normalize(status) else {
                page.skipped += 1;
                continue;
            };
            if published_at > request.to {
                reached_window_end = true;
                continue;
            }
            if published_at >= request.from {
                page.items.push(item);
            }
        }
        if page.skipped > 0 {
            tracing::warn!(provider = PROVIDER, skipped = page.skipped, "skipped malformed records");
        }

        if statuses.len() == PAGE_SIZE && !reached_window_end {
            page.next_cursor = newest_id(&statuses).map(str::to_owned);
        }
        Ok(page)
    }
}
