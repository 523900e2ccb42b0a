//! Client for the Threads Graph API keyword search.

use async_trait::async_trait;
use nucsent_core::{Engagement, NewRawItem, SourceId};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::ProviderError;
use crate::http::{build_client, get_json, join, parse_base_url, HttpSettings};
use crate::normalize::{non_blank, parse_timestamp};
use crate::retry::RetryPolicy;
use crate::{ContentProvider, ListingOrder, Page, PageRequest};

const DEFAULT_BASE_URL: &str = "https://graph.threads.net/v1.0/";
const PAGE_SIZE: &str = "100";
const FIELDS: &str = "id,text,permalink,timestamp,username,like_count,reply_count,repost_count";
const PROVIDER: &str = "threads";

pub struct ThreadsProvider {
    client: Client,
    access_token: String,
    base_url: Url,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Post>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(default)]
    cursors: Option<Cursors>,
    /// Present only when another page exists.
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Cursors {
    #[serde(default)]
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    permalink: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    like_count: Option<i64>,
    #[serde(default)]
    reply_count: Option<i64>,
    #[serde(default)]
    repost_count: Option<i64>,
}

impl ThreadsProvider {
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the HTTP client cannot be built.
    pub fn new(access_token: &str, http: &HttpSettings) -> Result<Self, ProviderError> {
        Self::with_base_url(access_token, http, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the HTTP client cannot be built, or
    /// [`ProviderError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        access_token: &str,
        http: &HttpSettings,
        base_url: &str,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(http)?,
            access_token: access_token.to_owned(),
            base_url: parse_base_url(base_url)?,
            retry: http.retry,
        })
    }

    fn build_url(&self, request: &PageRequest<'_>) -> Result<Url, ProviderError> {
        let mut url = join(&self.base_url, "keyword_search")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", request.query);
            pairs.append_pair("search_type", "RECENT");
            pairs.append_pair("fields", FIELDS);
            pairs.append_pair("since", &request.from.timestamp().to_string());
            pairs.append_pair("until", &request.to.timestamp().to_string());
            pairs.append_pair("limit", PAGE_SIZE);
            if let Some(after) = request.cursor {
                pairs.append_pair("after", after);
            }
            pairs.append_pair("access_token", &self.access_token);
        }
        Ok(url)
    }
}

fn normalize(post: Post) -> Option<NewRawItem> {
    let published_at = parse_timestamp(post.timestamp.as_deref()?)?;
    let body = non_blank(post.text.as_deref())?;
    let id = non_blank(post.id.as_deref())?;
    Some(NewRawItem {
        external_id: Some(id),
        title: None,
        author: non_blank(post.username.as_deref()),
        url: non_blank(post.permalink.as_deref()),
        section: None,
        published_at,
        body,
        word_count: None,
        engagement: Engagement {
            likes: post.like_count,
            comments: post.reply_count,
            reposts: post.repost_count,
            author_verified: None,
        },
    })
}

#[async_trait]
impl ContentProvider for ThreadsProvider {
    fn source(&self) -> SourceId {
        SourceId::Threads
    }

    fn order(&self) -> ListingOrder {
        ListingOrder::NewestFirst
    }

    async fn fetch_page(&self, request: &PageRequest<'_>) -> Result<Page, ProviderError> {
        let url = self.build_url(request)?;
        let response: SearchResponse = get_json(&self.client, PROVIDER, &url, self.retry).await?;

        let total = response.data.len();
        let items: Vec<NewRawItem> = response.data.into_iter().filter_map(normalize).collect();
        let skipped = total - items.len();
        if skipped > 0 {
            tracing::warn!(provider = PROVIDER, skipped, "skipped malformed records");
        }

        let next_cursor = response.paging.and_then(|paging| {
            paging.next.as_ref()?;
            paging.cursors.and_then(|c| c.after)
        });

        Ok(Page {
            items,
            next_cursor,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn build_url_uses_unix_window_and_cursor() {
        let provider =
            ThreadsProvider::with_base_url("tok", &HttpSettings::default(), "https://graph.example")
                .unwrap();
        let request = PageRequest {
            query: "nuclear",
            from: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            to: Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap(),
            cursor: Some("abc"),
        };
        let url = provider.build_url(&request).unwrap();
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(url.path(), "/keyword_search");
        assert!(query.contains(&("since".into(), "1717200000".into())));
        assert!(query.contains(&("until".into(), "1717286400".into())));
        assert!(query.contains(&("after".into(), "abc".into())));
        assert!(query.contains(&("search_type".into(), "RECENT".into())));
    }

    #[test]
    fn normalize_skips_posts_without_text() {
        let post: Post = serde_json::from_value(serde_json::json!({
            "id": "17",
            "timestamp": "2024-06-01T08:00:00+0000",
            "media_type": "IMAGE"
        }))
        .unwrap();
        assert!(normalize(post).is_none());
    }

    #[test]
    fn normalize_maps_engagement_and_permalink() {
        let post: Post = serde_json::from_value(serde_json::json!({
            "id": "18",
            "text": "Nuclear plants are quiet neighbours.",
            "permalink": "https://www.threads.net/@a/post/18",
            "timestamp": "2024-06-01T08:00:00+0000",
            "username": "a",
            "like_count": 4,
            "reply_count": 1
        }))
        .unwrap();
        let item = normalize(post).unwrap();
        assert_eq!(item.external_id.as_deref(), Some("18"));
        assert_eq!(item.engagement.likes, Some(4));
        assert_eq!(item.engagement.comments, Some(1));
        assert_eq!(item.engagement.reposts, None);
    }
}
