//! Client for YouTube Data API v3 comment threads.
//!
//! A query is a tracked video id; each top-level comment becomes one item.
//! Threads come back newest-first, so paging stops at the window start.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nucsent_core::{Engagement, NewRawItem, SourceId};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::ProviderError;
use crate::http::{build_client, get_json, join, parse_base_url, HttpSettings};
use crate::normalize::{non_blank, parse_timestamp};
use crate::retry::RetryPolicy;
use crate::{ContentProvider, ListingOrder, Page, PageRequest};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3/";
const PAGE_SIZE: &str = "100";
const PROVIDER: &str = "youtube";

pub struct YoutubeProvider {
    client: Client,
    api_key: String,
    base_url: Url,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadList {
    #[serde(default)]
    items: Vec<CommentThread>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThread {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    snippet: Option<ThreadSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadSnippet {
    #[serde(default)]
    video_id: Option<String>,
    #[serde(default)]
    total_reply_count: Option<i64>,
    #[serde(default)]
    top_level_comment: Option<Comment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Comment {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    snippet: Option<CommentSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    #[serde(default)]
    text_original: Option<String>,
    #[serde(default)]
    author_display_name: Option<String>,
    #[serde(default)]
    like_count: Option<i64>,
    #[serde(default)]
    published_at: Option<String>,
}

impl YoutubeProvider {
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: &str, http: &HttpSettings) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, http, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the HTTP client cannot be built, or
    /// [`ProviderError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        http: &HttpSettings,
        base_url: &str,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(http)?,
            api_key: api_key.to_owned(),
            base_url: parse_base_url(base_url)?,
            retry: http.retry,
        })
    }

    fn build_url(&self, video_id: &str, page_token: Option<&str>) -> Result<Url, ProviderError> {
        let mut url = join(&self.base_url, "commentThreads")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("part", "snippet");
            pairs.append_pair("videoId", video_id);
            pairs.append_pair("maxResults", PAGE_SIZE);
            pairs.append_pair("order", "time");
            pairs.append_pair("textFormat", "plainText");
            if let Some(token) = page_token {
                pairs.append_pair("pageToken", token);
            }
            pairs.append_pair("key", &self.api_key);
        }
        Ok(url)
    }
}

fn normalize(thread: CommentThread) -> Option<(DateTime<Utc>, NewRawItem)> {
    let snippet = thread.snippet?;
    let comment = snippet.top_level_comment?;
    let comment_id = non_blank(comment.id.as_deref()).or_else(|| non_blank(thread.id.as_deref()))?;
    let details = comment.snippet?;
    let published_at = parse_timestamp(details.published_at.as_deref()?)?;
    let body = non_blank(details.text_original.as_deref())?;
    let video_id = non_blank(snippet.video_id.as_deref());
    let url = video_id
        .as_ref()
        .map(|v| format!("https://www.youtube.com/watch?v={v}&lc={comment_id}"));
    let item = NewRawItem {
        external_id: Some(comment_id),
        title: None,
        author: non_blank(details.author_display_name.as_deref()),
        url,
        section: video_id,
        published_at,
        body,
        word_count: None,
        engagement: Engagement {
            likes: details.like_count,
            comments: snippet.total_reply_count,
            reposts: None,
            author_verified: None,
        },
    };
    Some((published_at, item))
}

#[async_trait]
impl ContentProvider for YoutubeProvider {
    fn source(&self) -> SourceId {
        SourceId::Youtube
    }

    fn order(&self) -> ListingOrder {
        ListingOrder::NewestFirst
    }

    async fn fetch_page(&self, request: &PageRequest<'_>) -> Result<Page, ProviderError> {
        let url = self.build_url(request.query, request.cursor)?;
        let list: ThreadList = get_json(&self.client, PROVIDER, &url, self.retry).await?;

        let mut page = Page::default();
        let mut reached_window_start = false;
        for thread in list.items {
            let Some((published_at, item)) = normalize(thread) else {
                page.skipped += 1;
                continue;
            };
            if published_at < request.from {
                reached_window_start = true;
                continue;
            }
            if published_at <= request.to {
                page.items.push(item);
            }
        }
        if page.skipped > 0 {
            tracing::warn!(provider = PROVIDER, skipped = page.skipped, "skipped malformed records");
        }

        if !reached_window_start {
            page.next_cursor = list.next_page_token;
        }
        Ok(page)
    }
}
