//! Client for the New York Times Article Search API (v2).
//!
//! The API returns 10 documents per page and refuses page indexes above 100.
//! Articles carry no full text; the body is assembled from the headline,
//! abstract, snippet and lead paragraph.

use async_trait::async_trait;
use nucsent_core::{Engagement, NewRawItem, SourceId};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::ProviderError;
use crate::http::{build_client, get_json, join, parse_base_url, HttpSettings};
use crate::normalize::{non_blank, parse_timestamp, start_of_day};
use crate::retry::RetryPolicy;
use crate::{ContentProvider, ListingOrder, Page, PageRequest};

const DEFAULT_BASE_URL: &str = "https://api.nytimes.com/svc/search/v2/";
const PAGE_SIZE: u32 = 10;
const MAX_PAGE: u32 = 100;
const PROVIDER: &str = "nytimes";

pub struct NytimesProvider {
    client: Client,
    api_key: String,
    base_url: Url,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    fault: Option<serde_json::Value>,
    #[serde(default)]
    response: Option<SearchResponse>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<Doc>,
    #[serde(default)]
    meta: Meta,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    #[serde(default)]
    hits: u64,
    #[serde(default)]
    offset: u64,
}

#[derive(Debug, Deserialize)]
struct Doc {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    #[serde(default)]
    web_url: Option<String>,
    /// Object in practice; kept loose because the API has sent `null` and `[]`.
    #[serde(default)]
    headline: serde_json::Value,
    #[serde(rename = "abstract", default)]
    summary: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    lead_paragraph: Option<String>,
    #[serde(default)]
    pub_date: Option<String>,
    #[serde(default)]
    byline: serde_json::Value,
    #[serde(default)]
    word_count: Option<i64>,
    #[serde(default)]
    section_name: Option<String>,
}

fn nested_str<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(serde_json::Value::as_str)
}

impl NytimesProvider {
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

    fn build_url(&self, request: &PageRequest<'_>, page: u32) -> Result<Url, ProviderError> {
        let mut url = join(&self.base_url, "articlesearch.json")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", request.query);
            pairs.append_pair("fq", &format!("body:(\"{}\")", request.query));
            pairs.append_pair("begin_date", &request.from.format("%Y%m%d").to_string());
            pairs.append_pair("end_date", &request.to.format("%Y%m%d").to_string());
            pairs.append_pair("sort", "oldest");
            pairs.append_pair("page", &page.to_string());
            pairs.append_pair("api-key", &self.api_key);
        }
        Ok(url)
    }
}

/// Labelled paragraphs, blank parts left out.
fn article_text(doc: &Doc) -> String {
    [
        ("Title", nested_str(&doc.headline, "main")),
        ("Abstract", doc.summary.as_deref()),
        ("Snippet", doc.snippet.as_deref()),
        ("Lead Paragraph", doc.lead_paragraph.as_deref()),
    ]
    .iter()
    .filter_map(|(label, value)| non_blank(*value).map(|v| format!("{label}: {v}")))
    .collect::<Vec<_>>()
    .join("\n\n")
}

fn normalize(doc: Doc) -> Option<NewRawItem> {
    let published_at = start_of_day(parse_timestamp(doc.pub_date.as_deref()?)?);
    let body = article_text(&doc);
    if body.is_empty() {
        return None;
    }
    Some(NewRawItem {
        external_id: non_blank(doc.id.as_deref()),
        title: non_blank(nested_str(&doc.headline, "main")),
        author: non_blank(nested_str(&doc.byline, "original")),
        url: non_blank(doc.web_url.as_deref()),
        section: non_blank(doc.section_name.as_deref()),
        published_at,
        body,
        word_count: doc.word_count,
        engagement: Engagement::default(),
    })
}

#[async_trait]
impl ContentProvider for NytimesProvider {
    fn source(&self) -> SourceId {
        SourceId::Nytimes
    }

    fn order(&self) -> ListingOrder {
        ListingOrder::OldestFirst
    }

    async fn fetch_page(&self, request: &PageRequest<'_>) -> Result<Page, ProviderError> {
        let page = request
            .cursor
            .and_then(|c| c.parse::<u32>().ok())
            .unwrap_or(0);
        let url = self.build_url(request, page)?;
        let envelope: Envelope = get_json(&self.client, PROVIDER, &url, self.retry).await?;

        if let Some(fault) = envelope.fault {
            return Err(ProviderError::Api {
                provider: PROVIDER,
                message: fault.to_string(),
            });
        }
        if envelope.status.as_deref().is_some_and(|s| s != "OK") {
            return Err(ProviderError::Api {
                provider: PROVIDER,
                message: format!("status '{}'", envelope.status.unwrap_or_default()),
            });
        }
        let Some(response) = envelope.response else {
            return Ok(Page::default());
        };

        let total = response.docs.len();
        let returned = total as u64;
        let seen = response.meta.offset + returned;
        let items: Vec<NewRawItem> = response.docs.into_iter().filter_map(normalize).collect();
        let skipped = total - items.len();
        if skipped > 0 {
            tracing::warn!(provider = PROVIDER, skipped, "skipped malformed records");
        }

        let more = returned == u64::from(PAGE_SIZE) && seen < response.meta.hits;
        let next_cursor = (more && page < MAX_PAGE).then(|| (page + 1).to_string());

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
    fn article_text_labels_and_skips_blank_parts() {
        let doc: Doc = serde_json::from_value(serde_json::json!({
            "headline": { "main": "Reactor plans" },
            "abstract": "Nuclear power returns.",
            "snippet": "  ",
            "lead_paragraph": "The state voted."
        }))
        .unwrap();
        assert_eq!(
            article_text(&doc),
            "Title: Reactor plans\n\nAbstract: Nuclear power returns.\n\nLead Paragraph: The state voted."
        );
    }

    #[test]
    fn normalize_truncates_to_date_granularity() {
        let doc: Doc = serde_json::from_value(serde_json::json!({
            "_id": "nyt://article/1",
            "headline": { "main": "Reactor plans" },
            "pub_date": "2024-06-01T17:45:00+0000"
        }))
        .unwrap();
        let item = normalize(doc).unwrap();
        assert_eq!(
            item.published_at,
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(item.external_id.as_deref(), Some("nyt://article/1"));
    }

    #[test]
    fn normalize_drops_docs_without_date_or_text() {
        let no_date: Doc =
            serde_json::from_value(serde_json::json!({ "headline": { "main": "x" } })).unwrap();
        assert!(normalize(no_date).is_none());
        let no_text: Doc =
            serde_json::from_value(serde_json::json!({ "pub_date": "2024-06-01" })).unwrap();
        assert!(normalize(no_text).is_none());
    }

    #[test]
    fn build_url_uses_compact_dates_and_body_filter() {
        let provider =
            NytimesProvider::with_base_url("k", &HttpSettings::default(), "https://api.example")
                .unwrap();
        let request = PageRequest {
            query: "nuclear",
            from: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            to: Utc.with_ymd_and_hms(2024, 2, 3, 0, 0, 0).unwrap(),
            cursor: None,
        };
        let url = provider.build_url(&request, 3).unwrap();
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("begin_date".into(), "20240102".into())));
        assert!(query.contains(&("end_date".into(), "20240203".into())));
        assert!(query.contains(&("fq".into(), "body:(\"nuclear\")".into())));
        assert!(query.contains(&("page".into(), "3".into())));
    }
}
