//! Client for the Guardian Content API `search` endpoint.

use async_trait::async_trait;
use nucsent_core::{Engagement, NewRawItem, SourceId};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::ProviderError;
use crate::http::{build_client, get_json, join, parse_base_url, HttpSettings};
use crate::normalize::{non_blank, parse_timestamp};
use crate::retry::RetryPolicy;
use crate::{ContentProvider, ListingOrder, Page, PageRequest};

const DEFAULT_BASE_URL: &str = "https://content.guardianapis.com/";
const PAGE_SIZE: &str = "100";
const PROVIDER: &str = "guardian";

pub struct GuardianProvider {
    client: Client,
    api_key: String,
    section: Option<String>,
    base_url: Url,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    response: SearchResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    current_page: u32,
    #[serde(default)]
    pages: u32,
    #[serde(default)]
    results: Vec<GuardianResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GuardianResult {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    web_title: Option<String>,
    #[serde(default)]
    web_url: Option<String>,
    #[serde(default)]
    web_publication_date: Option<String>,
    #[serde(default)]
    section_name: Option<String>,
    #[serde(default)]
    fields: GuardianFields,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GuardianFields {
    #[serde(default)]
    byline: Option<String>,
    /// Sent as a string by the API.
    #[serde(default)]
    wordcount: Option<String>,
    #[serde(default)]
    body_text: Option<String>,
}

impl GuardianProvider {
    /// Creates a client pointed at the production Content API.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the HTTP client cannot be built.
    pub fn new(
        api_key: &str,
        section: Option<String>,
        http: &HttpSettings,
    ) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, section, http, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the HTTP client cannot be built, or
    /// [`ProviderError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        section: Option<String>,
        http: &HttpSettings,
        base_url: &str,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(http)?,
            api_key: api_key.to_owned(),
            section,
            base_url: parse_base_url(base_url)?,
            retry: http.retry,
        })
    }

    fn build_url(&self, request: &PageRequest<'_>) -> Result<Url, ProviderError> {
        let mut url = join(&self.base_url, "search")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", request.query);
            pairs.append_pair("from-date", &request.from.format("%Y-%m-%d").to_string());
            pairs.append_pair("to-date", &request.to.format("%Y-%m-%d").to_string());
            pairs.append_pair("order-by", "oldest");
            pairs.append_pair("type", "article");
            pairs.append_pair("page-size", PAGE_SIZE);
            pairs.append_pair("page", request.cursor.unwrap_or("1"));
            pairs.append_pair("show-fields", "bodyText,wordcount,byline");
            if let Some(section) = &self.section {
                pairs.append_pair("section", section);
            }
            pairs.append_pair("api-key", &self.api_key);
        }
        Ok(url)
    }
}

fn normalize(result: GuardianResult) -> Option<NewRawItem> {
    let published_at = parse_timestamp(result.web_publication_date.as_deref()?)?;
    let body = non_blank(result.fields.body_text.as_deref())?;
    let title = non_blank(result.web_title.as_deref())?;
    let url = non_blank(result.web_url.as_deref())?;
    Some(NewRawItem {
        external_id: non_blank(result.id.as_deref()),
        title: Some(title),
        author: non_blank(result.fields.byline.as_deref()),
        url: Some(url),
        section: non_blank(result.section_name.as_deref()),
        published_at,
        body,
        word_count: result
            .fields
            .wordcount
            .as_deref()
            .and_then(|w| w.trim().parse::<i64>().ok()),
        engagement: Engagement::default(),
    })
}

#[async_trait]
impl ContentProvider for GuardianProvider {
    fn source(&self) -> SourceId {
        SourceId::Guardian
    }

    fn order(&self) -> ListingOrder {
        ListingOrder::OldestFirst
    }

    async fn fetch_page(&self, request: &PageRequest<'_>) -> Result<Page, ProviderError> {
        let url = self.build_url(request)?;
        let envelope: Envelope = get_json(&self.client, PROVIDER, &url, self.retry).await?;
        let response = envelope.response;
        if response.status != "ok" {
            return Err(ProviderError::Api {
                provider: PROVIDER,
                message: response
                    .message
                    .unwrap_or_else(|| format!("status '{}'", response.status)),
            });
        }

        let total = response.results.len();
        let items: Vec<NewRawItem> = response.results.into_iter().filter_map(normalize).collect();
        let skipped = total - items.len();
        if skipped > 0 {
            tracing::warn!(provider = PROVIDER, skipped, "skipped malformed records");
        }

        let next_cursor = (response.current_page < response.pages)
            .then(|| (response.current_page + 1).to_string());

        Ok(Page {
            items,
            next_cursor,
            skipped,
        })
    }
}
