//! Shared HTTP plumbing: client construction, base-URL handling, JSON GETs.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::error::ProviderError;
use crate::retry::{retry_with_backoff, RetryPolicy};

/// Client settings shared by every provider.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "nucsent/0.1 (discourse-research)".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl HttpSettings {
    #[must_use]
    pub fn from_app_config(config: &nucsent_core::AppConfig) -> Self {
        Self {
            timeout_secs: config.http_request_timeout_secs,
            user_agent: config.http_user_agent.clone(),
            retry: RetryPolicy {
                max_retries: config.http_max_retries,
                backoff_base_ms: config.http_retry_backoff_ms,
            },
        }
    }
}

/// # Errors
///
/// Returns [`ProviderError::Http`] if the `reqwest::Client` cannot be built.
pub fn build_client(settings: &HttpSettings) -> Result<Client, ProviderError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(settings.user_agent.as_str())
        .build()?;
    Ok(client)
}

/// Parse a base URL, normalised to end with exactly one slash so that
/// `Url::join` appends rather than replaces the last path segment.
pub(crate) fn parse_base_url(base_url: &str) -> Result<Url, ProviderError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|e| ProviderError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn join(base: &Url, path: &str) -> Result<Url, ProviderError> {
    base.join(path).map_err(|e| ProviderError::InvalidBaseUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })
}

/// GET `url` and deserialize the body, retrying transient failures.
///
/// Error contexts carry only the URL path so credentials in the query
/// string never reach logs.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    provider: &'static str,
    url: &Url,
    retry: RetryPolicy,
) -> Result<T, ProviderError> {
    retry_with_backoff(retry, move || async move {
        let response = client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                provider,
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ProviderError::Deserialize {
            context: format!("{provider} {}", url.path()),
            source: e,
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_a_single_trailing_slash() {
        let url = parse_base_url("https://content.guardianapis.com///").unwrap();
        assert_eq!(url.as_str(), "https://content.guardianapis.com/");
        let nested = parse_base_url("https://api.nytimes.com/svc/search/v2").unwrap();
        assert_eq!(
            join(&nested, "articlesearch.json").unwrap().as_str(),
            "https://api.nytimes.com/svc/search/v2/articlesearch.json"
        );
    }

    #[test]
    fn invalid_base_url_is_reported() {
        assert!(matches!(
            parse_base_url("not a url"),
            Err(ProviderError::InvalidBaseUrl { .. })
        ));
    }
}
