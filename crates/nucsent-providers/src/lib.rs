//! Content-provider clients.
//!
//! Every provider lists items for a search query inside a time window, one
//! page at a time, and normalizes its records to [`NewRawItem`]. Records that
//! lack a timestamp, body or identity are skipped and counted, never stored.

pub mod error;
pub mod guardian;
pub mod http;
pub mod mastodon;
pub(crate) mod normalize;
pub mod nytimes;
pub mod retry;
pub mod threads;
pub mod youtube;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nucsent_core::{AppConfig, NewRawItem, SourceId, SourceSettings};

pub use error::ProviderError;
pub use guardian::GuardianProvider;
pub use http::HttpSettings;
pub use mastodon::MastodonProvider;
pub use nytimes::NytimesProvider;
pub use retry::RetryPolicy;
pub use threads::ThreadsProvider;
pub use youtube::YoutubeProvider;

/// One page request: a query, an inclusive window, and the cursor returned
/// by the previous page (`None` for the first page).
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    pub query: &'a str,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub cursor: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<NewRawItem>,
    /// Cursor for the next page; `None` when the listing is exhausted.
    pub next_cursor: Option<String>,
    /// Records dropped because a required field was missing or malformed.
    pub skipped: usize,
}

/// Direction in which successive pages walk through a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingOrder {
    /// The first page holds the oldest items; later pages move toward `to`.
    OldestFirst,
    /// The first page holds the newest items; later pages move toward `from`.
    NewestFirst,
}

#[async_trait]
pub trait ContentProvider: Send + Sync {
    fn source(&self) -> SourceId;

    fn order(&self) -> ListingOrder;

    /// Fetch one page of items for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the provider cannot be reached or
    /// answers with an error; malformed individual records are skipped.
    async fn fetch_page(&self, request: &PageRequest<'_>) -> Result<Page, ProviderError>;
}

/// Construct the live provider for `settings.id` from application config.
///
/// # Errors
///
/// Returns [`ProviderError::Api`] when the source's credential is missing
/// (callers are expected to have run `AppConfig::validate_credentials`), or
/// an HTTP/URL error if the client cannot be built.
pub fn build_provider(
    config: &AppConfig,
    settings: &SourceSettings,
) -> Result<Arc<dyn ContentProvider>, ProviderError> {
    let http = HttpSettings::from_app_config(config);
    let credential = |value: &Option<String>, provider: &'static str, var: &str| {
        value.clone().ok_or_else(|| ProviderError::Api {
            provider,
            message: format!("{var} is not set"),
        })
    };

    let provider: Arc<dyn ContentProvider> = match settings.id {
        SourceId::Guardian => Arc::new(GuardianProvider::new(
            &credential(&config.guardian_api_key, "guardian", "GUARDIAN_API_KEY")?,
            settings.section.clone(),
            &http,
        )?),
        SourceId::Nytimes => Arc::new(NytimesProvider::new(
            &credential(&config.nyt_api_key, "nytimes", "NYT_API_KEY")?,
            &http,
        )?),
        SourceId::Mastodon => Arc::new(MastodonProvider::with_base_url(
            &config.mastodon_base_url,
            &http,
        )?),
        SourceId::Threads => Arc::new(ThreadsProvider::new(
            &credential(&config.threads_access_token, "threads", "THREADS_ACCESS_TOKEN")?,
            &http,
        )?),
        SourceId::Youtube => Arc::new(YoutubeProvider::new(
            &credential(&config.youtube_api_key, "youtube", "YOUTUBE_API_KEY")?,
            &http,
        )?),
    };
    Ok(provider)
}
