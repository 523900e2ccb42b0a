use nucsent_core::{ConfigError, SourceId};
use nucsent_db::DbError;
use nucsent_providers::ProviderError;
use thiserror::Error;

/// Failures talking to a model (classifier or chat completion).
#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("malformed {service} response: {message}")]
    Malformed {
        service: &'static str,
        message: String,
    },

    #[error("invalid keyword pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The provider could not be reached or answered with an error. Rows
    /// inserted before the failure stay committed.
    #[error("provider for {source_id} unavailable: {cause}")]
    ProviderUnavailable {
        source_id: SourceId,
        #[source]
        cause: ProviderError,
    },

    #[error("failed to build provider client: {0}")]
    ProviderSetup(#[from] ProviderError),

    #[error("source '{0}' is not configured or not enabled")]
    SourceNotConfigured(SourceId),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Sentiment(#[from] SentimentError),
}
