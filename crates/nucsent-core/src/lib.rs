pub mod app_config;
pub mod config;
pub mod sources;
pub mod sources_file;
pub mod types;

use thiserror::Error;

pub use app_config::{AppConfig, ClassifierKind, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use sources::{natural_key, NaturalKeyKind, SourceId, SourceSpec, TimestampGranularity};
pub use sources_file::{load_sources, parse_sources, SourceSettings, SourcesFile};
pub use types::{BucketWidth, Engagement, ItemStatus, NewRawItem, SentimentLabel};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sources file {path}: {source}")]
    SourcesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sources file: {0}")]
    SourcesFileParse(#[from] serde_yaml::Error),

    #[error("invalid sources configuration: {0}")]
    Validation(String),

    /// An enabled source or the selected classifier has no credential/endpoint.
    #[error("{what} requires {var} to be set")]
    MissingCredential { what: String, var: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown sentiment label: {0}")]
    UnknownLabel(String),

    #[error("unknown item status: {0}")]
    UnknownStatus(String),

    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("invalid bucket width '{0}': expected <n>m or <n>w with n >= 1")]
    InvalidBucketWidth(String),
}
