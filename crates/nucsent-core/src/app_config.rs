use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::sources::SourceId;
use crate::sources_file::SourcesFile;
use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Which sentiment classification strategy the labeler uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    /// Sequence-classification model behind a local inference server.
    Tei,
    /// Remote chat-completion model constrained to one word.
    Llm,
    /// Offline weighted lexicon.
    Lexicon,
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierKind::Tei => write!(f, "tei"),
            ClassifierKind::Llm => write!(f, "llm"),
            ClassifierKind::Lexicon => write!(f, "lexicon"),
        }
    }
}

impl FromStr for ClassifierKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tei" | "local" => Ok(ClassifierKind::Tei),
            "llm" | "remote" => Ok(ClassifierKind::Llm),
            "lexicon" => Ok(ClassifierKind::Lexicon),
            other => Err(format!("unknown classifier '{other}'; expected tei, llm or lexicon")),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub sources_path: PathBuf,
    /// Topic keyword driving extraction and excluded from top terms.
    pub keyword: String,
    pub classifier: ClassifierKind,
    pub tei_url: Option<String>,
    pub llm_base_url: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub guardian_api_key: Option<String>,
    pub nyt_api_key: Option<String>,
    pub youtube_api_key: Option<String>,
    pub threads_access_token: Option<String>,
    pub mastodon_base_url: String,
    pub freshness_interval_hours: u64,
    pub label_batch_size: usize,
    pub extract_delay_ms: u64,
    /// Six-field cron expression (seconds first) for the `schedule` command.
    pub schedule: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub http_request_timeout_secs: u64,
    pub http_user_agent: String,
    pub http_max_retries: u32,
    pub http_retry_backoff_ms: u64,
}

impl AppConfig {
    /// Check that every enabled source and the selected classifier have the
    /// credentials they need. A partially configured pipeline must not run.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] naming the first gap found.
    pub fn validate_credentials(&self, sources: &SourcesFile) -> Result<(), ConfigError> {
        let missing = |what: String, var: &str| ConfigError::MissingCredential {
            what,
            var: var.to_string(),
        };

        for source in sources.enabled() {
            let required = match source.id {
                SourceId::Guardian => Some((&self.guardian_api_key, "GUARDIAN_API_KEY")),
                SourceId::Nytimes => Some((&self.nyt_api_key, "NYT_API_KEY")),
                SourceId::Youtube => Some((&self.youtube_api_key, "YOUTUBE_API_KEY")),
                SourceId::Threads => Some((&self.threads_access_token, "THREADS_ACCESS_TOKEN")),
                SourceId::Mastodon => None,
            };
            if let Some((value, var)) = required {
                if value.is_none() {
                    return Err(missing(format!("source '{}'", source.id), var));
                }
            }
            if source.model_extraction && self.llm_api_key.is_none() {
                return Err(missing(
                    format!("model extraction for source '{}'", source.id),
                    "NUCSENT_LLM_API_KEY",
                ));
            }
        }

        match self.classifier {
            ClassifierKind::Tei if self.tei_url.is_none() => {
                Err(missing("classifier 'tei'".to_string(), "NUCSENT_TEI_URL"))
            }
            ClassifierKind::Llm if self.llm_api_key.is_none() => {
                Err(missing("classifier 'llm'".to_string(), "NUCSENT_LLM_API_KEY"))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[redacted]");
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("sources_path", &self.sources_path)
            .field("database_url", &"[redacted]")
            .field("keyword", &self.keyword)
            .field("classifier", &self.classifier)
            .field("tei_url", &self.tei_url)
            .field("llm_base_url", &self.llm_base_url)
            .field("llm_api_key", &redact(&self.llm_api_key))
            .field("llm_model", &self.llm_model)
            .field("guardian_api_key", &redact(&self.guardian_api_key))
            .field("nyt_api_key", &redact(&self.nyt_api_key))
            .field("youtube_api_key", &redact(&self.youtube_api_key))
            .field("threads_access_token", &redact(&self.threads_access_token))
            .field("mastodon_base_url", &self.mastodon_base_url)
            .field("freshness_interval_hours", &self.freshness_interval_hours)
            .field("label_batch_size", &self.label_batch_size)
            .field("extract_delay_ms", &self.extract_delay_ms)
            .field("schedule", &self.schedule)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("http_request_timeout_secs", &self.http_request_timeout_secs)
            .field("http_user_agent", &self.http_user_agent)
            .field("http_max_retries", &self.http_max_retries)
            .field("http_retry_backoff_ms", &self.http_retry_backoff_ms)
            .finish()
    }
}
