use std::str::FromStr;

use crate::app_config::{AppConfig, ClassifierKind, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let parse = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("NUCSENT_ENV", "development"));
    let log_level = or_default("NUCSENT_LOG_LEVEL", "info");
    let sources_path = PathBuf::from(or_default(
        "NUCSENT_SOURCES_PATH",
        "./config/sources.yaml",
    ));

    let keyword = or_default("NUCSENT_KEYWORD", "nuclear").trim().to_string();
    if keyword.is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "NUCSENT_KEYWORD".to_string(),
            reason: "must not be blank".to_string(),
        });
    }

    let classifier = ClassifierKind::from_str(&or_default("NUCSENT_CLASSIFIER", "tei"))
        .map_err(|reason| ConfigError::InvalidEnvVar {
            var: "NUCSENT_CLASSIFIER".to_string(),
            reason,
        })?;
    let tei_url = optional("NUCSENT_TEI_URL");
    let llm_base_url = or_default("NUCSENT_LLM_BASE_URL", "https://api.openai.com/v1");
    let llm_api_key = optional("NUCSENT_LLM_API_KEY");
    let llm_model = or_default("NUCSENT_LLM_MODEL", "gpt-4o-mini");

    let guardian_api_key = optional("GUARDIAN_API_KEY");
    let nyt_api_key = optional("NYT_API_KEY");
    let youtube_api_key = optional("YOUTUBE_API_KEY");
    let threads_access_token = optional("THREADS_ACCESS_TOKEN");
    let mastodon_base_url = or_default("MASTODON_BASE_URL", "https://mastodon.social");

    let freshness_interval_hours = parse("NUCSENT_FRESHNESS_INTERVAL_HOURS", "72")?;
    let label_batch_size = usize::try_from(parse("NUCSENT_LABEL_BATCH_SIZE", "8")?)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ConfigError::InvalidEnvVar {
            var: "NUCSENT_LABEL_BATCH_SIZE".to_string(),
            reason: "must be a positive integer".to_string(),
        })?;
    let extract_delay_ms = parse("NUCSENT_EXTRACT_DELAY_MS", "500")?;
    let schedule = or_default("NUCSENT_SCHEDULE", "0 0 3 */3 * *");

    let db_max_connections = parse_u32("NUCSENT_DB_MAX_CONNECTIONS", "5")?;
    let db_acquire_timeout_secs = parse("NUCSENT_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let http_request_timeout_secs = parse("NUCSENT_HTTP_TIMEOUT_SECS", "30")?;
    let http_user_agent = or_default("NUCSENT_HTTP_USER_AGENT", "nucsent/0.1 (discourse-research)");
    let http_max_retries = parse_u32("NUCSENT_HTTP_MAX_RETRIES", "2")?;
    let http_retry_backoff_ms = parse("NUCSENT_HTTP_RETRY_BACKOFF_MS", "1000")?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        sources_path,
        keyword,
        classifier,
        tei_url,
        llm_base_url,
        llm_api_key,
        llm_model,
        guardian_api_key,
        nyt_api_key,
        youtube_api_key,
        threads_access_token,
        mastodon_base_url,
        freshness_interval_hours,
        label_batch_size,
        extract_delay_ms,
        schedule,
        db_max_connections,
        db_acquire_timeout_secs,
        http_request_timeout_secs,
        http_user_agent,
        http_max_retries,
        http_retry_backoff_ms,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
