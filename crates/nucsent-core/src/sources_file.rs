//! Per-source tunables loaded from `config/sources.yaml`.

use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::sources::SourceId;
use crate::types::BucketWidth;
use crate::ConfigError;

const DEFAULT_PAGE_CAP: usize = 500;
const DEFAULT_WINDOW_MONTHS: u32 = 12;
const MAX_WINDOW_MONTHS: u32 = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSettings {
    pub id: SourceId,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Provider search terms. For YouTube these are tracked video ids, for
    /// Mastodon hashtags (without `#`).
    pub queries: Vec<String>,
    /// Guardian section filter (for example `us-news`).
    #[serde(default)]
    pub section: Option<String>,
    /// Maximum items requested per query per run.
    #[serde(default = "default_page_cap")]
    pub page_cap: usize,
    #[serde(default)]
    pub bucket: BucketWidth,
    /// Trailing window used by period stats and top terms.
    #[serde(default = "default_window_months")]
    pub window_months: u32,
    /// Lower bound of the first fetch when the store is empty. Defaults to
    /// `now - window_months`.
    #[serde(default)]
    pub epoch: Option<NaiveDate>,
    /// Run the model-assisted extraction pass in addition to the keyword pass.
    #[serde(default = "default_true")]
    pub model_extraction: bool,
    /// Exact bodies removed by the `purge` maintenance command.
    #[serde(default)]
    pub placeholders: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_page_cap() -> usize {
    DEFAULT_PAGE_CAP
}

fn default_window_months() -> u32 {
    DEFAULT_WINDOW_MONTHS
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesFile {
    pub sources: Vec<SourceSettings>,
}

impl SourcesFile {
    #[must_use]
    pub fn get(&self, id: SourceId) -> Option<&SourceSettings> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn enabled(&self) -> impl Iterator<Item = &SourceSettings> {
        self.sources.iter().filter(|s| s.enabled)
    }
}

/// Load and validate the sources configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sources(path: &Path) -> Result<SourcesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_sources(&content)
}

/// Parse and validate sources YAML already in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_sources(content: &str) -> Result<SourcesFile, ConfigError> {
    let sources_file: SourcesFile = serde_yaml::from_str(content)?;
    validate_sources(&sources_file)?;
    Ok(sources_file)
}

fn validate_sources(sources_file: &SourcesFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for source in &sources_file.sources {
        if !seen.insert(source.id) {
            return Err(ConfigError::Validation(format!(
                "duplicate source: '{}'",
                source.id
            )));
        }

        if source.enabled && source.queries.is_empty() {
            return Err(ConfigError::Validation(format!(
                "source '{}' is enabled but has no queries",
                source.id
            )));
        }

        if source.queries.iter().any(|q| q.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "source '{}' has a blank query",
                source.id
            )));
        }

        if source.page_cap == 0 {
            return Err(ConfigError::Validation(format!(
                "source '{}' has page_cap 0",
                source.id
            )));
        }

        if source.window_months == 0 || source.window_months > MAX_WINDOW_MONTHS {
            return Err(ConfigError::Validation(format!(
                "source '{}' has window_months {}; must be 1..={MAX_WINDOW_MONTHS}",
                source.id, source.window_months
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "sources_file_test.rs"]
mod tests;
