//! Static per-source schema: table names, identity, timestamp granularity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::NewRawItem;
use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    Guardian,
    Nytimes,
    Mastodon,
    Threads,
    Youtube,
}

/// How a source identifies an item across fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaturalKeyKind {
    /// Headline plus canonical URL (news archives that re-issue ids).
    TitleAndUrl,
    /// The provider-assigned id.
    ProviderId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampGranularity {
    Date,
    DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpec {
    pub id: SourceId,
    pub items_table: &'static str,
    pub units_table: &'static str,
    pub natural_key: NaturalKeyKind,
    pub granularity: TimestampGranularity,
}

impl SourceId {
    pub const ALL: [SourceId; 5] = [
        SourceId::Guardian,
        SourceId::Nytimes,
        SourceId::Mastodon,
        SourceId::Threads,
        SourceId::Youtube,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceId::Guardian => "guardian",
            SourceId::Nytimes => "nytimes",
            SourceId::Mastodon => "mastodon",
            SourceId::Threads => "threads",
            SourceId::Youtube => "youtube",
        }
    }

    /// Table names are compile-time constants; they are the only identifiers
    /// ever interpolated into SQL.
    #[must_use]
    pub fn spec(self) -> SourceSpec {
        let (items_table, units_table) = match self {
            SourceId::Guardian => ("guardian_items", "guardian_units"),
            SourceId::Nytimes => ("nytimes_items", "nytimes_units"),
            SourceId::Mastodon => ("mastodon_items", "mastodon_units"),
            SourceId::Threads => ("threads_items", "threads_units"),
            SourceId::Youtube => ("youtube_items", "youtube_units"),
        };
        let natural_key = match self {
            SourceId::Guardian => NaturalKeyKind::TitleAndUrl,
            _ => NaturalKeyKind::ProviderId,
        };
        let granularity = match self {
            SourceId::Nytimes => TimestampGranularity::Date,
            _ => TimestampGranularity::DateTime,
        };
        SourceSpec {
            id: self,
            items_table,
            units_table,
            natural_key,
            granularity,
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guardian" => Ok(SourceId::Guardian),
            "nytimes" | "nyt" => Ok(SourceId::Nytimes),
            "mastodon" => Ok(SourceId::Mastodon),
            "threads" => Ok(SourceId::Threads),
            "youtube" => Ok(SourceId::Youtube),
            _ => Err(CoreError::UnknownSource(s.to_string())),
        }
    }
}

/// Derive the dedup key for `item` under `source`'s identity rule.
///
/// Returns `None` when the fields the rule needs are missing or blank; such
/// records cannot be deduplicated and must not be stored.
#[must_use]
pub fn natural_key(source: SourceId, item: &NewRawItem) -> Option<String> {
    let non_blank = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    match source.spec().natural_key {
        NaturalKeyKind::TitleAndUrl => {
            let title = non_blank(&item.title)?;
            let url = non_blank(&item.url)?;
            let mut hasher = Sha256::new();
            hasher.update(title.as_bytes());
            hasher.update([0x1f]);
            hasher.update(url.as_bytes());
            Some(
                hasher
                    .finalize()
                    .iter()
                    .map(|b| format!("{b:02x}"))
                    .collect(),
            )
        }
        NaturalKeyKind::ProviderId => non_blank(&item.external_id),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::types::Engagement;

    fn item(title: Option<&str>, url: Option<&str>, external_id: Option<&str>) -> NewRawItem {
        NewRawItem {
            external_id: external_id.map(str::to_string),
            title: title.map(str::to_string),
            author: None,
            url: url.map(str::to_string),
            section: None,
            published_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            body: "Nuclear power is risky.".to_string(),
            word_count: None,
            engagement: Engagement::default(),
        }
    }

    #[test]
    fn every_source_has_distinct_tables() {
        let mut tables: Vec<&str> = SourceId::ALL
            .iter()
            .flat_map(|s| [s.spec().items_table, s.spec().units_table])
            .collect();
        tables.sort_unstable();
        tables.dedup();
        assert_eq!(tables.len(), SourceId::ALL.len() * 2);
    }

    #[test]
    fn source_id_parses_aliases() {
        assert_eq!("NYT".parse::<SourceId>(), Ok(SourceId::Nytimes));
        assert_eq!("guardian".parse::<SourceId>(), Ok(SourceId::Guardian));
        assert!("reddit".parse::<SourceId>().is_err());
    }

    #[test]
    fn title_and_url_key_is_stable_and_field_sensitive() {
        let a = item(Some("Reactor restarts"), Some("https://example.com/a"), None);
        let b = item(Some("Reactor restarts"), Some("https://example.com/b"), None);
        let key_a = natural_key(SourceId::Guardian, &a).unwrap();
        assert_eq!(key_a.len(), 64);
        assert_eq!(natural_key(SourceId::Guardian, &a), Some(key_a.clone()));
        assert_ne!(natural_key(SourceId::Guardian, &b), Some(key_a));
    }

    #[test]
    fn title_and_url_key_requires_both_fields() {
        let no_url = item(Some("Reactor restarts"), Some("  "), Some("id-1"));
        assert_eq!(natural_key(SourceId::Guardian, &no_url), None);
    }

    #[test]
    fn provider_id_key_uses_external_id() {
        let post = item(None, None, Some("109876"));
        assert_eq!(natural_key(SourceId::Mastodon, &post).as_deref(), Some("109876"));
        assert_eq!(natural_key(SourceId::Threads, &item(None, None, None)), None);
    }
}
