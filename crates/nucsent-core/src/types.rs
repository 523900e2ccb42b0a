use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// The fixed sentiment vocabulary. Stored lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Negative,
    Neutral,
    Positive,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 3] = [
        SentimentLabel::Negative,
        SentimentLabel::Neutral,
        SentimentLabel::Positive,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Positive => "positive",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = CoreError;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "negative" => Ok(SentimentLabel::Negative),
            "neutral" => Ok(SentimentLabel::Neutral),
            "positive" => Ok(SentimentLabel::Positive),
            _ => Err(CoreError::UnknownLabel(s.to_string())),
        }
    }
}

/// Processing status of a raw item. Only ever moves away from `Unprocessed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Unprocessed,
    Processed,
    NoRelevantContent,
}

impl ItemStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Unprocessed => "unprocessed",
            ItemStatus::Processed => "processed",
            ItemStatus::NoRelevantContent => "no_relevant_content",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unprocessed" => Ok(ItemStatus::Unprocessed),
            "processed" => Ok(ItemStatus::Processed),
            "no_relevant_content" => Ok(ItemStatus::NoRelevantContent),
            _ => Err(CoreError::UnknownStatus(s.to_string())),
        }
    }
}

/// Aggregation bucket width: a number of calendar months or of weeks.
///
/// Written as `<n>m` or `<n>w` in configuration and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BucketWidth {
    Months(u32),
    Weeks(u32),
}

impl BucketWidth {
    /// The start of the bucket following the one that starts at `start`.
    #[must_use]
    pub fn advance(self, start: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            BucketWidth::Months(n) => start
                .checked_add_months(Months::new(n))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            BucketWidth::Weeks(n) => start
                .checked_add_signed(Duration::weeks(i64::from(n)))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }
}

impl Default for BucketWidth {
    fn default() -> Self {
        BucketWidth::Months(1)
    }
}

impl fmt::Display for BucketWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketWidth::Months(n) => write!(f, "{n}m"),
            BucketWidth::Weeks(n) => write!(f, "{n}w"),
        }
    }
}

impl FromStr for BucketWidth {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || CoreError::InvalidBucketWidth(s.to_string());
        let Some((unit_at, _)) = trimmed.char_indices().last() else {
            return Err(invalid());
        };
        let (digits, unit) = trimmed.split_at(unit_at);
        let n: u32 = digits.parse().map_err(|_| invalid())?;
        if n == 0 {
            return Err(invalid());
        }
        match unit {
            "m" | "M" => Ok(BucketWidth::Months(n)),
            "w" | "W" => Ok(BucketWidth::Weeks(n)),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for BucketWidth {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BucketWidth> for String {
    fn from(value: BucketWidth) -> Self {
        value.to_string()
    }
}

/// Engagement counters reported by social platforms. All optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub likes: Option<i64>,
    pub comments: Option<i64>,
    pub reposts: Option<i64>,
    /// Whether the platform vouches for the author's identity.
    #[serde(default)]
    pub author_verified: Option<bool>,
}

/// A provider record normalized to the shared item shape, ready for insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRawItem {
    /// Provider-assigned identifier, when the provider has one.
    pub external_id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub section: Option<String>,
    pub published_at: DateTime<Utc>,
    pub body: String,
    pub word_count: Option<i64>,
    #[serde(default)]
    pub engagement: Engagement,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn label_parse_is_case_insensitive_and_trims() {
        assert_eq!(
            " Positive\n".parse::<SentimentLabel>(),
            Ok(SentimentLabel::Positive)
        );
        assert_eq!("NEGATIVE".parse::<SentimentLabel>(), Ok(SentimentLabel::Negative));
    }

    #[test]
    fn label_parse_rejects_unknown_words() {
        assert!(matches!(
            "maybe".parse::<SentimentLabel>(),
            Err(CoreError::UnknownLabel(ref s)) if s == "maybe"
        ));
    }

    #[test]
    fn status_round_trips_through_its_column_value() {
        for status in [
            ItemStatus::Unprocessed,
            ItemStatus::Processed,
            ItemStatus::NoRelevantContent,
        ] {
            assert_eq!(status.as_str().parse::<ItemStatus>(), Ok(status));
        }
    }

    #[test]
    fn bucket_width_parses_months_and_weeks() {
        assert_eq!("2m".parse::<BucketWidth>(), Ok(BucketWidth::Months(2)));
        assert_eq!("1w".parse::<BucketWidth>(), Ok(BucketWidth::Weeks(1)));
        assert_eq!("12M".parse::<BucketWidth>(), Ok(BucketWidth::Months(12)));
    }

    #[test]
    fn bucket_width_rejects_zero_and_garbage() {
        assert!("0m".parse::<BucketWidth>().is_err());
        assert!("m".parse::<BucketWidth>().is_err());
        assert!("3d".parse::<BucketWidth>().is_err());
        assert!("".parse::<BucketWidth>().is_err());
    }

    #[test]
    fn bucket_width_advances_by_calendar_months() {
        let jan31 = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        // chrono clamps to the last day of the shorter month
        assert_eq!(
            BucketWidth::Months(1).advance(jan31),
            Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap()
        );
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            BucketWidth::Weeks(2).advance(start),
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn bucket_width_deserializes_from_yaml_string() {
        let width: BucketWidth = serde_json::from_str("\"2m\"").unwrap();
        assert_eq!(width, BucketWidth::Months(2));
    }
}
