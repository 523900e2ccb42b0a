//! Topical extraction, sentiment labeling and aggregation over the content
//! store, plus the [`Pipeline`] service that ties fetching to them.

pub mod aggregate;
pub mod classifier;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod freshness;
pub mod labeler;
pub mod llm;
pub mod pipeline;
pub mod scorer;
mod stopwords;
pub mod terms;

pub use aggregate::{aggregate, BucketCounts, TimeSeries};
pub use classifier::{
    Classification, Classifier, LexiconClassifier, LlmClassifier, TeiClassifier,
};
pub use error::{PipelineError, SentimentError};
pub use extract::{ExtractStats, Extractor, KeywordMatcher};
pub use fetcher::FetchStats;
pub use freshness::FetchWindow;
pub use labeler::LabelStats;
pub use llm::ChatClient;
pub use pipeline::{
    EngagementSummary, FetchOutcome, Metrics, Pipeline, PipelineOptions, RecentItem, RecentUnit,
    RunReport, Services,
};
pub use terms::{TermCount, TopTerms};
