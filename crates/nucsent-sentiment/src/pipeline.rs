//! The pipeline service object: one generic pipeline parameterized by
//! source, plus the read operations served from the store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use nucsent_core::{
    AppConfig, BucketWidth, ClassifierKind, ConfigError, Engagement, ItemStatus, SentimentLabel,
    SourceId, SourceSettings, SourcesFile,
};
use nucsent_db::PurgeStats;
use nucsent_providers::{build_provider, ContentProvider};
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::aggregate::{aggregate, month_window, trailing_window, BucketCounts, TimeSeries};
use crate::classifier::{Classifier, LexiconClassifier, LlmClassifier, TeiClassifier};
use crate::error::PipelineError;
use crate::extract::{extract_pending, ExtractStats, Extractor};
use crate::fetcher::{fetch, FetchStats};
use crate::freshness::{fetch_window, is_fresh, latest_boundary, FetchWindow};
use crate::labeler::{label_pending, LabelStats};
use crate::llm::ChatClient;
use crate::terms::{rank_terms, TopTerms, DEFAULT_TOP_TERMS};

const MAX_MONTH_OFFSET: u32 = 12;
const MAX_WINDOW_MONTHS: u32 = 120;

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// A fetch is skipped while the newest stored item is younger than this.
    pub freshness_interval: Duration,
    pub label_batch_size: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            freshness_interval: Duration::hours(72),
            label_batch_size: 8,
        }
    }
}

impl PipelineOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            freshness_interval: i64::try_from(config.freshness_interval_hours)
                .ok()
                .and_then(Duration::try_hours)
                .unwrap_or(Duration::MAX),
            label_batch_size: config.label_batch_size,
        }
    }
}

/// Clients built once and shared by every source.
pub struct Services {
    pub providers: HashMap<SourceId, Arc<dyn ContentProvider>>,
    pub classifier: Arc<dyn Classifier>,
    pub extractor: Arc<Extractor>,
}

impl Services {
    /// Build every client the enabled sources and the selected classifier
    /// need.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] when a credential or endpoint is
    /// missing, or a setup error if a client cannot be built.
    pub fn from_config(config: &AppConfig, sources: &SourcesFile) -> Result<Self, PipelineError> {
        config.validate_credentials(sources)?;
        let timeout = config.http_request_timeout_secs;

        let chat = config
            .llm_api_key
            .as_deref()
            .map(|key| ChatClient::new(&config.llm_base_url, key, &config.llm_model, timeout))
            .transpose()?
            .map(Arc::new);

        let classifier: Arc<dyn Classifier> = match config.classifier {
            ClassifierKind::Tei => {
                let url = config.tei_url.as_deref().ok_or_else(|| {
                    ConfigError::MissingCredential {
                        what: "classifier 'tei'".to_string(),
                        var: "NUCSENT_TEI_URL".to_string(),
                    }
                })?;
                Arc::new(TeiClassifier::new(url, timeout)?)
            }
            ClassifierKind::Llm => {
                let chat = chat.clone().ok_or_else(|| ConfigError::MissingCredential {
                    what: "classifier 'llm'".to_string(),
                    var: "NUCSENT_LLM_API_KEY".to_string(),
                })?;
                Arc::new(LlmClassifier::new(chat))
            }
            ClassifierKind::Lexicon => Arc::new(LexiconClassifier),
        };

        let extractor = Arc::new(Extractor::new(
            &config.keyword,
            chat,
            StdDuration::from_millis(config.extract_delay_ms),
        )?);

        let mut providers = HashMap::new();
        for settings in sources.enabled() {
            providers.insert(settings.id, build_provider(config, settings)?);
        }

        tracing::info!(
            classifier = classifier.name(),
            model_extraction = extractor.has_model(),
            providers = providers.len(),
            "pipeline services ready"
        );

        Ok(Self {
            providers,
            classifier,
            extractor,
        })
    }

    /// Services for read-only use: no providers and offline labeling. Reads
    /// never need credentials.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Sentiment`] if the keyword cannot be compiled.
    pub fn read_only(keyword: &str) -> Result<Self, PipelineError> {
        Ok(Self {
            providers: HashMap::new(),
            classifier: Arc::new(LexiconClassifier),
            extractor: Arc::new(Extractor::new(keyword, None, StdDuration::ZERO)?),
        })
    }
}

// ---------------------------------------------------------------------------
// Report and read-model types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchOutcome {
    /// The newest stored item is within the freshness interval.
    Skipped { latest: DateTime<Utc> },
    Completed {
        window: FetchWindow,
        stats: FetchStats,
    },
    /// The provider failed. Rows up to the point every query had listed
    /// without a gap are kept; the next run's window starts there.
    Failed { window: FetchWindow, error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub source: SourceId,
    pub fetch: FetchOutcome,
    pub extraction: ExtractStats,
    pub labeling: LabelStats,
    pub latest_before: Option<DateTime<Utc>>,
    pub latest_after: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentUnit {
    pub text: String,
    pub label: Option<SentimentLabel>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentItem {
    pub id: i64,
    pub published_at: DateTime<Utc>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub section: Option<String>,
    pub body: String,
    pub status: ItemStatus,
    pub engagement: Engagement,
    pub units: Vec<RecentUnit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EngagementSummary {
    pub avg_likes: Option<f64>,
    pub avg_comments: Option<f64>,
    pub avg_reposts: Option<f64>,
    /// Percentage of verified authors among items that report it.
    pub verified_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub source: SourceId,
    /// Labeled units.
    pub total: i64,
    pub negative: i64,
    pub neutral: i64,
    pub positive: i64,
    /// Units awaiting a label.
    pub pending: i64,
    pub items: i64,
    pub engagement: EngagementSummary,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline {
    pool: SqlitePool,
    sources: SourcesFile,
    services: Services,
    options: PipelineOptions,
    locks: HashMap<SourceId, Mutex<()>>,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        pool: SqlitePool,
        sources: SourcesFile,
        services: Services,
        options: PipelineOptions,
    ) -> Self {
        let locks = SourceId::ALL.iter().map(|&id| (id, Mutex::new(()))).collect();
        Self {
            pool,
            sources,
            services,
            options,
            locks,
        }
    }

    /// Validate credentials, build clients, and assemble the pipeline.
    ///
    /// # Errors
    ///
    /// See [`Services::from_config`].
    pub fn from_config(
        config: &AppConfig,
        pool: SqlitePool,
        sources: SourcesFile,
    ) -> Result<Self, PipelineError> {
        let services = Services::from_config(config, &sources)?;
        Ok(Self::new(
            pool,
            sources,
            services,
            PipelineOptions::from_app_config(config),
        ))
    }

    #[must_use]
    pub fn sources(&self) -> &SourcesFile {
        &self.sources
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn settings(&self, source: SourceId) -> Result<&SourceSettings, PipelineError> {
        self.sources
            .get(source)
            .ok_or(PipelineError::SourceNotConfigured(source))
    }

    fn enabled_settings(&self, source: SourceId) -> Result<&SourceSettings, PipelineError> {
        self.settings(source)
            .ok()
            .filter(|s| s.enabled)
            .ok_or(PipelineError::SourceNotConfigured(source))
    }

    fn lock(&self, source: SourceId) -> Result<&Mutex<()>, PipelineError> {
        self.locks
            .get(&source)
            .ok_or(PipelineError::SourceNotConfigured(source))
    }

    // -- ingestion ----------------------------------------------------------

    /// Bring `source` up to date: fetch unless fresh (or `force`), then
    /// resume pending extraction and labeling.
    ///
    /// Provider failures are reported in the [`RunReport`], not returned.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::SourceNotConfigured`] for a disabled source,
    /// or [`PipelineError::Db`] if the store cannot be read or written.
    pub async fn ensure_up_to_date(
        &self,
        source: SourceId,
        force: bool,
    ) -> Result<RunReport, PipelineError> {
        self.ensure_up_to_date_at(source, force, Utc::now()).await
    }

    /// [`Self::ensure_up_to_date`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`Self::ensure_up_to_date`].
    pub async fn ensure_up_to_date_at(
        &self,
        source: SourceId,
        force: bool,
        now: DateTime<Utc>,
    ) -> Result<RunReport, PipelineError> {
        let settings = self.enabled_settings(source)?;
        let provider = self
            .services
            .providers
            .get(&source)
            .ok_or(PipelineError::SourceNotConfigured(source))?;
        let _guard = self.lock(source)?.lock().await;

        let latest_before = nucsent_db::latest_published_at(&self.pool, source).await?;
        let fetch_outcome = match latest_before {
            Some(latest)
                if !force && is_fresh(latest_before, now, self.options.freshness_interval) =>
            {
                tracing::info!(source = %source, latest = %latest, "store is fresh; skipping fetch");
                FetchOutcome::Skipped { latest }
            }
            _ => {
                let boundary = latest_boundary(&self.pool, settings, now).await?;
                let window = fetch_window(boundary, now);
                match fetch(&self.pool, provider.as_ref(), settings, window).await {
                    Ok(stats) => FetchOutcome::Completed { window, stats },
                    Err(PipelineError::ProviderUnavailable { cause, .. }) => {
                        tracing::warn!(
                            source = %source,
                            error = %cause,
                            "fetch failed; the rest of the window is retried next run"
                        );
                        FetchOutcome::Failed {
                            window,
                            error: cause.to_string(),
                        }
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        let extraction = extract_pending(
            &self.pool,
            source,
            &self.services.extractor,
            settings.model_extraction,
        )
        .await?;
        let labeling = label_pending(
            &self.pool,
            source,
            self.services.classifier.as_ref(),
            self.options.label_batch_size,
        )
        .await?;
        let latest_after = nucsent_db::latest_published_at(&self.pool, source).await?;

        Ok(RunReport {
            source,
            fetch: fetch_outcome,
            extraction,
            labeling,
            latest_before,
            latest_after,
        })
    }

    /// Run [`Self::ensure_up_to_date`] for every enabled source, one after
    /// another.
    pub async fn run_enabled(
        &self,
        force: bool,
    ) -> Vec<(SourceId, Result<RunReport, PipelineError>)> {
        let mut results = Vec::new();
        for settings in self.sources.enabled() {
            let result = self.ensure_up_to_date(settings.id, force).await;
            if let Err(e) = &result {
                tracing::error!(source = %settings.id, error = %e, "pipeline run failed");
            }
            results.push((settings.id, result));
        }
        results
    }

    /// Label pending units of `source` without fetching or extracting.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Db`] if unlabeled units cannot be listed.
    pub async fn label(&self, source: SourceId) -> Result<LabelStats, PipelineError> {
        let _guard = self.lock(source)?.lock().await;
        let stats = label_pending(
            &self.pool,
            source,
            self.services.classifier.as_ref(),
            self.options.label_batch_size,
        )
        .await?;
        Ok(stats)
    }

    /// Delete items and units whose text is one of the source's configured
    /// placeholder strings.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::SourceNotConfigured`] or [`PipelineError::Db`].
    pub async fn purge_placeholders(&self, source: SourceId) -> Result<PurgeStats, PipelineError> {
        let settings = self.settings(source)?;
        if settings.placeholders.is_empty() {
            return Ok(PurgeStats::default());
        }
        let _guard = self.lock(source)?.lock().await;
        let stats =
            nucsent_db::delete_placeholders(&self.pool, source, &settings.placeholders).await?;
        tracing::info!(
            source = %source,
            items = stats.items,
            units = stats.units,
            "placeholders purged"
        );
        Ok(stats)
    }

    // -- reads --------------------------------------------------------------

    /// The newest `limit` items with their units.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Db`] if the store cannot be read.
    pub async fn get_recent(
        &self,
        source: SourceId,
        limit: usize,
    ) -> Result<Vec<RecentItem>, PipelineError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = nucsent_db::list_recent_items(&self.pool, source, limit).await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let units = nucsent_db::list_units_for_item(&self.pool, source, row.id)
                .await?
                .into_iter()
                .map(|u| RecentUnit {
                    label: u.label.as_deref().and_then(|l| l.parse().ok()),
                    score: u.score,
                    text: u.text,
                })
                .collect();
            let status = row.status().unwrap_or_else(|e| {
                tracing::warn!(item_id = row.id, error = %e, "unreadable item status");
                ItemStatus::Unprocessed
            });
            items.push(RecentItem {
                id: row.id,
                published_at: row.published_at,
                title: row.title,
                author: row.author,
                url: row.url,
                section: row.section,
                body: row.body,
                status,
                engagement: Engagement {
                    likes: row.like_count,
                    comments: row.comment_count,
                    reposts: row.repost_count,
                    author_verified: row.author_verified,
                },
                units,
            });
        }
        Ok(items)
    }

    /// Label totals and engagement averages over the whole store.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Db`] if the store cannot be read.
    pub async fn get_metrics(&self, source: SourceId) -> Result<Metrics, PipelineError> {
        let counts = nucsent_db::label_counts(&self.pool, source).await?;
        let engagement = nucsent_db::engagement_averages(&self.pool, source).await?;
        Ok(Metrics {
            source,
            total: counts.negative + counts.neutral + counts.positive,
            negative: counts.negative,
            neutral: counts.neutral,
            positive: counts.positive,
            pending: counts.pending,
            items: engagement.items,
            engagement: EngagementSummary {
                avg_likes: engagement.avg_likes,
                avg_comments: engagement.avg_comments,
                avg_reposts: engagement.avg_reposts,
                verified_percent: engagement.verified_percent,
            },
        })
    }

    /// Bucketed counts over the source's trailing window. `bucket` overrides
    /// the configured width.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::SourceNotConfigured`] or [`PipelineError::Db`].
    pub async fn get_period_stats(
        &self,
        source: SourceId,
        bucket: Option<BucketWidth>,
    ) -> Result<TimeSeries, PipelineError> {
        self.get_period_stats_at(source, bucket, Utc::now()).await
    }

    /// [`Self::get_period_stats`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`Self::get_period_stats`].
    pub async fn get_period_stats_at(
        &self,
        source: SourceId,
        bucket: Option<BucketWidth>,
        now: DateTime<Utc>,
    ) -> Result<TimeSeries, PipelineError> {
        let settings = self.settings(source)?;
        let width = bucket.unwrap_or(settings.bucket);
        let (start, end) = trailing_window(now, settings.window_months);
        let observations =
            nucsent_db::list_unit_observations(&self.pool, source, start, end).await?;
        Ok(aggregate(&observations, start, end, width))
    }

    /// Counts for one calendar month, `offset` months back (0 = current).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] if `offset` exceeds 12, or
    /// [`PipelineError::Db`].
    pub async fn get_month_stats(
        &self,
        source: SourceId,
        offset: u32,
    ) -> Result<BucketCounts, PipelineError> {
        self.get_month_stats_at(source, offset, Utc::now()).await
    }

    /// [`Self::get_month_stats`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`Self::get_month_stats`].
    pub async fn get_month_stats_at(
        &self,
        source: SourceId,
        offset: u32,
        now: DateTime<Utc>,
    ) -> Result<BucketCounts, PipelineError> {
        if offset > MAX_MONTH_OFFSET {
            return Err(PipelineError::InvalidArgument(format!(
                "month offset {offset} is out of range 0..={MAX_MONTH_OFFSET}"
            )));
        }
        let (start, end) = month_window(now, offset);
        let observations =
            nucsent_db::list_unit_observations(&self.pool, source, start, end).await?;
        let series = aggregate(&observations, start, end, BucketWidth::Months(1));
        Ok(series
            .buckets
            .into_iter()
            .next()
            .unwrap_or_else(|| BucketCounts::empty(start, end)))
    }

    /// Most frequent terms per label over a trailing window of
    /// `window_months` (default: the source's window).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] for a zero or oversized
    /// window, [`PipelineError::SourceNotConfigured`], or [`PipelineError::Db`].
    pub async fn get_top_terms(
        &self,
        source: SourceId,
        window_months: Option<u32>,
        limit: Option<usize>,
    ) -> Result<TopTerms, PipelineError> {
        self.get_top_terms_at(source, window_months, limit, Utc::now())
            .await
    }

    /// [`Self::get_top_terms`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`Self::get_top_terms`].
    pub async fn get_top_terms_at(
        &self,
        source: SourceId,
        window_months: Option<u32>,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<TopTerms, PipelineError> {
        let settings = self.settings(source)?;
        let months = window_months.unwrap_or(settings.window_months);
        if months == 0 || months > MAX_WINDOW_MONTHS {
            return Err(PipelineError::InvalidArgument(format!(
                "window of {months} months is out of range 1..={MAX_WINDOW_MONTHS}"
            )));
        }
        let limit = limit.unwrap_or(DEFAULT_TOP_TERMS);
        let (start, end) = trailing_window(now, months);
        let observations =
            nucsent_db::list_unit_observations(&self.pool, source, start, end).await?;

        let mut by_label: BTreeMap<SentimentLabel, Vec<&str>> = BTreeMap::new();
        for obs in &observations {
            if let Some(label) = obs.label.as_deref().and_then(|l| l.parse().ok()) {
                by_label.entry(label).or_default().push(obs.text.as_str());
            }
        }

        let keyword = self.services.extractor.keyword();
        let rank = |label: SentimentLabel| {
            let texts = by_label.get(&label).map(Vec::as_slice).unwrap_or_default();
            rank_terms(texts.iter().copied(), keyword, limit)
        };
        Ok(TopTerms {
            negative: rank(SentimentLabel::Negative),
            neutral: rank(SentimentLabel::Neutral),
            positive: rank(SentimentLabel::Positive),
        })
    }
}
