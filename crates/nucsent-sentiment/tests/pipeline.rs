//! End-to-end pipeline runs against an in-memory store and a scripted
//! provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use nucsent_core::{
    BucketWidth, Engagement, NewRawItem, SentimentLabel, SourceId, SourceSettings, SourcesFile,
};
use nucsent_providers::{ContentProvider, ListingOrder, Page, PageRequest, ProviderError};
use nucsent_sentiment::freshness::latest_boundary;
use nucsent_sentiment::{
    Classification, Classifier, Extractor, FetchOutcome, LexiconClassifier, Pipeline,
    PipelineError, PipelineOptions, SentimentError, Services,
};
use sqlx::SqlitePool;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

fn now() -> DateTime<Utc> {
    at(2024, 6, 15, 12)
}

fn post(id: &str, published_at: DateTime<Utc>, body: &str) -> NewRawItem {
    NewRawItem {
        external_id: Some(id.to_string()),
        title: None,
        author: Some("@atomic".to_string()),
        url: Some(format!("https://mastodon.example/@atomic/{id}")),
        section: None,
        published_at,
        body: body.to_string(),
        word_count: None,
        engagement: Engagement {
            likes: Some(4),
            comments: Some(1),
            reposts: None,
            author_verified: None,
        },
    }
}

fn corpus() -> Vec<NewRawItem> {
    let mut verified = post("1", at(2024, 5, 2, 9), "Nuclear is safe.");
    verified.engagement.author_verified = Some(true);
    let mut unverified = post(
        "2",
        at(2024, 5, 20, 9),
        "Solar is growing. Nuclear power is risky. The economy improved.",
    );
    unverified.engagement.author_verified = Some(false);
    vec![
        verified,
        unverified,
        post("3", at(2024, 6, 14, 12), "Nuclear is clean energy and safe."),
    ]
}

fn mastodon_settings() -> SourceSettings {
    SourceSettings {
        id: SourceId::Mastodon,
        enabled: true,
        queries: vec!["nuclear".to_string()],
        section: None,
        page_cap: 100,
        bucket: BucketWidth::Months(1),
        window_months: 12,
        epoch: None,
        model_extraction: false,
        placeholders: vec!["Not related.".to_string()],
    }
}

/// Serves every item inside the requested (inclusive) window as one page.
struct ScriptedProvider {
    items: Vec<NewRawItem>,
    /// Hand out a cursor with the first page and fail when it is followed.
    fail_second_page: bool,
    requests: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
}

impl ScriptedProvider {
    fn new(items: Vec<NewRawItem>) -> Arc<Self> {
        Arc::new(Self {
            items,
            fail_second_page: false,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn failing(items: Vec<NewRawItem>) -> Arc<Self> {
        Arc::new(Self {
            items,
            fail_second_page: true,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ContentProvider for ScriptedProvider {
    fn source(&self) -> SourceId {
        SourceId::Mastodon
    }

    fn order(&self) -> ListingOrder {
        ListingOrder::OldestFirst
    }

    async fn fetch_page(&self, request: &PageRequest<'_>) -> Result<Page, ProviderError> {
        self.requests
            .lock()
            .unwrap()
            .push((request.from, request.to));
        if self.fail_second_page && request.cursor.is_some() {
            return Err(ProviderError::Api {
                provider: "mastodon",
                message: "rate limit exceeded".to_string(),
            });
        }
        let items = self
            .items
            .iter()
            .filter(|i| i.published_at >= request.from && i.published_at <= request.to)
            .cloned()
            .collect();
        Ok(Page {
            items,
            next_cursor: self.fail_second_page.then(|| "page-2".to_string()),
            skipped: 0,
        })
    }
}

/// Serves one item per page in listing order, with items tagged by query.
/// While `broken` is set, the request for page `fail_page` of `fail_query`
/// answers with an error.
struct PagedTimeline {
    items: Vec<(&'static str, NewRawItem)>,
    order: ListingOrder,
    fail_query: &'static str,
    fail_page: usize,
    broken: AtomicBool,
}

impl PagedTimeline {
    fn new(
        items: Vec<(&'static str, NewRawItem)>,
        order: ListingOrder,
        fail_query: &'static str,
        fail_page: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            items,
            order,
            fail_query,
            fail_page,
            broken: AtomicBool::new(true),
        })
    }

    fn repair(&self) {
        self.broken.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContentProvider for PagedTimeline {
    fn source(&self) -> SourceId {
        SourceId::Mastodon
    }

    fn order(&self) -> ListingOrder {
        self.order
    }

    async fn fetch_page(&self, request: &PageRequest<'_>) -> Result<Page, ProviderError> {
        let index: usize = request.cursor.map_or(0, |c| c.parse().unwrap());
        if self.broken.load(Ordering::SeqCst)
            && request.query == self.fail_query
            && index == self.fail_page
        {
            return Err(ProviderError::Status {
                provider: "mastodon",
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        let mut listed: Vec<NewRawItem> = self
            .items
            .iter()
            .filter(|(query, item)| {
                *query == request.query
                    && item.published_at >= request.from
                    && item.published_at <= request.to
            })
            .map(|(_, item)| item.clone())
            .collect();
        listed.sort_by_key(|item| item.published_at);
        if self.order == ListingOrder::NewestFirst {
            listed.reverse();
        }
        Ok(Page {
            items: listed.get(index).cloned().into_iter().collect(),
            next_cursor: (index + 1 < listed.len()).then(|| (index + 1).to_string()),
            skipped: 0,
        })
    }
}

/// Labels everything positive; used to show stored labels never change.
struct AlwaysPositive;

#[async_trait]
impl Classifier for AlwaysPositive {
    fn name(&self) -> &'static str {
        "always-positive"
    }

    async fn classify_batch(
        &self,
        texts: &[&str],
    ) -> Result<Vec<Option<Classification>>, SentimentError> {
        Ok(texts
            .iter()
            .map(|_| {
                Some(Classification {
                    label: SentimentLabel::Positive,
                    score: 1.0,
                })
            })
            .collect())
    }
}

fn build(
    pool: &SqlitePool,
    provider: Arc<dyn ContentProvider>,
    classifier: Arc<dyn Classifier>,
) -> Pipeline {
    build_with(pool, provider, classifier, mastodon_settings())
}

fn build_with(
    pool: &SqlitePool,
    provider: Arc<dyn ContentProvider>,
    classifier: Arc<dyn Classifier>,
    settings: SourceSettings,
) -> Pipeline {
    let mut providers: HashMap<SourceId, Arc<dyn ContentProvider>> = HashMap::new();
    providers.insert(SourceId::Mastodon, provider);
    let services = Services {
        providers,
        classifier,
        extractor: Arc::new(Extractor::new("nuclear", None, Duration::ZERO).unwrap()),
    };
    Pipeline::new(
        pool.clone(),
        SourcesFile {
            sources: vec![settings],
        },
        services,
        PipelineOptions::default(),
    )
}

async fn setup(provider: Arc<dyn ContentProvider>) -> (SqlitePool, Pipeline) {
    let pool = nucsent_db::connect_in_memory().await.unwrap();
    let pipeline = build(&pool, provider, Arc::new(LexiconClassifier));
    (pool, pipeline)
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn first_run_fetches_extracts_and_labels() {
    let provider = ScriptedProvider::new(corpus());
    let (_pool, pipeline) = setup(provider.clone()).await;

    let report = pipeline
        .ensure_up_to_date_at(SourceId::Mastodon, false, now())
        .await
        .unwrap();

    let FetchOutcome::Completed { window, stats } = &report.fetch else {
        panic!("expected a completed fetch, got {:?}", report.fetch);
    };
    assert_eq!(window.from, at(2023, 6, 15, 12));
    assert_eq!(window.to, now());
    assert_eq!(stats.inserted, 3);
    assert_eq!(report.extraction.processed, 3);
    assert_eq!(report.extraction.units, 3);
    assert_eq!(report.labeling.labeled, 3);
    assert_eq!(report.latest_before, None);
    assert_eq!(report.latest_after, Some(at(2024, 6, 14, 12)));
}

#[tokio::test]
async fn only_the_keyword_sentence_becomes_a_unit() {
    let provider = ScriptedProvider::new(corpus());
    let (_pool, pipeline) = setup(provider).await;
    pipeline
        .ensure_up_to_date_at(SourceId::Mastodon, false, now())
        .await
        .unwrap();

    let recent = pipeline.get_recent(SourceId::Mastodon, 10).await.unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].published_at, at(2024, 6, 14, 12));

    let solar = recent
        .iter()
        .find(|i| i.body.starts_with("Solar"))
        .expect("solar post is stored");
    assert_eq!(solar.units.len(), 1);
    assert_eq!(solar.units[0].text, "Nuclear power is risky.");
    assert_eq!(solar.units[0].label, Some(SentimentLabel::Negative));
    assert_eq!(solar.engagement.likes, Some(4));
}

#[tokio::test]
async fn fresh_store_skips_the_fetch_unless_forced() {
    let provider = ScriptedProvider::new(corpus());
    let (_pool, pipeline) = setup(provider.clone()).await;
    pipeline
        .ensure_up_to_date_at(SourceId::Mastodon, false, now())
        .await
        .unwrap();
    assert_eq!(provider.request_count(), 1);

    let skipped = pipeline
        .ensure_up_to_date_at(SourceId::Mastodon, false, now())
        .await
        .unwrap();
    assert_eq!(
        skipped.fetch,
        FetchOutcome::Skipped {
            latest: at(2024, 6, 14, 12)
        }
    );
    assert_eq!(provider.request_count(), 1);

    let forced = pipeline
        .ensure_up_to_date_at(SourceId::Mastodon, true, now())
        .await
        .unwrap();
    assert_eq!(provider.request_count(), 2);
    let FetchOutcome::Completed { window, stats } = forced.fetch else {
        panic!("expected a completed fetch");
    };
    assert_eq!(window.from, at(2024, 6, 14, 12));
    assert_eq!(stats.inserted, 0);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(forced.latest_after, forced.latest_before);
}

#[tokio::test]
async fn boundary_never_moves_backwards() {
    let (pool, pipeline) = setup(ScriptedProvider::new(corpus())).await;
    let settings = mastodon_settings();

    let before = latest_boundary(&pool, &settings, now()).await.unwrap();
    assert_eq!(before, at(2023, 6, 15, 12));
    pipeline
        .ensure_up_to_date_at(SourceId::Mastodon, false, now())
        .await
        .unwrap();
    let after = latest_boundary(&pool, &settings, now()).await.unwrap();
    assert!(after >= before);
    assert_eq!(after, at(2024, 6, 14, 12));
}

#[tokio::test]
async fn rerunning_never_duplicates_items() {
    let provider = ScriptedProvider::new(corpus());
    let (pool, pipeline) = setup(provider).await;
    for _ in 0..3 {
        pipeline
            .ensure_up_to_date_at(SourceId::Mastodon, true, now())
            .await
            .unwrap();
    }
    assert_eq!(
        nucsent_db::count_items(&pool, SourceId::Mastodon)
            .await
            .unwrap(),
        3
    );
    let metrics = pipeline.get_metrics(SourceId::Mastodon).await.unwrap();
    assert_eq!(metrics.total, 3);
}

#[tokio::test]
async fn concurrent_runs_for_one_source_are_serialized() {
    let provider = ScriptedProvider::new(corpus());
    let (pool, pipeline) = setup(provider).await;
    let (a, b) = tokio::join!(
        pipeline.ensure_up_to_date_at(SourceId::Mastodon, true, now()),
        pipeline.ensure_up_to_date_at(SourceId::Mastodon, true, now()),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.extraction.units + b.extraction.units, 3);
    assert_eq!(
        nucsent_db::count_items(&pool, SourceId::Mastodon)
            .await
            .unwrap(),
        3
    );
}

#[tokio::test]
async fn empty_window_makes_no_provider_call() {
    let boundary = at(2024, 6, 1, 0);
    let provider = ScriptedProvider::new(vec![post("1", boundary, "Nuclear is safe.")]);
    let (_pool, pipeline) = setup(provider.clone()).await;
    pipeline
        .ensure_up_to_date_at(SourceId::Mastodon, true, at(2024, 6, 2, 0))
        .await
        .unwrap();
    assert_eq!(provider.request_count(), 1);

    let report = pipeline
        .ensure_up_to_date_at(SourceId::Mastodon, true, boundary)
        .await
        .unwrap();
    let FetchOutcome::Completed { window, stats } = report.fetch else {
        panic!("expected a completed fetch");
    };
    assert!(window.is_empty());
    assert_eq!(stats.pages, 0);
    assert_eq!(stats.inserted, 0);
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn provider_failure_is_reported_and_partial_rows_are_kept() {
    let provider = ScriptedProvider::failing(corpus());
    let (pool, pipeline) = setup(provider).await;

    let report = pipeline
        .ensure_up_to_date_at(SourceId::Mastodon, false, now())
        .await
        .unwrap();
    let FetchOutcome::Failed { error, .. } = &report.fetch else {
        panic!("expected a failed fetch, got {:?}", report.fetch);
    };
    assert!(error.contains("rate limit"));
    assert_eq!(
        nucsent_db::count_items(&pool, SourceId::Mastodon)
            .await
            .unwrap(),
        3
    );
    assert_eq!(report.extraction.processed, 3);
    assert_eq!(report.labeling.labeled, 3);
}

async fn stored_items(pool: &SqlitePool) -> i64 {
    nucsent_db::count_items(pool, SourceId::Mastodon).await.unwrap()
}

fn tagged(query: &'static str, items: Vec<NewRawItem>) -> Vec<(&'static str, NewRawItem)> {
    items.into_iter().map(|item| (query, item)).collect()
}

#[tokio::test]
async fn newest_first_failure_stores_nothing_past_the_gap() {
    let provider = PagedTimeline::new(
        tagged("nuclear", corpus()),
        ListingOrder::NewestFirst,
        "nuclear",
        1,
    );
    let (pool, pipeline) = setup(provider.clone()).await;

    let first = pipeline
        .ensure_up_to_date_at(SourceId::Mastodon, false, now())
        .await
        .unwrap();
    assert!(matches!(first.fetch, FetchOutcome::Failed { .. }));
    assert_eq!(stored_items(&pool).await, 0);
    assert_eq!(first.latest_after, None);

    provider.repair();
    let retry = pipeline
        .ensure_up_to_date_at(SourceId::Mastodon, true, now())
        .await
        .unwrap();
    let FetchOutcome::Completed { window, stats } = &retry.fetch else {
        panic!("expected a completed fetch, got {:?}", retry.fetch);
    };
    assert_eq!(window.from, at(2023, 6, 15, 12));
    assert_eq!(stats.inserted, 3);
    assert_eq!(stored_items(&pool).await, 3);
}

#[tokio::test]
async fn oldest_first_failure_keeps_the_listed_prefix() {
    let provider = PagedTimeline::new(
        tagged("nuclear", corpus()),
        ListingOrder::OldestFirst,
        "nuclear",
        2,
    );
    let (pool, pipeline) = setup(provider.clone()).await;

    let first = pipeline
        .ensure_up_to_date_at(SourceId::Mastodon, false, now())
        .await
        .unwrap();
    assert!(matches!(first.fetch, FetchOutcome::Failed { .. }));
    assert_eq!(stored_items(&pool).await, 2);
    assert_eq!(first.latest_after, Some(at(2024, 5, 20, 9)));

    provider.repair();
    let retry = pipeline
        .ensure_up_to_date_at(SourceId::Mastodon, true, now())
        .await
        .unwrap();
    let FetchOutcome::Completed { window, stats } = &retry.fetch else {
        panic!("expected a completed fetch, got {:?}", retry.fetch);
    };
    assert_eq!(window.from, at(2024, 5, 20, 9));
    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(stored_items(&pool).await, 3);
}

#[tokio::test]
async fn one_failing_query_holds_back_the_others() {
    let corpus = corpus();
    let mut items = tagged("nuclear", vec![corpus[0].clone(), corpus[2].clone()]);
    items.extend(tagged("reactor", vec![corpus[1].clone()]));
    let provider = PagedTimeline::new(items, ListingOrder::OldestFirst, "reactor", 0);
    let pool = nucsent_db::connect_in_memory().await.unwrap();
    let settings = SourceSettings {
        queries: vec!["nuclear".to_string(), "reactor".to_string()],
        ..mastodon_settings()
    };
    let pipeline = build_with(&pool, provider.clone(), Arc::new(LexiconClassifier), settings);

    let first = pipeline
        .ensure_up_to_date_at(SourceId::Mastodon, false, now())
        .await
        .unwrap();
    assert!(matches!(first.fetch, FetchOutcome::Failed { .. }));
    assert_eq!(stored_items(&pool).await, 0);

    provider.repair();
    let retry = pipeline
        .ensure_up_to_date_at(SourceId::Mastodon, true, now())
        .await
        .unwrap();
    assert!(matches!(retry.fetch, FetchOutcome::Completed { .. }));
    assert_eq!(stored_items(&pool).await, 3);
}

#[tokio::test]
async fn oldest_first_page_cap_defers_the_rest_to_the_next_run() {
    let provider = PagedTimeline::new(
        tagged("nuclear", corpus()),
        ListingOrder::OldestFirst,
        "none",
        0,
    );
    let pool = nucsent_db::connect_in_memory().await.unwrap();
    let settings = SourceSettings {
        page_cap: 2,
        ..mastodon_settings()
    };
    let pipeline = build_with(&pool, provider, Arc::new(LexiconClassifier), settings);

    let first = pipeline
        .ensure_up_to_date_at(SourceId::Mastodon, false, now())
        .await
        .unwrap();
    let FetchOutcome::Completed { stats, .. } = &first.fetch else {
        panic!("expected a completed fetch, got {:?}", first.fetch);
    };
    assert_eq!(stats.inserted, 2);
    assert_eq!(first.latest_after, Some(at(2024, 5, 20, 9)));

    pipeline
        .ensure_up_to_date_at(SourceId::Mastodon, true, now())
        .await
        .unwrap();
    assert_eq!(stored_items(&pool).await, 3);
}

#[tokio::test]
async fn stored_labels_are_never_overwritten() {
    let provider = ScriptedProvider::new(corpus());
    let (pool, pipeline) = setup(provider.clone()).await;
    pipeline
        .ensure_up_to_date_at(SourceId::Mastodon, false, now())
        .await
        .unwrap();

    let relabeling = build(&pool, provider, Arc::new(AlwaysPositive));
    let stats = relabeling.label(SourceId::Mastodon).await.unwrap();
    assert_eq!(stats.labeled, 0);

    let report = relabeling
        .ensure_up_to_date_at(SourceId::Mastodon, true, now())
        .await
        .unwrap();
    assert_eq!(report.labeling.labeled, 0);

    let metrics = relabeling.get_metrics(SourceId::Mastodon).await.unwrap();
    assert_eq!((metrics.positive, metrics.negative), (2, 1));
}

#[tokio::test]
async fn unconfigured_source_is_rejected() {
    let (_pool, pipeline) = setup(ScriptedProvider::new(Vec::new())).await;
    let err = pipeline
        .ensure_up_to_date_at(SourceId::Guardian, false, now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::SourceNotConfigured(SourceId::Guardian)
    ));
    assert!(matches!(
        pipeline
            .get_period_stats_at(SourceId::Guardian, None, now())
            .await,
        Err(PipelineError::SourceNotConfigured(_))
    ));
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

async fn populated() -> Pipeline {
    let (_pool, pipeline) = setup(ScriptedProvider::new(corpus())).await;
    pipeline
        .ensure_up_to_date_at(SourceId::Mastodon, false, now())
        .await
        .unwrap();
    pipeline
}

#[tokio::test]
async fn metrics_count_labels_and_average_engagement() {
    let pipeline = populated().await;
    let metrics = pipeline.get_metrics(SourceId::Mastodon).await.unwrap();
    assert_eq!(metrics.total, 3);
    assert_eq!(metrics.positive, 2);
    assert_eq!(metrics.negative, 1);
    assert_eq!(metrics.neutral, 0);
    assert_eq!(metrics.pending, 0);
    assert_eq!(metrics.items, 3);
    assert_eq!(metrics.engagement.avg_likes, Some(4.0));
    assert_eq!(metrics.engagement.avg_reposts, None);
    assert_eq!(metrics.engagement.verified_percent, Some(50.0));
}

#[tokio::test]
async fn metrics_on_an_empty_store_are_zero() {
    let (_pool, pipeline) = setup(ScriptedProvider::new(Vec::new())).await;
    let metrics = pipeline.get_metrics(SourceId::Mastodon).await.unwrap();
    assert_eq!((metrics.total, metrics.pending, metrics.items), (0, 0, 0));
}

#[tokio::test]
async fn period_stats_cover_the_trailing_window() {
    let pipeline = populated().await;

    let monthly = pipeline
        .get_period_stats_at(SourceId::Mastodon, None, now())
        .await
        .unwrap();
    assert_eq!(monthly.start, at(2023, 7, 1, 0));
    assert_eq!(monthly.buckets.len(), 12);

    let bimonthly = pipeline
        .get_period_stats_at(SourceId::Mastodon, Some(BucketWidth::Months(2)), now())
        .await
        .unwrap();
    assert_eq!(bimonthly.buckets.len(), 6);
    let last = bimonthly.buckets.last().unwrap();
    assert_eq!(last.start, at(2024, 5, 1, 0));
    assert_eq!((last.total, last.positive, last.items), (3, 2, 3));
    assert_eq!(bimonthly.buckets.iter().map(|b| b.total).sum::<i64>(), 3);
}

#[tokio::test]
async fn month_stats_select_one_calendar_month() {
    let pipeline = populated().await;

    let june = pipeline
        .get_month_stats_at(SourceId::Mastodon, 0, now())
        .await
        .unwrap();
    assert_eq!((june.total, june.positive), (1, 1));

    let may = pipeline
        .get_month_stats_at(SourceId::Mastodon, 1, now())
        .await
        .unwrap();
    assert_eq!((may.total, may.positive, may.negative), (2, 1, 1));
    assert_eq!(may.end, at(2024, 6, 1, 0));

    let err = pipeline
        .get_month_stats_at(SourceId::Mastodon, 13, now())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidArgument(_)));
}

#[tokio::test]
async fn top_terms_are_grouped_by_label_without_the_keyword() {
    let pipeline = populated().await;
    let terms = pipeline
        .get_top_terms_at(SourceId::Mastodon, None, None, now())
        .await
        .unwrap();

    assert_eq!(terms.positive[0].term, "safe");
    assert_eq!(terms.positive[0].count, 2);
    let negative: Vec<&str> = terms.negative.iter().map(|t| t.term.as_str()).collect();
    assert_eq!(negative, vec!["power", "risky"]);
    assert!(terms.neutral.is_empty());
    assert!(terms
        .positive
        .iter()
        .chain(&terms.negative)
        .all(|t| t.term != "nuclear" && t.term != "is"));

    let limited = pipeline
        .get_top_terms_at(SourceId::Mastodon, None, Some(1), now())
        .await
        .unwrap();
    assert_eq!(limited.positive.len(), 1);

    let err = pipeline
        .get_top_terms_at(SourceId::Mastodon, Some(0), None, now())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidArgument(_)));
}

#[tokio::test]
async fn purge_removes_placeholder_items() {
    let mut items = corpus();
    items.push(post("4", at(2024, 5, 3, 9), "Not related."));
    let (pool, pipeline) = setup(ScriptedProvider::new(items)).await;
    let report = pipeline
        .ensure_up_to_date_at(SourceId::Mastodon, false, now())
        .await
        .unwrap();
    assert_eq!(report.extraction.no_relevant_content, 1);

    let purged = pipeline
        .purge_placeholders(SourceId::Mastodon)
        .await
        .unwrap();
    assert_eq!((purged.items, purged.units), (1, 0));
    assert_eq!(
        nucsent_db::count_items(&pool, SourceId::Mastodon)
            .await
            .unwrap(),
        3
    );
}
