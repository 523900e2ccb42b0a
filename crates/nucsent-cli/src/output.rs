//! Table and JSON rendering for command results.

use nucsent_core::SourceId;
use nucsent_db::PurgeStats;
use nucsent_sentiment::{
    BucketCounts, FetchOutcome, LabelStats, Metrics, RecentItem, RunReport, TermCount, TimeSeries,
    TopTerms,
};
use serde::Serialize;

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn percent(part: i64, total: i64) -> String {
    if total == 0 {
        return "-".to_string();
    }
    #[allow(clippy::cast_precision_loss)]
    let pct = part as f64 * 100.0 / total as f64;
    format!("{pct:.1}%")
}

fn average(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"))
}

pub(crate) fn print_run_report(report: &RunReport, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(report);
    }
    let fetch = match &report.fetch {
        FetchOutcome::Skipped { latest } => {
            format!("skipped (latest item {})", latest.format("%Y-%m-%d %H:%M"))
        }
        FetchOutcome::Completed { stats, .. } => format!(
            "{} new, {} duplicate, {} skipped, {} deferred over {} pages",
            stats.inserted, stats.duplicates, stats.skipped, stats.deferred, stats.pages
        ),
        FetchOutcome::Failed { error, .. } => format!("FAILED: {error}"),
    };
    println!("{}", report.source);
    println!("  fetch:    {fetch}");
    println!(
        "  extract:  {} items, {} units, {} without relevant content, {} failed",
        report.extraction.processed,
        report.extraction.units,
        report.extraction.no_relevant_content,
        report.extraction.failed
    );
    println!(
        "  label:    {} labeled, {} already labeled, {} failed",
        report.labeling.labeled, report.labeling.skipped, report.labeling.failed
    );
    Ok(())
}

pub(crate) fn print_label_stats(
    source: SourceId,
    stats: &LabelStats,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        return print_json(&serde_json::json!({ "source": source, "labeling": stats }));
    }
    println!(
        "{source}: {} labeled, {} already labeled, {} failed",
        stats.labeled, stats.skipped, stats.failed
    );
    Ok(())
}

pub(crate) fn print_recent(
    source: SourceId,
    items: &[RecentItem],
    json: bool,
) -> anyhow::Result<()> {
    if json {
        return print_json(items);
    }
    if items.is_empty() {
        println!("no items stored for {source}; run `nucsent ingest --source {source}` first");
        return Ok(());
    }
    for item in items {
        let heading = item
            .title
            .as_deref()
            .or(item.author.as_deref())
            .unwrap_or("(untitled)");
        println!(
            "{}  {heading}",
            item.published_at.format("%Y-%m-%d %H:%M")
        );
        if let Some(url) = &item.url {
            println!("  {url}");
        }
        for unit in &item.units {
            let label = unit.label.map_or("pending", |l| l.as_str());
            println!("  [{label:<8}] {}", unit.text);
        }
    }
    Ok(())
}

pub(crate) fn print_metrics(metrics: &Metrics, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(metrics);
    }
    println!("{:<12}{:>8}{:>9}", "LABEL", "UNITS", "SHARE");
    for (name, count) in [
        ("negative", metrics.negative),
        ("neutral", metrics.neutral),
        ("positive", metrics.positive),
    ] {
        println!("{name:<12}{count:>8}{:>9}", percent(count, metrics.total));
    }
    println!("{:<12}{:>8}", "total", metrics.total);
    println!("{:<12}{:>8}", "pending", metrics.pending);
    println!();
    println!(
        "{} items; avg likes {}, comments {}, reposts {}",
        metrics.items,
        average(metrics.engagement.avg_likes),
        average(metrics.engagement.avg_comments),
        average(metrics.engagement.avg_reposts)
    );
    if let Some(verified) = metrics.engagement.verified_percent {
        println!("{verified:.1}% of authors verified");
    }
    Ok(())
}

fn print_bucket_row(bucket: &BucketCounts) {
    println!(
        "{:<12}{:>6}{:>9}{:>9}{:>9}{:>9}{:>9}",
        bucket.start.format("%Y-%m-%d"),
        bucket.items,
        bucket.negative,
        bucket.neutral,
        bucket.positive,
        bucket.total,
        bucket.pending
    );
}

fn print_bucket_header() {
    println!(
        "{:<12}{:>6}{:>9}{:>9}{:>9}{:>9}{:>9}",
        "FROM", "ITEMS", "NEG", "NEU", "POS", "TOTAL", "PENDING"
    );
}

pub(crate) fn print_series(
    source: SourceId,
    series: &TimeSeries,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        return print_json(series);
    }
    println!(
        "{source}: {} buckets of {} from {}",
        series.buckets.len(),
        series.bucket,
        series.start.format("%Y-%m-%d")
    );
    print_bucket_header();
    for bucket in &series.buckets {
        print_bucket_row(bucket);
    }
    Ok(())
}

pub(crate) fn print_month(
    source: SourceId,
    offset: u32,
    counts: &BucketCounts,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        return print_json(counts);
    }
    println!("{source}: {} (offset {offset})", counts.start.format("%B %Y"));
    print_bucket_header();
    print_bucket_row(counts);
    Ok(())
}

fn print_term_column(name: &str, terms: &[TermCount]) {
    println!("{name}:");
    if terms.is_empty() {
        println!("  (none)");
    }
    for term in terms {
        println!("  {:<24}{:>6}", term.term, term.count);
    }
}

pub(crate) fn print_terms(source: SourceId, terms: &TopTerms, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(terms);
    }
    println!("{source}: top terms");
    print_term_column("negative", &terms.negative);
    print_term_column("neutral", &terms.neutral);
    print_term_column("positive", &terms.positive);
    Ok(())
}

pub(crate) fn print_purge(source: SourceId, stats: &PurgeStats, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&serde_json::json!({ "source": source, "purged": stats }));
    }
    println!(
        "{source}: removed {} placeholder items and {} placeholder units",
        stats.items, stats.units
    );
    Ok(())
}
