//! Batch labeling of units that have no label yet.

use chrono::Utc;
use nucsent_core::SourceId;
use nucsent_db::DbError;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::classifier::Classifier;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelStats {
    pub labeled: usize,
    /// Units labeled by someone else between listing and writing.
    pub skipped: usize,
    /// Units left unlabeled because classification or the write failed.
    pub failed: usize,
}

/// Label every unlabeled unit of `source` in batches of `batch_size`.
///
/// Each label is written on its own with a `label IS NULL` guard, so a
/// failure part-way keeps earlier labels and a rerun never overwrites one.
///
/// # Errors
///
/// Returns [`DbError`] only if listing unlabeled units fails.
pub async fn label_pending(
    pool: &SqlitePool,
    source: SourceId,
    classifier: &dyn Classifier,
    batch_size: usize,
) -> Result<LabelStats, DbError> {
    let batch_size = batch_size.max(1);
    let limit = i64::try_from(batch_size).unwrap_or(i64::MAX);
    let mut stats = LabelStats::default();
    let mut after_id = 0;

    loop {
        let units = nucsent_db::list_unlabeled_units(pool, source, after_id, limit).await?;
        let Some(last) = units.last() else { break };
        after_id = last.id;

        let texts: Vec<&str> = units.iter().map(|u| u.text.as_str()).collect();
        let results = match classifier.classify_batch(&texts).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(
                    source = %source,
                    classifier = classifier.name(),
                    batch = units.len(),
                    error = %e,
                    "classification batch failed; units left unlabeled"
                );
                stats.failed += units.len();
                continue;
            }
        };

        stats.failed += units.len().saturating_sub(results.len());
        for (unit, result) in units.iter().zip(results) {
            let Some(classification) = result else {
                stats.failed += 1;
                continue;
            };
            match nucsent_db::set_unit_label(
                pool,
                source,
                unit.id,
                classification.label,
                classification.score,
                Utc::now(),
            )
            .await
            {
                Ok(true) => stats.labeled += 1,
                Ok(false) => stats.skipped += 1,
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(
                        source = %source,
                        unit_id = unit.id,
                        error = %e,
                        "failed to store label"
                    );
                }
            }
        }
    }

    tracing::info!(
        source = %source,
        classifier = classifier.name(),
        labeled = stats.labeled,
        skipped = stats.skipped,
        failed = stats.failed,
        "labeling stage complete"
    );
    Ok(stats)
}
