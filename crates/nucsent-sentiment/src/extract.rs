//! Topical sentence extraction.
//!
//! Two passes run over each body and their results are unioned:
//!
//! 1. A deterministic keyword pass that returns every sentence containing
//!    the keyword as a whole word, case-insensitively. It never misses.
//! 2. An optional model-assisted pass that asks a chat model to quote the
//!    relevant sentences verbatim. Anything it returns that is not a verbatim
//!    substring of the body, or too short to be a sentence, is discarded.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use nucsent_core::{ItemStatus, SourceId};
use nucsent_db::DbError;
use regex::Regex;
use sqlx::SqlitePool;

use crate::error::SentimentError;
use crate::llm::ChatClient;

const ITEM_PAGE: i64 = 100;

/// Sentinel the model is told to answer with when nothing is relevant.
const NONE_SENTINEL: &str = "none";

fn extraction_prompt(keyword: &str) -> String {
    format!(
        "This project is for academic research on public discussion of {keyword} topics.\n\
         Extract only single, stand-alone sentences from the user's text that either:\n\
         1. contain the word '{keyword}' or one of its variants (every such sentence must be \
         extracted, with no exceptions), or\n\
         2. directly discuss {keyword} power, safety, waste, policy or technology.\n\
         \n\
         Rules:\n\
         - Copy each sentence exactly as it appears, with original punctuation and spacing.\n\
         - Do not summarize, paraphrase, modify or generate new content.\n\
         - Do not return loosely related sentences about general energy, environment or economy.\n\
         - Return one sentence per line.\n\
         - If nothing qualifies, return 'None'."
    )
}

// ---------------------------------------------------------------------------
// Deterministic pass
// ---------------------------------------------------------------------------

/// Finds keyword-bearing sentences. A sentence ends at `.`, `!`, `?` or a
/// line break.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keyword: String,
    sentence: Regex,
}

impl KeywordMatcher {
    /// # Errors
    ///
    /// Returns [`SentimentError::Pattern`] if the pattern cannot be compiled.
    pub fn new(keyword: &str) -> Result<Self, SentimentError> {
        let keyword = keyword.trim().to_lowercase();
        let sentence = Regex::new(&format!(
            r"(?im)[^.?!\n]*\b{}\b[^.?!\n]*(?:[.?!]+|$)",
            regex::escape(&keyword)
        ))?;
        Ok(Self { keyword, sentence })
    }

    #[must_use]
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Every trimmed, non-empty sentence of `body` containing the keyword.
    #[must_use]
    pub fn sentences(&self, body: &str) -> BTreeSet<String> {
        self.sentence
            .find_iter(body)
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Model-assisted pass
// ---------------------------------------------------------------------------

/// Shortest model quote stored as a unit.
const MIN_UNIT_WORDS: usize = 3;

/// Titles and short forms whose trailing `.` does not end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "st", "jr", "sr", "vs", "etc", "inc", "ltd", "co",
    "corp", "gov", "sen", "rep", "gen", "approx", "dept",
];

/// Whether the whitespace-delimited `token` ending in `.` is an abbreviation
/// rather than the end of a sentence: a listed short form, a single letter,
/// or a dotted initialism such as `U.S.`.
fn is_abbreviation(token: &str) -> bool {
    let Some(stem) = token.strip_suffix('.') else {
        return false;
    };
    let stem = stem.trim_start_matches(|c: char| !c.is_alphanumeric());
    if stem.contains('.') {
        return true;
    }
    let mut chars = stem.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return c.is_alphabetic();
    }
    ABBREVIATIONS
        .iter()
        .any(|abbr| stem.eq_ignore_ascii_case(abbr))
}

/// Split one line at whitespace following `.`, `!` or `?`, except after an
/// abbreviation.
fn split_line(line: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut token_start = 0;
    let mut prev: Option<char> = None;
    for (idx, ch) in line.char_indices() {
        if ch.is_whitespace() {
            let token = &line[token_start..idx];
            let terminal = matches!(prev, Some('.' | '!' | '?'));
            if terminal && !(prev == Some('.') && is_abbreviation(token)) {
                out.push(&line[start..idx]);
                start = idx;
            }
            token_start = idx + ch.len_utf8();
        }
        prev = Some(ch);
    }
    out.push(&line[start..]);
    out
}

fn clean(candidate: &str) -> &str {
    candidate.trim().trim_start_matches('-').trim()
}

/// Fragments such as `Dr.` or a lone keyword are not sentences.
fn is_sentence(candidate: &str) -> bool {
    candidate
        .split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .count()
        >= MIN_UNIT_WORDS
}

/// Split a model reply into candidate sentences, one per line. A line is
/// split further only when it is not itself a verbatim sentence of `body`.
/// List dashes are stripped; the `None` sentinel and fragments that do not
/// read as sentences are dropped.
pub(crate) fn split_reply(reply: &str, body: &str) -> Vec<String> {
    let mut out = Vec::new();
    for line in reply.lines() {
        let whole = clean(line);
        if whole.is_empty() || is_none_sentinel(whole) {
            continue;
        }
        if body.contains(whole) && is_sentence(whole) {
            out.push(whole.to_string());
            continue;
        }
        out.extend(
            split_line(whole)
                .into_iter()
                .map(clean)
                .filter(|s| !s.is_empty() && !is_none_sentinel(s))
                .filter(|s| is_sentence(s))
                .map(str::to_string),
        );
    }
    out
}

fn is_none_sentinel(s: &str) -> bool {
    s.trim_matches(|c: char| !c.is_alphanumeric())
        .eq_ignore_ascii_case(NONE_SENTINEL)
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

pub struct Extractor {
    matcher: KeywordMatcher,
    model: Option<Arc<ChatClient>>,
    prompt: String,
    model_delay: Duration,
}

impl Extractor {
    /// `model` is `None` for keyword-only extraction.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Pattern`] if the keyword pattern cannot be
    /// compiled.
    pub fn new(
        keyword: &str,
        model: Option<Arc<ChatClient>>,
        model_delay: Duration,
    ) -> Result<Self, SentimentError> {
        let matcher = KeywordMatcher::new(keyword)?;
        let prompt = extraction_prompt(matcher.keyword());
        Ok(Self {
            matcher,
            model,
            prompt,
            model_delay,
        })
    }

    #[must_use]
    pub fn keyword(&self) -> &str {
        self.matcher.keyword()
    }

    #[must_use]
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    #[must_use]
    pub fn deterministic(&self, body: &str) -> BTreeSet<String> {
        self.matcher.sentences(body)
    }

    /// Sentences quoted by the model that occur verbatim in `body`.
    ///
    /// Model failures are logged and contribute nothing.
    pub async fn model_assisted(&self, body: &str) -> BTreeSet<String> {
        let Some(model) = &self.model else {
            return BTreeSet::new();
        };
        let reply = match model.complete(&self.prompt, body, None).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "model extraction failed; using keyword pass only");
                return BTreeSet::new();
            }
        };

        let mut kept = BTreeSet::new();
        for sentence in split_reply(&reply, body) {
            if body.contains(&sentence) {
                kept.insert(sentence);
            } else {
                tracing::debug!(sentence = %sentence, "discarding non-verbatim model sentence");
            }
        }
        kept
    }

    /// Union of both passes. `use_model = false` runs the keyword pass only.
    pub async fn extract(&self, body: &str, use_model: bool) -> BTreeSet<String> {
        let mut units = self.deterministic(body);
        if !use_model {
            return units;
        }
        units.extend(self.model_assisted(body).await);
        // A keyword match cut short at an abbreviation is covered by the
        // model's full quote.
        units
            .iter()
            .filter(|unit| {
                !units
                    .iter()
                    .any(|other| other.len() > unit.len() && other.contains(unit.as_str()))
            })
            .cloned()
            .collect()
    }
}

/// Outcome of one extraction stage run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ExtractStats {
    pub processed: usize,
    pub no_relevant_content: usize,
    pub units: usize,
    pub failed: usize,
}

/// Expand every `unprocessed` item of `source` into units.
///
/// Each item commits in its own transaction; an item that fails to commit
/// stays `unprocessed` and is retried by the next run. When the model pass
/// is on, `model_delay` is slept between model calls.
///
/// # Errors
///
/// Returns [`DbError`] only if listing pending items fails.
pub async fn extract_pending(
    pool: &SqlitePool,
    source: SourceId,
    extractor: &Extractor,
    use_model: bool,
) -> Result<ExtractStats, DbError> {
    let use_model = use_model && extractor.has_model();
    let mut stats = ExtractStats::default();
    let mut after_id = 0;
    let mut first_model_call = true;

    loop {
        let items = nucsent_db::list_items_by_status(
            pool,
            source,
            ItemStatus::Unprocessed,
            after_id,
            ITEM_PAGE,
        )
        .await?;
        let Some(last) = items.last() else { break };
        after_id = last.id;

        for item in &items {
            if use_model {
                if !first_model_call && !extractor.model_delay.is_zero() {
                    tokio::time::sleep(extractor.model_delay).await;
                }
                first_model_call = false;
            }
            let units: Vec<String> = extractor
                .extract(&item.body, use_model)
                .await
                .into_iter()
                .collect();

            match nucsent_db::record_extraction(pool, source, item.id, &units).await {
                Ok(ItemStatus::NoRelevantContent) => stats.no_relevant_content += 1,
                Ok(_) => {
                    stats.processed += 1;
                    stats.units += units.len();
                }
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(
                        source = %source,
                        item_id = item.id,
                        error = %e,
                        "failed to record extraction"
                    );
                }
            }
        }
    }

    tracing::info!(
        source = %source,
        processed = stats.processed,
        no_relevant_content = stats.no_relevant_content,
        units = stats.units,
        failed = stats.failed,
        "extraction stage complete"
    );
    Ok(stats)
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
