//! Most frequent terms per label.

use std::collections::HashMap;

use nucsent_core::SentimentLabel;
use serde::Serialize;

use crate::stopwords::is_stopword;

pub const DEFAULT_TOP_TERMS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermCount {
    pub term: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopTerms {
    pub negative: Vec<TermCount>,
    pub neutral: Vec<TermCount>,
    pub positive: Vec<TermCount>,
}

impl TopTerms {
    #[must_use]
    pub fn for_label(&self, label: SentimentLabel) -> &[TermCount] {
        match label {
            SentimentLabel::Negative => &self.negative,
            SentimentLabel::Neutral => &self.neutral,
            SentimentLabel::Positive => &self.positive,
        }
    }
}

/// Lowercased ASCII alphanumeric runs of length two or more, minus stop
/// words and `keyword`.
pub fn tokenize<'a>(text: &'a str, keyword: &'a str) -> impl Iterator<Item = String> + 'a {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() >= 2)
        .map(str::to_ascii_lowercase)
        .filter(move |t| t.as_str() != keyword && !is_stopword(t))
}

/// Rank tokens of `texts` by frequency, most frequent first; ties keep the
/// order in which terms were first seen.
pub fn rank_terms<'a>(
    texts: impl IntoIterator<Item = &'a str>,
    keyword: &str,
    limit: usize,
) -> Vec<TermCount> {
    let keyword = keyword.to_ascii_lowercase();
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let mut next_seen = 0usize;
    for text in texts {
        for token in tokenize(text, &keyword) {
            let entry = counts.entry(token).or_insert_with(|| {
                next_seen += 1;
                (0, next_seen)
            });
            entry.0 += 1;
        }
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(term, (count, first))| (term, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(term, count, _)| TermCount { term, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(ranked: &[TermCount]) -> Vec<&str> {
        ranked.iter().map(|t| t.term.as_str()).collect()
    }

    #[test]
    fn tokenize_drops_short_tokens_stopwords_and_keyword() {
        let tokens: Vec<String> =
            tokenize("The NUCLEAR plant's 2 reactors, X-ray and U235!", "nuclear").collect();
        assert_eq!(tokens, vec!["plant", "reactors", "ray", "u235"]);
    }

    #[test]
    fn ranking_is_by_count_then_first_seen() {
        let texts = [
            "waste storage costs",
            "storage waste",
            "reactor storage",
            "costs reactor",
        ];
        let ranked = rank_terms(texts, "nuclear", 10);
        assert_eq!(terms(&ranked), vec!["storage", "waste", "costs", "reactor"]);
        assert_eq!(ranked[0].count, 3);
    }

    #[test]
    fn limit_truncates() {
        let ranked = rank_terms(["alpha beta gamma delta"], "nuclear", 2);
        assert_eq!(terms(&ranked), vec!["alpha", "beta"]);
    }
}
