//! Weighted lexicon scorer for nuclear-energy discourse.

/// Domain-specific word weights.
///
/// Keys are lowercase single words. Values in `(0.0, 1.0]` are positive,
/// in `[-1.0, 0.0)` are negative. The final score is clamped to `[-1.0, 1.0]`.
pub(crate) const LEXICON: &[(&str, f32)] = &[
    // Positive signals
    ("clean", 0.4),
    ("safe", 0.4),
    ("safer", 0.4),
    ("safest", 0.5),
    ("reliable", 0.4),
    ("carbon-free", 0.5),
    ("zero-carbon", 0.5),
    ("low-carbon", 0.4),
    ("affordable", 0.3),
    ("efficient", 0.3),
    ("innovation", 0.3),
    ("innovative", 0.3),
    ("breakthrough", 0.5),
    ("growing", 0.3),
    ("growth", 0.3),
    ("support", 0.3),
    ("supports", 0.3),
    ("approved", 0.4),
    ("restart", 0.3),
    ("promising", 0.4),
    ("benefit", 0.3),
    ("benefits", 0.3),
    ("good", 0.3),
    ("great", 0.4),
    ("excellent", 0.5),
    ("success", 0.4),
    ("successful", 0.4),
    ("improved", 0.3),
    // Negative signals
    ("risky", -0.5),
    ("risk", -0.3),
    ("risks", -0.3),
    ("dangerous", -0.6),
    ("danger", -0.5),
    ("disaster", -0.7),
    ("catastrophe", -0.7),
    ("catastrophic", -0.7),
    ("meltdown", -0.7),
    ("accident", -0.5),
    ("leak", -0.5),
    ("leaks", -0.5),
    ("radiation", -0.3),
    ("contamination", -0.6),
    ("contaminated", -0.6),
    ("toxic", -0.6),
    ("waste", -0.3),
    ("expensive", -0.4),
    ("costly", -0.4),
    ("overrun", -0.4),
    ("overruns", -0.4),
    ("delay", -0.3),
    ("delays", -0.3),
    ("delayed", -0.3),
    ("shutdown", -0.4),
    ("protest", -0.4),
    ("protests", -0.4),
    ("oppose", -0.4),
    ("opposition", -0.4),
    ("fear", -0.4),
    ("fears", -0.4),
    ("threat", -0.5),
    ("weapon", -0.4),
    ("weapons", -0.4),
    ("bad", -0.4),
    ("worst", -0.6),
    ("failed", -0.4),
    ("failure", -0.4),
];

/// Scores strictly above this are positive, strictly below its negation
/// negative, everything else neutral.
pub(crate) const NEUTRAL_BAND: f32 = 0.1;

/// Score a text string using the domain lexicon.
///
/// Splits text into lowercase words, sums matching weights, and clamps
/// the result to `[-1.0, 1.0]`. Returns `0.0` for empty or unknown text.
#[must_use]
pub fn lexicon_score(text: &str) -> f32 {
    let mut score = 0.0_f32;
    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if let Some(&(_, weight)) = LEXICON.iter().find(|(lex_word, _)| *lex_word == w) {
            score += weight;
        }
    }
    score.clamp(-1.0, 1.0)
}
