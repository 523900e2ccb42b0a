//! Sentiment classification strategies.
//!
//! Every strategy maps a batch of texts to one [`Classification`] per text,
//! or `None` for a text it could not classify (that unit stays unlabeled and
//! is retried by the next run).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nucsent_core::SentimentLabel;
use serde::{Deserialize, Serialize};

use crate::error::SentimentError;
use crate::llm::ChatClient;
use crate::scorer::{lexicon_score, NEUTRAL_BAND};

const TEI_SERVICE: &str = "tei";

const LABEL_PROMPT: &str = "You are a sentiment classifier for sentences about nuclear energy. \
     Classify the sentiment the sentence expresses toward its subject. \
     Respond with only one of: neutral, negative, or positive.";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub label: SentimentLabel,
    /// Confidence in `[0, 1]`.
    pub score: f64,
}

#[async_trait]
pub trait Classifier: Send + Sync {
    fn name(&self) -> &'static str;

    /// Classify `texts`, returning exactly one entry per input in order.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError`] when the whole batch failed.
    async fn classify_batch(
        &self,
        texts: &[&str],
    ) -> Result<Vec<Option<Classification>>, SentimentError>;
}

// ---------------------------------------------------------------------------
// TEI
// ---------------------------------------------------------------------------

/// Sequence-classification model served by Text Embeddings Inference.
pub struct TeiClassifier {
    http: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    inputs: &'a [&'a str],
    truncate: bool,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    score: f64,
    label: String,
}

/// Map a model label to the vocabulary. Accepts the names and the
/// `LABEL_<n>` ids of a three-class head ordered negative, neutral, positive.
fn map_model_label(raw: &str) -> Option<SentimentLabel> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "negative" | "label_0" | "neg" => Some(SentimentLabel::Negative),
        "neutral" | "label_1" | "neu" => Some(SentimentLabel::Neutral),
        "positive" | "label_2" | "pos" => Some(SentimentLabel::Positive),
        _ => None,
    }
}

impl TeiClassifier {
    /// # Errors
    ///
    /// Returns [`SentimentError::Http`] if the HTTP client cannot be built.
    pub fn new(tei_url: &str, timeout_secs: u64) -> Result<Self, SentimentError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            http,
            url: format!("{}/predict", tei_url.trim_end_matches('/')),
        })
    }

    fn pick(predictions: Vec<Prediction>) -> Option<Classification> {
        let best = predictions
            .into_iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))?;
        match map_model_label(&best.label) {
            Some(label) => Some(Classification {
                label,
                score: best.score,
            }),
            None => {
                tracing::warn!(label = %best.label, "unknown model label; storing neutral");
                Some(Classification {
                    label: SentimentLabel::Neutral,
                    score: 0.0,
                })
            }
        }
    }
}

#[async_trait]
impl Classifier for TeiClassifier {
    fn name(&self) -> &'static str {
        "tei"
    }

    async fn classify_batch(
        &self,
        texts: &[&str],
    ) -> Result<Vec<Option<Classification>>, SentimentError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .http
            .post(&self.url)
            .json(&PredictRequest {
                inputs: texts,
                truncate: true,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SentimentError::Status {
                service: TEI_SERVICE,
                status,
                body: body.chars().take(500).collect(),
            });
        }

        let body = response.text().await?;
        let predictions: Vec<Vec<Prediction>> =
            serde_json::from_str(&body).map_err(|e| SentimentError::Malformed {
                service: TEI_SERVICE,
                message: e.to_string(),
            })?;

        if predictions.len() != texts.len() {
            return Err(SentimentError::Malformed {
                service: TEI_SERVICE,
                message: format!(
                    "{} predictions for {} inputs",
                    predictions.len(),
                    texts.len()
                ),
            });
        }

        Ok(predictions.into_iter().map(Self::pick).collect())
    }
}

// ---------------------------------------------------------------------------
// Remote chat model
// ---------------------------------------------------------------------------

/// Chat model constrained to answer with a single label word.
pub struct LlmClassifier {
    chat: Arc<ChatClient>,
}

impl LlmClassifier {
    #[must_use]
    pub fn new(chat: Arc<ChatClient>) -> Self {
        Self { chat }
    }
}

/// In-vocabulary answers carry confidence 1.0; anything else is coerced to
/// neutral with confidence 0.0.
pub(crate) fn parse_label_reply(reply: &str) -> Classification {
    let word = reply
        .trim()
        .trim_matches(|c: char| !c.is_alphabetic())
        .to_ascii_lowercase();
    if let Ok(label) = word.parse::<SentimentLabel>() {
        return Classification { label, score: 1.0 };
    }
    tracing::warn!(reply = %reply, "label outside vocabulary; storing neutral");
    Classification {
        label: SentimentLabel::Neutral,
        score: 0.0,
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn classify_batch(
        &self,
        texts: &[&str],
    ) -> Result<Vec<Option<Classification>>, SentimentError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            match self.chat.complete(LABEL_PROMPT, text, Some(10)).await {
                Ok(reply) => out.push(Some(parse_label_reply(&reply))),
                Err(e) => {
                    tracing::warn!(model = %self.chat.model(), error = %e, "label request failed");
                    out.push(None);
                }
            }
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Lexicon
// ---------------------------------------------------------------------------

/// Offline classifier backed by [`lexicon_score`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LexiconClassifier;

impl LexiconClassifier {
    #[must_use]
    pub fn classify(text: &str) -> Classification {
        let score = lexicon_score(text);
        let label = if score > NEUTRAL_BAND {
            SentimentLabel::Positive
        } else if score < -NEUTRAL_BAND {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        };
        Classification {
            label,
            score: f64::from(0.5 + score.abs() / 2.0),
        }
    }
}

#[async_trait]
impl Classifier for LexiconClassifier {
    fn name(&self) -> &'static str {
        "lexicon"
    }

    async fn classify_batch(
        &self,
        texts: &[&str],
    ) -> Result<Vec<Option<Classification>>, SentimentError> {
        Ok(texts.iter().map(|t| Some(Self::classify(t))).collect())
    }
}
