//! Class schemas and score mapping
//!
//! A pretrained classifier emits one probability per class in an order fixed by
//! the model. A [`ClassSchema`] declares which sentiment bucket each class
//! feeds, so star-rating, binary, and three-way models all collapse onto the
//! same negative / neutral / positive result.

use sentiment_core::{Error, ProbabilityVector, Result, SentimentBucket, SentimentResult};
use std::fmt;

use SentimentBucket::{Negative, Neutral, Positive};

/// Per-model class-to-bucket assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSchema {
    name: String,
    class_buckets: Vec<SentimentBucket>,
}

impl ClassSchema {
    /// 1-5 star ratings: 1-2 stars negative, 3 neutral, 4-5 positive
    pub fn star_rating() -> Self {
        Self {
            name: "star-rating".to_string(),
            class_buckets: vec![Negative, Negative, Neutral, Positive, Positive],
        }
    }

    /// Two-way polarity; neutral is always scored 0.0
    pub fn binary() -> Self {
        Self {
            name: "binary".to_string(),
            class_buckets: vec![Negative, Positive],
        }
    }

    /// Three-way polarity in negative, neutral, positive order
    pub fn polarity() -> Self {
        Self {
            name: "polarity".to_string(),
            class_buckets: vec![Negative, Neutral, Positive],
        }
    }

    /// Explicit assignment, one bucket per model class in output order
    pub fn custom(class_buckets: Vec<SentimentBucket>) -> Result<Self> {
        if class_buckets.is_empty() {
            return Err(Error::config("class schema must declare at least one class"));
        }

        Ok(Self {
            name: "custom".to_string(),
            class_buckets,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of probabilities the model must emit
    pub fn expected_classes(&self) -> usize {
        self.class_buckets.len()
    }

    pub fn class_buckets(&self) -> &[SentimentBucket] {
        &self.class_buckets
    }
}

impl fmt::Display for ClassSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} classes)", self.name, self.class_buckets.len())
    }
}

/// Collapse class probabilities into bucket scores and pick the primary label.
///
/// All three buckets are always present in the result. Equal maximal scores
/// resolve to the earliest bucket in [`SentimentBucket::PRIORITY`].
pub fn map_scores(
    probabilities: &ProbabilityVector,
    schema: &ClassSchema,
) -> Result<SentimentResult> {
    if probabilities.len() != schema.expected_classes() {
        return Err(Error::invalid_model_output(format!(
            "{} schema expects {} class probabilities, model returned {}",
            schema.name(),
            schema.expected_classes(),
            probabilities.len()
        )));
    }

    let mut totals = [0.0f32; 3];
    for (probability, bucket) in probabilities.as_slice().iter().zip(schema.class_buckets()) {
        totals[bucket.index()] += probability;
    }

    let (label, confidence) = select_label(&totals);

    let scores = SentimentBucket::PRIORITY
        .iter()
        .map(|bucket| (*bucket, totals[bucket.index()]))
        .collect();

    Ok(SentimentResult {
        label,
        confidence,
        scores,
    })
}

/// Highest bucket score; only a strictly greater score displaces an earlier bucket
fn select_label(totals: &[f32; 3]) -> (SentimentBucket, f32) {
    let mut best = SentimentBucket::PRIORITY[0];
    let mut best_score = totals[best.index()];

    for bucket in &SentimentBucket::PRIORITY[1..] {
        let score = totals[bucket.index()];
        if score > best_score {
            best = *bucket;
            best_score = score;
        }
    }

    (best, best_score)
}
