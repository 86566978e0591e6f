//! Core types for the sentiment service

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One of the three sentiment buckets every backend resolves to.
///
/// Variant order is the declared tie-break priority: when two buckets score
/// exactly the same, the earlier one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentBucket {
    Negative,
    Neutral,
    Positive,
}

impl SentimentBucket {
    /// All buckets in tie-break priority order
    pub const PRIORITY: [SentimentBucket; 3] = [Self::Negative, Self::Neutral, Self::Positive];

    /// Lowercase label used on the wire and in storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Positive => "positive",
        }
    }

    /// Position of this bucket in [`SentimentBucket::PRIORITY`]
    pub fn index(&self) -> usize {
        match self {
            Self::Negative => 0,
            Self::Neutral => 1,
            Self::Positive => 2,
        }
    }
}

impl fmt::Display for SentimentBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentBucket {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            "positive" => Ok(Self::Positive),
            other => Err(Error::invalid_request(format!(
                "unknown sentiment bucket '{}'",
                other
            ))),
        }
    }
}

/// Ordered class probabilities produced by a model's softmax.
///
/// Never empty; every entry is finite and non-negative.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityVector(Vec<f32>);

/// Allowed drift from 1.0 in a softmax distribution
const PROBABILITY_TOLERANCE: f32 = 1e-3;

impl ProbabilityVector {
    /// Validate raw model output
    pub fn new(values: Vec<f32>) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::invalid_model_output("empty probability vector"));
        }

        if let Some((idx, value)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0 || **v > 1.0 + PROBABILITY_TOLERANCE)
        {
            return Err(Error::invalid_model_output(format!(
                "probability at class {} is {}",
                idx, value
            )));
        }

        let total: f32 = values.iter().sum();
        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(Error::invalid_model_output(format!(
                "probabilities sum to {}, expected 1.0",
                total
            )));
        }

        Ok(Self(values))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Sum of all class probabilities (~1.0 for softmax output)
    pub fn total(&self) -> f32 {
        self.0.iter().sum()
    }
}

impl TryFrom<Vec<f32>> for ProbabilityVector {
    type Error = Error;

    fn try_from(values: Vec<f32>) -> Result<Self> {
        Self::new(values)
    }
}

/// Outcome of a single classification call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    /// Primary bucket
    pub label: SentimentBucket,

    /// Score of the primary bucket (0.0-1.0)
    pub confidence: f32,

    /// Per-bucket scores
    pub scores: BTreeMap<SentimentBucket, f32>,
}

impl SentimentResult {
    /// Result for a backend that only names a label and reports no scores
    pub fn certain(label: SentimentBucket) -> Self {
        Self {
            label,
            confidence: 1.0,
            scores: BTreeMap::from([(label, 1.0)]),
        }
    }

    /// Score for a bucket, 0.0 when absent
    pub fn score(&self, bucket: SentimentBucket) -> f32 {
        self.scores.get(&bucket).copied().unwrap_or(0.0)
    }
}

/// Backend used to classify a piece of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMethod {
    /// Local pretrained transformer classifier
    #[default]
    Bert,
    /// Remote LLM completion endpoint
    OpenAi,
}

impl AnalysisMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bert => "bert",
            Self::OpenAi => "openai",
        }
    }

    /// Resolve an optional request field. Absent or blank selects the default
    /// backend; anything else must name a known backend.
    pub fn resolve(method: Option<&str>) -> Result<Self> {
        match method.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(name) => name.parse(),
        }
    }
}

impl fmt::Display for AnalysisMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bert" => Ok(Self::Bert),
            "openai" => Ok(Self::OpenAi),
            other => Err(Error::invalid_request(format!(
                "unknown analysis method '{}' (expected 'bert' or 'openai')",
                other
            ))),
        }
    }
}

/// Feedback as submitted by a client, before classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSubmission {
    pub customer: String,
    pub product: String,
    pub feedback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// A persisted feedback entry. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub customer: String,
    pub product: String,
    pub feedback: String,
    pub method: AnalysisMethod,
    pub sentiment: SentimentBucket,
}

impl FeedbackRecord {
    /// Attach a classification outcome to a submission
    pub fn new(
        submission: FeedbackSubmission,
        method: AnalysisMethod,
        sentiment: SentimentBucket,
    ) -> Self {
        Self {
            customer: submission.customer,
            product: submission.product,
            feedback: submission.feedback,
            method,
            sentiment,
        }
    }
}
