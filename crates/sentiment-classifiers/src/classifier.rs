//! Classifier trait for local probability models

use crate::schema::ClassSchema;
use async_trait::async_trait;
use sentiment_core::{ProbabilityVector, Result};

/// A pretrained sequence classifier treated as a black box:
/// text in, one probability per class out.
#[async_trait]
pub trait SequenceClassifier: Send + Sync {
    /// Run tokenization and the forward pass, returning softmax probabilities
    async fn infer(&self, text: &str) -> Result<ProbabilityVector>;

    /// Get the model name
    fn name(&self) -> &str;

    /// Class schema describing how the output maps onto sentiment buckets
    fn schema(&self) -> &ClassSchema;
}
