//! Extension points for model-backed classifier loading.

use crate::classifier::SequenceClassifier;
use sentiment_core::Result;
use std::sync::Arc;

/// Pluggable backend for loading the local sentiment classifier.
///
/// The Candle loader is the production implementation; tests substitute
/// loaders that hand back canned probability models.
#[async_trait::async_trait]
pub trait ModelLoaderPlugin: Send + Sync {
    /// Load a classifier instance by model name.
    async fn load_classifier(&self, name: &str) -> Result<Arc<dyn SequenceClassifier>>;

    /// List model names available to this loader.
    fn available_models(&self) -> Vec<String>;
}
