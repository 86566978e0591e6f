//! Sentiment backends and method dispatch
//!
//! Two interchangeable ways to label text: the local classifier (Candle BERT
//! behind [`ModelLoaderPlugin`]) and a remote completion endpoint. The
//! [`SentimentAnalyzer`] owns one of each and picks by [`AnalysisMethod`].

use crate::classifier::SequenceClassifier;
use crate::completion::{
    build_prompt, parse_completion_label, CompletionBackend, SENTIMENT_MAX_TOKENS,
};
use crate::loader_plugin::ModelLoaderPlugin;
use crate::schema::map_scores;
use async_trait::async_trait;
use sentiment_core::{AnalysisMethod, Error, Result, SentimentBucket, SentimentResult};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;

/// A way of turning text into a sentiment result
#[async_trait]
pub trait SentimentBackend: Send + Sync {
    /// Method this backend serves
    fn method(&self) -> AnalysisMethod;

    /// Classify text with per-bucket scores
    async fn classify_detailed(&self, text: &str) -> Result<SentimentResult>;

    /// Classify text, returning only the label
    async fn classify(&self, text: &str) -> Result<SentimentBucket> {
        Ok(self.classify_detailed(text).await?.label)
    }
}

type LoadOutcome = std::result::Result<Arc<dyn SequenceClassifier>, String>;

/// Local classifier, loaded once on first use.
///
/// Concurrent cold-start callers wait on the same load. The outcome is kept
/// for the process lifetime, so a failed load is reported on every call
/// without being retried.
pub struct LocalBackend {
    loader: Arc<dyn ModelLoaderPlugin>,
    model_name: String,
    classifier: OnceCell<LoadOutcome>,
}

impl LocalBackend {
    pub fn new(loader: Arc<dyn ModelLoaderPlugin>, model_name: impl Into<String>) -> Self {
        Self {
            loader,
            model_name: model_name.into(),
            classifier: OnceCell::new(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Whether the classifier has been loaded successfully
    pub fn is_loaded(&self) -> bool {
        matches!(self.classifier.get(), Some(Ok(_)))
    }

    /// Load the classifier now instead of on the first request
    pub async fn preload(&self) -> Result<()> {
        self.classifier().await.map(|_| ())
    }

    async fn classifier(&self) -> Result<Arc<dyn SequenceClassifier>> {
        let outcome = self
            .classifier
            .get_or_init(|| async {
                let outcome = self.loader.load_classifier(&self.model_name).await;
                if let Err(e) = &outcome {
                    tracing::error!("Failed to load model '{}': {}", self.model_name, e);
                }
                outcome.map_err(|e| match e {
                    Error::ModelUnavailable(message) => message,
                    other => other.to_string(),
                })
            })
            .await;

        match outcome {
            Ok(classifier) => Ok(Arc::clone(classifier)),
            Err(message) => Err(Error::model_unavailable(message.clone())),
        }
    }
}

#[async_trait]
impl SentimentBackend for LocalBackend {
    fn method(&self) -> AnalysisMethod {
        AnalysisMethod::Bert
    }

    async fn classify_detailed(&self, text: &str) -> Result<SentimentResult> {
        let classifier = self.classifier().await?;
        let probabilities = classifier.infer(text).await?;
        map_scores(&probabilities, classifier.schema())
    }
}

/// Remote completion endpoint prompted for a one-word label
pub struct RemoteBackend {
    completion: Arc<dyn CompletionBackend>,
}

impl RemoteBackend {
    pub fn new(completion: Arc<dyn CompletionBackend>) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl SentimentBackend for RemoteBackend {
    fn method(&self) -> AnalysisMethod {
        AnalysisMethod::OpenAi
    }

    async fn classify_detailed(&self, text: &str) -> Result<SentimentResult> {
        let reply = self
            .completion
            .complete(&build_prompt(text), SENTIMENT_MAX_TOKENS)
            .await?;

        tracing::debug!("Completion backend '{}' replied {:?}", self.completion.name(), reply);

        Ok(SentimentResult::certain(parse_completion_label(&reply)))
    }
}

/// Dispatches classification to the backend selected by [`AnalysisMethod`]
#[derive(Clone)]
pub struct SentimentAnalyzer {
    local: Arc<LocalBackend>,
    remote: Arc<RemoteBackend>,
}

impl SentimentAnalyzer {
    pub fn new(local: Arc<LocalBackend>, remote: Arc<RemoteBackend>) -> Self {
        Self { local, remote }
    }

    pub fn local(&self) -> &Arc<LocalBackend> {
        &self.local
    }

    /// Backend serving `method`
    pub fn backend(&self, method: AnalysisMethod) -> &dyn SentimentBackend {
        match method {
            AnalysisMethod::Bert => self.local.as_ref() as &dyn SentimentBackend,
            AnalysisMethod::OpenAi => self.remote.as_ref(),
        }
    }

    /// Classify with per-bucket scores, recording latency and label metrics
    pub async fn classify_detailed(
        &self,
        text: &str,
        method: AnalysisMethod,
    ) -> Result<SentimentResult> {
        let start = Instant::now();
        let result = self.backend(method).classify_detailed(text).await?;
        let latency_us = start.elapsed().as_micros() as f64;

        metrics::histogram!("sentiment_inference_latency_us", "method" => method.as_str())
            .record(latency_us);
        metrics::counter!(
            "sentiment_classifications_total",
            "method" => method.as_str(),
            "label" => result.label.as_str()
        )
        .increment(1);

        tracing::debug!(
            "Classified {} chars with {} as {} ({:.3}) in {}us",
            text.len(),
            method,
            result.label,
            result.confidence,
            latency_us
        );

        Ok(result)
    }

    pub async fn classify(&self, text: &str, method: AnalysisMethod) -> Result<SentimentBucket> {
        Ok(self.classify_detailed(text, method).await?.label)
    }
}
