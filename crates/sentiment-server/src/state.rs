//! Shared application state

use crate::config::ServerConfig;
use crate::service::{FeedbackService, SentimentService};
use metrics_exporter_prometheus::PrometheusHandle;
use sentiment_classifiers::{
    CandleModelLoader, CompletionBackend, LocalBackend, ModelLoaderPlugin, OpenAiCompletionClient,
    RemoteBackend, SentimentAnalyzer,
};
use sentiment_store::{open_store, FeedbackStore};
use std::sync::Arc;

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub feedback: FeedbackService,
    pub sentiment: SentimentService,
    pub analyzer: SentimentAnalyzer,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire services from explicit components
    pub fn new(
        loader: Arc<dyn ModelLoaderPlugin>,
        model_name: &str,
        completion: Arc<dyn CompletionBackend>,
        store: Arc<dyn FeedbackStore>,
    ) -> Self {
        let analyzer = SentimentAnalyzer::new(
            Arc::new(LocalBackend::new(loader, model_name)),
            Arc::new(RemoteBackend::new(completion)),
        );

        Self {
            feedback: FeedbackService::new(analyzer.clone(), store),
            sentiment: SentimentService::new(analyzer.clone()),
            analyzer,
            metrics: None,
        }
    }

    /// Build production components from configuration
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let registry = config.classifier.build_registry()?;
        let loader = Arc::new(CandleModelLoader::new(registry));
        tracing::info!(
            "Local classifier: {} (cache: {})",
            config.classifier.model,
            loader.cache_dir().display()
        );

        let completion = OpenAiCompletionClient::new(config.openai.clone())?;
        if completion.has_credential() {
            tracing::info!("Completion backend: {}", config.openai.model);
        } else {
            tracing::warn!("OPENAI_API_KEY not set, the openai method will be unavailable");
        }

        let store = open_store(&config.store)?;

        Ok(Self::new(
            loader,
            &config.classifier.model,
            Arc::new(completion),
            store,
        ))
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
