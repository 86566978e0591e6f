//! Sentiment Classifiers
//!
//! Everything between raw text and a [`SentimentResult`]:
//! - Class schemas and the score mapper that collapses model classes into
//!   negative / neutral / positive buckets
//! - Candle-based BERT sequence classifiers, loaded from a local directory or
//!   the HuggingFace Hub
//! - The remote completion backend (OpenAI-compatible `/completions`)
//! - [`SentimentAnalyzer`], which dispatches on [`AnalysisMethod`]
//!
//! [`SentimentResult`]: sentiment_core::SentimentResult
//! [`AnalysisMethod`]: sentiment_core::AnalysisMethod

pub mod backend;
pub mod classifier;
pub mod completion;
pub mod loader_plugin;
pub mod model_config;
pub mod model_loader;
pub mod schema;

pub use backend::{LocalBackend, RemoteBackend, SentimentAnalyzer, SentimentBackend};
pub use classifier::SequenceClassifier;
pub use completion::{
    build_prompt, parse_completion_label, CompletionBackend, OpenAiCompletionClient,
    OpenAiSettings, OPENAI_API_KEY_ENV,
};
pub use loader_plugin::ModelLoaderPlugin;
pub use model_config::{
    InferenceConfig, ModelConfig, ModelRegistry, ModelSource, SchemaSpec, DEFAULT_MODEL,
};
pub use model_loader::{BertSentimentModel, CandleModelLoader};
pub use schema::{map_scores, ClassSchema};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::backend::{SentimentAnalyzer, SentimentBackend};
    pub use crate::classifier::SequenceClassifier;
    pub use crate::completion::CompletionBackend;
    pub use crate::loader_plugin::ModelLoaderPlugin;
    pub use crate::schema::{map_scores, ClassSchema};
}
