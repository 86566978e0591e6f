//! Feedback and sentiment services behind the HTTP handlers

use sentiment_classifiers::SentimentAnalyzer;
use sentiment_core::{
    AnalysisMethod, FeedbackRecord, FeedbackSubmission, Result, SentimentBucket,
};
use sentiment_store::FeedbackStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Classifies and persists customer feedback
#[derive(Clone)]
pub struct FeedbackService {
    analyzer: SentimentAnalyzer,
    store: Arc<dyn FeedbackStore>,
}

impl FeedbackService {
    pub fn new(analyzer: SentimentAnalyzer, store: Arc<dyn FeedbackStore>) -> Self {
        Self { analyzer, store }
    }

    /// Classify the submission, persist it, and return the stored record.
    ///
    /// Nothing is persisted when classification fails, and a failed write
    /// fails the whole submission.
    pub async fn submit(&self, submission: FeedbackSubmission) -> Result<FeedbackRecord> {
        let method = AnalysisMethod::resolve(submission.method.as_deref())?;

        let sentiment = self.analyzer.classify(&submission.feedback, method).await?;
        let record = FeedbackRecord::new(submission, method, sentiment);

        self.store.insert(&record).await?;

        tracing::info!(
            "Stored feedback from '{}' on '{}' as {} ({})",
            record.customer,
            record.product,
            record.sentiment,
            method
        );

        Ok(record)
    }

    /// Every stored record, in store order
    pub async fn list_all(&self) -> Result<Vec<FeedbackRecord>> {
        self.store.find_all().await
    }
}

/// Body of the sentiment endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
    #[serde(default)]
    pub method: Option<String>,
}

/// Label-only analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    pub text: String,
    pub sentiment: SentimentBucket,
    pub method: AnalysisMethod,
}

/// Analysis with confidence and per-bucket scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedSentimentAnalysis {
    pub text: String,
    pub sentiment: SentimentBucket,
    pub confidence: f32,
    pub scores: BTreeMap<SentimentBucket, f32>,
    pub method: AnalysisMethod,
}

/// Stateless text analysis, nothing is persisted
#[derive(Clone)]
pub struct SentimentService {
    analyzer: SentimentAnalyzer,
}

impl SentimentService {
    pub fn new(analyzer: SentimentAnalyzer) -> Self {
        Self { analyzer }
    }

    pub async fn analyze(&self, request: AnalyzeRequest) -> Result<SentimentAnalysis> {
        let method = AnalysisMethod::resolve(request.method.as_deref())?;

        let sentiment = self.analyzer.classify(&request.text, method).await?;

        Ok(SentimentAnalysis {
            text: request.text,
            sentiment,
            method,
        })
    }

    pub async fn analyze_detailed(
        &self,
        request: AnalyzeRequest,
    ) -> Result<DetailedSentimentAnalysis> {
        let method = AnalysisMethod::resolve(request.method.as_deref())?;

        let result = self.analyzer.classify_detailed(&request.text, method).await?;

        Ok(DetailedSentimentAnalysis {
            text: request.text,
            sentiment: result.label,
            confidence: result.confidence,
            scores: result.scores,
            method,
        })
    }
}
