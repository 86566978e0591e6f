//! Sentiment Core
//!
//! Core types and utilities shared across the sentiment service crates.
//!
//! This crate provides:
//! - Sentiment buckets, probability vectors, and classification results
//! - Feedback submission and record types
//! - Error types and result handling
//! - Wire types for the remote completion backend

pub mod completion;
pub mod error;
pub mod types;

pub use error::{Error, ExternalServiceError, Result};
pub use types::{
    AnalysisMethod, FeedbackRecord, FeedbackSubmission, ProbabilityVector, SentimentBucket,
    SentimentResult,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, ExternalServiceError, Result};
    pub use crate::types::{
        AnalysisMethod, FeedbackRecord, FeedbackSubmission, ProbabilityVector, SentimentBucket,
        SentimentResult,
    };
}
