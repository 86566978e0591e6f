//! Sentiment Server
//!
//! HTTP service that labels customer feedback as negative, neutral, or
//! positive with either a local BERT classifier or a remote completion
//! endpoint, and keeps an append-only record of submitted feedback.

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
pub mod service;
pub mod state;

pub use app::{build_app, run_server};
pub use config::ServerConfig;
pub use error::AppError;
pub use state::AppState;
