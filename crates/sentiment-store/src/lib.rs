//! Sentiment Store
//!
//! Append-only persistence for classified feedback. Records are written once
//! and read back in insertion order; there is no update or delete.
//!
//! The backend is chosen from a connection URL:
//! - `redis://` / `rediss://` - a Redis list of JSON documents
//! - `file://<path>` - a JSON-lines file
//! - `memory://` - process memory, lost on exit

pub mod jsonl;
pub mod memory;
pub mod redis_store;

use async_trait::async_trait;
use sentiment_core::{Error, FeedbackRecord, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use jsonl::JsonLinesStore;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Environment variable naming the store connection URL
pub const FEEDBACK_STORE_URL_ENV: &str = "FEEDBACK_STORE_URL";

/// Append-only collection of feedback records
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Persist one record
    async fn insert(&self, record: &FeedbackRecord) -> Result<()>;

    /// Every persisted record, in insertion order
    async fn find_all(&self) -> Result<Vec<FeedbackRecord>>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// Store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Connection URL
    #[serde(default = "default_url")]
    pub url: String,

    /// Redis list holding the records
    #[serde(default = "default_key")]
    pub key: String,
}

fn default_url() -> String {
    "redis://127.0.0.1:6379/".to_string()
}

fn default_key() -> String {
    "feedback".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            key: default_key(),
        }
    }
}

/// Open the store named by `config.url`.
///
/// Network backends connect lazily, so this only fails on a malformed URL.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn FeedbackStore>> {
    let url = config.url.trim();

    let is_redis = url.starts_with("redis://") || url.starts_with("rediss://");
    let store: Arc<dyn FeedbackStore> = if is_redis {
        Arc::new(RedisStore::new(url, &config.key)?)
    } else if let Some(path) = url.strip_prefix("file://") {
        if path.is_empty() {
            return Err(Error::config("file:// store URL needs a path"));
        }
        Arc::new(JsonLinesStore::new(path))
    } else if url.starts_with("memory://") {
        Arc::new(MemoryStore::new())
    } else {
        return Err(Error::config(format!(
            "Unsupported store URL '{}' (expected redis://, rediss://, file://, or memory://)",
            url
        )));
    };

    tracing::info!("Feedback store: {}", store.backend_name());
    Ok(store)
}
