//! Redis list store

use crate::FeedbackStore;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use sentiment_core::{Error, FeedbackRecord, Result};
use tokio::sync::OnceCell;

/// Records as JSON documents in a Redis list, oldest first.
///
/// The connection is established on first use and shared afterwards; the
/// manager reconnects on its own after transient failures.
pub struct RedisStore {
    client: redis::Client,
    key: String,
    connection: OnceCell<ConnectionManager>,
}

impl RedisStore {
    /// Validate the URL without connecting
    pub fn new(url: &str, key: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::config(format!("Invalid Redis URL '{}': {}", url, e)))?;

        Ok(Self {
            client,
            key: key.into(),
            connection: OnceCell::new(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                tracing::info!("Connecting to Redis feedback store");
                ConnectionManager::new(self.client.clone()).await
            })
            .await
            .map_err(|e| Error::storage(format!("Redis connection failed: {}", e)))?;

        Ok(manager.clone())
    }
}

/// Parse list entries, skipping any that are not valid records
fn decode_documents(key: &str, documents: &[String]) -> Vec<FeedbackRecord> {
    documents
        .iter()
        .enumerate()
        .filter_map(|(idx, doc)| match serde_json::from_str(doc) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping malformed record at {}[{}]: {}", key, idx, e);
                None
            }
        })
        .collect()
}

#[async_trait]
impl FeedbackStore for RedisStore {
    async fn insert(&self, record: &FeedbackRecord) -> Result<()> {
        let document = serde_json::to_string(record)?;
        let mut conn = self.connection().await?;

        conn.rpush::<_, _, ()>(&self.key, document)
            .await
            .map_err(|e| Error::storage(format!("RPUSH {} failed: {}", self.key, e)))
    }

    async fn find_all(&self) -> Result<Vec<FeedbackRecord>> {
        let mut conn = self.connection().await?;

        let documents: Vec<String> = conn
            .lrange(&self.key, 0, -1)
            .await
            .map_err(|e| Error::storage(format!("LRANGE {} failed: {}", self.key, e)))?;

        Ok(decode_documents(&self.key, &documents))
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
