//! In-memory feedback store

use crate::FeedbackStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use sentiment_core::{FeedbackRecord, Result};

/// Records held in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<FeedbackRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl FeedbackStore for MemoryStore {
    async fn insert(&self, record: &FeedbackRecord) -> Result<()> {
        self.records.write().push(record.clone());
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<FeedbackRecord>> {
        Ok(self.records.read().clone())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
