//! JSON-lines file store
//!
//! One record per line, appended. Reads parse the whole file; malformed lines
//! are skipped with a warning so a torn final write does not hide the rest.

use crate::FeedbackStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use sentiment_core::{Error, FeedbackRecord, Result};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Append-only JSON-lines file
pub struct JsonLinesStore {
    inner: Arc<JsonLinesFile>,
}

struct JsonLinesFile {
    path: PathBuf,
    // Serializes appends from concurrent requests
    write_lock: Mutex<()>,
}

impl JsonLinesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(JsonLinesFile {
                path: path.into(),
                write_lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

impl JsonLinesFile {
    fn append(&self, line: &str) -> std::io::Result<()> {
        let _guard = self.write_lock.lock();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        // Terminate a torn final line so the new record starts on its own
        if ends_without_newline(&mut file)? {
            file.write_all(b"\n")?;
        }
        writeln!(file, "{}", line)?;
        file.flush()
    }

    fn read_all(&self) -> std::io::Result<Vec<FeedbackRecord>> {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut records = Vec::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<FeedbackRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(
                    "Skipping malformed record at {}:{}: {}",
                    self.path.display(),
                    line_no + 1,
                    e
                ),
            }
        }

        Ok(records)
    }
}

fn ends_without_newline(file: &mut std::fs::File) -> std::io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

#[async_trait]
impl FeedbackStore for JsonLinesStore {
    async fn insert(&self, record: &FeedbackRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        let inner = Arc::clone(&self.inner);

        tokio::task::spawn_blocking(move || inner.append(&line))
            .await
            .map_err(|e| Error::storage(format!("write task failed: {}", e)))?
            .map_err(|e| {
                Error::storage(format!("failed to append to {}: {}", self.path().display(), e))
            })
    }

    async fn find_all(&self) -> Result<Vec<FeedbackRecord>> {
        let inner = Arc::clone(&self.inner);

        tokio::task::spawn_blocking(move || inner.read_all())
            .await
            .map_err(|e| Error::storage(format!("read task failed: {}", e)))?
            .map_err(|e| Error::storage(format!("failed to read {}: {}", self.path().display(), e)))
    }

    fn backend_name(&self) -> &'static str {
        "jsonl"
    }
}
