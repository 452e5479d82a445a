use std::sync::Arc;

use parking_lot::Mutex;

use super::{StorageBackend, StoreError};
use crate::analysis::{AnalysisResult, HistoryItem};

pub const HISTORY_STORAGE_KEY: &str = "neuroscan_history";

/// Append-only, most-recent-first log of completed analyses.
///
/// The in-memory sequence and the persisted blob are kept identical:
/// `append` writes the full updated sequence first and only commits it in
/// memory once the write succeeded. The lock is held across the write, so
/// concurrent appends are serialized and none of them can overwrite
/// another's snapshot.
pub struct ResultStore {
    backend: Arc<dyn StorageBackend>,
    key: String,
    items: Mutex<Vec<HistoryItem>>,
}

impl ResultStore {
    /// Reads the persisted history. Any failure (unreadable medium, invalid
    /// JSON, a single record failing validation) leaves the store empty.
    pub fn load(backend: Arc<dyn StorageBackend>) -> Self {
        Self::load_key(backend, HISTORY_STORAGE_KEY)
    }

    pub fn load_key(backend: Arc<dyn StorageBackend>, key: &str) -> Self {
        let items = match backend.read(key) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<HistoryItem>>(&raw) {
                Ok(items) => {
                    tracing::info!(count = items.len(), "loaded analysis history");
                    items
                }
                Err(err) => {
                    tracing::error!(error = %err, "failed to load history; starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::error!(error = %err, "failed to read history; starting empty");
                Vec::new()
            }
        };
        Self {
            backend,
            key: key.to_string(),
            items: Mutex::new(items),
        }
    }

    pub fn append(
        &self,
        result: AnalysisResult,
        image_url: impl Into<String>,
    ) -> Result<HistoryItem, StoreError> {
        let item = HistoryItem {
            result,
            image_url: image_url.into(),
        };

        let mut items = self.items.lock();
        let mut next = Vec::with_capacity(items.len() + 1);
        next.push(item.clone());
        next.extend(items.iter().cloned());

        let raw = serde_json::to_string(&next)?;
        self.backend.write(&self.key, &raw)?;
        *items = next;
        tracing::debug!(id = %item.result.id, total = items.len(), "history item appended");
        Ok(item)
    }

    pub fn list(&self) -> Vec<HistoryItem> {
        self.items.lock().clone()
    }

    pub fn get(&self, id: &str) -> Option<HistoryItem> {
        self.items
            .lock()
            .iter()
            .find(|item| item.result.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}
