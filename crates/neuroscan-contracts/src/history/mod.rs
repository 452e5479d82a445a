mod storage;
mod store;

use thiserror::Error;

pub use storage::{FileStorage, MemoryStorage, StorageBackend};
pub use store::{ResultStore, HISTORY_STORAGE_KEY};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("history storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("history serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
