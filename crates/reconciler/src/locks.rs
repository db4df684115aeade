//! Per-file mutual exclusion: a single `tokio::sync::Mutex` per file id,
//! held across awaits for the duration of a local-edit or remote-chunk
//! critical section. One map guarding both handlers (rather than separate
//! maps per handler) is enough to guarantee only one of them touches a
//! given file's cache entry and deque at a time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use synctree_model::FileId;
use tokio::sync::Mutex as AsyncMutex;

#[derive(Default)]
pub struct FileLockRegistry {
    inner: Mutex<HashMap<FileId, Arc<AsyncMutex<()>>>>,
}

impl FileLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutex guarding `file_id`, creating it on first use.
    pub fn get(&self, file_id: FileId) -> Arc<AsyncMutex<()>> {
        let mut inner = self.inner.lock().unwrap();
        inner.entry(file_id).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_file_id_shares_one_mutex() {
        let registry = FileLockRegistry::new();
        let a = registry.get(FileId(1));
        let b = registry.get(FileId(1));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn different_file_ids_do_not_contend() {
        let registry = FileLockRegistry::new();
        let a = registry.get(FileId(1));
        let b = registry.get(FileId(2));

        let _guard_a = a.lock().await;
        // Must not deadlock: b is a distinct mutex.
        let _guard_b = b.lock().await;
    }
}
