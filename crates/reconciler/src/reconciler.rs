//! The `Reconciler`: owns the cache, outbound deques and file locks, and
//! drives every reconciliation path (startup, inbound chunk/event handling,
//! outbound local edits) against the adapter ports.

use std::sync::Arc;

use synctree_model::ConflictResolution;

use crate::cache::FileCache;
use crate::cursor::CursorTracker;
use crate::locks::FileLockRegistry;
use crate::ports::{ApiClient, DiffModal, Storage, WsClient};
use crate::queue::DequeRegistry;

pub struct Reconciler {
    pub(crate) cache: FileCache,
    pub(crate) deques: DequeRegistry,
    pub(crate) locks: FileLockRegistry,
    pub(crate) cursors: CursorTracker,
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) api: Arc<dyn ApiClient>,
    pub(crate) ws: Arc<dyn WsClient>,
    pub(crate) diff_modal: Arc<dyn DiffModal>,
    pub(crate) conflict_resolution: ConflictResolution,
}

impl Reconciler {
    pub fn new(
        storage: Arc<dyn Storage>,
        api: Arc<dyn ApiClient>,
        ws: Arc<dyn WsClient>,
        diff_modal: Arc<dyn DiffModal>,
        conflict_resolution: ConflictResolution,
    ) -> Self {
        Self {
            cache: FileCache::new(),
            deques: DequeRegistry::new(),
            locks: FileLockRegistry::new(),
            cursors: CursorTracker::new(crate::cursor::DEFAULT_CURSOR_TTL),
            storage,
            api,
            ws,
            diff_modal,
            conflict_resolution,
        }
    }

    pub fn cache(&self) -> &FileCache {
        &self.cache
    }

    pub fn cursors(&self) -> &CursorTracker {
        &self.cursors
    }
}
