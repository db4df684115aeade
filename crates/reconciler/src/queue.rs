//! Per-file FIFO of in-flight outbound `ChunkMessage`s awaiting server ack.
//! The registry is the single source of truth for "operations this client
//! has sent that have not yet been acked".

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use synctree_model::{ChunkMessage, FileId};

#[derive(Default)]
pub struct PerFileDeque {
    items: VecDeque<ChunkMessage>,
}

impl PerFileDeque {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_back(&mut self, msg: ChunkMessage) {
        self.items.push_back(msg);
    }

    pub fn remove_front(&mut self) -> Option<ChunkMessage> {
        self.items.pop_front()
    }

    pub fn peek_front(&self) -> Option<&ChunkMessage> {
        self.items.front()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Newest-to-oldest iteration over the queued messages, used by rollback.
    pub fn iter_newest_first(&self) -> impl Iterator<Item = &ChunkMessage> {
        self.items.iter().rev()
    }

    /// Empties the deque, e.g. once its contents have been rolled back and
    /// superseded by an inbound remote edit.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// `fileId -> deque`, created lazily on first access.
#[derive(Default)]
pub struct DequeRegistry {
    inner: Mutex<HashMap<FileId, PerFileDeque>>,
}

impl DequeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against the deque for `file_id`, creating an empty one first
    /// if none exists yet.
    pub fn with_deque<R>(&self, file_id: FileId, f: impl FnOnce(&mut PerFileDeque) -> R) -> R {
        let mut inner = self.inner.lock().unwrap();
        let deque = inner.entry(file_id).or_default();
        f(deque)
    }
}
