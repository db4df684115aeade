//! Remote cursor / presence tracking: purely informational
//! positions broadcast by peers editing the same file, never fed back into
//! diff/transform. Stale entries are pruned by last-seen time so a peer that
//! disconnects without sending an explicit leave eventually disappears.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use synctree_model::FileId;

use crate::reconciler::Reconciler;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorUpdate {
    pub file_id: FileId,
    pub peer_id: String,
    pub position: usize,
}

struct Entry {
    position: usize,
    last_seen: Instant,
}

/// Default staleness window after which a peer's cursor is dropped absent a
/// fresher update.
pub const DEFAULT_CURSOR_TTL: Duration = Duration::from_secs(30);

#[derive(Default)]
struct Inner {
    // (file_id, peer_id) -> last known position
    cursors: HashMap<(FileId, String), Entry>,
}

pub struct CursorTracker {
    inner: Mutex<Inner>,
    ttl: Duration,
}

impl Default for CursorTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CURSOR_TTL)
    }
}

impl CursorTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            ttl,
        }
    }

    pub fn record(&self, update: CursorUpdate) {
        let mut inner = self.inner.lock().unwrap();
        inner.cursors.insert(
            (update.file_id, update.peer_id),
            Entry {
                position: update.position,
                last_seen: Instant::now(),
            },
        );
    }

    pub fn remove(&self, file_id: FileId, peer_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.cursors.remove(&(file_id, peer_id.to_string()));
    }

    /// Live (non-stale) cursor positions for `file_id`, pruning stale entries
    /// as a side effect.
    pub fn live_for_file(&self, file_id: FileId) -> Vec<(String, usize)> {
        let mut inner = self.inner.lock().unwrap();
        let now = Instant::now();
        let ttl = self.ttl;
        inner.cursors.retain(|_, entry| now.duration_since(entry.last_seen) < ttl);
        inner
            .cursors
            .iter()
            .filter(|((id, _), _)| *id == file_id)
            .map(|((_, peer), entry)| (peer.clone(), entry.position))
            .collect()
    }
}

impl Reconciler {
    /// A local cursor-position update from the host editor. `path` must
    /// resolve to a currently cached file — a cursor in an unsaved or
    /// not-yet-synced buffer has nothing meaningful to broadcast, so it's
    /// dropped rather than queued for later.
    pub fn local_cursor_update(&self, path: &str, peer_id: &str, position: usize) -> Option<CursorUpdate> {
        let file = self.cache.get_by_path(path)?;
        Some(CursorUpdate { file_id: file.id, peer_id: peer_id.to_string(), position })
    }

    /// A cursor update broadcast by a peer. If the receiving client isn't
    /// currently focused on this file, any cursor previously shown for that
    /// peer is cleared instead of recording the new position — presence for
    /// a file nobody is looking at is noise, not state worth keeping warm.
    pub fn handle_remote_cursor(&self, update: CursorUpdate, receiver_is_focused_on_file: bool) {
        if receiver_is_focused_on_file {
            self.cursors.record(update);
        } else {
            self.cursors.remove(update.file_id, &update.peer_id);
        }
    }
}
