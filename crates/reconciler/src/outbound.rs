//! Local edits turned into outbound traffic: diffing a local file write
//! against the cache, queueing the result, and sending it over the
//! websocket; plus local create/delete/rename, which go over the REST API
//! and are announced with an `EventMessage`. Folders have no server-side
//! record of their own — the server infers them from contained file paths —
//! so a folder-shaped local change fans out across every cached file under
//! that path prefix instead of hitting a single API endpoint.

use std::time::Duration;

use synctree_diff::{compute_diff, DiffChunk};
use synctree_model::{ChunkMessage, EventMessage, FileContent, ObjectType};

use crate::error::{ReconcileError, Result};
use crate::ports::{DeleteOptions, ListOptions, ObjectKind};
use crate::reconciler::Reconciler;

/// How long `rename_local` waits for a renamed-away folder to drain of
/// leftover files on disk before it attempts to remove the empty husk.
const FOLDER_DRAIN_ATTEMPTS: u32 = 10;
const FOLDER_DRAIN_INTERVAL: Duration = Duration::from_millis(100);

impl Reconciler {
    /// Largest number of chunks carried by a single outbound `ChunkMessage`;
    /// a diff bigger than this is split across several messages, each queued
    /// and sent independently.
    const MAX_CHUNKS_PER_MESSAGE: usize = 10;

    /// Called when the local filesystem watcher reports `path` changed to
    /// `new_content`. Diffs against the cached (last server-confirmed)
    /// content, queues the result as an in-flight outbound message, and sends
    /// it to the server.
    ///
    /// Deliberately does *not* update the cache's content here: the cache
    /// stays at the last server-confirmed state until the ack arrives and
    /// advances it (`handle_chunk_message`). The ack-detection predicate
    /// there assumes applying `msg.chunks` to the pre-ack cache content
    /// yields the post-ack content; pre-applying it here would make that
    /// double-apply.
    pub async fn modify_local(&self, path: &str, new_content: FileContent) -> Result<()> {
        let cached = self.cache.get_by_path(path).ok_or_else(|| ReconcileError::PathNotFound(path.to_string()))?;
        let file_id = cached.id;

        let lock = self.locks.get(file_id);
        let _guard = lock.lock().await;

        // Re-read after acquiring the lock: another handler may have mutated
        // the cache while we were waiting.
        let cached = self.cache.get_by_id(file_id).ok_or(ReconcileError::FileNotFound(file_id))?;

        let (old_text, new_text) = match (cached.content.as_text(), new_content.as_text()) {
            (Some(old), Some(new)) => (old.to_string(), new.to_string()),
            _ => {
                // Binary files have no character-level diff stream and no
                // update-content wire endpoint (only create, not replace);
                // a local binary edit is a no-op here.
                return Ok(());
            }
        };

        if old_text == new_text {
            return Ok(());
        }

        let chunks: Vec<DiffChunk> = compute_diff(&old_text, &new_text);

        for batch in chunks.chunks(Self::MAX_CHUNKS_PER_MESSAGE) {
            let msg = ChunkMessage {
                file_id,
                version: cached.version,
                chunks: batch.to_vec(),
            };
            self.deques.with_deque(file_id, |d| d.add_back(msg.clone()));
            self.ws.send_chunk(msg).await?;
        }
        Ok(())
    }

    /// A brand-new local path the watcher reported. If it's already cached
    /// this is a no-op (idempotent — the same create can surface twice, once
    /// from the watcher and once from startup reconciliation racing it). A
    /// directory has nothing to upload: the server infers folders from the
    /// paths of files created under them, so only the folder-create intent
    /// is announced to peers, for clients that want to react to the empty
    /// folder before any file lands in it. A file is read from local storage,
    /// POSTed in full, and cached.
    pub async fn create_local(&self, path: &str, kind: ObjectKind) -> Result<()> {
        if kind == ObjectKind::Directory {
            self.ws
                .send_event(EventMessage::Create {
                    file_id: None,
                    workspace_path: path.to_string(),
                    object_type: ObjectType::Folder,
                })
                .await?;
            return Ok(());
        }
        if self.cache.has_by_path(path) {
            return Ok(());
        }
        let content = self.storage.read(path).await?;
        let created = self.api.push_create(path, &content).await?;
        self.cache.create(created.clone());
        self.ws
            .send_event(EventMessage::Create {
                file_id: Some(created.id),
                workspace_path: path.to_string(),
                object_type: ObjectType::File,
            })
            .await?;
        Ok(())
    }

    /// A local delete the watcher reported. If `path` is a known file this
    /// deletes it via the API and drops the cache entry; otherwise it's
    /// treated as a folder delete and every cached file under the prefix is
    /// removed individually, followed by one folder `Delete` event (the
    /// server has no folder record to delete against — only the contained
    /// files do).
    pub async fn delete_local(&self, path: &str) -> Result<()> {
        if let Some(file) = self.cache.get_by_path(path) {
            self.api.push_delete(file.id).await?;
            self.cache.delete_by_id(file.id);
            self.ws
                .send_event(EventMessage::Delete {
                    file_id: Some(file.id),
                    workspace_path: path.to_string(),
                    object_type: ObjectType::File,
                })
                .await?;
            return Ok(());
        }

        for contained in self.cache.find_under_prefix(path) {
            self.api.push_delete(contained.id).await?;
            self.cache.delete_by_id(contained.id);
        }
        self.ws
            .send_event(EventMessage::Delete {
                file_id: None,
                workspace_path: path.to_string(),
                object_type: ObjectType::Folder,
            })
            .await?;
        Ok(())
    }

    /// A local rename the watcher reported. A known file is PATCHed directly.
    /// A folder rename instead PATCHes every cached file under the old
    /// prefix to its new path, announces a single folder `Rename` event
    /// carrying the old path (so peers can resolve by old-path lookup or a
    /// fetch), then polls local storage for the vacated folder to drain
    /// before best-effort removing the empty husk left behind by renaming
    /// each file out from under it individually.
    pub async fn rename_local(&self, old_path: &str, new_path: &str) -> Result<()> {
        if let Some(file) = self.cache.get_by_path(old_path) {
            let updated = self.api.push_rename(file.id, new_path).await?;
            self.cache.set_by_id(file.id, updated);
            self.ws
                .send_event(EventMessage::Rename {
                    file_id: Some(file.id),
                    old_workspace_path: old_path.to_string(),
                    new_workspace_path: new_path.to_string(),
                    object_type: ObjectType::File,
                })
                .await?;
            return Ok(());
        }

        let prefix = format!("{old_path}/");
        for contained in self.cache.find_under_prefix(old_path) {
            let suffix = contained.workspace_path.strip_prefix(&prefix).unwrap_or(&contained.workspace_path);
            let moved_path = format!("{new_path}/{suffix}");
            let updated = self.api.push_rename(contained.id, &moved_path).await?;
            self.cache.set_by_id(contained.id, updated);
        }
        self.ws
            .send_event(EventMessage::Rename {
                file_id: None,
                old_workspace_path: old_path.to_string(),
                new_workspace_path: new_path.to_string(),
                object_type: ObjectType::Folder,
            })
            .await?;

        self.wait_for_folder_drain(old_path).await;
        self.storage.delete(old_path, DeleteOptions { suppress_watch_echo: true }).await.ok();
        Ok(())
    }

    /// Polls up to `FOLDER_DRAIN_ATTEMPTS * FOLDER_DRAIN_INTERVAL` (1s total
    /// at the defaults) for `path` to report no remaining entries, giving the
    /// host editor's own per-file rename operations — each one individually
    /// awaited above, but the underlying filesystem moves may still be
    /// settling — a chance to finish before the best-effort folder delete.
    async fn wait_for_folder_drain(&self, path: &str) {
        for _ in 0..FOLDER_DRAIN_ATTEMPTS {
            match self.storage.list(path, ListOptions { recursive: true }).await {
                Ok(entries) if entries.is_empty() => return,
                Ok(_) => {}
                Err(_) => return,
            }
            tokio::time::sleep(FOLDER_DRAIN_INTERVAL).await;
        }
    }
}
