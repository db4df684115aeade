//! Handling of messages arriving from the server: chunk acks,
//! genuine concurrent remote edits (with rollback-and-replay against our own
//! unacked queue), version-gap fill, and filesystem-shape events from peers.

use synctree_diff::{apply_diffs, invert_diff, DiffChunk};
use synctree_model::{ChunkMessage, EventMessage, File, FileContent, FileId, ObjectType};

use crate::error::{ReconcileError, Result};
use crate::ports::{DeleteOptions, WriteOptions};
use crate::reconciler::Reconciler;

impl Reconciler {
    /// Entry point for every `ChunkMessage` the websocket reader receives,
    /// whether it's the server echoing back one of our own sends (an ack) or
    /// a genuine edit from another peer.
    pub async fn handle_chunk_message(&self, msg: ChunkMessage) -> Result<()> {
        let file_id = msg.file_id;
        let lock = self.locks.get(file_id);
        let _guard = lock.lock().await;

        let cached = self.cache.get_by_id(file_id).ok_or(ReconcileError::FileNotFound(file_id))?;

        if !cached.content.is_text() {
            // Chunks carry character-level text edits; a binary file can
            // only change via whole-file replacement, never a diff stream.
            tracing::debug!(file_id = %file_id, "dropping chunk message for non-text file");
            return Ok(());
        }

        if msg.version < cached.version {
            tracing::warn!(file_id = %file_id, msg_version = msg.version, cached_version = cached.version, "dropping stale chunk message");
            return Err(ReconcileError::StaleVersion {
                file_id,
                msg_version: msg.version,
                cached_version: cached.version,
            });
        }

        // The server echoes back a client's own send with identical chunks
        // at `clientSentVersion + 1`. The deque's front holds the version the
        // client believed was current *before* that send, so a genuine ack
        // satisfies both: same chunk content, and `msg.version == front.version + 1`.
        let is_ack = self.deques.with_deque(file_id, |d| {
            d.peek_front()
                .map(|front| front.same_chunks(&msg) && msg.version == front.version + 1)
                .unwrap_or(false)
        });

        if is_ack {
            self.deques.with_deque(file_id, |d| {
                d.remove_front();
            });
            let new_text = apply_diffs(cached.content.as_text().unwrap_or_default(), &msg.chunks);
            self.cache.apply_ack(file_id, FileContent::Text(new_text), msg.version);
            return Ok(());
        }

        self.apply_remote_chunk(cached, msg).await
    }

    /// A genuine concurrent edit from another peer (not an ack of our own
    /// send): fetch any version history we're missing, then roll back our
    /// own unacked queue against local storage and replay the remote edit on
    /// top of the last server-confirmed state.
    async fn apply_remote_chunk(&self, cached: File, msg: ChunkMessage) -> Result<()> {
        let file_id = msg.file_id;

        let gap_chunks = if msg.version != cached.version + 1 {
            self.fetch_gap_chunks(file_id, cached.version, msg.version).await?
        } else {
            Vec::new()
        };

        let mut chunks_to_persist = gap_chunks;
        chunks_to_persist.extend(msg.chunks);

        self.rebase_and_apply(cached, chunks_to_persist, msg.version).await
    }

    /// Fetches every historical operation the client missed between
    /// `from_version` (exclusive) and `upto_version` (exclusive), verifying
    /// strict contiguity. Any gap — a version the server skipped, returned
    /// out of order, or never sent at all — is fatal for this one
    /// reconciliation; the file recovers on the next chunk that triggers
    /// another gap-fill.
    async fn fetch_gap_chunks(&self, file_id: FileId, from_version: u64, upto_version: u64) -> Result<Vec<DiffChunk>> {
        let history = self.api.fetch_file_history(file_id, from_version).await?;
        let mut expected = from_version + 1;
        let mut chunks = Vec::new();
        for record in history {
            if record.version != expected {
                return Err(ReconcileError::NonContiguousHistory { file_id, expected, got: record.version });
            }
            chunks.extend(record.operation);
            expected += 1;
            if expected == upto_version {
                break;
            }
        }
        if expected != upto_version {
            return Err(ReconcileError::NonContiguousHistory { file_id, expected, got: upto_version });
        }
        Ok(chunks)
    }

    /// Rolls local storage back to the last server-confirmed base (undoing
    /// our own still-unacked queued ops, newest message first and newest
    /// chunk first within each message — the exact reverse of the order they
    /// were originally applied, so each inversion lands on the text exactly
    /// where it left it), applies `chunks_to_persist` on top, writes the
    /// result back to storage, and advances the cache to `new_version`.
    ///
    /// The queued ops themselves are discarded rather than rebased forward:
    /// the user's in-memory editor still holds their unacked typing, and the
    /// next local-modify event re-diffs against the new cache content to
    /// re-derive it.
    async fn rebase_and_apply(&self, cached: File, chunks_to_persist: Vec<DiffChunk>, new_version: u64) -> Result<()> {
        let file_id = cached.id;
        let Some(confirmed_text) = cached.content.as_text() else {
            return Err(ReconcileError::DiffModal("cannot apply a chunk diff to binary content".into()));
        };

        let disk_content = self.storage.read(&cached.workspace_path).await?;
        let mut text = disk_content.as_text().map(str::to_string).unwrap_or_else(|| confirmed_text.to_string());

        let queued: Vec<ChunkMessage> = self.deques.with_deque(file_id, |d| d.iter_newest_first().cloned().collect());
        for queued_msg in &queued {
            let inverses: Vec<DiffChunk> = queued_msg.chunks.iter().rev().map(invert_diff).collect();
            text = apply_diffs(&text, &inverses);
        }

        text = apply_diffs(&text, &chunks_to_persist);

        self.deques.with_deque(file_id, |d| d.clear());
        self.cache.apply_ack(file_id, FileContent::Text(text.clone()), new_version);
        self.storage
            .write(&cached.workspace_path, &FileContent::Text(text), WriteOptions { suppress_watch_echo: true, is_dir: false })
            .await?;
        Ok(())
    }

    /// Applies a filesystem-shape event from a peer (create/delete/rename)
    /// to the local filesystem and cache, mirroring what the peer already
    /// did on their end.
    pub async fn handle_event(&self, event: EventMessage) -> Result<()> {
        match event {
            EventMessage::Create { file_id, workspace_path, object_type } => {
                self.handle_remote_create(file_id, workspace_path, object_type).await
            }
            EventMessage::Delete { file_id, workspace_path, object_type } => {
                self.handle_remote_delete(file_id, workspace_path, object_type).await
            }
            EventMessage::Rename { file_id, old_workspace_path, new_workspace_path, object_type } => {
                self.handle_remote_rename(file_id, old_workspace_path, new_workspace_path, object_type).await
            }
        }
    }

    async fn handle_remote_create(&self, file_id: Option<FileId>, workspace_path: String, object_type: ObjectType) -> Result<()> {
        if object_type == ObjectType::Folder {
            // Folders have no server-side content to fetch; creating the
            // directory locally is enough, the files inside arrive as their
            // own Create events.
            self.storage
                .write(&workspace_path, &FileContent::Text(String::new()), WriteOptions { suppress_watch_echo: true, is_dir: true })
                .await
                .ok();
            return Ok(());
        }
        let Some(file_id) = file_id else {
            return Err(ReconcileError::FileNotFound(FileId(0)));
        };
        let files = self.api.fetch_remote_files().await?;
        let Some(remote) = files.into_iter().find(|f| f.id == file_id) else {
            return Err(ReconcileError::FileNotFound(file_id));
        };
        self.storage
            .write(&workspace_path, &remote.content, WriteOptions { suppress_watch_echo: true, is_dir: false })
            .await?;
        self.cache.create(remote);
        Ok(())
    }

    async fn handle_remote_delete(&self, file_id: Option<FileId>, workspace_path: String, object_type: ObjectType) -> Result<()> {
        if object_type == ObjectType::Folder {
            for file in self.cache.find_under_prefix(&workspace_path) {
                self.cache.delete_by_id(file.id);
            }
            self.storage.delete(&workspace_path, DeleteOptions { suppress_watch_echo: true }).await.ok();
            return Ok(());
        }

        let cached = file_id.and_then(|id| self.cache.get_by_id(id)).or_else(|| self.cache.get_by_path(&workspace_path));
        let Some(file) = cached else {
            tracing::warn!(workspace_path = %workspace_path, "remote delete for a file not in cache, skipping");
            return Ok(());
        };
        self.storage.delete(&file.workspace_path, DeleteOptions { suppress_watch_echo: true }).await?;
        self.cache.delete_by_id(file.id);
        Ok(())
    }

    async fn handle_remote_rename(
        &self,
        file_id: Option<FileId>,
        old_workspace_path: String,
        new_workspace_path: String,
        object_type: ObjectType,
    ) -> Result<()> {
        if object_type == ObjectType::Folder {
            self.storage.rename(&old_workspace_path, &new_workspace_path).await?;
            for file in self.cache.find_under_prefix(&old_workspace_path) {
                let suffix = file.workspace_path.strip_prefix(&old_workspace_path).unwrap_or(&file.workspace_path);
                self.cache.set_path(file.id, format!("{new_workspace_path}{suffix}"));
            }
            return Ok(());
        }

        match self.cache.get_by_path(&old_workspace_path) {
            Some(file) => {
                self.storage.rename(&old_workspace_path, &new_workspace_path).await?;
                self.cache.set_path(file.id, new_workspace_path);
            }
            None => {
                // Unrecognized file rename: treat as a fetch-and-create at
                // the new path rather than renaming something we never had.
                let Some(file_id) = file_id else {
                    return Err(ReconcileError::FileNotFound(FileId(0)));
                };
                let files = self.api.fetch_remote_files().await?;
                let Some(remote) = files.into_iter().find(|f| f.id == file_id) else {
                    return Err(ReconcileError::FileNotFound(file_id));
                };
                self.storage
                    .write(&new_workspace_path, &remote.content, WriteOptions { suppress_watch_echo: true, is_dir: false })
                    .await?;
                self.cache.create(remote);
            }
        }
        Ok(())
    }
}
