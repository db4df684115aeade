//! Startup reconciliation: reconcile the local filesystem against
//! the server's file list exactly once, before the websocket connection
//! starts delivering live chunks.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;

use synctree_diff::compute_diff;
use synctree_model::{ChunkMessage, ConflictResolution, File, FileContent};

use crate::error::Result;
use crate::ports::{ConflictChoice, ListOptions, Stat, WriteOptions};
use crate::reconciler::Reconciler;

/// Caps how many per-file startup reconciliations run concurrently, so a
/// workspace with thousands of files doesn't open thousands of file handles
/// or HTTP requests at once.
const MAX_CONCURRENT_STARTUP_TASKS: usize = 16;

fn hash_content(content: &FileContent) -> String {
    let mut hasher = Sha256::new();
    match content {
        FileContent::Text(s) => hasher.update(s.as_bytes()),
        FileContent::Binary(bytes) => hasher.update(bytes),
    }
    format!("{:x}", hasher.finalize())
}

impl Reconciler {
    /// Runs the full startup sequence: fetch the remote file list, diff it
    /// against what's on disk, and reconcile every divergence according to
    /// the configured `ConflictResolution` policy. Populates the cache as a
    /// side effect; must run before the websocket reader starts dispatching
    /// live chunk/event traffic.
    pub async fn init(&self) -> Result<()> {
        let remote_files = self.api.fetch_remote_files().await?;
        let local_stats = self.storage.list("", ListOptions { recursive: true }).await?;

        let remote_by_path: HashMap<String, File> =
            remote_files.into_iter().map(|f| (f.workspace_path.clone(), f)).collect();
        let local_by_path: HashMap<String, Stat> =
            local_stats.into_iter().map(|s| (s.path.clone(), s)).collect();

        let mut paths: Vec<String> = remote_by_path.keys().chain(local_by_path.keys()).cloned().collect();
        paths.sort();
        paths.dedup();

        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_STARTUP_TASKS));
        let mut tasks = Vec::with_capacity(paths.len());

        for path in paths {
            let remote = remote_by_path.get(&path).cloned();
            let local = local_by_path.get(&path).cloned();
            let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");

            tasks.push(async move {
                let _permit = permit;
                self.reconcile_one_path(&path, remote, local).await
            });
        }

        let results = join_all(tasks).await;
        for result in results {
            // One file's reconciliation failure doesn't abort the rest; log
            // and move on, matching the "never fatal for the whole batch"
            // policy documented on `ReconcileError`.
            if let Err(err) = result {
                tracing::warn!(error = %err, "startup reconciliation failed for one file");
            }
        }

        Ok(())
    }

    async fn reconcile_one_path(
        &self,
        path: &str,
        remote: Option<File>,
        local: Option<Stat>,
    ) -> Result<()> {
        match (remote, local) {
            (Some(remote), None) => self.pull_remote_only(remote).await,
            (None, Some(_)) => self.push_local_only(path).await,
            (Some(remote), Some(_)) => self.reconcile_both_sides(remote, path).await,
            (None, None) => Ok(()),
        }
    }

    async fn pull_remote_only(&self, remote: File) -> Result<()> {
        self.storage
            .write(&remote.workspace_path, &remote.content, WriteOptions { suppress_watch_echo: true, is_dir: false })
            .await?;
        self.cache.create(remote);
        Ok(())
    }

    async fn push_local_only(&self, path: &str) -> Result<()> {
        let content = self.storage.read(path).await?;
        let created = self.api.push_create(path, &content).await?;
        self.cache.create(created);
        Ok(())
    }

    async fn reconcile_both_sides(&self, remote: File, path: &str) -> Result<()> {
        let local_content = self.storage.read(path).await?;
        if hash_content(&local_content) == remote.hash {
            self.cache.create(File { content: local_content, ..remote });
            return Ok(());
        }

        if !remote.is_text() {
            // Binary divergence is always remote-wins; there is no delta
            // sync or merge for opaque byte content.
            self.storage
                .write(path, &remote.content, WriteOptions { suppress_watch_echo: true, is_dir: false })
                .await?;
            self.cache.create(remote);
            return Ok(());
        }

        let remote_text = remote.content.as_text().unwrap_or_default().to_string();
        let local_text = local_content.as_text().map(str::to_string).unwrap_or_default();

        match self.conflict_resolution {
            ConflictResolution::Remote => {
                self.storage
                    .write(path, &remote.content, WriteOptions { suppress_watch_echo: true, is_dir: false })
                    .await?;
                self.cache.create(remote);
            }
            ConflictResolution::Local => {
                self.apply_local_wins(remote, local_text).await?;
            }
            ConflictResolution::Merge => {
                match self.diff_modal.resolve(&local_text, &remote_text).await? {
                    ConflictChoice::KeepRemote => {
                        self.storage
                            .write(path, &remote.content, WriteOptions { suppress_watch_echo: true, is_dir: false })
                            .await?;
                        self.cache.create(remote);
                    }
                    ConflictChoice::KeepLocal => {
                        self.apply_local_wins(remote, local_text).await?;
                    }
                    ConflictChoice::Merged(merged) => {
                        self.apply_merge_result(remote, remote_text, merged).await?;
                    }
                }
            }
        }
        Ok(())
    }

    /// `local` conflict strategy: the local copy wins outright. Cache and
    /// keep the local text as-is (it is already on disk; nothing to write),
    /// and if it actually differs from what the server last confirmed, tell
    /// the server via a forced-overwrite `ChunkMessage` at the file's current
    /// version. Not pushed to the outbound deque: this is a forced overwrite,
    /// not an ack-tracked edit (see DESIGN.md for the rollback-on-reject
    /// rationale).
    async fn apply_local_wins(&self, remote: File, local_text: String) -> Result<()> {
        let remote_text = remote.content.as_text().unwrap_or_default();
        let chunks = compute_diff(remote_text, &local_text);
        let file_id = remote.id;
        let version = remote.version;
        self.cache.create(File { content: FileContent::Text(local_text), ..remote });
        if !chunks.is_empty() {
            self.ws.send_chunk(ChunkMessage { file_id, version, chunks }).await?;
        }
        Ok(())
    }

    /// `merge` conflict strategy, user resolved to a merged string: persist
    /// it locally, cache it, and send the server the diff from its last-known
    /// content as a `ChunkMessage` pushed to the deque — unlike the `local`
    /// strategy, this one is ack-tracked and rolls back like any other edit
    /// if the server rejects it.
    async fn apply_merge_result(&self, remote: File, remote_text: String, merged: String) -> Result<()> {
        let file_id = remote.id;
        let version = remote.version;
        let chunks = compute_diff(&remote_text, &merged);
        let content = FileContent::Text(merged);
        self.storage
            .write(&remote.workspace_path, &content, WriteOptions { suppress_watch_echo: true, is_dir: false })
            .await?;
        self.cache.create(File { content, ..remote });
        if !chunks.is_empty() {
            let msg = ChunkMessage { file_id, version, chunks };
            self.deques.with_deque(file_id, |d| d.add_back(msg.clone()));
            self.ws.send_chunk(msg).await?;
        }
        Ok(())
    }
}
