//! The local filesystem adapter: an `async_trait Storage` implementation
//! backed by `tokio::fs`, plus a `notify`-based watcher that turns raw
//! filesystem events into the shape the reconciliation engine's outbound
//! path expects.

mod watch;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use synctree_model::FileContent;
use synctree_reconciler::{DeleteOptions, ListOptions, ObjectKind, ReconcileError, Result, Stat, Storage, WriteOptions};

pub use watch::{FsWatcher, WatchEvent};

fn to_storage_err(path: &Path, err: std::io::Error) -> ReconcileError {
    tracing::warn!(path = %path.display(), error = %err, "filesystem operation failed");
    ReconcileError::Storage(format!("{}: {err}", path.display()))
}

/// Tracks paths the engine itself just wrote, so the watcher can skip
/// re-ingesting that write as if it were a fresh local edit from the user.
#[derive(Default, Clone)]
pub struct SuppressSet(std::sync::Arc<Mutex<HashSet<PathBuf>>>);

impl SuppressSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn mark(&self, path: &Path) {
        self.0.lock().unwrap().insert(path.to_path_buf());
    }

    /// Returns `true` and clears the mark if `path` was suppressed; the
    /// watcher calls this once per observed event.
    pub fn take(&self, path: &Path) -> bool {
        let suppressed = self.0.lock().unwrap().remove(path);
        if suppressed {
            tracing::debug!(path = %path.display(), "suppressing watcher echo of our own write");
        }
        suppressed
    }
}

pub struct FsStorage {
    root: PathBuf,
    suppress: SuppressSet,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>, suppress: SuppressSet) -> Self {
        Self { root: root.into(), suppress }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl Storage for FsStorage {
    async fn read(&self, path: &str) -> Result<FileContent> {
        let full = self.resolve(path);
        let bytes = tokio::fs::read(&full).await.map_err(|e| to_storage_err(&full, e))?;
        match String::from_utf8(bytes) {
            Ok(text) => Ok(FileContent::Text(text)),
            Err(err) => Ok(FileContent::Binary(err.into_bytes())),
        }
    }

    async fn write(&self, path: &str, content: &FileContent, opts: WriteOptions) -> Result<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| to_storage_err(parent, e))?;
        }
        if opts.suppress_watch_echo {
            self.suppress.mark(&full);
        }
        if opts.is_dir {
            return tokio::fs::create_dir_all(&full).await.map_err(|e| to_storage_err(&full, e));
        }
        match content {
            FileContent::Text(text) => tokio::fs::write(&full, text.as_bytes()).await,
            FileContent::Binary(bytes) => tokio::fs::write(&full, bytes).await,
        }
        .map_err(|e| to_storage_err(&full, e))
    }

    async fn delete(&self, path: &str, opts: DeleteOptions) -> Result<()> {
        let full = self.resolve(path);
        if opts.suppress_watch_echo {
            self.suppress.mark(&full);
        }
        let metadata = tokio::fs::metadata(&full).await.map_err(|e| to_storage_err(&full, e))?;
        if metadata.is_dir() {
            tokio::fs::remove_dir_all(&full).await
        } else {
            tokio::fs::remove_file(&full).await
        }
        .map_err(|e| to_storage_err(&full, e))
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let full_from = self.resolve(from);
        let full_to = self.resolve(to);
        if let Some(parent) = full_to.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| to_storage_err(parent, e))?;
        }
        self.suppress.mark(&full_from);
        self.suppress.mark(&full_to);
        tokio::fs::rename(&full_from, &full_to).await.map_err(|e| to_storage_err(&full_from, e))
    }

    async fn stat(&self, path: &str) -> Result<Option<Stat>> {
        let full = self.resolve(path);
        match tokio::fs::metadata(&full).await {
            Ok(meta) => Ok(Some(Stat {
                path: path.to_string(),
                kind: if meta.is_dir() { ObjectKind::Directory } else { ObjectKind::File },
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(to_storage_err(&full, e)),
        }
    }

    async fn list(&self, prefix: &str, opts: ListOptions) -> Result<Vec<Stat>> {
        let root = self.resolve(prefix);
        let root_for_walk = root.clone();
        let recursive = opts.recursive;
        let entries = tokio::task::spawn_blocking(move || walk(&root_for_walk, recursive))
            .await
            .map_err(|e| ReconcileError::Storage(format!("list task panicked: {e}")))??;

        let base = self.root.clone();
        Ok(entries
            .into_iter()
            .map(|(path, kind)| Stat {
                path: path.strip_prefix(&base).unwrap_or(&path).to_string_lossy().replace('\\', "/"),
                kind,
            })
            .collect())
    }
}

fn walk(dir: &Path, recursive: bool) -> Result<Vec<(PathBuf, ObjectKind)>> {
    let mut out = Vec::new();
    if !dir.exists() {
        return Ok(out);
    }
    let read_dir = std::fs::read_dir(dir).map_err(|e| to_storage_err(dir, e))?;
    for entry in read_dir {
        let entry = entry.map_err(|e| to_storage_err(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| to_storage_err(&path, e))?;
        if file_type.is_dir() {
            if recursive {
                out.extend(walk(&path, recursive)?);
            }
        } else {
            out.push((path, ObjectKind::File));
        }
    }
    Ok(out)
}
