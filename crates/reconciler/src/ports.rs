//! Adapter seams: everything the reconciliation engine needs from
//! the outside world, expressed as traits so the engine itself stays free of
//! any concrete filesystem, HTTP or websocket dependency. Concrete
//! implementations live in `synctree-storage`, `synctree-sync-api` and
//! `synctree-sync-ws`; tests in this crate use fakes built directly against
//! these traits.

use async_trait::async_trait;

use synctree_model::{ChunkMessage, EventMessage, File, FileContent, FileId, OperationRecord};

use crate::error::Result;

/// The kind of filesystem object a local path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    File,
    Directory,
}

/// Minimal local filesystem metadata, analogous to `std::fs::Metadata` but
/// trimmed to what reconciliation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub path: String,
    pub kind: ObjectKind,
}

#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Suppress the filesystem watcher's own echo of this write so it is
    /// not re-ingested as a local edit.
    pub suppress_watch_echo: bool,
    /// Create `path` as an empty directory instead of writing file content.
    pub is_dir: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    pub suppress_watch_echo: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub recursive: bool,
}

/// Local filesystem access, backed by `synctree-storage` in production.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn read(&self, path: &str) -> Result<FileContent>;
    async fn write(&self, path: &str, content: &FileContent, opts: WriteOptions) -> Result<()>;
    async fn delete(&self, path: &str, opts: DeleteOptions) -> Result<()>;
    async fn rename(&self, from: &str, to: &str) -> Result<()>;
    async fn stat(&self, path: &str) -> Result<Option<Stat>>;
    async fn list(&self, prefix: &str, opts: ListOptions) -> Result<Vec<Stat>>;
}

/// The workspace-sync REST surface, backed by `synctree-sync-api`.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn fetch_remote_files(&self) -> Result<Vec<File>>;
    async fn fetch_file_history(&self, file_id: FileId, since_version: u64) -> Result<Vec<OperationRecord>>;
    async fn push_create(&self, workspace_path: &str, content: &FileContent) -> Result<File>;
    async fn push_delete(&self, file_id: FileId) -> Result<()>;
    async fn push_rename(&self, file_id: FileId, new_path: &str) -> Result<File>;
}

/// The realtime chunk/event channel, backed by `synctree-sync-ws`.
#[async_trait]
pub trait WsClient: Send + Sync {
    async fn send_chunk(&self, msg: ChunkMessage) -> Result<()>;
    async fn send_event(&self, event: EventMessage) -> Result<()>;
}

/// The three-way conflict surface shown to a human at startup: out of scope
/// to implement here, a UI collaborator decides which side wins or how to
/// merge.
#[async_trait]
pub trait DiffModal: Send + Sync {
    async fn resolve(&self, local: &str, remote: &str) -> Result<ConflictChoice>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictChoice {
    KeepLocal,
    KeepRemote,
    Merged(String),
}
