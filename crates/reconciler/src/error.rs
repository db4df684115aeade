//! Error taxonomy for the reconciliation engine.

use synctree_model::FileId;
use thiserror::Error;

/// Every error kind the Reconciler can produce or propagate.
///
/// Policy: not-found, stale-version and unrecognized-conflict
/// errors are always logged and swallowed by the caller, never fatal.
/// Non-contiguous history is fatal *for that one operation* — the caller
/// returns it as `Err`, but the file recovers on the next inbound chunk that
/// triggers another gap-fill. Storage/transport/API errors propagate so a
/// per-file batch future settles as rejected without aborting its siblings.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("file {0} not found in cache")]
    FileNotFound(FileId),

    #[error("path {0:?} not found in cache")]
    PathNotFound(String),

    #[error(
        "stale chunk message for file {file_id}: message version {msg_version} < cached version {cached_version}"
    )]
    StaleVersion {
        file_id: FileId,
        msg_version: u64,
        cached_version: u64,
    },

    #[error(
        "non-contiguous operation history for file {file_id}: expected version {expected}, got {got}"
    )]
    NonContiguousHistory {
        file_id: FileId,
        expected: u64,
        got: u64,
    },

    #[error("unrecognized conflict resolution strategy {0:?}")]
    UnrecognizedConflictStrategy(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("api error: {0}")]
    Api(String),

    #[error("diff modal error: {0}")]
    DiffModal(String),
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
