//! Wire and cache data model for the synctree reconciliation engine.
//!
//! Every type here is `Serialize`/`Deserialize` so it can cross the HTTP and
//! WebSocket boundaries without a second parallel representation, and every
//! optional-by-convention field from the source protocol (file ids on folder
//! events, for instance) is an explicit `Option` rather than a sentinel value.

use serde::{Deserialize, Serialize};
use synctree_diff::DiffChunk;

/// Server-assigned id for a file, stable for the lifetime of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u64);

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A file's content, typed so "text vs binary" is a type invariant rather than
/// a runtime check scattered across call sites.
///
/// Deliberately not `Serialize`/`Deserialize`: the wire never carries a
/// `FileContent` directly (text vs. base64-binary is decided by `mime_type` at
/// the multipart decode boundary in `synctree-sync-api`, not guessed by serde),
/// so building one is always an explicit, mime-aware constructor call.
#[derive(Debug, Clone, PartialEq)]
pub enum FileContent {
    Text(String),
    Binary(Vec<u8>),
}

impl FileContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FileContent::Text(s) => Some(s),
            FileContent::Binary(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, FileContent::Text(_))
    }
}

/// A cached file: the client's in-memory mirror of one server-side file.
///
/// Invariant: `version` only ever increases, and an ack bumps `version` and
/// replaces `content` atomically (see `synctree_reconciler::Reconciler::handle_chunk_message`).
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub id: FileId,
    pub workspace_path: String,
    pub mime_type: String,
    pub hash: String,
    pub version: u64,
    pub created_at: String,
    pub updated_at: String,
    pub content: FileContent,
}

impl File {
    pub fn is_text(&self) -> bool {
        self.content.is_text()
    }
}

/// Lightweight metadata returned by `GET /v1/api/file` (no content).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub id: FileId,
    pub workspace_path: String,
    pub mime_type: String,
    pub hash: String,
    pub version: u64,
    pub created_at: String,
    pub updated_at: String,
}

/// An in-flight, not-yet-acked outbound operation, or an inbound one applied
/// by a peer. `version` is the version the sender believed was current
/// *before* applying these chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMessage {
    pub file_id: FileId,
    pub version: u64,
    pub chunks: Vec<DiffChunk>,
}

impl ChunkMessage {
    /// Shallow, element-wise equality on chunk content — used by the ack
    /// detector in `handle_chunk_message`. Deliberately ignores `version`:
    /// the whole point is comparing a queued send against an echoed ack whose
    /// `version` differs by construction.
    pub fn same_chunks(&self, other: &ChunkMessage) -> bool {
        self.chunks == other.chunks
    }
}

/// Whether an EventMessage concerns a single file or an entire folder (the
/// server infers folders from file paths; the event still carries folder
/// intent so peers can react without waiting for every contained file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    File,
    Folder,
}

/// A filesystem-shape event (create/delete/rename), fanned out to peers.
///
/// Re-expressed as a closed enum rather than a flat `{fileId, workspacePath,
/// objectType, type}` struct: `Rename` is the only variant that needs both an
/// old and a new path, and a sum type makes that explicit instead of leaving
/// one field meaningless for two of the three variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventMessage {
    Create {
        #[serde(rename = "fileId")]
        file_id: Option<FileId>,
        #[serde(rename = "workspacePath")]
        workspace_path: String,
        #[serde(rename = "objectType")]
        object_type: ObjectType,
    },
    Delete {
        #[serde(rename = "fileId")]
        file_id: Option<FileId>,
        #[serde(rename = "workspacePath")]
        workspace_path: String,
        #[serde(rename = "objectType")]
        object_type: ObjectType,
    },
    Rename {
        #[serde(rename = "fileId")]
        file_id: Option<FileId>,
        #[serde(rename = "oldWorkspacePath")]
        old_workspace_path: String,
        #[serde(rename = "newWorkspacePath")]
        new_workspace_path: String,
        #[serde(rename = "objectType")]
        object_type: ObjectType,
    },
}

impl EventMessage {
    pub fn object_type(&self) -> ObjectType {
        match self {
            EventMessage::Create { object_type, .. }
            | EventMessage::Delete { object_type, .. }
            | EventMessage::Rename { object_type, .. } => *object_type,
        }
    }
}

/// One row of `GET /v1/api/operation?fileId=..&from=..`: a historical chunk
/// batch the client missed, used by gap-fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRecord {
    pub file_id: FileId,
    pub version: u64,
    pub operation: Vec<DiffChunk>,
    pub created_at: String,
}

/// The startup conflict-resolution policy a workspace is configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictResolution {
    Remote,
    Local,
    #[default]
    Merge,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_content_distinguishes_text_and_binary() {
        let text = FileContent::Text("hello".into());
        assert!(text.is_text());
        assert_eq!(text.as_text(), Some("hello"));

        let binary = FileContent::Binary(vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(!binary.is_text());
        assert_eq!(binary.as_text(), None);
    }

    #[test]
    fn event_message_rename_carries_old_and_new_path() {
        let event = EventMessage::Rename {
            file_id: Some(FileId(4)),
            old_workspace_path: "a.md".into(),
            new_workspace_path: "b.md".into(),
            object_type: ObjectType::File,
        };
        let encoded = serde_json::to_string(&event).unwrap();
        let decoded: EventMessage = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn chunk_message_same_chunks_ignores_version() {
        let chunks = vec![DiffChunk::add(0, "x")];
        let sent = ChunkMessage {
            file_id: FileId(1),
            version: 3,
            chunks: chunks.clone(),
        };
        let ack = ChunkMessage {
            file_id: FileId(1),
            version: 4,
            chunks,
        };
        assert!(sent.same_chunks(&ack));
    }
}
