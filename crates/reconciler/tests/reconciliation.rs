//! End-to-end reconciliation scenarios against in-memory fakes of every
//! adapter port: no real filesystem, HTTP or websocket involved.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::Arc;

use async_trait::async_trait;

use synctree_diff::DiffChunk;
use synctree_model::{ChunkMessage, ConflictResolution, EventMessage, File, FileContent, FileId, OperationRecord};
use synctree_reconciler::{
    ApiClient, ConflictChoice, DeleteOptions, DiffModal, ListOptions, ObjectKind, Reconciler, Result, Stat, Storage,
    WriteOptions, WsClient,
};

#[derive(Default)]
struct FakeStorage {
    files: Mutex<HashMap<String, FileContent>>,
}

#[async_trait]
impl Storage for FakeStorage {
    async fn read(&self, path: &str) -> Result<FileContent> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| synctree_reconciler::ReconcileError::PathNotFound(path.to_string()))
    }

    async fn write(&self, path: &str, content: &FileContent, _opts: WriteOptions) -> Result<()> {
        self.files.lock().unwrap().insert(path.to_string(), content.clone());
        Ok(())
    }

    async fn delete(&self, path: &str, _opts: DeleteOptions) -> Result<()> {
        self.files.lock().unwrap().remove(path);
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let mut files = self.files.lock().unwrap();
        if let Some(content) = files.remove(from) {
            files.insert(to.to_string(), content);
        }
        Ok(())
    }

    async fn stat(&self, path: &str) -> Result<Option<Stat>> {
        Ok(self.files.lock().unwrap().contains_key(path).then(|| Stat {
            path: path.to_string(),
            kind: ObjectKind::File,
        }))
    }

    async fn list(&self, prefix: &str, _opts: ListOptions) -> Result<Vec<Stat>> {
        let needle = if prefix.is_empty() { String::new() } else { format!("{prefix}/") };
        Ok(self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter(|p| p.starts_with(&needle))
            .map(|p| Stat { path: p.clone(), kind: ObjectKind::File })
            .collect())
    }
}

#[derive(Default)]
struct FakeApi {
    remote_files: Mutex<Vec<File>>,
    history: Mutex<HashMap<FileId, Vec<OperationRecord>>>,
    pushed_creates: Mutex<Vec<(String, FileContent)>>,
}

#[async_trait]
impl ApiClient for FakeApi {
    async fn fetch_remote_files(&self) -> Result<Vec<File>> {
        Ok(self.remote_files.lock().unwrap().clone())
    }

    async fn fetch_file_history(&self, file_id: FileId, since_version: u64) -> Result<Vec<OperationRecord>> {
        Ok(self
            .history
            .lock()
            .unwrap()
            .get(&file_id)
            .map(|records| records.iter().filter(|r| r.version >= since_version).cloned().collect())
            .unwrap_or_default())
    }

    async fn push_create(&self, workspace_path: &str, content: &FileContent) -> Result<File> {
        self.pushed_creates.lock().unwrap().push((workspace_path.to_string(), content.clone()));
        Ok(File {
            id: FileId(999),
            workspace_path: workspace_path.to_string(),
            mime_type: "text/markdown".to_string(),
            hash: "hash".to_string(),
            version: 0,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
            content: content.clone(),
        })
    }

    async fn push_delete(&self, _file_id: FileId) -> Result<()> {
        Ok(())
    }

    async fn push_rename(&self, file_id: FileId, new_path: &str) -> Result<File> {
        Ok(File {
            id: file_id,
            workspace_path: new_path.to_string(),
            mime_type: "text/markdown".to_string(),
            hash: "hash".to_string(),
            version: 0,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
            content: FileContent::Text(String::new()),
        })
    }
}

#[derive(Default)]
struct FakeWs {
    sent_chunks: Mutex<Vec<ChunkMessage>>,
    sent_events: Mutex<Vec<EventMessage>>,
}

#[async_trait]
impl WsClient for FakeWs {
    async fn send_chunk(&self, msg: ChunkMessage) -> Result<()> {
        self.sent_chunks.lock().unwrap().push(msg);
        Ok(())
    }

    async fn send_event(&self, event: EventMessage) -> Result<()> {
        self.sent_events.lock().unwrap().push(event);
        Ok(())
    }
}

struct FakeDiffModal {
    choice: ConflictChoice,
}

#[async_trait]
impl DiffModal for FakeDiffModal {
    async fn resolve(&self, _local: &str, _remote: &str) -> Result<ConflictChoice> {
        Ok(self.choice.clone())
    }
}

fn file(id: u64, path: &str, version: u64, text: &str) -> File {
    File {
        id: FileId(id),
        workspace_path: path.to_string(),
        mime_type: "text/markdown".to_string(),
        hash: "irrelevant-for-these-tests".to_string(),
        version,
        created_at: "2026-01-01T00:00:00Z".to_string(),
        updated_at: "2026-01-01T00:00:00Z".to_string(),
        content: FileContent::Text(text.to_string()),
    }
}

fn build(
    storage: Arc<FakeStorage>,
    api: Arc<FakeApi>,
    ws: Arc<FakeWs>,
    resolution: ConflictResolution,
) -> Reconciler {
    Reconciler::new(
        storage,
        api,
        ws,
        Arc::new(FakeDiffModal { choice: ConflictChoice::KeepRemote }),
        resolution,
    )
}

#[tokio::test]
async fn local_edit_queues_outbound_chunk_but_does_not_touch_cache_content() {
    let storage = Arc::new(FakeStorage::default());
    let api = Arc::new(FakeApi::default());
    let ws = Arc::new(FakeWs::default());
    let reconciler = build(storage, api, ws.clone(), ConflictResolution::Remote);

    reconciler.cache().create(file(1, "a.md", 0, "hello"));

    reconciler.modify_local("a.md", FileContent::Text("hello!".to_string())).await.unwrap();

    // The cache stays at the last server-confirmed content until the ack
    // arrives; only the ack (tested below) advances it.
    let cached = reconciler.cache().get_by_id(FileId(1)).unwrap();
    assert_eq!(cached.content, FileContent::Text("hello".to_string()));
    assert_eq!(cached.version, 0);

    let sent = ws.sent_chunks.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].version, 0);
    assert_eq!(sent[0].chunks, vec![DiffChunk::add(5, "!")]);
}

#[tokio::test]
async fn server_ack_removes_queued_message_and_bumps_version() {
    let storage = Arc::new(FakeStorage::default());
    let api = Arc::new(FakeApi::default());
    let ws = Arc::new(FakeWs::default());
    let reconciler = build(storage, api, ws, ConflictResolution::Remote);

    reconciler.cache().create(file(1, "a.md", 0, "hello"));
    reconciler.modify_local("a.md", FileContent::Text("hello!".to_string())).await.unwrap();

    // The server echoes the client's own chunks back at clientSentVersion + 1.
    let ack = ChunkMessage {
        file_id: FileId(1),
        version: 1,
        chunks: vec![DiffChunk::add(5, "!")],
    };
    reconciler.handle_chunk_message(ack).await.unwrap();

    let cached = reconciler.cache().get_by_id(FileId(1)).unwrap();
    assert_eq!(cached.version, 1);
    assert_eq!(cached.content, FileContent::Text("hello!".to_string()));
}

#[tokio::test]
async fn remote_edit_at_matching_version_applies_directly() {
    let storage = Arc::new(FakeStorage::default());
    storage.files.lock().unwrap().insert("a.md".to_string(), FileContent::Text("hello".to_string()));
    let api = Arc::new(FakeApi::default());
    let ws = Arc::new(FakeWs::default());
    let reconciler = build(storage.clone(), api, ws, ConflictResolution::Remote);

    reconciler.cache().create(file(1, "a.md", 0, "hello"));

    let remote_edit = ChunkMessage {
        file_id: FileId(1),
        version: 1,
        chunks: vec![DiffChunk::add(0, ">> ")],
    };
    reconciler.handle_chunk_message(remote_edit).await.unwrap();

    let cached = reconciler.cache().get_by_id(FileId(1)).unwrap();
    assert_eq!(cached.version, 1);
    assert_eq!(cached.content, FileContent::Text(">> hello".to_string()));
    assert_eq!(storage.files.lock().unwrap().get("a.md"), Some(&FileContent::Text(">> hello".to_string())));
}

#[tokio::test]
async fn remote_edit_rolls_back_unacked_local_queue_and_discards_it() {
    let storage = Arc::new(FakeStorage::default());
    let api = Arc::new(FakeApi::default());
    let ws = Arc::new(FakeWs::default());
    let reconciler = build(storage.clone(), api, ws.clone(), ConflictResolution::Remote);

    reconciler.cache().create(file(1, "a.md", 0, "abc"));
    // The host editor already wrote the optimistic local edit to disk.
    storage.files.lock().unwrap().insert("a.md".to_string(), FileContent::Text("abcX".to_string()));
    reconciler.modify_local("a.md", FileContent::Text("abcX".to_string())).await.unwrap();
    assert_eq!(reconciler.cache().get_by_id(FileId(1)).unwrap().content, FileContent::Text("abc".to_string()));

    // A concurrent, unrelated remote edit against the same last-confirmed base.
    let remote_edit = ChunkMessage {
        file_id: FileId(1),
        version: 1,
        chunks: vec![DiffChunk::add(0, "Z")],
    };
    reconciler.handle_chunk_message(remote_edit).await.unwrap();

    // Storage is rolled back past our own unacked "X", then the remote edit
    // is applied on top of the server-confirmed base: "abc" -> "Zabc".
    let cached = reconciler.cache().get_by_id(FileId(1)).unwrap();
    assert_eq!(cached.content, FileContent::Text("Zabc".to_string()));
    assert_eq!(cached.version, 1);
    assert_eq!(storage.files.lock().unwrap().get("a.md"), Some(&FileContent::Text("Zabc".to_string())));

    // The queued local send is discarded, not replayed: the user's unacked
    // typing is re-derived from the next local-modify event instead.
    let sent = ws.sent_chunks.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].chunks, vec![DiffChunk::add(3, "X")]);
}

#[tokio::test]
async fn version_gap_triggers_history_fetch_before_applying() {
    let storage = Arc::new(FakeStorage::default());
    storage.files.lock().unwrap().insert("a.md".to_string(), FileContent::Text("hello".to_string()));
    let api = Arc::new(FakeApi::default());
    let ws = Arc::new(FakeWs::default());

    api.history.lock().unwrap().insert(
        FileId(1),
        vec![OperationRecord {
            file_id: FileId(1),
            version: 1,
            operation: vec![DiffChunk::add(5, "!")],
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }],
    );

    let reconciler = build(storage.clone(), api, ws, ConflictResolution::Remote);
    reconciler.cache().create(file(1, "a.md", 0, "hello"));

    let msg = ChunkMessage {
        file_id: FileId(1),
        version: 2,
        chunks: vec![DiffChunk::add(6, "?")],
    };
    reconciler.handle_chunk_message(msg).await.unwrap();

    let cached = reconciler.cache().get_by_id(FileId(1)).unwrap();
    assert_eq!(cached.content, FileContent::Text("hello!?".to_string()));
    assert_eq!(cached.version, 2);
}

#[tokio::test]
async fn non_contiguous_history_is_fatal_for_that_chunk() {
    let storage = Arc::new(FakeStorage::default());
    storage.files.lock().unwrap().insert("a.md".to_string(), FileContent::Text("hello".to_string()));
    let api = Arc::new(FakeApi::default());
    let ws = Arc::new(FakeWs::default());

    // History is missing version 1 entirely: server returns version 2 first.
    api.history.lock().unwrap().insert(
        FileId(1),
        vec![OperationRecord {
            file_id: FileId(1),
            version: 2,
            operation: vec![DiffChunk::add(5, "!")],
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }],
    );

    let reconciler = build(storage, api, ws, ConflictResolution::Remote);
    reconciler.cache().create(file(1, "a.md", 0, "hello"));

    let msg = ChunkMessage {
        file_id: FileId(1),
        version: 3,
        chunks: vec![DiffChunk::add(6, "?")],
    };
    let err = reconciler.handle_chunk_message(msg).await.unwrap_err();
    assert!(matches!(err, synctree_reconciler::ReconcileError::NonContiguousHistory { .. }));
}

#[tokio::test]
async fn startup_pulls_remote_only_file_to_disk() {
    let storage = Arc::new(FakeStorage::default());
    let api = Arc::new(FakeApi::default());
    let ws = Arc::new(FakeWs::default());

    api.remote_files.lock().unwrap().push(file(7, "notes/todo.md", 3, "buy milk"));

    let reconciler = build(storage.clone(), api, ws, ConflictResolution::Remote);
    reconciler.init().await.unwrap();

    assert_eq!(
        storage.files.lock().unwrap().get("notes/todo.md"),
        Some(&FileContent::Text("buy milk".to_string()))
    );
    assert!(reconciler.cache().has_by_id(FileId(7)));
}

#[tokio::test]
async fn startup_pushes_local_only_file_to_server() {
    let storage = Arc::new(FakeStorage::default());
    storage.files.lock().unwrap().insert("draft.md".to_string(), FileContent::Text("wip".to_string()));

    let api = Arc::new(FakeApi::default());
    let ws = Arc::new(FakeWs::default());

    let reconciler = build(storage, api.clone(), ws, ConflictResolution::Remote);
    reconciler.init().await.unwrap();

    let pushed = api.pushed_creates.lock().unwrap();
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0].0, "draft.md");
}

#[tokio::test]
async fn startup_conflict_under_remote_policy_overwrites_local() {
    let storage = Arc::new(FakeStorage::default());
    storage.files.lock().unwrap().insert("a.md".to_string(), FileContent::Text("local version".to_string()));

    let api = Arc::new(FakeApi::default());
    api.remote_files.lock().unwrap().push(file(1, "a.md", 2, "remote version"));

    let ws = Arc::new(FakeWs::default());
    let reconciler = build(storage.clone(), api, ws, ConflictResolution::Remote);
    reconciler.init().await.unwrap();

    assert_eq!(
        storage.files.lock().unwrap().get("a.md"),
        Some(&FileContent::Text("remote version".to_string()))
    );
}

#[tokio::test]
async fn remote_delete_event_removes_cached_file_and_local_copy() {
    let storage = Arc::new(FakeStorage::default());
    storage.files.lock().unwrap().insert("a.md".to_string(), FileContent::Text("hello".to_string()));

    let api = Arc::new(FakeApi::default());
    let ws = Arc::new(FakeWs::default());
    let reconciler = build(storage.clone(), api, ws, ConflictResolution::Remote);
    reconciler.cache().create(file(1, "a.md", 0, "hello"));

    reconciler
        .handle_event(EventMessage::Delete {
            file_id: Some(FileId(1)),
            workspace_path: "a.md".to_string(),
            object_type: synctree_model::ObjectType::File,
        })
        .await
        .unwrap();

    assert!(!reconciler.cache().has_by_id(FileId(1)));
    assert!(storage.files.lock().unwrap().get("a.md").is_none());
}

#[tokio::test]
async fn startup_conflict_under_local_strategy_keeps_local_and_sends_forced_overwrite() {
    let storage = Arc::new(FakeStorage::default());
    storage.files.lock().unwrap().insert("a.md".to_string(), FileContent::Text("localremote".to_string()));

    let api = Arc::new(FakeApi::default());
    api.remote_files.lock().unwrap().push(file(1, "a.md", 5, "remote"));

    let ws = Arc::new(FakeWs::default());
    let reconciler = build(storage.clone(), api, ws.clone(), ConflictResolution::Local);
    reconciler.init().await.unwrap();

    // Local wins outright: local content is untouched on disk and in cache.
    assert_eq!(storage.files.lock().unwrap().get("a.md"), Some(&FileContent::Text("localremote".to_string())));
    let cached = reconciler.cache().get_by_id(FileId(1)).unwrap();
    assert_eq!(cached.content, FileContent::Text("localremote".to_string()));

    // The server is told about the difference as a forced-overwrite chunk at
    // the file's currently-known version, not pushed to the outbound deque.
    let sent = ws.sent_chunks.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].version, 5);
    assert_eq!(sent[0].chunks, vec![DiffChunk::add(0, "local")]);
}

#[tokio::test]
async fn startup_conflict_under_merge_strategy_sends_diff_from_remote_to_merged() {
    let storage = Arc::new(FakeStorage::default());
    storage.files.lock().unwrap().insert("a.md".to_string(), FileContent::Text("local".to_string()));

    let api = Arc::new(FakeApi::default());
    api.remote_files.lock().unwrap().push(file(1, "a.md", 5, "remote"));

    let ws = Arc::new(FakeWs::default());
    let reconciler = Reconciler::new(
        storage.clone(),
        api,
        ws.clone(),
        Arc::new(FakeDiffModal { choice: ConflictChoice::Merged("localremote".to_string()) }),
        ConflictResolution::Merge,
    );
    reconciler.init().await.unwrap();

    assert_eq!(storage.files.lock().unwrap().get("a.md"), Some(&FileContent::Text("localremote".to_string())));
    let cached = reconciler.cache().get_by_id(FileId(1)).unwrap();
    assert_eq!(cached.content, FileContent::Text("localremote".to_string()));

    // Diff from the remote's last-known content to the merged result, at the
    // server's current version, pushed to the deque like any other edit.
    let sent = ws.sent_chunks.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].version, 5);
    assert_eq!(sent[0].chunks, vec![DiffChunk::add(0, "local")]);
}

#[tokio::test]
async fn create_local_directory_announces_folder_event_without_upload() {
    let storage = Arc::new(FakeStorage::default());
    let api = Arc::new(FakeApi::default());
    let ws = Arc::new(FakeWs::default());
    let reconciler = build(storage, api.clone(), ws.clone(), ConflictResolution::Remote);

    reconciler.create_local("notes", ObjectKind::Directory).await.unwrap();

    assert!(api.pushed_creates.lock().unwrap().is_empty());
    let sent = ws.sent_events.lock().unwrap();
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        EventMessage::Create { file_id, workspace_path, object_type } => {
            assert!(file_id.is_none());
            assert_eq!(workspace_path, "notes");
            assert_eq!(*object_type, synctree_model::ObjectType::Folder);
        }
        other => panic!("expected a folder Create event, got {other:?}"),
    }
}

#[tokio::test]
async fn create_local_file_is_idempotent_once_cached() {
    let storage = Arc::new(FakeStorage::default());
    let api = Arc::new(FakeApi::default());
    let ws = Arc::new(FakeWs::default());
    let reconciler = build(storage.clone(), api.clone(), ws, ConflictResolution::Remote);
    reconciler.cache().create(file(1, "a.md", 0, "hello"));

    storage.files.lock().unwrap().insert("a.md".to_string(), FileContent::Text("hello".to_string()));
    reconciler.create_local("a.md", ObjectKind::File).await.unwrap();

    assert!(api.pushed_creates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn delete_local_folder_removes_every_contained_file_and_sends_one_folder_event() {
    let storage = Arc::new(FakeStorage::default());
    let api = Arc::new(FakeApi::default());
    let ws = Arc::new(FakeWs::default());
    let reconciler = build(storage, api, ws.clone(), ConflictResolution::Remote);

    reconciler.cache().create(file(1, "notes/a.md", 0, "a"));
    reconciler.cache().create(file(2, "notes/sub/b.md", 0, "b"));
    reconciler.cache().create(file(3, "notesize.md", 0, "unrelated"));

    reconciler.delete_local("notes").await.unwrap();

    assert!(!reconciler.cache().has_by_id(FileId(1)));
    assert!(!reconciler.cache().has_by_id(FileId(2)));
    assert!(reconciler.cache().has_by_id(FileId(3)), "sibling path sharing the prefix as a substring must survive");

    let sent = ws.sent_events.lock().unwrap();
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        EventMessage::Delete { file_id, workspace_path, object_type } => {
            assert!(file_id.is_none());
            assert_eq!(workspace_path, "notes");
            assert_eq!(*object_type, synctree_model::ObjectType::Folder);
        }
        other => panic!("expected a folder Delete event, got {other:?}"),
    }
}

#[tokio::test]
async fn remote_delete_event_for_unknown_file_warns_and_skips() {
    let storage = Arc::new(FakeStorage::default());
    let api = Arc::new(FakeApi::default());
    let ws = Arc::new(FakeWs::default());
    let reconciler = build(storage.clone(), api, ws, ConflictResolution::Remote);

    // No cached entry for this id or path: should be a no-op, not an error.
    reconciler
        .handle_event(EventMessage::Delete {
            file_id: Some(FileId(42)),
            workspace_path: "ghost.md".to_string(),
            object_type: synctree_model::ObjectType::File,
        })
        .await
        .unwrap();

    assert!(!reconciler.cache().has_by_id(FileId(42)));
}

#[tokio::test]
async fn remote_rename_event_for_unknown_file_fetches_and_creates_at_new_path() {
    let storage = Arc::new(FakeStorage::default());
    let api = Arc::new(FakeApi::default());
    let ws = Arc::new(FakeWs::default());
    api.remote_files.lock().unwrap().push(file(9, "renamed.md", 2, "moved content"));
    let reconciler = build(storage.clone(), api, ws, ConflictResolution::Remote);

    // The cache never saw a Create for this file; the rename event is the
    // first time it's heard of, so it should be fetched and written fresh.
    reconciler
        .handle_event(EventMessage::Rename {
            file_id: Some(FileId(9)),
            old_workspace_path: "old.md".to_string(),
            new_workspace_path: "renamed.md".to_string(),
            object_type: synctree_model::ObjectType::File,
        })
        .await
        .unwrap();

    assert_eq!(
        storage.files.lock().unwrap().get("renamed.md"),
        Some(&FileContent::Text("moved content".to_string()))
    );
    assert!(reconciler.cache().has_by_id(FileId(9)));
}

#[tokio::test(start_paused = true)]
async fn rename_local_folder_moves_every_contained_file_and_drains_old_path() {
    let storage = Arc::new(FakeStorage::default());
    let api = Arc::new(FakeApi::default());
    let ws = Arc::new(FakeWs::default());
    let reconciler = build(storage.clone(), api, ws.clone(), ConflictResolution::Remote);

    reconciler.cache().create(file(1, "notes/a.md", 0, "a"));
    reconciler.cache().create(file(2, "notes/sub/b.md", 0, "b"));

    reconciler.rename_local("notes", "archive").await.unwrap();

    let moved_a = reconciler.cache().get_by_id(FileId(1)).unwrap();
    let moved_b = reconciler.cache().get_by_id(FileId(2)).unwrap();
    assert_eq!(moved_a.workspace_path, "archive/a.md");
    assert_eq!(moved_b.workspace_path, "archive/sub/b.md");

    let sent = ws.sent_events.lock().unwrap();
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        EventMessage::Rename { file_id, old_workspace_path, new_workspace_path, object_type } => {
            assert!(file_id.is_none());
            assert_eq!(old_workspace_path, "notes");
            assert_eq!(new_workspace_path, "archive");
            assert_eq!(*object_type, synctree_model::ObjectType::Folder);
        }
        other => panic!("expected a folder Rename event, got {other:?}"),
    }
}

#[tokio::test]
async fn local_cursor_update_for_uncached_path_is_dropped() {
    let storage = Arc::new(FakeStorage::default());
    let api = Arc::new(FakeApi::default());
    let ws = Arc::new(FakeWs::default());
    let reconciler = build(storage, api, ws, ConflictResolution::Remote);

    assert!(reconciler.local_cursor_update("missing.md", "me", 3).is_none());
}

#[tokio::test]
async fn local_cursor_update_for_cached_path_resolves_to_its_file_id() {
    let storage = Arc::new(FakeStorage::default());
    let api = Arc::new(FakeApi::default());
    let ws = Arc::new(FakeWs::default());
    let reconciler = build(storage, api, ws, ConflictResolution::Remote);
    reconciler.cache().create(file(1, "a.md", 0, "hello"));

    let update = reconciler.local_cursor_update("a.md", "me", 3).unwrap();
    assert_eq!(update.file_id, FileId(1));
    assert_eq!(update.position, 3);
}

#[tokio::test]
async fn remote_cursor_for_unfocused_file_clears_any_previous_position() {
    let storage = Arc::new(FakeStorage::default());
    let api = Arc::new(FakeApi::default());
    let ws = Arc::new(FakeWs::default());
    let reconciler = build(storage, api, ws, ConflictResolution::Remote);

    let update = synctree_reconciler::CursorUpdate { file_id: FileId(1), peer_id: "peer-a".to_string(), position: 5 };
    reconciler.handle_remote_cursor(update.clone(), true);
    assert_eq!(reconciler.cursors().live_for_file(FileId(1)), vec![("peer-a".to_string(), 5)]);

    reconciler.handle_remote_cursor(update, false);
    assert!(reconciler.cursors().live_for_file(FileId(1)).is_empty());
}
