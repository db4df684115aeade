//! The in-memory authoritative mirror: `id -> file` plus a `path -> id`
//! secondary index.

use std::collections::HashMap;
use std::sync::Mutex;

use synctree_model::{File, FileContent, FileId};

#[derive(Default)]
struct Inner {
    by_id: HashMap<FileId, File>,
    by_path: HashMap<String, FileId>,
}

/// No two cached entries ever share a `workspace_path`; `set_path` is the
/// only mutator allowed to migrate one, and `delete_by_id`/`delete_by_path`
/// always remove the path binding read off the entry being deleted, never a
/// stale one passed in separately.
#[derive(Default)]
pub struct FileCache {
    inner: Mutex<Inner>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, file: File) {
        let mut inner = self.inner.lock().unwrap();
        inner.by_path.insert(file.workspace_path.clone(), file.id);
        inner.by_id.insert(file.id, file);
    }

    pub fn get_by_id(&self, id: FileId) -> Option<File> {
        self.inner.lock().unwrap().by_id.get(&id).cloned()
    }

    pub fn get_by_path(&self, path: &str) -> Option<File> {
        let inner = self.inner.lock().unwrap();
        let id = *inner.by_path.get(path)?;
        inner.by_id.get(&id).cloned()
    }

    pub fn has_by_id(&self, id: FileId) -> bool {
        self.inner.lock().unwrap().by_id.contains_key(&id)
    }

    pub fn has_by_path(&self, path: &str) -> bool {
        self.inner.lock().unwrap().by_path.contains_key(path)
    }

    /// Replaces the whole entry for `id`. If the incoming file's path differs
    /// from what was cached, the old path binding is dropped first so no two
    /// paths ever point at the same id.
    pub fn set_by_id(&self, id: FileId, file: File) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.by_id.get(&id)
            && existing.workspace_path != file.workspace_path
        {
            inner.by_path.remove(&existing.workspace_path);
        }
        inner.by_path.insert(file.workspace_path.clone(), id);
        inner.by_id.insert(id, file);
    }

    /// Migrates `id`'s path binding atomically: old path unbound, new path
    /// bound. Returns `false` if `id` isn't cached.
    pub fn set_path(&self, id: FileId, new_path: impl Into<String>) -> bool {
        let new_path = new_path.into();
        let mut inner = self.inner.lock().unwrap();
        let Some(file) = inner.by_id.get_mut(&id) else {
            return false;
        };
        let old_path = std::mem::replace(&mut file.workspace_path, new_path.clone());
        inner.by_path.remove(&old_path);
        inner.by_path.insert(new_path, id);
        true
    }

    pub fn set_version(&self, id: FileId, version: u64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(file) = inner.by_id.get_mut(&id) {
            file.version = version;
        }
    }

    pub fn set_updated_at(&self, id: FileId, updated_at: impl Into<String>) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(file) = inner.by_id.get_mut(&id) {
            file.updated_at = updated_at.into();
        }
    }

    /// Applies a server ack: content and version move together, never one
    /// without the other.
    pub fn apply_ack(&self, id: FileId, content: FileContent, version: u64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(file) = inner.by_id.get_mut(&id) {
            file.content = content;
            file.version = version;
        }
    }

    pub fn set_content(&self, id: FileId, content: FileContent) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(file) = inner.by_id.get_mut(&id) {
            file.content = content;
        }
    }

    pub fn delete_by_id(&self, id: FileId) -> Option<File> {
        let mut inner = self.inner.lock().unwrap();
        let file = inner.by_id.remove(&id)?;
        inner.by_path.remove(&file.workspace_path);
        Some(file)
    }

    pub fn delete_by_path(&self, path: &str) -> Option<File> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.by_path.remove(path)?;
        inner.by_id.remove(&id)
    }

    pub fn find(&self, predicate: impl Fn(&File) -> bool) -> Vec<File> {
        self.inner
            .lock()
            .unwrap()
            .by_id
            .values()
            .filter(|f| predicate(f))
            .cloned()
            .collect()
    }

    /// All files whose path starts with `prefix` followed by `/` — used by
    /// the folder delete/rename operations, which only ever act on cached
    /// files under a folder prefix.
    pub fn find_under_prefix(&self, prefix: &str) -> Vec<File> {
        let needle = format!("{prefix}/");
        self.find(|f| f.workspace_path.starts_with(&needle))
    }

    pub fn dump(&self) -> Vec<File> {
        self.inner.lock().unwrap().by_id.values().cloned().collect()
    }
}
