//! Translates raw `notify` filesystem events into the create/modify/delete/
//! rename shape the reconciliation engine's outbound path consumes,
//! filtering out the engine's own writes via `SuppressSet`.

use std::path::PathBuf;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::SuppressSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
    Renamed { from: PathBuf, to: PathBuf },
}

/// Owns a native OS watcher over the workspace root and forwards classified
/// events on an unbounded async channel. Dropped along with its receiver
/// when the client shuts down.
pub struct FsWatcher {
    _watcher: RecommendedWatcher,
    rx: UnboundedReceiver<WatchEvent>,
}

impl FsWatcher {
    pub fn new(root: impl Into<PathBuf>, suppress: SuppressSet) -> notify::Result<Self> {
        let root = root.into();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let Ok(event) = res else { return };
                for classified in classify(event, &suppress) {
                    let _ = tx.send(classified);
                }
            },
            notify::Config::default(),
        )?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok(Self { _watcher: watcher, rx })
    }

    /// Awaits the next local filesystem change, or `None` once the watcher
    /// is dropped.
    pub async fn recv(&mut self) -> Option<WatchEvent> {
        self.rx.recv().await
    }
}

fn classify(event: Event, suppress: &SuppressSet) -> Vec<WatchEvent> {
    match event.kind {
        EventKind::Create(_) => event
            .paths
            .into_iter()
            .filter(|p| !suppress.take(p))
            .map(WatchEvent::Created)
            .collect(),
        EventKind::Modify(notify::event::ModifyKind::Name(_)) => {
            // notify reports renames as a paired from/to Modify(Name) event
            // on platforms that support it (inotify does); two paths means a
            // rename, one means the OS only reported one half.
            if event.paths.len() == 2 {
                let to = event.paths[1].clone();
                if suppress.take(&event.paths[0]) || suppress.take(&to) {
                    return Vec::new();
                }
                vec![WatchEvent::Renamed { from: event.paths[0].clone(), to }]
            } else {
                event.paths.into_iter().filter(|p| !suppress.take(p)).map(WatchEvent::Modified).collect()
            }
        }
        EventKind::Modify(_) => event.paths.into_iter().filter(|p| !suppress.take(p)).map(WatchEvent::Modified).collect(),
        EventKind::Remove(_) => event.paths.into_iter().filter(|p| !suppress.take(p)).map(WatchEvent::Removed).collect(),
        _ => Vec::new(),
    }
}
