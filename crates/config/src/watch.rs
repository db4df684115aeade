//! Hot-reload watcher for `config.toml`.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::{ConfigError, Result};

/// Watches the config directory for changes to `config.toml`.
pub struct ConfigWatcher {
    config_dir: PathBuf,
    rx: Receiver<notify::Result<Event>>,
    _watcher: RecommendedWatcher,
}

impl ConfigWatcher {
    pub fn new(config_dir: impl Into<PathBuf>) -> Result<Self> {
        let config_dir = config_dir.into();
        let (tx, rx) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            notify::Config::default(),
        )
        .map_err(|e| ConfigError::Watch(e.to_string()))?;

        if config_dir.exists() {
            watcher
                .watch(&config_dir, RecursiveMode::NonRecursive)
                .map_err(|e| ConfigError::Watch(e.to_string()))?;
        }

        Ok(Self { config_dir, rx, _watcher: watcher })
    }

    /// Polls for config file changes without blocking. Returns `true` if
    /// `config.toml` itself changed since the last poll.
    pub fn poll_changed(&self) -> bool {
        let mut changed = false;
        while let Ok(Ok(event)) = self.rx.try_recv() {
            if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                continue;
            }
            if event.paths.iter().any(|p| p.file_name().is_some_and(|n| n == crate::config_file_path(&self.config_dir).file_name().unwrap())) {
                changed = true;
            }
        }
        changed
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn watcher_creation() {
        let tmp = TempDir::new().unwrap();
        assert!(ConfigWatcher::new(tmp.path()).is_ok());
    }

    #[test]
    fn watcher_detects_config_change() {
        let tmp = TempDir::new().unwrap();
        let config_path = crate::config_file_path(tmp.path());
        fs::write(&config_path, "domain = \"a\"").unwrap();

        let watcher = ConfigWatcher::new(tmp.path()).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        fs::write(&config_path, "domain = \"b\"").unwrap();

        for _ in 0..20 {
            std::thread::sleep(Duration::from_millis(50));
            if watcher.poll_changed() {
                return;
            }
        }
        panic!("expected config change to be detected");
    }
}
