//! Workspace configuration: where to find the sync server, which workspace to
//! join, and how to resolve startup conflicts.
//!
//! Configuration lives in `$XDG_CONFIG_HOME/synctree/config.toml`
//! (`~/.config/synctree/config.toml` on Linux), a flat TOML document. The
//! `watch` feature (on by default) additionally exposes a filesystem watcher
//! so the client can pick up an edited config without a restart.

pub mod error;
#[cfg(feature = "watch")]
pub mod watch;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use error::{ConfigError, Result};
use synctree_model::ConflictResolution;

const APP_DIR: &str = "synctree";
const CONFIG_FILE: &str = "config.toml";

fn default_log_level() -> String {
    "info".to_string()
}

fn default_use_tls() -> bool {
    true
}

/// Parsed `config.toml` contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    /// Host (and optional port) of the sync server, e.g. `sync.example.com`.
    pub domain: String,
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
    pub workspace_name: String,
    /// Deliberately not redacted by serde: this struct round-trips to disk
    /// as plain TOML. `Debug` is implemented by hand below to keep it out of
    /// logs.
    pub workspace_pass: String,
    #[serde(default)]
    pub conflict_resolution: ConflictResolution,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Local directory mirrored against the workspace. Defaults to the
    /// current directory if omitted.
    pub local_root: Option<PathBuf>,
}

impl std::fmt::Debug for WorkspaceConfigRedacted<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceConfig")
            .field("domain", &self.0.domain)
            .field("use_tls", &self.0.use_tls)
            .field("workspace_name", &self.0.workspace_name)
            .field("workspace_pass", &"<redacted>")
            .field("conflict_resolution", &self.0.conflict_resolution)
            .field("log_level", &self.0.log_level)
            .field("local_root", &self.0.local_root)
            .finish()
    }
}

/// Wrapper that gives `WorkspaceConfig` a redacted `Debug` rendering without
/// making that the type's only `Debug` impl (tests still want the real one).
pub struct WorkspaceConfigRedacted<'a>(pub &'a WorkspaceConfig);

impl WorkspaceConfig {
    pub fn redacted(&self) -> WorkspaceConfigRedacted<'_> {
        WorkspaceConfigRedacted(self)
    }

    pub fn local_root(&self) -> PathBuf {
        self.local_root.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// `$XDG_CONFIG_HOME/synctree` (`~/.config/synctree` on Linux).
pub fn default_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(config_dir.join(APP_DIR))
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE)
}

/// Loads and parses `config.toml` from `config_dir`.
pub fn load(config_dir: &Path) -> Result<WorkspaceConfig> {
    let path = config_file_path(config_dir);
    let contents = fs::read_to_string(&path).map_err(|error| ConfigError::Io { path: path.clone(), error })?;
    toml::from_str(&contents).map_err(|error| ConfigError::Parse { path, error })
}

/// Loads from the default XDG config directory.
pub fn load_default() -> Result<WorkspaceConfig> {
    load(&default_config_dir()?)
}
