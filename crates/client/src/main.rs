//! The synctree CLI entry point: loads configuration, wires the
//! reconciliation engine to its concrete adapters, runs startup
//! reconciliation, then drives the local watcher and remote connection
//! until interrupted.

mod diff_modal;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use url::Url;

use synctree_model::FileContent;
use synctree_reconciler::{ObjectKind, Reconciler};
use synctree_storage::{FsStorage, FsWatcher, SuppressSet, WatchEvent};
use synctree_sync_api::SyncApiClient;
use synctree_sync_ws::{InboundFrame, SyncWsClient};

use diff_modal::ConsoleDiffModal;

#[derive(Parser, Debug)]
#[command(name = "synctree", about = "Realtime note-sync client")]
struct Cli {
    /// Override the default XDG config directory.
    #[arg(long)]
    config_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => synctree_config::default_config_dir().context("resolving config directory")?,
    };
    let config = synctree_config::load(&config_dir).context("loading config.toml")?;

    init_tracing(&config.log_level);
    tracing::info!(config = ?config.redacted(), "loaded workspace configuration");

    let local_root = config.local_root();
    tokio::fs::create_dir_all(&local_root).await.context("creating local sync root")?;

    let suppress = SuppressSet::new();
    let storage = Arc::new(FsStorage::new(&local_root, suppress.clone()));

    let anonymous_api = SyncApiClient::new(&config.domain, config.use_tls)?;
    let token = anonymous_api
        .login(&config.workspace_name, &config.workspace_pass)
        .await
        .context("authenticating with the sync server")?;
    let api = Arc::new(SyncApiClient::new_authenticated(&config.domain, config.use_tls, &token)?);
    let diff_modal = Arc::new(ConsoleDiffModal);

    let ws_scheme = if config.use_tls { "wss" } else { "ws" };
    let ws_url = Url::parse_with_params(&format!("{ws_scheme}://{}/v1/sync", config.domain), &[("jwt", token.as_str())])
        .context("building websocket URL")?;

    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel::<InboundFrame>();
    let ws = Arc::new(SyncWsClient::connect(ws_url, inbound_tx));

    let reconciler = Arc::new(Reconciler::new(storage.clone(), api, ws, diff_modal, config.conflict_resolution));

    // The websocket reader hands decoded frames to this task rather than
    // calling back into the engine directly, so construction order never
    // has to solve `Reconciler` needing its own `Arc` before it exists.
    let dispatch_reconciler = reconciler.clone();
    tokio::spawn(async move {
        while let Some(frame) = inbound_rx.recv().await {
            let result = match frame {
                InboundFrame::Chunk(msg) => dispatch_reconciler.handle_chunk_message(msg).await,
                InboundFrame::Event(event) => dispatch_reconciler.handle_event(event).await,
            };
            if let Err(err) = result {
                tracing::warn!(error = %err, "failed to apply inbound frame");
            }
        }
    });

    reconciler.init().await.context("startup reconciliation failed")?;
    tracing::info!("startup reconciliation complete, entering watch loop");

    let mut watcher = FsWatcher::new(&local_root, suppress).context("starting filesystem watcher")?;

    loop {
        tokio::select! {
            event = watcher.recv() => {
                match event {
                    Some(event) => handle_watch_event(&reconciler, &local_root, event).await,
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn handle_watch_event(reconciler: &Reconciler, root: &Path, event: WatchEvent) {
    let result = match event {
        WatchEvent::Created(path) => match tokio::fs::metadata(&path).await {
            Ok(meta) => {
                let kind = if meta.is_dir() { ObjectKind::Directory } else { ObjectKind::File };
                reconciler.create_local(&relative_path(root, &path), kind).await
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to stat newly created path");
                return;
            }
        },
        WatchEvent::Modified(path) => match tokio::fs::read(&path).await {
            Ok(bytes) => reconciler.modify_local(&relative_path(root, &path), content_from_bytes(bytes)).await,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to read modified file");
                return;
            }
        },
        WatchEvent::Removed(path) => reconciler.delete_local(&relative_path(root, &path)).await,
        WatchEvent::Renamed { from, to } => {
            reconciler.rename_local(&relative_path(root, &from), &relative_path(root, &to)).await
        }
    };

    if let Err(err) = result {
        tracing::warn!(error = %err, "failed to propagate local change");
    }
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).to_string_lossy().replace('\\', "/")
}

fn content_from_bytes(bytes: Vec<u8>) -> FileContent {
    match String::from_utf8(bytes) {
        Ok(text) => FileContent::Text(text),
        Err(err) => FileContent::Binary(err.into_bytes()),
    }
}
