//! The reconciliation engine: the authoritative in-memory file cache, the
//! per-file outbound ack queue, startup three-way reconciliation, and
//! inbound/outbound chunk and event handling. Everything this crate touches
//! outside of its own state goes through the `ports` traits, so it has no
//! concrete dependency on the filesystem, HTTP or websocket layers.

mod cache;
mod cursor;
mod error;
mod inbound;
mod locks;
mod outbound;
mod ports;
mod queue;
mod reconciler;
mod startup;

pub use cache::FileCache;
pub use cursor::{CursorTracker, CursorUpdate, DEFAULT_CURSOR_TTL};
pub use error::{ReconcileError, Result};
pub use ports::{ApiClient, ConflictChoice, DeleteOptions, DiffModal, ListOptions, ObjectKind, Stat, Storage, WriteOptions, WsClient};
pub use queue::{DequeRegistry, PerFileDeque};
pub use reconciler::Reconciler;
