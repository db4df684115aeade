//! The realtime half of the protocol: a single websocket connection carrying
//! both outbound `ChunkMessage`s/`EventMessage`s and the server's broadcast
//! of the same from other peers.
//!
//! Reconnects with exponential backoff (250ms base, capped at 5s, unlimited
//! attempts) and keeps queued outbound frames across a reconnect — the
//! sender half is a plain channel outside the connection's own lifetime, so
//! a dropped socket never loses what was waiting to go out.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use async_trait::async_trait;
use synctree_model::{ChunkMessage, EventMessage};
use synctree_reconciler::{ReconcileError, Result, WsClient};

const INITIAL_BACKOFF: Duration = Duration::from_millis(250);
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// The integer `type` discriminator every frame on the wire carries, per the
/// protocol's message catalogue.
const TYPE_CHUNK: u64 = 0;
const TYPE_CREATE: u64 = 1;
const TYPE_DELETE: u64 = 2;
const TYPE_RENAME: u64 = 3;

/// A frame received from the server, decoded off the wire but not yet
/// dispatched into the reconciliation engine — kept as a plain channel item
/// rather than an `EventBus` callback so this crate never needs a
/// already-constructed engine handle to start connecting.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    Chunk(ChunkMessage),
    Event(EventMessage),
}

enum OutboundFrame {
    Chunk(ChunkMessage),
    Event(EventMessage),
}

/// `EventMessage` is internally tagged with its own string `type` (`create`/
/// `delete`/`rename`) for a clean Rust-side sum type; the wire protocol wants
/// an integer `type` shared across chunk and event frames alike (`0` Chunk,
/// `1` Create, `2` Delete, `3` Rename). This swaps the string tag for the
/// numeric one on the way out, and back on the way in, so the model crate's
/// types stay idiomatic while the bytes on the wire match the protocol.
fn encode_frame(frame: OutboundFrame) -> Result<String> {
    let to_err = |e: serde_json::Error| ReconcileError::Transport(e.to_string());

    let mut value = match &frame {
        OutboundFrame::Chunk(msg) => serde_json::to_value(msg).map_err(to_err)?,
        OutboundFrame::Event(event) => serde_json::to_value(event).map_err(to_err)?,
    };
    let type_num = match &frame {
        OutboundFrame::Chunk(_) => TYPE_CHUNK,
        OutboundFrame::Event(EventMessage::Create { .. }) => TYPE_CREATE,
        OutboundFrame::Event(EventMessage::Delete { .. }) => TYPE_DELETE,
        OutboundFrame::Event(EventMessage::Rename { .. }) => TYPE_RENAME,
    };
    value
        .as_object_mut()
        .expect("ChunkMessage/EventMessage always serialize to a JSON object")
        .insert("type".to_string(), Value::from(type_num));

    serde_json::to_string(&value).map_err(to_err)
}

fn decode_frame(text: &str) -> Result<InboundFrame> {
    let to_err = |e: serde_json::Error| ReconcileError::Transport(e.to_string());

    let mut value: Value = serde_json::from_str(text).map_err(to_err)?;
    let type_num = value
        .get("type")
        .and_then(Value::as_u64)
        .ok_or_else(|| ReconcileError::Transport("frame missing integer type discriminator".into()))?;

    match type_num {
        TYPE_CHUNK => {
            let msg: ChunkMessage = serde_json::from_value(value).map_err(to_err)?;
            Ok(InboundFrame::Chunk(msg))
        }
        TYPE_CREATE | TYPE_DELETE | TYPE_RENAME => {
            let tag = match type_num {
                TYPE_CREATE => "create",
                TYPE_DELETE => "delete",
                _ => "rename",
            };
            value
                .as_object_mut()
                .expect("frame value is always a JSON object")
                .insert("type".to_string(), Value::from(tag));
            let event: EventMessage = serde_json::from_value(value).map_err(to_err)?;
            Ok(InboundFrame::Event(event))
        }
        other => Err(ReconcileError::Transport(format!("unrecognized frame type {other}"))),
    }
}

pub struct SyncWsClient {
    tx: UnboundedSender<Message>,
}

impl SyncWsClient {
    /// Spawns the background connection-management task and returns a
    /// handle whose `send_chunk`/`send_event` just enqueue onto it. Frames
    /// the server sends back are pushed onto `inbound`; the caller owns
    /// wiring those into the reconciliation engine.
    pub fn connect(url: Url, inbound: UnboundedSender<InboundFrame>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_connection_loop(url, rx, inbound));
        Self { tx }
    }

    fn enqueue(&self, frame: OutboundFrame) -> Result<()> {
        let text = encode_frame(frame)?;
        self.tx
            .send(Message::Text(text.into()))
            .map_err(|_| ReconcileError::Transport("websocket connection loop has shut down".into()))
    }
}

#[async_trait]
impl WsClient for SyncWsClient {
    async fn send_chunk(&self, msg: ChunkMessage) -> Result<()> {
        self.enqueue(OutboundFrame::Chunk(msg))
    }

    async fn send_event(&self, event: EventMessage) -> Result<()> {
        self.enqueue(OutboundFrame::Event(event))
    }
}

async fn run_connection_loop(url: Url, mut rx: UnboundedReceiver<Message>, inbound: UnboundedSender<InboundFrame>) {
    let mut backoff = INITIAL_BACKOFF;

    loop {
        match connect_async(url.as_str()).await {
            Ok((stream, _response)) => {
                tracing::info!(%url, "websocket connected");
                backoff = INITIAL_BACKOFF;
                let (mut write, mut read) = stream.split();

                loop {
                    tokio::select! {
                        outgoing = rx.recv() => {
                            match outgoing {
                                Some(msg) => {
                                    if write.send(msg).await.is_err() {
                                        tracing::warn!("websocket write failed, reconnecting");
                                        break;
                                    }
                                }
                                None => {
                                    tracing::info!("websocket sender dropped, shutting down connection loop");
                                    return;
                                }
                            }
                        }
                        incoming = read.next() => {
                            match incoming {
                                Some(Ok(Message::Text(text))) => dispatch(&text, &inbound),
                                Some(Ok(Message::Close(_))) | None => {
                                    tracing::info!("websocket closed by peer, reconnecting");
                                    break;
                                }
                                Some(Ok(_)) => {}
                                Some(Err(err)) => {
                                    tracing::warn!(error = %err, "websocket read error, reconnecting");
                                    break;
                                }
                            }
                        }
                    }
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, backoff_ms = backoff.as_millis(), "websocket connect failed");
            }
        }

        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

fn dispatch(text: &str, inbound: &UnboundedSender<InboundFrame>) {
    match decode_frame(text) {
        Ok(frame) => {
            let _ = inbound.send(frame);
        }
        Err(err) => tracing::warn!(error = %err, "dropping unparseable websocket frame"),
    }
}
