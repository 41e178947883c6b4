//! ==============================================================================
//! session.rs - websocket session, broadcast target, autonomous ticker
//! ==============================================================================
//!
//! purpose:
//!     owns the single tracked ui connection. one task reads inbound frames
//!     and runs them through the dispatcher; a writer task drains the
//!     outbound queue; a per-connection ticker simulates the firmware
//!     flipping the clock between time and date views.
//!
//! connection model:
//!     the simulator tracks exactly one broadcast target - the most recent
//!     connection. a new connection silently replaces the previous target.
//!     each connection owns its own ticker task, aborted when the read loop
//!     ends, so a stale ticker can never fire against a dead socket.
//!
//! relationships:
//!     - upgraded from: server.rs (GET /ws)
//!     - drives: dispatch.rs, protocol.rs
//!     - broadcast target shared with: faces.rs (deferred snapshots)
//!
//! ==============================================================================

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::dispatch::{self, DispatchOutcome};
use crate::protocol::{self, Command};
use crate::state::{screens, StateStore};
use crate::AppCtx;

// ==============================================================================
// broadcast target
// ==============================================================================

/// the active connection's outbound queue, shared with every component
/// that can change state out-of-band (ticker, face uploads).
#[derive(Clone, Default)]
pub struct Broadcaster {
    slot: Arc<Mutex<Option<mpsc::UnboundedSender<String>>>>,
}

impl Broadcaster {
    /// make `sender` the broadcast target, replacing any previous one
    pub async fn install(&self, sender: mpsc::UnboundedSender<String>) {
        *self.slot.lock().await = Some(sender);
    }

    /// send one frame to the active connection. false means there was no
    /// live target and the frame was dropped; callers log and move on.
    pub async fn broadcast(&self, frame: &str) -> bool {
        match self.slot.lock().await.as_ref() {
            Some(sender) => sender.send(frame.to_string()).is_ok(),
            None => false,
        }
    }

    /// clear the slot, but only while it still belongs to `sender` - a
    /// newer connection may have replaced it, and a departing connection
    /// must not evict its successor.
    pub async fn clear_if(&self, sender: &mpsc::UnboundedSender<String>) {
        let mut slot = self.slot.lock().await;
        if slot.as_ref().map(|s| s.same_channel(sender)).unwrap_or(false) {
            *slot = None;
        }
    }
}

// ==============================================================================
// session loop
// ==============================================================================

/// run one websocket session to completion
pub async fn run(socket: WebSocket, ctx: AppCtx) {
    println!("[WS] client connected");
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    // writer task: delivers queued frames in order
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    ctx.broadcaster.install(tx.clone()).await;
    let ticker = spawn_ticker(ctx.clone());

    while let Some(incoming) = stream.next().await {
        let Ok(message) = incoming else { break };
        let text = match message {
            Message::Text(text) => text,
            // the ui may deliver commands as binary frames; decode to text
            Message::Binary(bytes) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    println!("[WS] dropping non-utf8 binary frame");
                    continue;
                }
            },
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => continue,
        };
        if ctx.show_frames {
            println!("[WS] received: {}", text);
        }

        match protocol::parse(&text) {
            Ok(command) => {
                let outcome = {
                    let mut store = ctx.store.write().await;
                    dispatch::handle(&mut store, command)
                };
                deliver(&ctx, &tx, outcome).await;
            }
            // bad frames are logged and dropped; the connection stays up
            Err(err) => println!("[WS] bad frame: {:#}", err),
        }
    }

    // disconnect: the ticker dies with the connection, always
    ticker.abort();
    ctx.broadcaster.clear_if(&tx).await;
    drop(tx);
    writer.await.ok();
    println!("[WS] client disconnected");
}

/// route a dispatch outcome: replies to this connection, broadcasts to
/// the active one (normally the same connection, but not necessarily)
async fn deliver(ctx: &AppCtx, tx: &mpsc::UnboundedSender<String>, outcome: DispatchOutcome) {
    for frame in outcome.replies {
        if ctx.show_frames {
            println!("[WS] {}", frame);
        }
        if tx.send(frame).is_err() {
            return;
        }
    }
    for frame in outcome.broadcasts {
        if ctx.show_frames {
            println!("[WS] {}", frame);
        }
        if !ctx.broadcaster.broadcast(&frame).await {
            println!("[WS] broadcast dropped (no client)");
        }
    }
}

// ==============================================================================
// autonomous ticker
// ==============================================================================
//
// the real firmware flips the clock screen between time and date views on
// its own. the simulator reproduces that: every period it advances
// time_or_date through 0 -> 1 -> 2 -> 0 via the same update path as a
// client edit, so the wire frame is indistinguishable from one.

/// advance time_or_date once. a non-numeric current value (a client can
/// write anything into the field) restarts the cycle at 0.
pub fn tick_once(store: &mut StateStore) -> DispatchOutcome {
    let current = store
        .fields(screens::CLOCK)
        .and_then(|fields| fields.get("time_or_date"))
        .and_then(Value::as_i64)
        .unwrap_or(-1);
    let next = (current + 1).rem_euclid(3);

    dispatch::handle(
        store,
        Command::Update {
            screen: screens::CLOCK,
            field: "time_or_date".to_string(),
            value_text: next.to_string(),
        },
    )
}

/// start the per-connection tick task. the caller aborts the handle on
/// disconnect; a leaked ticker is a bug, not a tolerated quirk.
pub fn spawn_ticker(ctx: AppCtx) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut period = tokio::time::interval(ctx.tick_interval);
        period.tick().await; // the first interval tick completes immediately
        loop {
            period.tick().await;
            let outcome = {
                let mut store = ctx.store.write().await;
                tick_once(&mut store)
            };
            for frame in outcome.broadcasts {
                if ctx.show_frames {
                    println!("[TICK] {}", frame);
                }
                if !ctx.broadcaster.broadcast(&frame).await {
                    println!("[TICK] broadcast dropped (no client)");
                }
            }
        }
    })
}
