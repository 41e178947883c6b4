//! ==============================================================================
//! main.rs - ips clock control-plane simulator entry point
//! ==============================================================================
//!
//! purpose:
//!     stands in for the clock's on-device web control plane so the ui can
//!     be developed without hardware. one process holds the whole
//!     user-visible configuration, serves the pre-built ui assets, and
//!     keeps the single connected client in sync as values change from
//!     either side.
//!
//! responsibilities:
//!     - load sim.toml configuration
//!     - seed the per-screen state store
//!     - serve the ui assets and the /ws state-sync socket
//!     - accept face uploads/deletes and push the resulting snapshots
//!     - tick the clock's time/date flip while a client is connected
//!
//! architecture:
//!
//!     ┌──────────────────────────────────────────────────────────┐
//!     │                  simulator (this binary)                 │
//!     │  ┌───────────┐   ┌────────────┐   ┌──────────────────┐   │
//!     │  │ http      │   │ ws session │   │ ticker           │   │
//!     │  │ (assets,  │   │ (dispatch, │   │ (time_or_date,   │   │
//!     │  │  uploads) │   │  broadcast)│   │  per connection) │   │
//!     │  └─────┬─────┘   └─────┬──────┘   └────────┬─────────┘   │
//!     │        │               │                   │             │
//!     │        └───────────────┼───────────────────┘             │
//!     │                        │                                 │
//!     │                  ┌─────┴──────┐                          │
//!     │                  │ StateStore │  <- state.rs             │
//!     │                  └────────────┘                          │
//!     └──────────────────────────────────────────────────────────┘
//!                              │ websocket (json frames)
//!                              ▼
//!                       ┌─────────────┐
//!                       │  ui client  │
//!                       │  (browser)  │
//!                       └─────────────┘
//!
//! ==============================================================================

mod config;
mod dispatch;
mod faces;
mod protocol;
mod server;
mod session;
mod state;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use faces::FaceRegistry;
use session::Broadcaster;
use state::StateStore;

// ==============================================================================
// shared context
// ==============================================================================
// one clone-able handle wiring the store, the broadcast target and the
// upload registry into every task that needs them. the store itself is
// explicitly owned here and injected everywhere - no globals.

#[derive(Clone)]
pub struct AppCtx {
    pub store: Arc<RwLock<StateStore>>,
    pub broadcaster: Broadcaster,
    pub faces: FaceRegistry,
    pub tick_interval: Duration,
    pub show_frames: bool,
}

/// small context for unit tests: seeded store, fast upload broadcast
#[cfg(test)]
pub fn test_ctx(tick_interval: Duration) -> AppCtx {
    let store = Arc::new(RwLock::new(StateStore::seeded()));
    let broadcaster = Broadcaster::default();
    let faces = FaceRegistry::new(
        store.clone(),
        broadcaster.clone(),
        Duration::from_millis(1),
    );
    AppCtx {
        store,
        broadcaster,
        faces,
        tick_interval,
        show_frames: false,
    }
}

// ==============================================================================
// main entry point
// ==============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // startup banner
    println!("===========================================================");
    println!("  IPS Clock Control-Plane Simulator");
    println!("  \"The clock, minus the clock\"");
    println!("===========================================================");

    // step 1: load configuration
    let config = config::SimConfig::load_or_default();
    config.print_summary();

    // step 2: seed the state store and wire the shared context
    let store = Arc::new(RwLock::new(StateStore::seeded()));
    let broadcaster = Broadcaster::default();
    let faces = FaceRegistry::new(
        store.clone(),
        broadcaster.clone(),
        Duration::from_millis(config.uploads.broadcast_delay_ms),
    );
    let ctx = AppCtx {
        store,
        broadcaster,
        faces,
        tick_interval: Duration::from_secs(config.ticker.interval_seconds),
        show_frames: config.logging.show_frames,
    };

    // step 3: build the router and start serving
    let app = server::build_router(ctx, std::path::Path::new(&config.server.static_dir));
    let addr = format!("0.0.0.0:{}", config.port());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    println!("[STARTUP] ✓ Serving ui assets from {}/", config.server.static_dir);
    println!("[STARTUP] ✓ State-sync socket at ws://{}/ws", addr);
    println!("[STARTUP] ✓ Server started on port {} :)", config.port());
    println!("────────────────────────────────────────────────────────────");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
