//! ==============================================================================
//! dispatch.rs - command dispatcher
//! ==============================================================================
//!
//! purpose:
//!     interprets decoded client commands against the state store and
//!     produces the outbound frames they cause. the dispatcher never sends
//!     anything itself: replies go back to the requesting connection,
//!     broadcasts go to the active connection, and session.rs decides both.
//!     keeping it pure makes the whole protocol testable without a socket.
//!
//! firmware quirk, kept as a contract:
//!     requesting the clock snapshot (code 1) always also sends the faces
//!     snapshot, because clock.html renders the face picker from it.
//!
//! relationships:
//!     - called by: session.rs (client frames and ticker updates)
//!     - mutates/reads: state.rs
//!     - builds frames via: protocol.rs
//!
//! ==============================================================================

use serde_json::Value;

use crate::protocol::{self, Command};
use crate::state::{screens, StateStore};

/// frames produced by one command, split by destination
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// frames for the connection that sent the command
    pub replies: Vec<String>,
    /// frames for the active broadcast target
    pub broadcasts: Vec<String>,
}

/// run one command to completion against the store.
///
/// the caller holds the store's write guard for the duration, so each
/// command is atomic with respect to other mutation sources.
pub fn handle(store: &mut StateStore, command: Command) -> DispatchOutcome {
    let mut outcome = DispatchOutcome::default();

    match command {
        Command::Menu => outcome.replies.push(protocol::menu_frame()),
        Command::Snapshot(screen) => {
            push_snapshot(store, screen, &mut outcome.replies);
            if screen == screens::CLOCK {
                // fixed coupling: clock always refreshes faces too
                push_snapshot(store, screens::FACES, &mut outcome.replies);
            }
        }
        Command::Update {
            screen,
            field,
            value_text,
        } => {
            // try json first; anything unparseable is stored as the raw
            // string (so "divergence" round-trips without quoting)
            let value: Value = serde_json::from_str(&value_text)
                .unwrap_or(Value::String(value_text));
            let stored = store.set(screen, &field, value);
            outcome
                .broadcasts
                .push(protocol::update_frame(&field, &stored));
        }
        Command::Ignored(code) => {
            println!("[WS] ignoring unknown command code {}", code);
        }
    }

    outcome
}

fn push_snapshot(store: &StateStore, screen: u8, frames: &mut Vec<String>) {
    let (Some(name), Some(fields)) = (protocol::screen_name(screen), store.fields(screen)) else {
        return;
    };
    frames.push(protocol::snapshot_frame(name, fields));
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parse;
    use serde_json::json;

    fn frame(raw: &str) -> Value {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn clock_snapshot_is_followed_by_faces() {
        let mut store = StateStore::seeded();
        let outcome = handle(&mut store, parse("1:").unwrap());

        assert_eq!(outcome.replies.len(), 2);
        assert!(outcome.broadcasts.is_empty());
        assert_eq!(frame(&outcome.replies[0])["type"], "sv.init.clock");
        assert_eq!(frame(&outcome.replies[1])["type"], "sv.init.faces");
    }

    #[test]
    fn other_snapshots_are_single_frames() {
        let mut store = StateStore::seeded();
        for (code, name) in [("2:", "leds"), ("4:", "presets"), ("8:", "sync")] {
            let outcome = handle(&mut store, parse(code).unwrap());
            assert_eq!(outcome.replies.len(), 1);
            assert_eq!(
                frame(&outcome.replies[0])["type"],
                format!("sv.init.{}", name)
            );
        }
    }

    #[test]
    fn snapshot_carries_current_values() {
        let mut store = StateStore::seeded();
        handle(&mut store, parse("9:2:led_pattern:7").unwrap());
        let outcome = handle(&mut store, parse("2:").unwrap());
        assert_eq!(frame(&outcome.replies[0])["value"]["led_pattern"], json!(7));
    }

    #[test]
    fn preset_update_stores_and_broadcasts_a_string() {
        let mut store = StateStore::seeded();
        let outcome = handle(&mut store, parse("9:4:preset:5").unwrap());

        assert_eq!(
            store.fields(screens::PRESETS).unwrap()["preset"],
            json!("5")
        );
        assert_eq!(outcome.broadcasts.len(), 1);
        assert_eq!(
            frame(&outcome.broadcasts[0])["value"]["preset"],
            json!("5"),
            "screen 4 broadcasts the string form, not the number"
        );
    }

    #[test]
    fn clock_update_keeps_the_json_type() {
        let mut store = StateStore::seeded();
        let outcome = handle(&mut store, parse("9:1:time_or_date:2").unwrap());

        assert_eq!(
            store.fields(screens::CLOCK).unwrap()["time_or_date"],
            json!(2)
        );
        assert_eq!(
            frame(&outcome.broadcasts[0])["value"]["time_or_date"],
            json!(2)
        );
    }

    #[test]
    fn unparseable_values_are_stored_as_raw_strings() {
        let mut store = StateStore::seeded();
        handle(
            &mut store,
            parse("9:1:time_server:http://pool.ntp.org:123").unwrap(),
        );
        assert_eq!(
            store.fields(screens::CLOCK).unwrap()["time_server"],
            json!("http://pool.ntp.org:123")
        );
    }

    #[test]
    fn ignored_codes_produce_no_frames() {
        let mut store = StateStore::seeded();
        let outcome = handle(&mut store, parse("12:anything").unwrap());
        assert!(outcome.replies.is_empty());
        assert!(outcome.broadcasts.is_empty());
    }

    #[test]
    fn menu_reply_only() {
        let mut store = StateStore::seeded();
        let outcome = handle(&mut store, parse("0:").unwrap());
        assert_eq!(outcome.replies.len(), 1);
        assert_eq!(frame(&outcome.replies[0])["type"], "sv.init.menu");
    }
}
