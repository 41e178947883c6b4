//! ==============================================================================
//! protocol.rs - wire message parsing and building
//! ==============================================================================
//!
//! purpose:
//!     the ui client speaks a tiny text protocol over the websocket:
//!
//!       client -> server   "<code>:<rest>"     (numeric command codes)
//!       server -> client   json frames         ("sv.init.*" / "sv.update")
//!
//!     codes: 0 menu, 1-8 screen snapshot, 9 field update
//!     ("9:<screen>:<field>:<value>"), anything else is a no-op.
//!
//! relationships:
//!     - used by: session.rs (parse inbound frames), dispatch.rs and
//!       faces.rs (build outbound frames)
//!
//! ==============================================================================

use anyhow::{anyhow, Context, Result};
use serde_json::json;

use crate::state::FieldMap;

/// snapshot names for screens 1-8, in screen-id order
const SCREEN_NAMES: [&str; 8] = [
    "clock",
    "leds",
    "faces",
    "presets",
    "info",
    "preset_names",
    "weather",
    "sync",
];

pub fn screen_name(screen: u8) -> Option<&'static str> {
    SCREEN_NAMES.get(usize::from(screen).checked_sub(1)?).copied()
}

/// a decoded client command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// code 0: send the navigation menu
    Menu,
    /// codes 1-8: send one screen's full snapshot
    Snapshot(u8),
    /// code 9: write one field and broadcast the change.
    /// `value_text` is kept raw here; json coercion happens at dispatch.
    Update {
        screen: u8,
        field: String,
        value_text: String,
    },
    /// any other code: accepted and ignored
    Ignored(u32),
}

/// parse one inbound text frame.
///
/// malformed frames (no separator, non-numeric code, truncated code-9
/// payload) are errors; the session logs them and keeps the connection
/// alive rather than crashing it.
pub fn parse(frame: &str) -> Result<Command> {
    let (code, rest) = frame
        .split_once(':')
        .ok_or_else(|| anyhow!("missing ':' separator in {:?}", frame))?;
    let code: u32 = code
        .parse()
        .with_context(|| format!("non-numeric command code {:?}", code))?;

    match code {
        0 => Ok(Command::Menu),
        1..=8 => Ok(Command::Snapshot(code as u8)),
        9 => {
            // split on the first two ':' only, so values may contain ':'
            let (screen, pair) = rest
                .split_once(':')
                .ok_or_else(|| anyhow!("update missing screen separator"))?;
            let (field, value_text) = pair
                .split_once(':')
                .ok_or_else(|| anyhow!("update missing field separator"))?;
            let screen: u8 = screen
                .parse()
                .with_context(|| format!("bad screen id {:?}", screen))?;
            Ok(Command::Update {
                screen,
                field: field.to_string(),
                value_text: value_text.to_string(),
            })
        }
        other => Ok(Command::Ignored(other)),
    }
}

// ==============================================================================
// outbound frames
// ==============================================================================

/// the static navigation menu. only the five user-visible pages are
/// listed; presets and preset names are reached from within clock.html.
pub fn menu_frame() -> String {
    json!({
        "type": "sv.init.menu",
        "value": [
            {"1": { "url": "clock.html",   "title": "Clock" }},
            {"2": { "url": "leds.html",    "title": "LEDs" }},
            {"3": { "url": "faces.html",   "title": "Files" }},
            {"7": { "url": "weather.html", "title": "Weather" }},
            {"5": { "url": "info.html",    "title": "Info" }}
        ]
    })
    .to_string()
}

/// full-state snapshot for one screen
pub fn snapshot_frame(name: &str, fields: &FieldMap) -> String {
    json!({
        "type": format!("sv.init.{}", name),
        "value": fields,
    })
    .to_string()
}

/// single-field change notification
pub fn update_frame(field: &str, value: &serde_json::Value) -> String {
    json!({
        "type": "sv.update",
        "value": { field: value },
    })
    .to_string()
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn parses_menu_and_snapshots() {
        assert_eq!(parse("0:").unwrap(), Command::Menu);
        assert_eq!(parse("1:").unwrap(), Command::Snapshot(1));
        assert_eq!(parse("8:").unwrap(), Command::Snapshot(8));
    }

    #[test]
    fn parses_update_and_preserves_colons_in_value() {
        let cmd = parse("9:1:time_server:http://example.com:8080/x").unwrap();
        assert_eq!(
            cmd,
            Command::Update {
                screen: 1,
                field: "time_server".to_string(),
                value_text: "http://example.com:8080/x".to_string(),
            }
        );
    }

    #[test]
    fn unknown_codes_are_ignored_not_errors() {
        assert_eq!(parse("42:whatever").unwrap(), Command::Ignored(42));
    }

    #[test]
    fn malformed_frames_are_errors() {
        assert!(parse("no separator").is_err());
        assert!(parse("x:1").is_err());
        assert!(parse("9:1:field_without_value").is_err());
        assert!(parse("9:").is_err());
    }

    #[test]
    fn screen_names_cover_one_through_eight() {
        assert_eq!(screen_name(1), Some("clock"));
        assert_eq!(screen_name(6), Some("preset_names"));
        assert_eq!(screen_name(8), Some("sync"));
        assert_eq!(screen_name(0), None);
        assert_eq!(screen_name(9), None);
    }

    #[test]
    fn menu_frame_lists_visible_pages_in_order() {
        let menu: Value = serde_json::from_str(&menu_frame()).unwrap();
        assert_eq!(menu["type"], "sv.init.menu");
        let ids: Vec<&String> = menu["value"]
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry.as_object().unwrap().keys().next().unwrap())
            .collect();
        assert_eq!(ids, ["1", "2", "3", "7", "5"]);
        assert_eq!(menu["value"][0]["1"]["url"], "clock.html");
    }

    #[test]
    fn update_frame_shape() {
        let frame: Value =
            serde_json::from_str(&update_frame("preset", &serde_json::json!("5"))).unwrap();
        assert_eq!(frame["type"], "sv.update");
        assert_eq!(frame["value"]["preset"], "5");
    }
}
