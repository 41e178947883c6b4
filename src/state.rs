//! ==============================================================================
//! state.rs - in-memory per-screen configuration store
//! ==============================================================================
//!
//! purpose:
//!     holds the entire user-visible configuration of the simulated clock,
//!     keyed by screen id. this is the value the real firmware keeps in
//!     nvram; here it is seeded at startup and lives only for the process.
//!
//! data model:
//!     screen id (1-8)  ->  field map (name -> json value)
//!
//!     1 Clock   2 LEDs   3 Faces   4 Presets
//!     5 Info    6 Preset Names     7 Weather   8 Sync
//!
//! coercion rule:
//!     screens 4 (Presets) and 6 (Preset Names) always store string-typed
//!     values: whatever is written is converted to its string form before
//!     storage. all other screens store the value as-is, so a field's type
//!     may change across writes (the firmware behaves the same way).
//!
//! relationships:
//!     - mutated by: dispatch.rs (code-9 updates), session.rs (tick),
//!       faces.rs (upload/delete)
//!     - read by: dispatch.rs (snapshots), faces.rs (faces snapshot)
//!
//! ==============================================================================

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// named configuration values belonging to one screen
pub type FieldMap = Map<String, Value>;

/// screen ids, matching the firmware's menu numbering
pub mod screens {
    pub const CLOCK: u8 = 1;
    pub const LEDS: u8 = 2;
    pub const FACES: u8 = 3;
    pub const PRESETS: u8 = 4;
    pub const INFO: u8 = 5;
    pub const PRESET_NAMES: u8 = 6;
    pub const WEATHER: u8 = 7;
    pub const SYNC: u8 = 8;
}

/// the process-wide configuration state, owned by main and shared behind
/// an Arc<RwLock<..>>. no persistence; lost on restart.
pub struct StateStore {
    screens: BTreeMap<u8, FieldMap>,
}

impl StateStore {
    /// build the store from the static seed configuration
    pub fn seeded() -> Self {
        Self { screens: seed() }
    }

    /// field map for a screen. screens are fixed at startup, so a miss
    /// only happens for ids outside 1-8.
    pub fn fields(&self, screen: u8) -> Option<&FieldMap> {
        self.screens.get(&screen)
    }

    /// write one field, applying the per-screen coercion rule.
    /// returns the value actually stored (post-coercion).
    pub fn set(&mut self, screen: u8, field: &str, value: Value) -> Value {
        let stored = if screen == screens::PRESETS || screen == screens::PRESET_NAMES {
            Value::String(string_form(value))
        } else {
            value
        };
        self.screens
            .entry(screen)
            .or_default()
            .insert(field.to_string(), stored.clone());
        stored
    }

    /// drop one field outright. nothing in the wire protocol does this
    /// today; face artifacts go through remove_face instead.
    #[allow(dead_code)]
    pub fn remove(&mut self, screen: u8, field: &str) -> Option<Value> {
        self.screens.get_mut(&screen)?.remove(field)
    }

    /// register an uploaded face artifact under the faces screen's
    /// `face_files` sub-object. re-uploading a key overwrites its filename.
    pub fn insert_face(&mut self, key: &str, filename: &str) {
        self.face_files_mut()
            .insert(key.to_string(), Value::String(filename.to_string()));
    }

    /// drop a face artifact. false when the key was never registered.
    pub fn remove_face(&mut self, key: &str) -> bool {
        self.face_files_mut().remove(key).is_some()
    }

    pub fn has_face(&self, key: &str) -> bool {
        self.fields(screens::FACES)
            .and_then(|f| f.get("face_files"))
            .and_then(Value::as_object)
            .map(|files| files.contains_key(key))
            .unwrap_or(false)
    }

    /// the `face_files` object on the faces screen. a client can overwrite
    /// the field with a non-object via a code-9 update; recreate it so
    /// uploads keep working afterwards.
    fn face_files_mut(&mut self) -> &mut FieldMap {
        let faces = self.screens.entry(screens::FACES).or_default();
        let entry = faces
            .entry("face_files".to_string())
            .or_insert_with(|| json!({}));
        if !entry.is_object() {
            *entry = json!({});
        }
        entry.as_object_mut().unwrap()
    }
}

/// string form used by the screen 4/6 coercion: strings pass through,
/// everything else uses its json text ("5", "true", ...)
fn string_form(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// the device's factory seed configuration, field order preserved
fn seed() -> BTreeMap<u8, FieldMap> {
    let mut screens = BTreeMap::new();
    let mut put = |id: u8, value: Value| {
        // json! with preserve_order keeps the literal field order
        screens.insert(id, value.as_object().cloned().unwrap_or_default());
    };

    put(
        screens::CLOCK,
        json!({
            "time_or_date": 1,
            "date_format": 1,
            "time_format": true,
            "leading_zero": false,
            "display_on": 10,
            "display_off": 20,
            "time_server": "http://niobo.us/blah"
        }),
    );
    put(
        screens::LEDS,
        json!({
            "led_pattern": 3,
            "breath_per_min": 7,
            "led_intensity": 5
        }),
    );
    put(
        screens::FACES,
        json!({
            "set_icon_faces": "Bletch",
            "clock_face": "divergence",
            "weather_icons": "yahoo",
            "face_files": {
                "blue_ribbon": "blue_ribbon.tar.gz",
                "divergence": "divergence.tar.gz",
                "dots": "dots.tar.gz"
            },
            "file_set": "faces"
        }),
    );
    put(screens::PRESETS, json!({ "preset": "set3" }));
    put(
        screens::INFO,
        json!({
            "esp_boot_version": "1234",
            "esp_free_heap": "5678",
            "esp_sketch_size": "90123",
            "esp_sketch_space": "4567",
            "esp_flash_size": "8901",
            "esp_chip_id": "chip id",
            "wifi_ip_address": "192.168.1.1",
            "wifi_mac_address": "0E:12:34:56:78",
            "wifi_ssid": "STC-Wonderful"
        }),
    );
    put(
        screens::PRESET_NAMES,
        json!({
            "set1_name": "Clock 1",
            "set2_name": "Clock 2",
            "set3_name": "Clock 3",
            "set4_name": "Conditioner",
            "set5_name": "Manual"
        }),
    );
    put(
        screens::WEATHER,
        json!({
            "weather_token": "462cf98d57c30f4cc3698a70a63bd3bb",
            "weather_latitude": "21.2",
            "weather_longitude": "-37.1",
            "units": "imperial"
        }),
    );
    put(
        screens::SYNC,
        json!({
            "sync_port": "12345",
            "sync_role": "0",
            "set_icon_sync": "burble",
            "wifi_ap": true
        }),
    );

    screens
}
