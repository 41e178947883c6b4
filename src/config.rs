//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `sim.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - ServerConfig:  listening port and the static asset directory.
//!     - TickerConfig:  period of the simulated time/date flip.
//!     - UploadsConfig: delay before the post-upload faces broadcast.
//!     - LoggingConfig: per-frame wire logging toggle.
//!
//! ==============================================================================

use serde::Deserialize;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SimConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ticker: TickerConfig,
    #[serde(default)]
    pub uploads: UploadsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TickerConfig {
    pub interval_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UploadsConfig {
    pub broadcast_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub show_frames: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            static_dir: "web".to_string(),
        }
    }
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self { interval_seconds: 5 }
    }
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            broadcast_delay_ms: 200,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { show_frames: true }
    }
}

impl SimConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        let config: SimConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;

        Ok(config)
    }

    /// Load with default fallback
    pub fn load_or_default() -> Self {
        let paths = [
            std::path::PathBuf::from("sim.toml"),
            std::path::PathBuf::from("config").join("sim.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        println!("[CONFIG] Warning: No config file found - using defaults");
        Self::default()
    }

    /// Listening port; a PORT environment variable overrides the file
    pub fn port(&self) -> u16 {
        std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(self.server.port)
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("┌─────────────────────────────────────────┐");
        println!("│           SIM CONFIGURATION             │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Port: {}                              │", self.port());
        println!("│ Static Dir: {}                         │", self.server.static_dir);
        println!("│ Tick Interval: {}s                      │", self.ticker.interval_seconds);
        println!("│ Upload Delay: {}ms                     │", self.uploads.broadcast_delay_ms);
        println!("├─────────────────────────────────────────┤");
    }
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_firmware_dev_server() {
        let config = SimConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.ticker.interval_seconds, 5);
        assert_eq!(config.uploads.broadcast_delay_ms, 200);
        assert!(config.logging.show_frames);
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let config: SimConfig = toml::from_str(
            r#"
            [server]
            port = 9090

            [ticker]
            interval_seconds = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.static_dir, "web");
        assert_eq!(config.ticker.interval_seconds, 1);
        assert_eq!(config.uploads.broadcast_delay_ms, 200);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config: SimConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
    }
}
