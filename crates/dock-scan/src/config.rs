//! # Scan Configuration
//!
//! Configuration management for the scan engine and its host station.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     DOCK_ACCEPT_BARE_GTIN=false                                        │
//! │     DOCK_RESOLVE_TIMEOUT_MS=5000                                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/receiving/scan.toml (Linux)                              │
//! │     ~/Library/Application Support/com.dock.receiving/scan.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # scan.toml
//! [station]
//! name = "Dock 3"
//! catalog = "/srv/receiving/catalog.json"
//! picking_id = 42
//!
//! [scan]
//! accept_bare_gtin = true
//! verify_element_check_digit = false
//! resolve_timeout_ms = 10000
//! max_choice_reopens = 1
//!
//! [messages]
//! applied = "GS1 scan applied to receipt."
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use dock_core::NormalizeOptions;

use crate::error::{ScanError, ScanResult};

// =============================================================================
// Station Configuration
// =============================================================================

/// Configuration for the receiving station hosting the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    /// Human-readable station name (e.g., "Dock 3").
    #[serde(default = "default_station_name")]
    pub name: String,

    /// Path of the inventory catalog file.
    #[serde(default)]
    pub catalog: Option<PathBuf>,

    /// Picking open when the station starts.
    #[serde(default)]
    pub picking_id: Option<i64>,
}

fn default_station_name() -> String {
    "Receiving Dock".to_string()
}

impl Default for StationConfig {
    fn default() -> Self {
        StationConfig {
            name: default_station_name(),
            catalog: None,
            picking_id: None,
        }
    }
}

// =============================================================================
// Scan Settings
// =============================================================================

/// Scan interpretation and resolution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Accept a bare GTIN-12/13/14 when a scan is not an element string.
    #[serde(default = "default_true")]
    pub accept_bare_gtin: bool,

    /// Validate the check digit of GTINs read from element strings too.
    /// Off by default: element strings are trusted as encoded.
    #[serde(default)]
    pub verify_element_check_digit: bool,

    /// Resolve/confirm calls slower than this are treated as failed.
    #[serde(default = "default_resolve_timeout")]
    pub resolve_timeout_ms: u64,

    /// How often a dismissed variant picker may be reopened per scan.
    #[serde(default = "default_max_choice_reopens")]
    pub max_choice_reopens: u32,
}

fn default_true() -> bool {
    true
}

fn default_resolve_timeout() -> u64 {
    10_000
}

fn default_max_choice_reopens() -> u32 {
    1
}

impl Default for ScanSettings {
    fn default() -> Self {
        ScanSettings {
            accept_bare_gtin: true,
            verify_element_check_digit: false,
            resolve_timeout_ms: default_resolve_timeout(),
            max_choice_reopens: default_max_choice_reopens(),
        }
    }
}

impl ScanSettings {
    /// Normalization switches derived from these settings.
    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            accept_bare_gtin: self.accept_bare_gtin,
            verify_element_check_digit: self.verify_element_check_digit,
        }
    }

    /// Resolver call deadline.
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }
}

// =============================================================================
// Messages
// =============================================================================

/// User-facing notification texts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSettings {
    /// Resolver applied the scan without a message of its own.
    #[serde(default = "default_applied")]
    pub applied: String,

    /// Resolve call faulted or timed out.
    #[serde(default = "default_resolve_failed")]
    pub resolve_failed: String,

    /// Confirmation applied without a message of its own.
    #[serde(default = "default_variant_added")]
    pub variant_added: String,

    /// Confirm call faulted or timed out.
    #[serde(default = "default_confirm_failed")]
    pub confirm_failed: String,

    /// Resolver asked for a choice but offered no candidates.
    #[serde(default = "default_no_candidates")]
    pub no_candidates: String,
}

fn default_applied() -> String {
    "GS1 scan applied to receipt.".to_string()
}

fn default_resolve_failed() -> String {
    "GS1 scan could not be applied.".to_string()
}

fn default_variant_added() -> String {
    "Variant added to picking.".to_string()
}

fn default_confirm_failed() -> String {
    "Variant could not be added to picking.".to_string()
}

fn default_no_candidates() -> String {
    "Product not found for scanned code".to_string()
}

impl Default for MessageSettings {
    fn default() -> Self {
        MessageSettings {
            applied: default_applied(),
            resolve_failed: default_resolve_failed(),
            variant_added: default_variant_added(),
            confirm_failed: default_confirm_failed(),
            no_candidates: default_no_candidates(),
        }
    }
}

// =============================================================================
// Main Scan Configuration
// =============================================================================

/// Complete scan engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Station identity and startup state.
    #[serde(default)]
    pub station: StationConfig,

    /// Scan behavior settings.
    #[serde(default)]
    pub scan: ScanSettings,

    /// Notification texts.
    #[serde(default)]
    pub messages: MessageSettings,
}

impl ScanConfig {
    /// Creates a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (scan.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ScanResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading scan config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load scan config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ScanResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ScanError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ScanError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ScanError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Scan config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ScanResult<()> {
        if self.station.name.trim().is_empty() {
            return Err(ScanError::InvalidConfig("station name must not be empty".into()));
        }

        if self.scan.resolve_timeout_ms == 0 {
            return Err(ScanError::InvalidConfig(
                "resolve_timeout_ms must be greater than 0".into(),
            ));
        }

        let messages = [
            ("applied", &self.messages.applied),
            ("resolve_failed", &self.messages.resolve_failed),
            ("variant_added", &self.messages.variant_added),
            ("confirm_failed", &self.messages.confirm_failed),
            ("no_candidates", &self.messages.no_candidates),
        ];
        for (key, text) in messages {
            if text.trim().is_empty() {
                return Err(ScanError::InvalidConfig(format!(
                    "messages.{} must not be empty",
                    key
                )));
            }
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(name) = std::env::var("DOCK_STATION_NAME") {
            self.station.name = name;
        }

        if let Ok(path) = std::env::var("DOCK_CATALOG") {
            debug!(catalog = %path, "Overriding catalog path from environment");
            self.station.catalog = Some(PathBuf::from(path));
        }

        if let Ok(id) = std::env::var("DOCK_PICKING_ID") {
            match id.parse::<i64>() {
                Ok(id) => self.station.picking_id = Some(id),
                Err(_) => warn!(picking_id = %id, "Ignoring non-numeric picking id in environment"),
            }
        }

        if let Ok(flag) = std::env::var("DOCK_ACCEPT_BARE_GTIN") {
            if let Some(value) = parse_flag(&flag) {
                self.scan.accept_bare_gtin = value;
            }
        }

        if let Ok(flag) = std::env::var("DOCK_VERIFY_ELEMENT_CHECK_DIGIT") {
            if let Some(value) = parse_flag(&flag) {
                self.scan.verify_element_check_digit = value;
            }
        }

        if let Ok(ms) = std::env::var("DOCK_RESOLVE_TIMEOUT_MS") {
            if let Ok(ms) = ms.parse::<u64>() {
                debug!(timeout_ms = ms, "Overriding resolve timeout from environment");
                self.scan.resolve_timeout_ms = ms;
            }
        }

        if let Ok(n) = std::env::var("DOCK_MAX_CHOICE_REOPENS") {
            if let Ok(n) = n.parse::<u32>() {
                self.scan.max_choice_reopens = n;
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "dock", "receiving")
            .map(|dirs| dirs.config_dir().join("scan.toml"))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        other => {
            warn!(value = %other, "Unknown boolean in environment");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert!(config.scan.accept_bare_gtin);
        assert!(!config.scan.verify_element_check_digit);
        assert_eq!(config.scan.resolve_timeout(), Duration::from_secs(10));
        assert_eq!(config.scan.max_choice_reopens, 1);
        assert_eq!(config.messages.applied, "GS1 scan applied to receipt.");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ScanConfig = toml::from_str(
            r#"
            [station]
            name = "Dock 3"
            picking_id = 42

            [scan]
            verify_element_check_digit = true
            "#,
        )
        .unwrap();

        assert_eq!(config.station.name, "Dock 3");
        assert_eq!(config.station.picking_id, Some(42));
        assert!(config.scan.verify_element_check_digit);
        assert!(config.scan.accept_bare_gtin);
        assert_eq!(config.scan.resolve_timeout_ms, 10_000);
        assert_eq!(config.messages, MessageSettings::default());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ScanConfig::default();
        config.scan.resolve_timeout_ms = 0;
        assert!(config.validate().unwrap_err().is_config_error());

        let mut config = ScanConfig::default();
        config.messages.applied = "  ".into();
        assert!(config.validate().is_err());

        let mut config = ScanConfig::default();
        config.station.name = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_normalize_options_follow_settings() {
        let settings = ScanSettings {
            accept_bare_gtin: false,
            verify_element_check_digit: true,
            ..ScanSettings::default()
        };
        let options = settings.normalize_options();
        assert!(!options.accept_bare_gtin);
        assert!(options.verify_element_check_digit);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_toml_serialization() {
        let config = ScanConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[station]"));
        assert!(toml_str.contains("[scan]"));
        assert!(toml_str.contains("[messages]"));

        let back: ScanConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("dock-scan-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("scan.toml");

        let mut config = ScanConfig::default();
        config.station.name = "Dock 9".into();
        config.scan.max_choice_reopens = 3;
        config.save(Some(path.clone())).unwrap();

        let loaded = ScanConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.station.name, "Dock 9");
        assert_eq!(loaded.scan.max_choice_reopens, 3);

        let _ = std::fs::remove_dir_all(dir);
    }
}
