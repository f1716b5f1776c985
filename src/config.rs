//! Persisted bot configuration.
//!
//! A single JSON file holds every venue credential, the selected strategy
//! and its parameters, plus global settings. The file is rewritten
//! atomically (write-to-temp then rename) on every control-plane mutation.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};

/// What a venue's API credentials are allowed to do.
///
/// Totally ordered: `ReadOnly < ReadWrite < ReadWriteWithdraw`. Permission
/// checks compare with this ordering, so a venue configured for withdrawals
/// implicitly passes every lower gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    #[default]
    ReadOnly,
    ReadWrite,
    ReadWriteWithdraw,
}

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOnly => "read_only",
            Self::ReadWrite => "read_write",
            Self::ReadWriteWithdraw => "read_write_withdraw",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity and credentials for one venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    pub venue_id: String,
    pub display_name: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub permission_level: PermissionLevel,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub test_mode: bool,
    /// Venue-specific knobs passed through to the adapter.
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl VenueConfig {
    /// A disabled-credentials stub for a known venue.
    pub fn stub(venue_id: &str, display_name: &str) -> Self {
        Self {
            venue_id: venue_id.to_string(),
            display_name: display_name.to_string(),
            api_key: String::new(),
            api_secret: String::new(),
            password: None,
            permission_level: PermissionLevel::ReadOnly,
            enabled: true,
            test_mode: false,
            extra: Map::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Root of the persisted configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub exchanges: Vec<VenueConfig>,
    #[serde(default)]
    pub active_strategy: Option<String>,
    #[serde(default)]
    pub strategy_params: Map<String, Value>,
    #[serde(default = "default_global_settings")]
    pub global_settings: Map<String, Value>,
}

fn default_global_settings() -> Map<String, Value> {
    let settings = json!({
        "log_level": "info",
        "max_order_age_seconds": 60 * 60 * 24,
        "default_order_refresh_time": 60,
        "default_order_amount": 0.01,
        "default_market": "BTC/USDT",
        "default_leverage": 1,
        "default_position_mode": "one-way",
        "default_slippage_tolerance": 0.01,
    });
    match settings {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            exchanges: vec![
                VenueConfig::stub("xeggex", "XeggeX"),
                VenueConfig::stub("nonkyc", "NonKYC"),
                VenueConfig::stub("tradeogre", "TradeOgre"),
            ],
            active_strategy: None,
            strategy_params: Map::new(),
            global_settings: default_global_settings(),
        }
    }
}

impl BotConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: BotConfig = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Load the config, falling back to defaults when the file is absent.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        if path.as_ref().exists() {
            match Self::load(&path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to load config, using defaults");
                    Self::default()
                }
            }
        } else {
            Self::default()
        }
    }

    /// Persist atomically: write a sibling temp file, then rename over the
    /// target so readers never observe a partial file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Add or replace a venue configuration, keyed by `venue_id`.
    pub fn upsert_exchange(&mut self, config: VenueConfig) {
        if let Some(existing) = self
            .exchanges
            .iter_mut()
            .find(|c| c.venue_id == config.venue_id)
        {
            *existing = config;
        } else {
            self.exchanges.push(config);
        }
    }

    pub fn remove_exchange(&mut self, venue_id: &str) -> bool {
        let before = self.exchanges.len();
        self.exchanges.retain(|c| c.venue_id != venue_id);
        self.exchanges.len() != before
    }

    pub fn get_exchange(&self, venue_id: &str) -> Option<&VenueConfig> {
        self.exchanges.iter().find(|c| c.venue_id == venue_id)
    }

    pub fn log_level(&self) -> &str {
        self.global_settings
            .get("log_level")
            .and_then(Value::as_str)
            .unwrap_or("info")
    }
}
