//! Configuration parsing for the signal trading system.
//!
//! The runner reads its settings from a single JSON config file. Only the
//! `api` credentials are mandatory; every other block falls back to defaults.
//!
//! # Example config
//!
//! ```json
//! {
//!   "app": { "module_name": "sigtrade", "log_path": "/tmp/log" },
//!   "server": { "host": "0.0.0.0", "port": 3000, "static_dir": "public" },
//!   "api": {
//!     "api_key": "...", "secret_key": "...", "passphrase": "...",
//!     "base_url": "https://api.bitget.com", "test_mode": true
//!   },
//!   "trading": { "data_dir": "data", "position_mode": "single_hold" },
//!   "monitor": { "interval_secs": 60 }
//! }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Module metadata (name, log path).
    #[serde(default)]
    pub app: Option<ModuleMeta>,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Exchange credentials and endpoint.
    pub api: ApiConfig,

    /// Local state and account-level trading options.
    #[serde(default)]
    pub trading: TradingConfig,

    /// Position monitor loop.
    #[serde(default)]
    pub monitor: MonitorConfig,
}

impl AppConfig {
    /// Returns the module name, defaulting to `"sigtrade"`.
    pub fn module_name(&self) -> String {
        self.app.as_ref().and_then(|m| m.module_name.clone()).unwrap_or_else(|| "sigtrade".to_string())
    }

    /// Returns the log path.
    pub fn log_path(&self) -> Option<String> {
        self.app.as_ref().and_then(|m| m.log_path.clone())
    }

    /// Reject configs that cannot possibly work.
    pub fn validate(&self) -> Result<()> {
        if self.api.api_key.trim().is_empty() || self.api.secret_key.trim().is_empty() {
            bail!("api.api_key and api.secret_key must be set");
        }
        if self.monitor.interval_secs == 0 {
            bail!("monitor.interval_secs must be greater than zero");
        }
        Ok(())
    }
}

/// Module metadata block.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleMeta {
    pub module_name: Option<String>,
    pub log_path: Option<String>,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Optional directory of static dashboard files served at `/`.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

/// Exchange API block.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub api_key: String,
    pub secret_key: String,
    #[serde(default)]
    pub passphrase: String,

    /// REST base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sends `X-SIMULATED-TRADING: 1` when set.
    #[serde(default)]
    pub test_mode: bool,

    /// Mix product type (`umcbl` = USDT-margined perpetuals).
    #[serde(default = "default_product_type")]
    pub product_type: String,

    #[serde(default = "default_margin_coin")]
    pub margin_coin: String,

    #[serde(default = "default_margin_mode")]
    pub margin_mode: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Local state and account-level options.
#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    /// Directory holding `active_trades.json` and `settings.json`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Hold mode applied once at startup (`single_hold` or `double_hold`).
    #[serde(default = "default_position_mode")]
    pub position_mode: String,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            position_mode: default_position_mode(),
        }
    }
}

/// Position monitor configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_monitor_interval")]
    pub interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_monitor_interval(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults (used by serde)
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    3000
}

fn default_base_url() -> String {
    "https://api.bitget.com".into()
}

fn default_product_type() -> String {
    "umcbl".into()
}

fn default_margin_coin() -> String {
    "USDT".into()
}

fn default_margin_mode() -> String {
    "crossed".into()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_position_mode() -> String {
    "single_hold".into()
}

fn default_true() -> bool {
    true
}

fn default_monitor_interval() -> u64 {
    60
}

/// Load and parse a JSON config file.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).with_context(|| format!("failed to read config {}", path.display()))?;
    let config: AppConfig =
        serde_json::from_str(&content).with_context(|| format!("failed to parse config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg: AppConfig = serde_json::from_str(r#"{"api": {"api_key": "k", "secret_key": "s"}}"#).unwrap();
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.api.base_url, "https://api.bitget.com");
        assert_eq!(cfg.api.product_type, "umcbl");
        assert_eq!(cfg.api.margin_coin, "USDT");
        assert_eq!(cfg.trading.data_dir, PathBuf::from("data"));
        assert_eq!(cfg.monitor.interval_secs, 60);
        assert!(cfg.monitor.enabled);
        assert_eq!(cfg.module_name(), "sigtrade");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_credentials_fail_validation() {
        let cfg: AppConfig = serde_json::from_str(r#"{"api": {"api_key": "", "secret_key": "s"}}"#).unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "app": {"module_name": "bot", "log_path": "/tmp/bot"},
                "server": {"port": 8080},
                "api": {"api_key": "k", "secret_key": "s", "passphrase": "p", "test_mode": true},
                "monitor": {"interval_secs": 15}
            }"#,
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.module_name(), "bot");
        assert_eq!(cfg.log_path().as_deref(), Some("/tmp/bot"));
        assert_eq!(cfg.server.port, 8080);
        assert!(cfg.api.test_mode);
        assert_eq!(cfg.monitor.interval_secs, 15);
    }
}
