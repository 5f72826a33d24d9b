//! Bitget trading module configuration.
//!
//! Derived from the `api` block of the application config. Holds credentials,
//! the REST endpoint, and the account-level fields every mix order carries.

use std::time::Duration;

use sigtrade_core::config::ApiConfig;

/// Configuration for the Bitget mix-contract client.
#[derive(Debug, Clone)]
pub struct BitgetTdConfig {
    /// Bitget API key.
    pub api_key: String,
    /// Bitget API secret (HMAC-SHA256 signing).
    pub secret_key: String,
    /// API passphrase chosen when the key was created.
    pub passphrase: String,
    /// REST base URL.
    pub base_url: String,
    /// Route orders to the simulated-trading environment.
    pub test_mode: bool,
    /// Mix product type (e.g. `umcbl`).
    pub product_type: String,
    /// Margin coin (e.g. `USDT`).
    pub margin_coin: String,
    /// Margin mode (`crossed` / `fixed`).
    pub margin_mode: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl BitgetTdConfig {
    /// Extract Bitget settings from the application's [`ApiConfig`].
    pub fn from_api(api: &ApiConfig) -> Self {
        Self {
            api_key: api.api_key.clone(),
            secret_key: api.secret_key.clone(),
            passphrase: api.passphrase.clone(),
            base_url: api.base_url.trim_end_matches('/').to_string(),
            test_mode: api.test_mode,
            product_type: api.product_type.clone(),
            margin_coin: api.margin_coin.clone(),
            margin_mode: api.margin_mode.clone(),
            timeout: Duration::from_secs(api.timeout_secs.max(1)),
        }
    }
}

impl Default for BitgetTdConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            secret_key: String::new(),
            passphrase: String::new(),
            base_url: "https://api.bitget.com".into(),
            test_mode: false,
            product_type: "umcbl".into(),
            margin_coin: "USDT".into(),
            margin_mode: "crossed".into(),
            timeout: Duration::from_secs(10),
        }
    }
}
