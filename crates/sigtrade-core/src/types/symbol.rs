//! Symbol normalization between user input and the mix-contract format.
//!
//! Signals and dashboard requests carry bare coin pairs in any case
//! (`btcusdt`), while the mix API identifies USDT-margined perpetuals as
//! `BTCUSDT_UMCBL`. Every symbol entering the engine goes through
//! [`normalize_symbol`] so the active-trade store is keyed consistently.

use crate::error::TradeError;

/// Suffix qualifying a USDT-margined perpetual contract.
pub const UMCBL_SUFFIX: &str = "_UMCBL";

/// Uppercase `raw` and append [`UMCBL_SUFFIX`] unless already present.
///
/// Returns a validation error for empty or whitespace-only input.
pub fn normalize_symbol(raw: &str) -> Result<String, TradeError> {
    let upper = raw.trim().to_uppercase();
    if upper.is_empty() || upper == UMCBL_SUFFIX {
        return Err(TradeError::Validation("missing symbol".into()));
    }
    if upper.contains(UMCBL_SUFFIX) {
        Ok(upper)
    } else {
        Ok(format!("{upper}{UMCBL_SUFFIX}"))
    }
}

/// Strip the contract suffix for human-facing messages.
pub fn display_symbol(symbol: &str) -> &str {
    symbol.strip_suffix(UMCBL_SUFFIX).unwrap_or(symbol)
}
