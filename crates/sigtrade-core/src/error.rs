//! Typed error definitions for the signal trading system.
//!
//! Two layers:
//!
//! - [`ApiError`] is produced by the exchange adapter. Venue rejections are
//!   classified exactly once, at the adapter boundary, into
//!   [`ApiError::PrecisionRejected`] or [`ApiError::OtherRejected`], so the
//!   order placer never has to inspect message text itself.
//! - [`TradeError`] is the domain taxonomy surfaced to callers of the engine
//!   and translated to HTTP statuses by the runner.

use thiserror::Error;

/// Errors returned by a `MarketApi` implementation (see `sigtrade-td`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The venue rejected the request because a price field used a decimal
    /// precision it does not accept for this symbol.
    #[error("precision rejected ({code}): {msg}")]
    PrecisionRejected { code: String, msg: String },

    /// The venue rejected the request for any other reason.
    #[error("rejected ({code}): {msg}")]
    OtherRejected { code: String, msg: String },

    /// The request never produced a response (connect, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(String),

    /// A response arrived but could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classify a non-success venue response by its message text.
    ///
    /// Bitget reports unsupported trigger-price precision with messages such
    /// as `"The price must be a multiple of 0.01"`; anything mentioning a
    /// price multiple, a price field or precision counts as precision-related.
    pub fn rejected(code: impl Into<String>, msg: impl Into<String>) -> Self {
        let code = code.into();
        let msg = msg.into();
        let lower = msg.to_ascii_lowercase();
        if lower.contains("multiple") || lower.contains("price") || lower.contains("precision") {
            Self::PrecisionRejected { code, msg }
        } else {
            Self::OtherRejected { code, msg }
        }
    }

    /// Returns `true` for a precision-related rejection.
    pub fn is_precision(&self) -> bool {
        matches!(self, Self::PrecisionRejected { .. })
    }
}

/// Domain errors of the trade lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TradeError {
    /// Missing or invalid input, rejected before any network call.
    #[error("{0}")]
    Validation(String),

    /// Duplicate active position, an operation already in flight for the
    /// symbol, or a side disallowed by the trade mode.
    #[error("{0}")]
    Conflict(String),

    /// The exchange was unreachable or returned a venue-level error.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Every preset-price precision from 6 down to 1 was rejected.
    #[error("no acceptable price precision found for {symbol} after {attempts} attempts")]
    PrecisionExhausted { symbol: String, attempts: u32 },

    /// No active trade for the requested symbol or order id.
    #[error("{0}")]
    NotFound(String),

    /// Reading or writing a local state file failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<ApiError> for TradeError {
    fn from(e: ApiError) -> Self {
        Self::Upstream(e.to_string())
    }
}

impl From<std::io::Error> for TradeError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for TradeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(e.to_string())
    }
}
