//! # sigtrade-td
//!
//! Market/trading access for the signal trading system.
//!
//! The engine talks to the exchange only through the [`MarketApi`] trait:
//! ticker lookup, the open-position listing, order placement, and the
//! one-shot position-mode setting. Venue rejections are classified into
//! [`ApiError::PrecisionRejected`] / [`ApiError::OtherRejected`] by the
//! implementation, never by its callers.
//!
//! ## Implementations
//!
//! | Exchange | Module    | Products              | Channel      |
//! |----------|-----------|-----------------------|--------------|
//! | Bitget   | `bitget`  | USDT-margined mix v1  | signed REST  |
//! | (tests)  | `mock`    | in-memory             | in-process   |

pub mod bitget;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

use async_trait::async_trait;
use sigtrade_core::error::ApiError;
use sigtrade_core::trading::{LivePosition, OrderAck, OrderRequest};

/// Trait implemented by every exchange adapter.
///
/// All methods take `&self` so one adapter can be shared (behind an `Arc`)
/// by request handlers and the position monitor concurrently. Each call is a
/// single request with its own timeout; nothing is retried here.
#[async_trait]
pub trait MarketApi: Send + Sync {
    /// Last traded price for `symbol`.
    async fn ticker(&self, symbol: &str) -> Result<f64, ApiError>;

    /// All open positions for the configured product type and margin coin.
    async fn positions(&self) -> Result<Vec<LivePosition>, ApiError>;

    /// Submit a market order, optionally with preset TP/SL trigger prices.
    ///
    /// Returns the exchange-assigned order ID on success.
    async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck, ApiError>;

    /// Set the account hold mode (`single_hold` / `double_hold`).
    async fn set_position_mode(&self, mode: &str) -> Result<(), ApiError>;
}
