//! Trading-related data structures — active trades, settings, orders, and
//! live positions.
//!
//! [`ActiveTrade`] and [`TradeSettings`] are persisted as camelCase JSON;
//! the order types flow between the engine and the exchange adapter.

use serde::{Deserialize, Serialize};

use super::enums::{OrderSide, TradeMode, TradeStatus, TradeType};

// ---------------------------------------------------------------------------
// Active trade (local mirror of one open exchange position)
// ---------------------------------------------------------------------------

/// A currently open position as recorded locally.
///
/// Everything except `current_price`, `profit_percentage` and `status` is
/// fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTrade {
    /// Exchange-assigned order ID of the opening order.
    pub order_id: String,
    /// Normalized contract symbol (e.g. `"BTCUSDT_UMCBL"`).
    pub symbol: String,
    /// Long or short.
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    /// Margin committed, in quote currency.
    pub amount: f64,
    /// Last price observed when the order was placed.
    pub entry_price: f64,
    /// Accepted preset take-profit trigger price.
    pub take_profit_price: f64,
    /// Accepted preset stop-loss trigger price.
    pub stop_loss_price: f64,
    /// Base-asset quantity as submitted (3 decimals).
    pub size: String,
    /// Last polled price (monitor only).
    #[serde(default)]
    pub current_price: Option<f64>,
    /// Unrealized P&L in percent, rounded to 2 decimals (monitor only).
    #[serde(default)]
    pub profit_percentage: Option<f64>,
    #[serde(default)]
    pub status: TradeStatus,
    /// Creation time, ms since epoch.
    pub timestamp: u64,
}

impl ActiveTrade {
    /// Unrealized P&L in percent at `current`, rounded to 2 decimals.
    ///
    /// Long: `(current − entry) / entry · 100`; short: the sign inverts.
    pub fn pnl_percent(&self, current: f64) -> f64 {
        if self.entry_price <= 0.0 {
            return 0.0;
        }
        let raw = match self.trade_type {
            TradeType::Long => (current - self.entry_price) / self.entry_price * 100.0,
            TradeType::Short => (self.entry_price - current) / self.entry_price * 100.0,
        };
        (raw * 100.0).round() / 100.0
    }
}

// ---------------------------------------------------------------------------
// Trade settings
// ---------------------------------------------------------------------------

/// User-adjustable trading parameters. Missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TradeSettings {
    /// Margin per trade, in quote currency.
    pub amount: f64,
    /// Leverage configured on the account (informational).
    pub leverage: u32,
    pub take_profit_percentage: f64,
    pub stop_loss_percentage: f64,
    pub trade_mode: TradeMode,
}

impl Default for TradeSettings {
    fn default() -> Self {
        Self {
            amount: 40.0,
            leverage: 25,
            take_profit_percentage: 5.0,
            stop_loss_percentage: 5.0,
            trade_mode: TradeMode::Both,
        }
    }
}

// ---------------------------------------------------------------------------
// Orders (engine → adapter)
// ---------------------------------------------------------------------------

/// A market order request. Account-level fields (margin coin, margin mode,
/// product type) are filled in by the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    /// Base quantity, already formatted.
    pub size: String,
    pub preset_take_profit_price: Option<String>,
    pub preset_stop_loss_price: Option<String>,
}

impl OrderRequest {
    /// A plain market order without TP/SL presets.
    pub fn market(symbol: impl Into<String>, side: OrderSide, size: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            size: size.into(),
            preset_take_profit_price: None,
            preset_stop_loss_price: None,
        }
    }
}

/// Successful order placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    /// Exchange-assigned order ID.
    pub order_id: String,
}

// ---------------------------------------------------------------------------
// Live position (adapter → engine)
// ---------------------------------------------------------------------------

/// One open position as reported by the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivePosition {
    pub symbol: String,
    pub hold_side: TradeType,
    /// Total position size.
    pub total: String,
    /// Size available to close.
    pub available: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(trade_type: TradeType, entry: f64) -> ActiveTrade {
        ActiveTrade {
            order_id: "1".into(),
            symbol: "BTCUSDT_UMCBL".into(),
            trade_type,
            amount: 40.0,
            entry_price: entry,
            take_profit_price: 0.0,
            stop_loss_price: 0.0,
            size: "0.001".into(),
            current_price: None,
            profit_percentage: None,
            status: TradeStatus::Active,
            timestamp: 0,
        }
    }

    #[test]
    fn pnl_sign_follows_direction() {
        assert_eq!(trade(TradeType::Long, 100.0).pnl_percent(110.0), 10.0);
        assert_eq!(trade(TradeType::Short, 100.0).pnl_percent(110.0), -10.0);
        assert_eq!(trade(TradeType::Short, 100.0).pnl_percent(95.0), 5.0);
    }

    #[test]
    fn pnl_rounds_to_two_decimals() {
        assert_eq!(trade(TradeType::Long, 3.0).pnl_percent(3.1), 3.33);
    }

    #[test]
    fn active_trade_json_layout() {
        let json = serde_json::to_value(trade(TradeType::Long, 100.0)).unwrap();
        assert_eq!(json["orderId"], "1");
        assert_eq!(json["type"], "long");
        assert_eq!(json["entryPrice"], 100.0);
        assert_eq!(json["status"], "active");
    }

    #[test]
    fn partial_settings_take_defaults() {
        let s: TradeSettings = serde_json::from_str(r#"{"amount": 100, "tradeMode": "short-only"}"#).unwrap();
        assert_eq!(s.amount, 100.0);
        assert_eq!(s.leverage, 25);
        assert_eq!(s.take_profit_percentage, 5.0);
        assert_eq!(s.trade_mode, TradeMode::ShortOnly);
    }
}
