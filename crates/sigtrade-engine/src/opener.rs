//! Position opening: price lookup, sizing, TP/SL derivation, precision-retrying
//! placement, and recording of the new active trade.

use serde::Serialize;
use sigtrade_core::enums::TradeType;
use sigtrade_core::error::TradeError;
use sigtrade_core::symbol::normalize_symbol;
use sigtrade_core::time_util::now_ms;
use sigtrade_core::trading::{ActiveTrade, OrderRequest};
use sigtrade_td::MarketApi;
use tracing::{error, info, warn};

use crate::placer::place_with_precision;
use crate::settings::SettingsProvider;
use crate::store::ActiveTradeStore;

/// Smallest order size submitted.
pub const MIN_ORDER_SIZE: f64 = 0.001;

/// Open parameters. Unset values come from the current settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenRequest {
    pub symbol: String,
    pub amount: Option<f64>,
    pub take_profit_pct: Option<f64>,
    pub stop_loss_pct: Option<f64>,
}

impl OpenRequest {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }
}

/// Result of a successful open.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenedTrade {
    pub order_id: String,
    pub symbol: String,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    pub amount: f64,
    pub entry_price: f64,
    /// Accepted preset prices as submitted.
    pub take_profit_price: String,
    pub stop_loss_price: String,
    pub size: String,
    pub precision: u32,
}

/// Unrounded TP/SL trigger prices for an entry at `price`.
pub fn preset_levels(trade_type: TradeType, price: f64, tp_pct: f64, sl_pct: f64) -> (f64, f64) {
    match trade_type {
        TradeType::Long => (price * (1.0 + tp_pct / 100.0), price * (1.0 - sl_pct / 100.0)),
        TradeType::Short => (price * (1.0 - tp_pct / 100.0), price * (1.0 + sl_pct / 100.0)),
    }
}

/// Base quantity for `amount` quote at `price`: floored to 3 decimals, at
/// least [`MIN_ORDER_SIZE`].
pub fn order_size(amount: f64, price: f64) -> String {
    let size = ((amount / price) * 1000.0).floor() / 1000.0;
    format!("{:.3}", size.max(MIN_ORDER_SIZE))
}

fn positive(label: &str, value: f64) -> Result<f64, TradeError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(TradeError::Validation(format!("{label} must be greater than 0")))
    }
}

/// Open a `trade_type` position for `req.symbol`.
///
/// Fails with a conflict if the symbol already has an active trade or an
/// operation in flight; nothing is recorded unless the order is accepted.
pub async fn open_position(
    api: &dyn MarketApi,
    store: &ActiveTradeStore,
    settings: &dyn SettingsProvider,
    trade_type: TradeType,
    req: OpenRequest,
) -> Result<OpenedTrade, TradeError> {
    let symbol = normalize_symbol(&req.symbol)?;
    let current = settings.settings();
    let amount = positive("amount", req.amount.unwrap_or(current.amount))?;
    let tp_pct = positive("takeProfitPercentage", req.take_profit_pct.unwrap_or(current.take_profit_percentage))?;
    let sl_pct = positive("stopLossPercentage", req.stop_loss_pct.unwrap_or(current.stop_loss_percentage))?;

    let ticket = store.begin_open(&symbol).await?;
    let placed = match place_open(api, &symbol, trade_type, amount, tp_pct, sl_pct).await {
        Ok(placed) => placed,
        Err(e) => {
            drop(ticket);
            warn!("[opener] {trade_type} {symbol} failed: {e}");
            return Err(e);
        }
    };

    let trade = ActiveTrade {
        order_id: placed.order_id.clone(),
        symbol: symbol.clone(),
        trade_type,
        amount,
        entry_price: placed.entry_price,
        take_profit_price: placed.take_profit_price.parse().unwrap_or(placed.raw_take_profit),
        stop_loss_price: placed.stop_loss_price.parse().unwrap_or(placed.raw_stop_loss),
        size: placed.size.clone(),
        current_price: None,
        profit_percentage: None,
        status: Default::default(),
        timestamp: now_ms(),
    };
    if let Err(e) = store.commit_open(ticket, trade).await {
        error!("[opener] order {} for {symbol} placed but not persisted: {e}", placed.order_id);
    }

    info!(
        "[opener] opened {trade_type} {symbol} size={} entry={} tp={} sl={} order={}",
        placed.size, placed.entry_price, placed.take_profit_price, placed.stop_loss_price, placed.order_id
    );
    Ok(OpenedTrade {
        order_id: placed.order_id,
        symbol,
        trade_type,
        amount,
        entry_price: placed.entry_price,
        take_profit_price: placed.take_profit_price,
        stop_loss_price: placed.stop_loss_price,
        size: placed.size,
        precision: placed.precision,
    })
}

struct PlacedOpen {
    order_id: String,
    entry_price: f64,
    size: String,
    take_profit_price: String,
    stop_loss_price: String,
    raw_take_profit: f64,
    raw_stop_loss: f64,
    precision: u32,
}

async fn place_open(
    api: &dyn MarketApi,
    symbol: &str,
    trade_type: TradeType,
    amount: f64,
    tp_pct: f64,
    sl_pct: f64,
) -> Result<PlacedOpen, TradeError> {
    let price = api.ticker(symbol).await?;
    let size = order_size(amount, price);
    let (tp, sl) = preset_levels(trade_type, price, tp_pct, sl_pct);

    let base = OrderRequest::market(symbol, trade_type.open_side(), size.clone());
    let placed = place_with_precision(api, &base, tp, sl).await?;

    Ok(PlacedOpen {
        order_id: placed.ack.order_id,
        entry_price: price,
        size,
        take_profit_price: placed.take_profit,
        stop_loss_price: placed.stop_loss,
        raw_take_profit: tp,
        raw_stop_loss: sl,
        precision: placed.precision,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::settings::MemorySettings;
    use crate::testutil::{SlowMarket, fixture};
    use sigtrade_core::enums::OrderSide;
    use sigtrade_core::error::ApiError;
    use sigtrade_core::trading::TradeSettings;

    #[test]
    fn levels_follow_direction() {
        let (tp, sl) = preset_levels(TradeType::Long, 100.0, 5.0, 2.0);
        assert!((tp - 105.0).abs() < 1e-9 && (sl - 98.0).abs() < 1e-9);
        let (tp, sl) = preset_levels(TradeType::Short, 100.0, 5.0, 2.0);
        assert!((tp - 95.0).abs() < 1e-9 && (sl - 102.0).abs() < 1e-9);
    }

    #[test]
    fn size_is_floored_with_minimum() {
        assert_eq!(order_size(40.0, 20_000.0), "0.002");
        assert_eq!(order_size(50.0, 3.0), "16.666");
        assert_eq!(order_size(1.0, 60_000.0), "0.001");
    }

    #[tokio::test]
    async fn opens_and_records_long() {
        let (_dir, api, store) = fixture().await;
        let settings = MemorySettings::default();
        api.set_price("BTCUSDT_UMCBL", 20_000.0);

        let opened = open_position(api.as_ref(), &store, &settings, TradeType::Long, OpenRequest::new("btcusdt"))
            .await
            .unwrap();
        assert_eq!(opened.symbol, "BTCUSDT_UMCBL");
        assert_eq!(opened.size, "0.002");
        assert_eq!(opened.take_profit_price, "21000.000000");
        assert_eq!(opened.stop_loss_price, "19000.000000");

        let order = &api.orders()[0];
        assert_eq!(order.side, OrderSide::OpenLong);

        let trade = store.get("BTCUSDT_UMCBL").await.unwrap();
        assert_eq!(trade.order_id, opened.order_id);
        assert_eq!(trade.entry_price, 20_000.0);
        assert_eq!(trade.take_profit_price, 21_000.0);
        assert_eq!(trade.amount, 40.0);
    }

    #[tokio::test]
    async fn explicit_parameters_override_settings() {
        let (_dir, api, store) = fixture().await;
        let settings = MemorySettings::new(TradeSettings {
            amount: 10.0,
            ..TradeSettings::default()
        });
        api.set_price("ETHUSDT_UMCBL", 100.0);

        let req = OpenRequest {
            symbol: "ETHUSDT".into(),
            amount: Some(50.0),
            take_profit_pct: Some(10.0),
            stop_loss_pct: Some(1.0),
        };
        let opened = open_position(api.as_ref(), &store, &settings, TradeType::Short, req).await.unwrap();
        assert_eq!(opened.size, "0.500");
        assert_eq!(opened.take_profit_price, "90.000000");
        assert_eq!(opened.stop_loss_price, "101.000000");
        assert_eq!(api.orders()[0].side, OrderSide::OpenShort);
    }

    #[tokio::test]
    async fn stored_presets_are_the_accepted_rounding() {
        let (_dir, api, store) = fixture().await;
        let settings = MemorySettings::default();
        api.set_price("XRPUSDT_UMCBL", 0.523456);
        for _ in 0..3 {
            api.push_order_result(Err(ApiError::rejected("40808", "price must be a multiple of 0.001")));
        }

        let opened = open_position(api.as_ref(), &store, &settings, TradeType::Long, OpenRequest::new("XRPUSDT"))
            .await
            .unwrap();
        assert_eq!(opened.precision, 3);
        assert_eq!(opened.take_profit_price, "0.550");
        let trade = store.get("XRPUSDT_UMCBL").await.unwrap();
        assert_eq!(trade.take_profit_price, 0.55);
        assert_eq!(trade.stop_loss_price, 0.497);
    }

    #[tokio::test]
    async fn second_open_is_rejected_without_orders() {
        let (_dir, api, store) = fixture().await;
        let settings = MemorySettings::default();
        api.set_price("BTCUSDT_UMCBL", 20_000.0);

        open_position(api.as_ref(), &store, &settings, TradeType::Long, OpenRequest::new("BTCUSDT"))
            .await
            .unwrap();
        let err = open_position(api.as_ref(), &store, &settings, TradeType::Short, OpenRequest::new("BTCUSDT"))
            .await
            .unwrap_err();
        assert!(matches!(err, TradeError::Conflict(_)));
        assert_eq!(api.order_count(), 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn concurrent_opens_record_one_trade() {
        let (_dir, api, store) = fixture().await;
        let settings = MemorySettings::default();
        api.set_price("BTCUSDT_UMCBL", 20_000.0);

        let a = open_position(api.as_ref(), &store, &settings, TradeType::Long, OpenRequest::new("BTCUSDT"));
        let b = open_position(api.as_ref(), &store, &settings, TradeType::Long, OpenRequest::new("BTCUSDT"));
        let (a, b) = tokio::join!(a, b);

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert_eq!(store.len().await, 1);
        assert_eq!(api.order_count(), 1);
    }

    #[tokio::test]
    async fn failures_leave_store_untouched() {
        let (_dir, api, store) = fixture().await;
        let settings = MemorySettings::default();

        // Ticker unknown.
        let err = open_position(api.as_ref(), &store, &settings, TradeType::Long, OpenRequest::new("BTCUSDT"))
            .await
            .unwrap_err();
        assert!(matches!(err, TradeError::Upstream(_)));

        // Order rejected.
        api.set_price("BTCUSDT_UMCBL", 20_000.0);
        api.push_order_result(Err(ApiError::rejected("40762", "Insufficient balance")));
        assert!(
            open_position(api.as_ref(), &store, &settings, TradeType::Long, OpenRequest::new("BTCUSDT"))
                .await
                .is_err()
        );
        assert!(store.is_empty().await);

        // The symbol was released; a retry goes through.
        open_position(api.as_ref(), &store, &settings, TradeType::Long, OpenRequest::new("BTCUSDT"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn invalid_input_makes_no_calls() {
        let (_dir, api, store) = fixture().await;
        let settings = MemorySettings::default();

        let err = open_position(api.as_ref(), &store, &settings, TradeType::Long, OpenRequest::new("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, TradeError::Validation(_)));

        let req = OpenRequest {
            amount: Some(-5.0),
            ..OpenRequest::new("BTCUSDT")
        };
        let err = open_position(api.as_ref(), &store, &settings, TradeType::Long, req).await.unwrap_err();
        assert!(matches!(err, TradeError::Validation(_)));
        assert_eq!(api.ticker_calls(), 0);
    }

    #[tokio::test]
    async fn cancelled_open_releases_symbol() {
        let (_dir, _api, store) = fixture().await;
        let settings = MemorySettings::default();

        let open = open_position(&SlowMarket, &store, &settings, TradeType::Long, OpenRequest::new("BTCUSDT"));
        assert!(tokio::time::timeout(Duration::from_millis(50), open).await.is_err());

        assert!(store.is_empty().await);
        let _ticket = store.begin_open("BTCUSDT_UMCBL").await.unwrap();
    }
}
