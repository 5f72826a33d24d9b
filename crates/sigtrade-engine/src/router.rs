//! Signal routing.
//!
//! A BUY/SELL signal is mapped onto open / close / hold depending on the
//! active trade for the symbol and the configured trade mode:
//!
//! | current | BUY                   | SELL                   |
//! |---------|-----------------------|------------------------|
//! | none    | open long (mode)      | open short (mode)      |
//! | long    | hold                  | close                  |
//! | short   | close                 | hold                   |
//!
//! "(mode)" means the open is rejected when the trade mode disallows the side.
//! A close never reverses into the opposite side; the next signal does that.

use serde::Serialize;
use sigtrade_core::enums::{SignalSide, TradeMode, TradeType};
use sigtrade_core::error::TradeError;
use sigtrade_core::symbol::{display_symbol, normalize_symbol};
use sigtrade_core::trading::ActiveTrade;
use sigtrade_td::MarketApi;
use tracing::info;

use crate::closer::{ClosedTrade, close_position};
use crate::opener::{OpenRequest, OpenedTrade, open_position};
use crate::settings::SettingsProvider;
use crate::store::ActiveTradeStore;

/// What a signal asks for, before any side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Open(TradeType),
    Close,
    Hold,
    Reject(String),
}

/// Map a signal onto a [`Decision`].
pub fn decide(current: Option<TradeType>, side: SignalSide, mode: TradeMode) -> Decision {
    match (current, side) {
        (None, side) => {
            let wanted = match side {
                SignalSide::Buy => TradeType::Long,
                SignalSide::Sell => TradeType::Short,
            };
            if mode.allows(wanted) {
                Decision::Open(wanted)
            } else {
                Decision::Reject(format!("{wanted} trades are disabled in {mode:?} mode"))
            }
        }
        (Some(TradeType::Long), SignalSide::Sell) | (Some(TradeType::Short), SignalSide::Buy) => Decision::Close,
        (Some(_), _) => Decision::Hold,
    }
}

/// Action actually taken for a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalAction {
    OpenLong,
    OpenShort,
    CloseLong,
    CloseShort,
    None,
}

/// Payload of the action taken.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionResult {
    Opened(OpenedTrade),
    Closed(ClosedTrade),
    /// The existing trade left in place.
    Held(ActiveTrade),
}

/// Outcome of routing one signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalOutcome {
    pub symbol: String,
    pub side: SignalSide,
    pub action: SignalAction,
    /// `false` when the signal was a no-op.
    pub executed: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ActionResult>,
}

/// Route a BUY/SELL signal for `symbol`.
///
/// A side disallowed by the trade mode is a conflict.
pub async fn route_signal(
    api: &dyn MarketApi,
    store: &ActiveTradeStore,
    settings: &dyn SettingsProvider,
    symbol: &str,
    side: SignalSide,
) -> Result<SignalOutcome, TradeError> {
    let symbol = normalize_symbol(symbol)?;
    let current = store.get(&symbol).await;
    let mode = settings.settings().trade_mode;
    let decision = decide(current.as_ref().map(|t| t.trade_type), side, mode);
    info!("[router] {} {} → {decision:?}", side.as_str(), symbol);

    let outcome = |action, executed, message: String, result| SignalOutcome {
        symbol: symbol.clone(),
        side,
        action,
        executed,
        message,
        result,
    };

    match decision {
        Decision::Open(trade_type) => {
            let opened = open_position(api, store, settings, trade_type, OpenRequest::new(symbol.as_str())).await?;
            let action = match trade_type {
                TradeType::Long => SignalAction::OpenLong,
                TradeType::Short => SignalAction::OpenShort,
            };
            let message = format!("opened {trade_type} position on {}", display_symbol(&symbol));
            Ok(outcome(action, true, message, Some(ActionResult::Opened(opened))))
        }
        Decision::Close => {
            let closed = close_position(api, store, &symbol).await?;
            let action = match closed.trade_type {
                TradeType::Long => SignalAction::CloseLong,
                TradeType::Short => SignalAction::CloseShort,
            };
            let message = format!("closed {} position on {}", closed.trade_type, display_symbol(&symbol));
            Ok(outcome(action, true, message, Some(ActionResult::Closed(closed))))
        }
        Decision::Hold => {
            let held = current.map(ActionResult::Held);
            let message = format!("already holding this side on {}, no action", display_symbol(&symbol));
            Ok(outcome(SignalAction::None, false, message, held))
        }
        Decision::Reject(reason) => Err(TradeError::Conflict(reason)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemorySettings;
    use crate::testutil::{fixture, insert_trade, sample_trade};
    use sigtrade_core::enums::OrderSide;
    use sigtrade_core::trading::TradeSettings;

    #[test]
    fn decision_table() {
        use Decision::*;
        let both = TradeMode::Both;
        assert_eq!(decide(None, SignalSide::Buy, both), Open(TradeType::Long));
        assert_eq!(decide(None, SignalSide::Sell, both), Open(TradeType::Short));
        assert_eq!(decide(Some(TradeType::Long), SignalSide::Buy, both), Hold);
        assert_eq!(decide(Some(TradeType::Long), SignalSide::Sell, both), Close);
        assert_eq!(decide(Some(TradeType::Short), SignalSide::Buy, both), Close);
        assert_eq!(decide(Some(TradeType::Short), SignalSide::Sell, both), Hold);
    }

    #[test]
    fn trade_mode_gates_opens_only() {
        assert!(matches!(decide(None, SignalSide::Sell, TradeMode::LongOnly), Decision::Reject(_)));
        assert!(matches!(decide(None, SignalSide::Buy, TradeMode::ShortOnly), Decision::Reject(_)));
        assert_eq!(decide(Some(TradeType::Long), SignalSide::Sell, TradeMode::ShortOnly), Decision::Close);
        assert_eq!(decide(Some(TradeType::Short), SignalSide::Buy, TradeMode::ShortOnly), Decision::Close);
    }

    #[tokio::test]
    async fn buy_opens_long_then_sell_closes() {
        let (_dir, api, store) = fixture().await;
        let settings = MemorySettings::default();
        api.set_price("SOLUSDT_UMCBL", 25.0);

        let out = route_signal(api.as_ref(), &store, &settings, "solusdt", SignalSide::Buy).await.unwrap();
        assert_eq!(out.action, SignalAction::OpenLong);
        assert!(out.executed);
        assert_eq!(store.get("SOLUSDT_UMCBL").await.unwrap().trade_type, TradeType::Long);

        let out = route_signal(api.as_ref(), &store, &settings, "SOLUSDT", SignalSide::Sell).await.unwrap();
        assert_eq!(out.action, SignalAction::CloseLong);
        assert!(store.is_empty().await);

        let sides: Vec<OrderSide> = api.orders().iter().map(|o| o.side).collect();
        assert_eq!(sides, vec![OrderSide::OpenLong, OrderSide::CloseLong]);
    }

    #[tokio::test]
    async fn same_side_signal_holds() {
        let (_dir, api, store) = fixture().await;
        let settings = MemorySettings::default();
        insert_trade(&store, sample_trade("5", "BTCUSDT_UMCBL", TradeType::Short)).await;

        let out = route_signal(api.as_ref(), &store, &settings, "BTCUSDT", SignalSide::Sell).await.unwrap();
        assert_eq!(out.action, SignalAction::None);
        assert!(!out.executed);
        assert!(matches!(out.result, Some(ActionResult::Held(ref t)) if t.order_id == "5"));
        assert_eq!(api.order_count(), 0);
    }

    #[tokio::test]
    async fn disallowed_side_is_conflict() {
        let (_dir, api, store) = fixture().await;
        let settings = MemorySettings::new(TradeSettings {
            trade_mode: TradeMode::LongOnly,
            ..TradeSettings::default()
        });
        api.set_price("BTCUSDT_UMCBL", 20_000.0);

        let err = route_signal(api.as_ref(), &store, &settings, "BTCUSDT", SignalSide::Sell).await.unwrap_err();
        assert!(matches!(err, TradeError::Conflict(_)));
        assert_eq!(api.order_count(), 0);
        assert_eq!(api.ticker_calls(), 0);
    }

    #[tokio::test]
    async fn outcome_serializes_action_label() {
        let (_dir, api, store) = fixture().await;
        let settings = MemorySettings::default();
        api.set_price("BTCUSDT_UMCBL", 20_000.0);
        let out = route_signal(api.as_ref(), &store, &settings, "BTCUSDT", SignalSide::Sell).await.unwrap();
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["action"], "open_short");
        assert_eq!(json["side"], "SELL");
        assert_eq!(json["result"]["type"], "short");
    }
}
