//! Bitget trading module.
//!
//! Implements the [`MarketApi`](crate::MarketApi) trait for Bitget
//! USDT-margined mix contracts (v1 REST API).
//!
//! # Architecture
//!
//! ```text
//! BitgetTd
//! ├── MixClient     (signed REST, envelope decoding, rejection classification)
//! └── account info  (product type, margin coin, margin mode)
//! ```
//!
//! All methods take `&self`; the client holds no mutable state.

pub mod auth;
pub mod client;
pub mod config;

use async_trait::async_trait;
use serde::Serialize;
use sigtrade_core::enums::TradeType;
use sigtrade_core::error::ApiError;
use sigtrade_core::symbol::UMCBL_SUFFIX;
use sigtrade_core::trading::{LivePosition, OrderAck, OrderRequest};
use tracing::{info, warn};

use self::client::{ALL_POSITION_PATH, MixClient, PLACE_ORDER_PATH, SET_POSITION_MODE_PATH, TICKER_PATH};
use self::config::BitgetTdConfig;

/// Trigger type attached to preset TP/SL prices.
const PRESET_PRICE_TYPE: &str = "last_price";

/// Bitget trading module.
pub struct BitgetTd {
    client: MixClient,
    product_type: String,
    margin_coin: String,
    margin_mode: String,
}

/// `placeOrder` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaceOrderBody<'a> {
    symbol: String,
    margin_coin: &'a str,
    margin_mode: &'a str,
    side: &'static str,
    pos_side: &'static str,
    order_type: &'static str,
    size: &'a str,
    product_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    preset_take_profit_price: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    preset_take_profit_price_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    preset_stop_loss_price: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    preset_stop_loss_price_type: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PositionModeBody<'a> {
    hold_mode: &'a str,
    product_type: &'a str,
}

impl BitgetTd {
    /// Create a new Bitget module.
    pub fn new(config: BitgetTdConfig) -> Result<Self, ApiError> {
        let client = MixClient::new(
            config.api_key,
            config.secret_key,
            config.passphrase,
            config.base_url,
            config.test_mode,
            config.timeout,
        )?;
        Ok(Self {
            client,
            product_type: config.product_type,
            margin_coin: config.margin_coin,
            margin_mode: config.margin_mode,
        })
    }

    fn order_body<'a>(&'a self, order: &'a OrderRequest) -> PlaceOrderBody<'a> {
        let symbol = if order.symbol.contains(UMCBL_SUFFIX) {
            order.symbol.clone()
        } else {
            format!("{}{UMCBL_SUFFIX}", order.symbol)
        };
        let tp = order.preset_take_profit_price.as_deref();
        let sl = order.preset_stop_loss_price.as_deref();
        PlaceOrderBody {
            symbol,
            margin_coin: &self.margin_coin,
            margin_mode: &self.margin_mode,
            side: order.side.as_str(),
            pos_side: order.side.pos_side().as_str(),
            order_type: "market",
            size: &order.size,
            product_type: &self.product_type,
            preset_take_profit_price: tp,
            preset_take_profit_price_type: tp.map(|_| PRESET_PRICE_TYPE),
            preset_stop_loss_price: sl,
            preset_stop_loss_price_type: sl.map(|_| PRESET_PRICE_TYPE),
        }
    }
}

#[async_trait]
impl crate::MarketApi for BitgetTd {
    async fn ticker(&self, symbol: &str) -> Result<f64, ApiError> {
        let data = self.client.get(TICKER_PATH, &[("symbol", symbol)]).await?;
        parse_last_price(&data).ok_or_else(|| ApiError::Decode(format!("ticker for {symbol} has no usable last price")))
    }

    async fn positions(&self) -> Result<Vec<LivePosition>, ApiError> {
        let data = self
            .client
            .get(
                ALL_POSITION_PATH,
                &[("productType", self.product_type.as_str()), ("marginCoin", self.margin_coin.as_str())],
            )
            .await?;
        let Some(arr) = data.as_array() else {
            return Err(ApiError::Decode("position listing is not an array".into()));
        };
        Ok(arr.iter().filter_map(parse_position).collect())
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck, ApiError> {
        let body = self.order_body(order);
        let data = self.client.post(PLACE_ORDER_PATH, &body).await?;

        let order_id = data
            .get("orderId")
            .and_then(json_string)
            .ok_or_else(|| ApiError::Decode("placeOrder response has no orderId".into()))?;

        info!(
            "[bitget-td] order placed: {} {} size={} tp={:?} sl={:?} → id={}",
            body.symbol, body.side, body.size, body.preset_take_profit_price, body.preset_stop_loss_price, order_id,
        );
        Ok(OrderAck { order_id })
    }

    async fn set_position_mode(&self, mode: &str) -> Result<(), ApiError> {
        let body = PositionModeBody {
            hold_mode: mode,
            product_type: &self.product_type,
        };
        match self.client.post(SET_POSITION_MODE_PATH, &body).await {
            Ok(_) => {
                info!("[bitget-td] position mode set to {mode}");
                Ok(())
            }
            Err(e) => {
                warn!("[bitget-td] set position mode {mode} failed: {e}");
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// JSON → typed helpers
// ---------------------------------------------------------------------------

/// Read a string or number field as a string.
fn json_string(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Extract a positive `last` price from ticker data.
fn parse_last_price(data: &serde_json::Value) -> Option<f64> {
    let price: f64 = json_string(data.get("last")?)?.parse().ok()?;
    (price.is_finite() && price > 0.0).then_some(price)
}

/// Parse a Bitget position JSON object into a [`LivePosition`].
///
/// Zero-size rows (Bitget lists both legs in some modes) are skipped.
fn parse_position(v: &serde_json::Value) -> Option<LivePosition> {
    let hold_side = match v.get("holdSide")?.as_str()? {
        "long" => TradeType::Long,
        "short" => TradeType::Short,
        _ => return None,
    };

    let total = v.get("total").and_then(json_string).unwrap_or_else(|| "0".into());
    let total_amt: f64 = total.parse().unwrap_or(0.0);
    if total_amt.abs() < 1e-12 {
        return None;
    }

    let available = v
        .get("available")
        .and_then(json_string)
        .filter(|a| a.parse::<f64>().map(|x| x > 0.0).unwrap_or(false))
        .unwrap_or_else(|| total.clone());

    Some(LivePosition {
        symbol: v.get("symbol")?.as_str()?.to_string(),
        hold_side,
        total,
        available,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigtrade_core::enums::OrderSide;

    fn td() -> BitgetTd {
        BitgetTd::new(BitgetTdConfig::default()).unwrap()
    }

    #[test]
    fn order_body_fills_account_fields() {
        let td = td();
        let order = OrderRequest {
            symbol: "BTCUSDT".into(),
            side: OrderSide::OpenShort,
            size: "0.001".into(),
            preset_take_profit_price: Some("95000.0000".into()),
            preset_stop_loss_price: Some("105000.0000".into()),
        };
        let json = serde_json::to_value(td.order_body(&order)).unwrap();
        assert_eq!(json["symbol"], "BTCUSDT_UMCBL");
        assert_eq!(json["side"], "open_short");
        assert_eq!(json["posSide"], "short");
        assert_eq!(json["orderType"], "market");
        assert_eq!(json["marginCoin"], "USDT");
        assert_eq!(json["marginMode"], "crossed");
        assert_eq!(json["productType"], "umcbl");
        assert_eq!(json["presetTakeProfitPrice"], "95000.0000");
        assert_eq!(json["presetStopLossPriceType"], "last_price");
    }

    #[test]
    fn close_order_body_has_no_presets() {
        let td = td();
        let order = OrderRequest::market("ETHUSDT_UMCBL", OrderSide::CloseLong, "0.5");
        let json = serde_json::to_value(td.order_body(&order)).unwrap();
        assert_eq!(json["symbol"], "ETHUSDT_UMCBL");
        assert_eq!(json["posSide"], "long");
        assert!(json.get("presetTakeProfitPrice").is_none());
        assert!(json.get("presetStopLossPriceType").is_none());
    }

    #[test]
    fn last_price_parsing() {
        assert_eq!(parse_last_price(&serde_json::json!({"last": "27000.5"})), Some(27000.5));
        assert_eq!(parse_last_price(&serde_json::json!({"last": 3.25})), Some(3.25));
        assert_eq!(parse_last_price(&serde_json::json!({"last": "0"})), None);
        assert_eq!(parse_last_price(&serde_json::json!({})), None);
    }

    #[test]
    fn position_parsing() {
        let p = parse_position(&serde_json::json!({
            "symbol": "BTCUSDT_UMCBL", "holdSide": "long", "total": "0.002", "available": "0.002"
        }))
        .unwrap();
        assert_eq!(p.hold_side, TradeType::Long);
        assert_eq!(p.available, "0.002");

        let fallback = parse_position(&serde_json::json!({
            "symbol": "BTCUSDT_UMCBL", "holdSide": "short", "total": "0.004", "available": "0"
        }))
        .unwrap();
        assert_eq!(fallback.available, "0.004");

        assert!(parse_position(&serde_json::json!({"symbol": "X", "holdSide": "long", "total": "0"})).is_none());
        assert!(parse_position(&serde_json::json!({"symbol": "X", "holdSide": "net", "total": "1"})).is_none());
    }
}
