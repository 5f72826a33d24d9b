//! Precision-retrying order placement.
//!
//! The venue accepts preset trigger prices only at a per-symbol decimal
//! precision that is not known up front. The placer formats TP/SL at 6
//! decimals and steps down one decimal at a time until the venue accepts the
//! order, giving up after 1 decimal.

use sigtrade_core::error::TradeError;
use sigtrade_core::trading::{OrderAck, OrderRequest};
use sigtrade_td::MarketApi;
use tracing::{debug, info, warn};

/// Highest precision tried first.
pub const MAX_PRECISION: u32 = 6;
/// Lowest precision tried last.
pub const MIN_PRECISION: u32 = 1;

/// An accepted order together with the preset prices as submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    pub ack: OrderAck,
    /// Decimal places of the accepted preset prices.
    pub precision: u32,
    pub take_profit: String,
    pub stop_loss: String,
    /// Orders submitted, including the accepted one.
    pub attempts: u32,
}

/// Format `price` with exactly `precision` decimals.
pub fn format_price(price: f64, precision: u32) -> String {
    format!("{price:.prec$}", prec = precision as usize)
}

fn check_price(label: &str, price: f64) -> Result<(), TradeError> {
    if price.is_finite() && price > 0.0 {
        Ok(())
    } else {
        Err(TradeError::Validation(format!("{label} price must be a positive number, got {price}")))
    }
}

/// Place `base` with TP/SL presets, stepping the price precision down from
/// [`MAX_PRECISION`] to [`MIN_PRECISION`] on precision rejections.
///
/// Any other failure ends the loop immediately. Presets already set on
/// `base` are replaced.
pub async fn place_with_precision(
    api: &dyn MarketApi,
    base: &OrderRequest,
    take_profit: f64,
    stop_loss: f64,
) -> Result<PlacedOrder, TradeError> {
    check_price("take-profit", take_profit)?;
    check_price("stop-loss", stop_loss)?;

    let mut attempts = 0;
    for precision in (MIN_PRECISION..=MAX_PRECISION).rev() {
        let tp = format_price(take_profit, precision);
        let sl = format_price(stop_loss, precision);
        let order = OrderRequest {
            preset_take_profit_price: Some(tp.clone()),
            preset_stop_loss_price: Some(sl.clone()),
            ..base.clone()
        };

        attempts += 1;
        debug!("[placer] {} {} tp={tp} sl={sl} (precision {precision})", base.symbol, base.side);
        match api.place_order(&order).await {
            Ok(ack) => {
                info!(
                    "[placer] {} {} accepted at precision {precision} after {attempts} attempt(s), order={}",
                    base.symbol, base.side, ack.order_id
                );
                return Ok(PlacedOrder {
                    ack,
                    precision,
                    take_profit: tp,
                    stop_loss: sl,
                    attempts,
                });
            }
            Err(e) if e.is_precision() => {
                debug!("[placer] precision {precision} rejected for {}: {e}", base.symbol);
            }
            Err(e) => {
                warn!("[placer] {} {} failed: {e}", base.symbol, base.side);
                return Err(e.into());
            }
        }
    }

    warn!("[placer] {} exhausted all precisions", base.symbol);
    Err(TradeError::PrecisionExhausted {
        symbol: base.symbol.clone(),
        attempts,
    })
}
