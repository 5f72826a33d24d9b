//! Position closing: size resolution, market close order, and removal of the
//! active trade.

use serde::Serialize;
use sigtrade_core::enums::TradeType;
use sigtrade_core::error::TradeError;
use sigtrade_core::symbol::normalize_symbol;
use sigtrade_core::time_util::now_ms;
use sigtrade_core::trading::{ActiveTrade, OrderRequest};
use sigtrade_td::MarketApi;
use tracing::{error, info, warn};

use crate::store::{ActiveTradeStore, CloseTicket};

/// Close size used when neither the record nor the live listing yields one.
pub const FALLBACK_CLOSE_SIZE: &str = "100";

/// Result of a successful close.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedTrade {
    /// ID of the closing order.
    pub order_id: String,
    /// ID of the order that opened the position.
    pub opened_order_id: String,
    pub symbol: String,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    pub size: String,
    pub closed_at: u64,
}

/// Close the active trade for `symbol`.
///
/// Returns `NotFound` without any network call when no trade is recorded.
pub async fn close_position(api: &dyn MarketApi, store: &ActiveTradeStore, symbol: &str) -> Result<ClosedTrade, TradeError> {
    let symbol = normalize_symbol(symbol)?;
    let ticket = store.begin_close(&symbol).await?;
    close_ticket(api, store, ticket).await
}

/// Close the active trade opened by `order_id`.
pub async fn close_by_order_id(api: &dyn MarketApi, store: &ActiveTradeStore, order_id: &str) -> Result<ClosedTrade, TradeError> {
    let order_id = order_id.trim();
    if order_id.is_empty() {
        return Err(TradeError::Validation("missing trade id".into()));
    }
    let ticket = store.begin_close_by_order_id(order_id).await?;
    close_ticket(api, store, ticket).await
}

async fn close_ticket(api: &dyn MarketApi, store: &ActiveTradeStore, ticket: CloseTicket) -> Result<ClosedTrade, TradeError> {
    let trade = ticket.trade().clone();
    let size = resolve_size(api, &trade).await;
    let order = OrderRequest::market(trade.symbol.as_str(), trade.trade_type.close_side(), size.clone());

    let ack = match api.place_order(&order).await {
        Ok(ack) => ack,
        Err(e) => {
            drop(ticket);
            warn!("[closer] close {} {} failed: {e}", trade.trade_type, trade.symbol);
            return Err(e.into());
        }
    };

    if let Err(e) = store.commit_close(ticket).await {
        error!("[closer] {} closed on venue but removal not persisted: {e}", trade.symbol);
    }
    info!(
        "[closer] closed {} {} size={size} order={} (opened by {})",
        trade.trade_type, trade.symbol, ack.order_id, trade.order_id
    );

    Ok(ClosedTrade {
        order_id: ack.order_id,
        opened_order_id: trade.order_id,
        symbol: trade.symbol,
        trade_type: trade.trade_type,
        size,
        closed_at: now_ms(),
    })
}

/// Recorded size if usable, else the live available size, else the fallback.
async fn resolve_size(api: &dyn MarketApi, trade: &ActiveTrade) -> String {
    if trade.size.parse::<f64>().is_ok_and(|s| s > 0.0) {
        return trade.size.clone();
    }

    match api.positions().await {
        Ok(positions) => {
            if let Some(p) = positions.iter().find(|p| p.symbol == trade.symbol && p.hold_side == trade.trade_type) {
                return p.available.clone();
            }
            warn!("[closer] {} {} not in live listing", trade.trade_type, trade.symbol);
        }
        Err(e) => warn!("[closer] position listing failed: {e}"),
    }

    warn!("[closer] no size for {}, using fallback {FALLBACK_CLOSE_SIZE}", trade.symbol);
    FALLBACK_CLOSE_SIZE.to_string()
}
