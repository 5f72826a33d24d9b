//! Shared test fixtures.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sigtrade_core::enums::{TradeStatus, TradeType};
use sigtrade_core::error::ApiError;
use sigtrade_core::trading::{ActiveTrade, LivePosition, OrderAck, OrderRequest};
use sigtrade_td::MarketApi;
use sigtrade_td::mock::MockMarket;

use crate::store::ActiveTradeStore;

pub async fn fixture() -> (tempfile::TempDir, Arc<MockMarket>, Arc<ActiveTradeStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store = ActiveTradeStore::open(dir.path()).await.unwrap();
    (dir, Arc::new(MockMarket::new()), Arc::new(store))
}

/// A trade entered at 100.0 with size 0.002.
pub fn sample_trade(order_id: &str, symbol: &str, trade_type: TradeType) -> ActiveTrade {
    ActiveTrade {
        order_id: order_id.to_string(),
        symbol: symbol.to_string(),
        trade_type,
        amount: 40.0,
        entry_price: 100.0,
        take_profit_price: 105.0,
        stop_loss_price: 95.0,
        size: "0.002".to_string(),
        current_price: None,
        profit_percentage: None,
        status: TradeStatus::Active,
        timestamp: 1_700_000_000_000,
    }
}

pub async fn insert_trade(store: &ActiveTradeStore, trade: ActiveTrade) {
    let ticket = store.begin_open(&trade.symbol).await.unwrap();
    store.commit_open(ticket, trade).await.unwrap();
}

/// Venue whose order endpoint hangs far longer than any caller waits.
pub struct SlowMarket;

#[async_trait]
impl MarketApi for SlowMarket {
    async fn ticker(&self, _symbol: &str) -> Result<f64, ApiError> {
        Ok(100.0)
    }

    async fn positions(&self) -> Result<Vec<LivePosition>, ApiError> {
        Ok(Vec::new())
    }

    async fn place_order(&self, _order: &OrderRequest) -> Result<OrderAck, ApiError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Err(ApiError::Transport("gave up".into()))
    }

    async fn set_position_mode(&self, _mode: &str) -> Result<(), ApiError> {
        Ok(())
    }
}
