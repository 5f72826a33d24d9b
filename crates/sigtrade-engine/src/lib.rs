//! # sigtrade-engine
//!
//! Trade lifecycle engine: turns BUY/SELL signals and manual requests into
//! exchange orders and keeps the local table of active trades in step with
//! the exchange.
//!
//! ```text
//! signal ──► router ──► opener ──► placer ──► MarketApi
//!                  └──► closer ─────────────► MarketApi
//!                          │
//!            store ◄───────┘◄──── monitor (interval)
//! ```
//!
//! - **store** — file-backed active trades, one per symbol
//! - **settings** — amount, TP/SL percentages, trade mode
//! - **placer** — precision-retrying TP/SL order placement
//! - **opener** / **closer** — position lifecycle
//! - **router** — signal → open / close / hold
//! - **monitor** — periodic reconciliation against live positions

pub mod closer;
pub mod monitor;
pub mod opener;
pub mod placer;
pub mod router;
pub mod settings;
pub mod store;

#[cfg(test)]
mod testutil;

use std::sync::Arc;
use std::time::Duration;

use sigtrade_core::enums::{SignalSide, TradeType};
use sigtrade_core::error::TradeError;
use sigtrade_core::trading::{ActiveTrade, TradeSettings};
use sigtrade_td::MarketApi;

use crate::closer::ClosedTrade;
use crate::monitor::PositionMonitor;
use crate::opener::{OpenRequest, OpenedTrade};
use crate::router::SignalOutcome;
use crate::settings::SettingsProvider;
use crate::store::ActiveTradeStore;

/// Entry point shared by every caller (HTTP handlers, monitor).
#[derive(Clone)]
pub struct TradeManager {
    api: Arc<dyn MarketApi>,
    store: Arc<ActiveTradeStore>,
    settings: Arc<dyn SettingsProvider>,
}

impl TradeManager {
    pub fn new(api: Arc<dyn MarketApi>, store: Arc<ActiveTradeStore>, settings: Arc<dyn SettingsProvider>) -> Self {
        Self { api, store, settings }
    }

    pub async fn handle_signal(&self, symbol: &str, side: SignalSide) -> Result<SignalOutcome, TradeError> {
        router::route_signal(self.api.as_ref(), &self.store, self.settings.as_ref(), symbol, side).await
    }

    pub async fn open_long(&self, req: OpenRequest) -> Result<OpenedTrade, TradeError> {
        self.open(TradeType::Long, req).await
    }

    pub async fn open_short(&self, req: OpenRequest) -> Result<OpenedTrade, TradeError> {
        self.open(TradeType::Short, req).await
    }

    pub async fn open(&self, trade_type: TradeType, req: OpenRequest) -> Result<OpenedTrade, TradeError> {
        opener::open_position(self.api.as_ref(), &self.store, self.settings.as_ref(), trade_type, req).await
    }

    pub async fn close_position(&self, symbol: &str) -> Result<ClosedTrade, TradeError> {
        closer::close_position(self.api.as_ref(), &self.store, symbol).await
    }

    pub async fn close_by_order_id(&self, order_id: &str) -> Result<ClosedTrade, TradeError> {
        closer::close_by_order_id(self.api.as_ref(), &self.store, order_id).await
    }

    pub async fn active_trades(&self) -> Vec<ActiveTrade> {
        self.store.snapshot().await
    }

    pub fn settings(&self) -> TradeSettings {
        self.settings.settings()
    }

    pub fn update_settings(&self, settings: TradeSettings) -> Result<TradeSettings, TradeError> {
        self.settings.save(settings)?;
        Ok(self.settings.settings())
    }

    /// A monitor over the same exchange and store.
    pub fn monitor(&self, interval: Duration) -> PositionMonitor {
        PositionMonitor::new(self.api.clone(), self.store.clone(), interval)
    }
}
