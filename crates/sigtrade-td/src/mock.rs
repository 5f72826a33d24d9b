//! In-memory [`MarketApi`] for tests.
//!
//! Tickers and the position listing are plain settable state; order outcomes
//! are scripted as a FIFO and fall back to success with sequential order IDs
//! once the script runs dry. Every submitted order is recorded.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use sigtrade_core::error::ApiError;
use sigtrade_core::trading::{LivePosition, OrderAck, OrderRequest};

use crate::MarketApi;

#[derive(Default)]
struct MockState {
    tickers: HashMap<String, Result<f64, ApiError>>,
    positions: Option<Result<Vec<LivePosition>, ApiError>>,
    order_script: VecDeque<Result<OrderAck, ApiError>>,
    orders: Vec<OrderRequest>,
    next_order_id: u64,
    ticker_calls: usize,
    position_calls: usize,
    position_modes: Vec<String>,
}

/// Scriptable exchange stand-in.
#[derive(Default)]
pub struct MockMarket {
    state: Mutex<MockState>,
}

impl MockMarket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the last price returned for `symbol`.
    pub fn set_price(&self, symbol: &str, price: f64) {
        self.lock().tickers.insert(symbol.to_string(), Ok(price));
    }

    /// Make ticker lookups for `symbol` fail.
    pub fn fail_ticker(&self, symbol: &str, err: ApiError) {
        self.lock().tickers.insert(symbol.to_string(), Err(err));
    }

    /// Replace the live position listing.
    pub fn set_positions(&self, positions: Vec<LivePosition>) {
        self.lock().positions = Some(Ok(positions));
    }

    /// Make the position listing fail.
    pub fn fail_positions(&self, err: ApiError) {
        self.lock().positions = Some(Err(err));
    }

    /// Queue the outcome of the next `place_order` call.
    pub fn push_order_result(&self, result: Result<OrderAck, ApiError>) {
        self.lock().order_script.push_back(result);
    }

    /// Every order submitted so far, in order.
    pub fn orders(&self) -> Vec<OrderRequest> {
        self.lock().orders.clone()
    }

    pub fn order_count(&self) -> usize {
        self.lock().orders.len()
    }

    pub fn ticker_calls(&self) -> usize {
        self.lock().ticker_calls
    }

    pub fn position_calls(&self) -> usize {
        self.lock().position_calls
    }

    /// Hold modes requested via `set_position_mode`.
    pub fn position_modes(&self) -> Vec<String> {
        self.lock().position_modes.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl MarketApi for MockMarket {
    async fn ticker(&self, symbol: &str) -> Result<f64, ApiError> {
        let mut state = self.lock();
        state.ticker_calls += 1;
        state
            .tickers
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| Err(ApiError::rejected("40034", format!("symbol {symbol} does not exist"))))
    }

    async fn positions(&self) -> Result<Vec<LivePosition>, ApiError> {
        let mut state = self.lock();
        state.position_calls += 1;
        state.positions.clone().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck, ApiError> {
        let mut state = self.lock();
        state.orders.push(order.clone());
        match state.order_script.pop_front() {
            Some(result) => result,
            None => {
                state.next_order_id += 1;
                Ok(OrderAck {
                    order_id: format!("{}", 1_000 + state.next_order_id),
                })
            }
        }
    }

    async fn set_position_mode(&self, mode: &str) -> Result<(), ApiError> {
        self.lock().position_modes.push(mode.to_string());
        Ok(())
    }
}
