//! Position monitor.
//!
//! Periodically reconciles the active-trade table against the exchange: each
//! trade gets a fresh price and P&L, and trades whose position no longer
//! appears in the live listing (TP/SL hit, closed by hand) are removed.
//!
//! A trade whose price or listing lookup fails is skipped for the cycle and
//! left untouched. Only an affirmative listing without the position marks
//! it closed.

use std::sync::Arc;
use std::time::Duration;

use sigtrade_td::MarketApi;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::store::{ActiveTradeStore, SweepOutcome};

/// Default time between cycles.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Counters for one monitor cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Trades in the snapshot.
    pub checked: usize,
    /// Rows refreshed with a new price.
    pub updated: usize,
    /// Rows removed as closed on the exchange.
    pub closed: usize,
    /// Trades skipped after a failed lookup.
    pub skipped: usize,
}

pub struct PositionMonitor {
    api: Arc<dyn MarketApi>,
    store: Arc<ActiveTradeStore>,
    interval: Duration,
}

impl PositionMonitor {
    pub fn new(api: Arc<dyn MarketApi>, store: Arc<ActiveTradeStore>, interval: Duration) -> Self {
        Self { api, store, interval }
    }

    /// Run one reconciliation pass.
    pub async fn run_cycle(&self) -> CycleReport {
        let trades = self.store.snapshot().await;
        let mut report = CycleReport {
            checked: trades.len(),
            ..CycleReport::default()
        };
        if trades.is_empty() {
            debug!("[monitor] no active trades");
            return report;
        }

        let mut outcomes = Vec::with_capacity(trades.len());
        for trade in &trades {
            let price = match self.api.ticker(&trade.symbol).await {
                Ok(p) => p,
                Err(e) => {
                    warn!("[monitor] ticker {} failed, skipping: {e}", trade.symbol);
                    report.skipped += 1;
                    continue;
                }
            };
            let positions = match self.api.positions().await {
                Ok(p) => p,
                Err(e) => {
                    warn!("[monitor] position listing failed, skipping {}: {e}", trade.symbol);
                    report.skipped += 1;
                    continue;
                }
            };

            let open = positions
                .iter()
                .any(|p| p.symbol == trade.symbol && p.hold_side == trade.trade_type);
            if open {
                let pnl = trade.pnl_percent(price);
                debug!("[monitor] {} {} price={price} pnl={pnl}%", trade.symbol, trade.trade_type);
                outcomes.push(SweepOutcome::Price {
                    order_id: trade.order_id.clone(),
                    current_price: price,
                    profit_percentage: pnl,
                });
            } else {
                info!(
                    "[monitor] {} {} closed on exchange (order {})",
                    trade.symbol, trade.trade_type, trade.order_id
                );
                outcomes.push(SweepOutcome::Vanished {
                    order_id: trade.order_id.clone(),
                });
            }
        }

        match self.store.apply_sweep(&outcomes).await {
            Ok(summary) => {
                report.updated = summary.updated;
                report.closed = summary.removed;
            }
            Err(e) => error!("[monitor] failed to persist sweep: {e}"),
        }
        report
    }

    /// Run a cycle now and then every interval, until the task is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("[monitor] started, interval {:?}", self.interval);
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let report = self.run_cycle().await;
                if report.checked > 0 {
                    info!(
                        "[monitor] cycle: checked={} updated={} closed={} skipped={}",
                        report.checked, report.updated, report.closed, report.skipped
                    );
                }
            }
        })
    }
}
