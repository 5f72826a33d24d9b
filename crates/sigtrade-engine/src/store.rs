//! Active Trade Store — the single owner of [`ActiveTrade`] rows.
//!
//! Backed by a JSON array file (`active_trades.json`) that is read fully at
//! startup and rewritten fully (temp file + rename) on every mutation. The
//! rows live behind one async mutex, so every read-modify-write is atomic
//! with respect to the others.
//!
//! Opening and closing span several network calls, which must not run under
//! the lock. Instead a symbol is marked *in flight* by [`begin_open`] /
//! [`begin_close`], which hand out a ticket. Committing the ticket writes the
//! change; dropping it for any reason (error, timeout, cancelled request)
//! releases the symbol with no row changed:
//!
//! ```text
//! begin_open ──► place order ──► commit_open   (row inserted)
//!            └──────────────────► drop ticket  (nothing written)
//! begin_close ─► place order ──► commit_close  (row removed)
//!             └─────────────────► drop ticket  (row untouched)
//! ```
//!
//! While a symbol is in flight a second open or close for it is a conflict,
//! and monitor sweeps leave its row alone.
//!
//! [`begin_open`]: ActiveTradeStore::begin_open
//! [`begin_close`]: ActiveTradeStore::begin_close

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, MutexGuard, PoisonError};

use sigtrade_core::enums::TradeStatus;
use sigtrade_core::error::TradeError;
use sigtrade_core::symbol::display_symbol;
use sigtrade_core::trading::ActiveTrade;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// File name of the persisted table inside the data directory.
pub const TRADES_FILE: &str = "active_trades.json";

/// Symbols with an open or close in progress.
///
/// Held behind a blocking mutex so a ticket can release its symbol from
/// `Drop`. Never locked across an `.await`.
type InFlight = Arc<std::sync::Mutex<HashSet<String>>>;

fn lock_in_flight(set: &InFlight) -> MutexGuard<'_, HashSet<String>> {
    set.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Releases one in-flight symbol when dropped.
#[derive(Debug)]
struct InFlightGuard {
    symbol: String,
    set: InFlight,
}

impl InFlightGuard {
    /// Mark `symbol` in flight, or `None` when it already is.
    fn acquire(set: &InFlight, symbol: &str) -> Option<Self> {
        if !lock_in_flight(set).insert(symbol.to_string()) {
            return None;
        }
        Some(Self {
            symbol: symbol.to_string(),
            set: set.clone(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock_in_flight(&self.set).remove(&self.symbol);
        debug!("[store] {} released", self.symbol);
    }
}

/// Permission to open a position for one symbol.
#[must_use = "dropping a ticket releases the symbol without writing"]
#[derive(Debug)]
pub struct OpenTicket {
    guard: InFlightGuard,
}

impl OpenTicket {
    pub fn symbol(&self) -> &str {
        &self.guard.symbol
    }
}

/// Permission to close one active trade.
#[must_use = "dropping a ticket releases the symbol without writing"]
#[derive(Debug)]
pub struct CloseTicket {
    trade: ActiveTrade,
    _guard: InFlightGuard,
}

impl CloseTicket {
    /// The trade as it was when the close began.
    pub fn trade(&self) -> &ActiveTrade {
        &self.trade
    }
}

/// One monitor observation, keyed by the opening order ID.
#[derive(Debug, Clone, PartialEq)]
pub enum SweepOutcome {
    /// The position is still open; refresh price and P&L.
    Price {
        order_id: String,
        current_price: f64,
        profit_percentage: f64,
    },
    /// The position is gone from the exchange listing.
    Vanished { order_id: String },
}

/// Rows actually changed by [`ActiveTradeStore::apply_sweep`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub updated: usize,
    pub removed: usize,
}

/// File-backed table of currently open positions, keyed by symbol.
pub struct ActiveTradeStore {
    path: PathBuf,
    trades: Mutex<Vec<ActiveTrade>>,
    in_flight: InFlight,
}

impl ActiveTradeStore {
    /// Open the store inside `data_dir`, creating the directory and an empty
    /// table file when missing.
    pub async fn open(data_dir: &Path) -> Result<Self, TradeError> {
        tokio::fs::create_dir_all(data_dir).await?;
        Self::load(data_dir.join(TRADES_FILE)).await
    }

    /// Load the table at `path` (created as `[]` when missing).
    ///
    /// A file that exists but does not parse is an error; it is never
    /// overwritten silently.
    pub async fn load(path: PathBuf) -> Result<Self, TradeError> {
        let trades: Vec<ActiveTrade> = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| TradeError::Storage(format!("{} is not a valid trade table: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                write_table(&path, &[]).await?;
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        // Rows persisted as closed never survive a reload.
        let trades: Vec<ActiveTrade> = trades.into_iter().filter(|t| t.status == TradeStatus::Active).collect();
        info!("[store] loaded {} active trade(s) from {}", trades.len(), path.display());

        Ok(Self {
            path,
            trades: Mutex::new(trades),
            in_flight: InFlight::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Copy of every active trade, in insertion order.
    pub async fn snapshot(&self) -> Vec<ActiveTrade> {
        self.trades.lock().await.clone()
    }

    /// The active trade for a normalized symbol.
    pub async fn get(&self, symbol: &str) -> Option<ActiveTrade> {
        self.trades.lock().await.iter().find(|t| t.symbol == symbol).cloned()
    }

    pub async fn len(&self) -> usize {
        self.trades.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    // -----------------------------------------------------------------------
    // Open
    // -----------------------------------------------------------------------

    /// Atomically check that `symbol` has no active trade and no operation in
    /// flight, and mark it in flight.
    pub async fn begin_open(&self, symbol: &str) -> Result<OpenTicket, TradeError> {
        let trades = self.trades.lock().await;
        if trades.iter().any(|t| t.symbol == symbol) {
            return Err(TradeError::Conflict(format!(
                "{} already has an active trade; only one position per symbol is allowed",
                display_symbol(symbol)
            )));
        }
        let guard = InFlightGuard::acquire(&self.in_flight, symbol).ok_or_else(|| in_progress(symbol))?;
        debug!("[store] open started for {symbol}");
        Ok(OpenTicket { guard })
    }

    /// Insert the newly opened trade and persist.
    ///
    /// The row stays in memory even if the write fails, because the exchange
    /// position exists either way; the next successful write persists it.
    pub async fn commit_open(&self, ticket: OpenTicket, trade: ActiveTrade) -> Result<(), TradeError> {
        debug_assert_eq!(ticket.symbol(), trade.symbol);
        let mut trades = self.trades.lock().await;
        info!("[store] + {} {} order={}", trade.symbol, trade.trade_type, trade.order_id);
        trades.push(trade);
        // Release only once the row is visible.
        drop(ticket);
        write_table(&self.path, &trades).await
    }

    // -----------------------------------------------------------------------
    // Close
    // -----------------------------------------------------------------------

    /// Begin closing the active trade for `symbol`.
    pub async fn begin_close(&self, symbol: &str) -> Result<CloseTicket, TradeError> {
        let trades = self.trades.lock().await;
        let trade = trades
            .iter()
            .find(|t| t.symbol == symbol)
            .cloned()
            .ok_or_else(|| TradeError::NotFound(format!("no active trade for {}", display_symbol(symbol))))?;
        self.mark_closing(trade)
    }

    /// Begin closing the active trade opened by `order_id`.
    pub async fn begin_close_by_order_id(&self, order_id: &str) -> Result<CloseTicket, TradeError> {
        let trades = self.trades.lock().await;
        let trade = trades
            .iter()
            .find(|t| t.order_id == order_id)
            .cloned()
            .ok_or_else(|| TradeError::NotFound(format!("no active trade with order id {order_id}")))?;
        self.mark_closing(trade)
    }

    /// Caller holds the table lock.
    fn mark_closing(&self, trade: ActiveTrade) -> Result<CloseTicket, TradeError> {
        let guard = InFlightGuard::acquire(&self.in_flight, &trade.symbol).ok_or_else(|| in_progress(&trade.symbol))?;
        debug!("[store] close started for {}", trade.symbol);
        Ok(CloseTicket { trade, _guard: guard })
    }

    /// Remove the closed trade and persist.
    pub async fn commit_close(&self, ticket: CloseTicket) -> Result<(), TradeError> {
        let mut trades = self.trades.lock().await;
        let before = trades.len();
        trades.retain(|t| t.order_id != ticket.trade.order_id);
        let changed = trades.len() != before;
        if changed {
            info!("[store] - {} order={}", ticket.trade.symbol, ticket.trade.order_id);
        }
        drop(ticket);
        if !changed {
            return Ok(());
        }
        write_table(&self.path, &trades).await
    }

    /// Whether an open or close for `symbol` is in progress.
    pub fn is_in_flight(&self, symbol: &str) -> bool {
        lock_in_flight(&self.in_flight).contains(symbol)
    }

    // -----------------------------------------------------------------------
    // Monitor
    // -----------------------------------------------------------------------

    /// Apply one monitor sweep atomically.
    ///
    /// Outcomes are matched by order ID, so a row that was closed (or closed
    /// and re-opened) after the sweep took its snapshot is never touched.
    /// Rows whose symbol is in flight are skipped. Closed rows are purged and
    /// the table is written only if at least one row changed.
    pub async fn apply_sweep(&self, outcomes: &[SweepOutcome]) -> Result<SweepSummary, TradeError> {
        let mut trades = self.trades.lock().await;
        // Tickets are only issued under the table lock, so no symbol joins mid-sweep.
        let busy = lock_in_flight(&self.in_flight).clone();
        let mut summary = SweepSummary::default();

        for outcome in outcomes {
            let order_id = match outcome {
                SweepOutcome::Price { order_id, .. } | SweepOutcome::Vanished { order_id } => order_id,
            };
            let Some(trade) = trades.iter_mut().find(|t| &t.order_id == order_id) else {
                debug!("[store] sweep result for order {order_id} ignored, row gone");
                continue;
            };
            if busy.contains(&trade.symbol) {
                debug!("[store] sweep result for {} ignored, operation in flight", trade.symbol);
                continue;
            }
            match outcome {
                SweepOutcome::Price {
                    current_price,
                    profit_percentage,
                    ..
                } => {
                    trade.current_price = Some(*current_price);
                    trade.profit_percentage = Some(*profit_percentage);
                    summary.updated += 1;
                }
                SweepOutcome::Vanished { .. } => {
                    trade.status = TradeStatus::Closed;
                    summary.removed += 1;
                }
            }
        }

        if summary.updated == 0 && summary.removed == 0 {
            return Ok(summary);
        }

        trades.retain(|t| t.status == TradeStatus::Active);
        write_table(&self.path, &trades).await?;
        Ok(summary)
    }
}

fn in_progress(symbol: &str) -> TradeError {
    TradeError::Conflict(format!("an order for {} is already in progress", display_symbol(symbol)))
}

/// Rewrite the whole table: write a sibling temp file, then rename over.
async fn write_table(path: &Path, trades: &[ActiveTrade]) -> Result<(), TradeError> {
    let json = serde_json::to_string_pretty(trades)?;
    let tmp = path.with_extension("json.tmp");
    if let Err(e) = tokio::fs::write(&tmp, json).await {
        warn!("[store] failed to write {}: {e}", tmp.display());
        return Err(e.into());
    }
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
