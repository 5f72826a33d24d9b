//! # sigtrade-core
//!
//! Core crate for the signal trading system, providing:
//!
//! - **Types** (`types`) — enums, active-trade and settings records, order wire types, symbol utils
//! - **Configuration** (`config`) — JSON config deserialization
//! - **Error types** (`error`) — adapter-level `ApiError` and domain `TradeError` via thiserror
//! - **Time utilities** (`time_util`) — epoch timestamps
//! - **Logging** (`logging`) — tracing-based structured logging

pub mod config;
pub mod error;
pub mod logging;
pub mod time_util;
pub mod types;

// Re-export types at crate root for convenience.
pub use types::*;
