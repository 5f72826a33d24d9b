//! Enumerations used throughout the signal trading system.
//!
//! Serde representations match the exchange wire format and the persisted
//! `active_trades.json` / `settings.json` layout.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TradeError;

// ---------------------------------------------------------------------------
// Position direction
// ---------------------------------------------------------------------------

/// Direction of an active trade. Also used as the exchange `holdSide` /
/// `posSide` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Long,
    Short,
}

impl TradeType {
    /// Order side that opens a position in this direction.
    pub fn open_side(self) -> OrderSide {
        match self {
            Self::Long => OrderSide::OpenLong,
            Self::Short => OrderSide::OpenShort,
        }
    }

    /// Order side that closes a position in this direction.
    pub fn close_side(self) -> OrderSide {
        match self {
            Self::Long => OrderSide::CloseLong,
            Self::Short => OrderSide::CloseShort,
        }
    }

    /// Wire label (`"long"` / `"short"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
        }
    }
}

impl std::fmt::Display for TradeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Trade status
// ---------------------------------------------------------------------------

/// Lifecycle state of an active trade. `Active → Closed` only; closed rows are
/// purged on the next write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    #[default]
    Active,
    Closed,
}

// ---------------------------------------------------------------------------
// Order side
// ---------------------------------------------------------------------------

/// Mix-contract order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    OpenLong,
    OpenShort,
    CloseLong,
    CloseShort,
}

impl OrderSide {
    /// The `posSide` that accompanies this order side.
    pub fn pos_side(self) -> TradeType {
        match self {
            Self::OpenLong | Self::CloseLong => TradeType::Long,
            Self::OpenShort | Self::CloseShort => TradeType::Short,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenLong => "open_long",
            Self::OpenShort => "open_short",
            Self::CloseLong => "close_long",
            Self::CloseShort => "close_short",
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Signal side
// ---------------------------------------------------------------------------

/// Side carried by an inbound trading signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalSide {
    Buy,
    Sell,
}

impl SignalSide {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for SignalSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalSide {
    type Err = TradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            _ => Err(TradeError::Validation("SIDE must be BUY or SELL".into())),
        }
    }
}

// ---------------------------------------------------------------------------
// Trade mode
// ---------------------------------------------------------------------------

/// Which directions new positions may be opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TradeMode {
    #[default]
    Both,
    LongOnly,
    ShortOnly,
}

impl TradeMode {
    /// Whether a new position of `trade_type` may be opened.
    pub fn allows(self, trade_type: TradeType) -> bool {
        match (self, trade_type) {
            (Self::Both, _) => true,
            (Self::LongOnly, TradeType::Long) => true,
            (Self::ShortOnly, TradeType::Short) => true,
            _ => false,
        }
    }
}
