//! Exchange connector traits and common types

use super::Exchange;
use crate::{
    data::{FundingInfo, OrderBookSnapshot, Position},
    ArbitrageError, Result,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability set the core consumes from a venue.
///
/// Implementations must be safe for concurrent use by several strategies;
/// connection-level locking and rate limiting are their responsibility.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExchangeConnector: Send + Sync {
    /// Venue identity
    fn exchange(&self) -> Exchange;

    /// Current best-N order book. Empty sides mean "no liquidity", not an error.
    async fn fetch_book(&self, symbol: &str) -> Result<OrderBookSnapshot>;

    /// Current funding rate in the venue's native scale
    async fn fetch_funding(&self, symbol: &str) -> Result<FundingInfo>;

    /// Place an order; `price` is advisory and its meaning is venue-defined
    async fn place_order(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: Decimal,
        price: Decimal,
    ) -> Result<OrderId>;

    /// Cancel an order. Idempotent.
    async fn cancel_order(&self, order_id: &OrderId) -> Result<()>;

    /// Current position, normalized at the connector boundary
    async fn get_position(&self, symbol: &str) -> Result<Position>;
}

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// Buy order
    Buy,
    /// Sell order
    Sell,
}

impl OrderSide {
    /// Signed position change this side produces for `amount`
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            OrderSide::Buy => amount,
            OrderSide::Sell => -amount,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

impl std::str::FromStr for OrderSide {
    type Err = ArbitrageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buy" => Ok(OrderSide::Buy),
            "sell" => Ok(OrderSide::Sell),
            _ => Err(ArbitrageError::DataParsing(format!("Unknown order side: {}", s))),
        }
    }
}

/// Venue-assigned order identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for OrderId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Position records in the shapes the two venues report them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VenuePosition {
    /// Base/quote amount pair (Drift perp position)
    Amounts {
        /// Signed base asset amount
        base_asset_amount: Decimal,
        /// Signed quote asset amount
        quote_asset_amount: Decimal,
    },
    /// Signed size with entry price (Hyperliquid `assetPositions` entry)
    Perp {
        /// Signed size (`szi`)
        szi: Decimal,
        /// Average entry price (`entryPx`), absent when flat
        entry_px: Option<Decimal>,
    },
}

impl From<VenuePosition> for Position {
    fn from(value: VenuePosition) -> Self {
        match value {
            VenuePosition::Amounts { base_asset_amount, quote_asset_amount } => Position {
                base_amount: base_asset_amount,
                quote_amount: Some(quote_asset_amount),
                entry_price: None,
            },
            VenuePosition::Perp { szi, entry_px } => Position {
                base_amount: szi,
                quote_amount: None,
                entry_price: entry_px,
            },
        }
    }
}
