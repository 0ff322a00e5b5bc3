//! Market snapshot types shared by the connectors, evaluator and engine

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Base deltas smaller than this are treated as "no fill" when reconstructing prices.
const NEGLIGIBLE_BASE_DELTA: Decimal = Decimal::from_parts(1, 0, 0, false, 12);

/// Fraction of the target amount a signed-size delta must reach before the
/// venue-reported entry price is trusted as the fill price.
const ENTRY_PRICE_FILL_RATIO: Decimal = Decimal::from_parts(9, 0, 0, false, 1);

/// One price level of an order book side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookLevel {
    /// Level price
    pub price: Decimal,
    /// Size resting at this price
    pub size: Decimal,
}

impl OrderBookLevel {
    /// Create a new level
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// Best-N snapshot of one symbol on one venue.
///
/// Bids are sorted descending and asks ascending, so index 0 is always the best
/// price. Either side may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// Bid levels, best first
    pub bids: Vec<OrderBookLevel>,
    /// Ask levels, best first
    pub asks: Vec<OrderBookLevel>,
}

impl OrderBookSnapshot {
    /// Build a snapshot, sorting both sides into best-first order
    pub fn new(mut bids: Vec<OrderBookLevel>, mut asks: Vec<OrderBookLevel>) -> Self {
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        Self { bids, asks }
    }

    /// Empty book on both sides
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when both sides carry at least one level
    pub fn is_two_sided(&self) -> bool {
        !self.bids.is_empty() && !self.asks.is_empty()
    }

    /// Best bid price
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|level| level.price)
    }

    /// Best ask price
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|level| level.price)
    }
}

/// Raw funding information as reported by a venue.
///
/// The rate is in the venue's native scale; see
/// [`Exchange::funding_scale`](crate::connectors::Exchange::funding_scale).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingInfo {
    /// Funding rate in venue units
    pub rate: Decimal,
}

impl FundingInfo {
    /// Create from a raw venue rate
    pub fn new(rate: Decimal) -> Self {
        Self { rate }
    }
}

/// Normalized position for one symbol on one venue.
///
/// Only used as a delta source for fill detection and realized price
/// reconstruction, never for absolute PnL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Signed base size, positive for long
    pub base_amount: Decimal,
    /// Signed quote amount, when the venue tracks it
    pub quote_amount: Option<Decimal>,
    /// Average entry price, when the venue reports it
    pub entry_price: Option<Decimal>,
}

impl Position {
    /// Flat position
    pub fn flat() -> Self {
        Self::default()
    }

    /// Signed base change relative to an earlier snapshot
    pub fn base_delta_since(&self, before: &Position) -> Decimal {
        self.base_amount - before.base_amount
    }

    /// Best-effort average fill price between two snapshots.
    ///
    /// Uses `|Δquote / Δbase|` when both snapshots carry quote amounts, and falls
    /// back to the reported entry price when the size moved by most of `amount`.
    pub fn fill_price_since(&self, before: &Position, amount: Decimal) -> Option<Decimal> {
        let delta_base = self.base_delta_since(before);

        if let (Some(quote_before), Some(quote_after)) = (before.quote_amount, self.quote_amount) {
            if delta_base.abs() < NEGLIGIBLE_BASE_DELTA {
                return None;
            }
            return Some(((quote_after - quote_before) / delta_base).abs());
        }

        match self.entry_price {
            Some(entry) if !entry.is_zero() && delta_base.abs() >= amount * ENTRY_PRICE_FILL_RATIO => {
                Some(entry)
            }
            _ => None,
        }
    }
}
