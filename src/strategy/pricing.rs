//! Book-walking price, slippage and fee math shared by both strategy variants

use crate::data::OrderBookLevel;
use rust_decimal::Decimal;

/// Basis points per unit
pub const BPS: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Volume-weighted price for filling `amount` by walking `levels` best-first.
///
/// Any amount left after the deepest level is priced at that level's price.
/// Returns `None` for a zero amount or an empty side.
pub fn vwap(levels: &[OrderBookLevel], amount: Decimal) -> Option<Decimal> {
    let deepest = levels.last()?;
    if amount.is_zero() {
        return None;
    }

    let mut remaining = amount;
    let mut cost = Decimal::ZERO;
    for level in levels {
        if remaining <= Decimal::ZERO {
            break;
        }
        let take = remaining.min(level.size);
        cost += level.price * take;
        remaining -= take;
    }
    if remaining > Decimal::ZERO {
        cost += deepest.price * remaining;
    }

    Some(cost / amount)
}

/// Slippage in basis points of the VWAP against the best level
pub fn slippage_bps(levels: &[OrderBookLevel], amount: Decimal) -> Option<Decimal> {
    let best = levels.first()?.price;
    if best.is_zero() {
        return None;
    }
    let average = vwap(levels, amount)?;
    Some(((average - best) / best * BPS).abs())
}

/// Deviation of a realized price from a planned price in basis points
pub fn deviation_bps(planned: Decimal, realized: Decimal) -> Option<Decimal> {
    if planned.is_zero() {
        return None;
    }
    Some(((realized - planned) / planned * BPS).abs())
}

/// Open plus close fees for both legs of a pair
pub fn round_trip_fees(
    long_price: Decimal,
    short_price: Decimal,
    amount: Decimal,
    fee_long: Decimal,
    fee_short: Decimal,
) -> Decimal {
    Decimal::TWO * (long_price * amount * fee_long + short_price * amount * fee_short)
}

/// VWAP and slippage of one book side for a fixed amount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SideQuote {
    /// Volume-weighted fill price
    pub price: Decimal,
    /// Slippage against the best level in bps
    pub slippage_bps: Decimal,
}

impl SideQuote {
    /// Quote a side, `None` when it is empty or the amount is zero
    pub fn from_levels(levels: &[OrderBookLevel], amount: Decimal) -> Option<Self> {
        Some(Self {
            price: vwap(levels, amount)?,
            slippage_bps: slippage_bps(levels, amount)?,
        })
    }
}
