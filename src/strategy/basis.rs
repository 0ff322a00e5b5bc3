//! Price-basis arbitrage: buy the cheaper venue, sell the richer one

use super::{
    pricing::{round_trip_fees, SideQuote},
    EvaluationParams, Opportunity, OpportunityEvaluator, StrategyKind, VenuePair,
};
use crate::{connectors::Exchange, data::OrderBookSnapshot, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;

/// Price-basis strategy variant
#[derive(Debug, Clone, Copy, Default)]
pub struct BasisStrategy;

#[async_trait]
impl OpportunityEvaluator for BasisStrategy {
    async fn evaluate(&self, venues: &VenuePair, params: &EvaluationParams) -> Result<Option<Opportunity>> {
        let Some((book_a, book_b)) = venues.fetch_books().await? else {
            return Ok(None);
        };
        Ok(evaluate_basis(
            (venues.a.exchange(), &book_a),
            (venues.b.exchange(), &book_b),
            params,
        ))
    }
}

/// Candidate trade in one direction
#[derive(Debug, Clone, Copy)]
struct Direction {
    long: Exchange,
    short: Exchange,
    buy: SideQuote,
    sell: SideQuote,
    profit: Decimal,
}

impl Direction {
    fn price(
        long: (Exchange, &OrderBookSnapshot, Decimal),
        short: (Exchange, &OrderBookSnapshot, Decimal),
        amount: Decimal,
    ) -> Option<Self> {
        let buy = SideQuote::from_levels(&long.1.asks, amount)?;
        let sell = SideQuote::from_levels(&short.1.bids, amount)?;
        let gross = (sell.price - buy.price) * amount;
        let fees = round_trip_fees(buy.price, sell.price, amount, long.2, short.2);
        Some(Self {
            long: long.0,
            short: short.0,
            buy,
            sell,
            profit: gross - fees,
        })
    }

    fn worst_slippage(&self) -> Decimal {
        self.buy.slippage_bps.max(self.sell.slippage_bps)
    }

    fn into_opportunity(self) -> Opportunity {
        Opportunity {
            kind: StrategyKind::Basis,
            long_exchange: self.long,
            short_exchange: self.short,
            long_price: self.buy.price,
            short_price: self.sell.price,
            profit: self.profit,
            spread: self.sell.price - self.buy.price,
        }
    }
}

/// Evaluate both directions of a basis trade on two book snapshots.
///
/// A direction whose worst leg slips past `max_slippage_bps` is discarded. The
/// more profitable remaining direction wins if it clears `min_profit_usd`;
/// on equal profit the long-A direction wins.
pub fn evaluate_basis(
    a: (Exchange, &OrderBookSnapshot),
    b: (Exchange, &OrderBookSnapshot),
    params: &EvaluationParams,
) -> Option<Opportunity> {
    if !a.1.is_two_sided() || !b.1.is_two_sided() {
        return None;
    }

    let long_a = Direction::price((a.0, a.1, params.fee_a), (b.0, b.1, params.fee_b), params.amount)?;
    let long_b = Direction::price((b.0, b.1, params.fee_b), (a.0, a.1, params.fee_a), params.amount)?;

    let viable: Vec<Direction> = [long_a, long_b]
        .into_iter()
        .filter(|direction| {
            let ok = direction.worst_slippage() <= params.max_slippage_bps;
            if !ok {
                debug!(
                    long = %direction.long,
                    short = %direction.short,
                    slippage_bps = %direction.worst_slippage(),
                    "Basis direction rejected on slippage"
                );
            }
            ok
        })
        .collect();

    let best = viable
        .into_iter()
        .reduce(|best, candidate| if candidate.profit > best.profit { candidate } else { best })?;

    if best.profit < params.min_profit_usd {
        debug!(profit = %best.profit, min_profit = %params.min_profit_usd, "Basis spread below profit floor");
        return None;
    }

    Some(best.into_opportunity())
}
