//! Funding-rate arbitrage: hold the long where funding is cheaper and the
//! short where it is richer

use super::{
    pricing::{round_trip_fees, slippage_bps, vwap},
    EvaluationParams, Opportunity, OpportunityEvaluator, StrategyKind, VenuePair,
};
use crate::{
    connectors::Exchange,
    data::{FundingInfo, OrderBookSnapshot},
    Result,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;

const SECONDS_PER_HOUR: u64 = 3600;

/// Funding-rate strategy variant
#[derive(Debug, Clone, Copy, Default)]
pub struct FundingStrategy;

#[async_trait]
impl OpportunityEvaluator for FundingStrategy {
    async fn evaluate(&self, venues: &VenuePair, params: &EvaluationParams) -> Result<Option<Opportunity>> {
        let Some((book_a, book_b)) = venues.fetch_books().await? else {
            return Ok(None);
        };
        let funding_a = venues.a.fetch_funding(&venues.symbol_a).await?;
        let funding_b = venues.b.fetch_funding(&venues.symbol_b).await?;

        Ok(evaluate_funding(
            FundingLeg { exchange: venues.a.exchange(), book: &book_a, funding: funding_a },
            FundingLeg { exchange: venues.b.exchange(), book: &book_b, funding: funding_b },
            params,
        ))
    }
}

/// One venue's inputs to a funding evaluation
#[derive(Debug, Clone, Copy)]
pub struct FundingLeg<'a> {
    /// Venue identity, selects the funding scale
    pub exchange: Exchange,
    /// Current book
    pub book: &'a OrderBookSnapshot,
    /// Raw venue funding
    pub funding: FundingInfo,
}

impl FundingLeg<'_> {
    fn normalized_rate(&self) -> Decimal {
        self.exchange.normalize_funding(self.funding.rate)
    }

    fn mid(&self, amount: Decimal) -> Option<Decimal> {
        let buy = vwap(&self.book.asks, amount)?;
        let sell = vwap(&self.book.bids, amount)?;
        Some((buy + sell) / Decimal::TWO)
    }
}

/// Evaluate a funding spread between two venues.
///
/// `spread = rate_a - rate_b` after normalization. A positive spread goes long
/// on B and short on A; a negative or zero spread goes long on A. Expected profit is the
/// spread carried over `hold_time_sec` on the average mid, less round-trip
/// fees at the best entry prices.
pub fn evaluate_funding(a: FundingLeg<'_>, b: FundingLeg<'_>, params: &EvaluationParams) -> Option<Opportunity> {
    if !a.book.is_two_sided() || !b.book.is_two_sided() {
        return None;
    }

    let spread = a.normalized_rate() - b.normalized_rate();

    let mid = (a.mid(params.amount)? + b.mid(params.amount)?) / Decimal::TWO;
    let hold_hours = Decimal::from(params.hold_time_sec) / Decimal::from(SECONDS_PER_HOUR);
    let gross = spread.abs() * mid * params.amount * hold_hours;

    let ((long, fee_long), (short, fee_short)) = if spread > Decimal::ZERO {
        ((b, params.fee_b), (a, params.fee_a))
    } else {
        ((a, params.fee_a), (b, params.fee_b))
    };

    let long_price = long.book.best_ask()?;
    let short_price = short.book.best_bid()?;
    let fees = round_trip_fees(long_price, short_price, params.amount, fee_long, fee_short);
    let profit = gross - fees;

    if profit < params.min_profit_usd {
        debug!(%spread, %profit, min_profit = %params.min_profit_usd, "Funding spread below profit floor");
        return None;
    }

    let long_slippage = slippage_bps(&long.book.asks, params.amount)?;
    let short_slippage = slippage_bps(&short.book.bids, params.amount)?;
    if long_slippage > params.max_slippage_bps || short_slippage > params.max_slippage_bps {
        debug!(%long_slippage, %short_slippage, "Funding trade rejected on slippage");
        return None;
    }

    Some(Opportunity {
        kind: StrategyKind::Funding,
        long_exchange: long.exchange,
        short_exchange: short.exchange,
        long_price,
        short_price,
        profit,
        spread,
    })
}
