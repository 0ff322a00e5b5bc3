//! Opportunity evaluation and the per-strategy trading loop

pub mod arbitrage;
pub mod basis;
pub mod funding;
pub mod pricing;
pub mod runner;

pub use arbitrage::{ArbitrageStrategy, TradingMode};
pub use basis::BasisStrategy;
pub use funding::FundingStrategy;
pub use runner::MultiStrategyRunner;

use crate::{
    connectors::{Exchange, ExchangeConnector},
    data::OrderBookSnapshot,
    ArbitrageError, Result,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Strategy variants available to the runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Price-basis arbitrage
    Basis,
    /// Funding-rate arbitrage
    Funding,
}

impl StrategyKind {
    /// All registered variants
    pub const ALL: [StrategyKind; 2] = [StrategyKind::Basis, StrategyKind::Funding];

    /// Human-readable label used in opportunity records
    pub fn label(&self) -> &'static str {
        match self {
            StrategyKind::Basis => "Price Arbitrage",
            StrategyKind::Funding => "Funding Rate Arbitrage",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Basis => write!(f, "basis"),
            StrategyKind::Funding => write!(f, "funding"),
        }
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = ArbitrageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basis" => Ok(StrategyKind::Basis),
            "funding" => Ok(StrategyKind::Funding),
            _ => Err(ArbitrageError::Config(format!("Unknown strategy: {}", s))),
        }
    }
}

#[async_trait]
impl OpportunityEvaluator for StrategyKind {
    async fn evaluate(&self, venues: &VenuePair, params: &EvaluationParams) -> Result<Option<Opportunity>> {
        match self {
            StrategyKind::Basis => BasisStrategy.evaluate(venues, params).await,
            StrategyKind::Funding => FundingStrategy.evaluate(venues, params).await,
        }
    }
}

/// One strategy variant's opportunity search
#[async_trait]
pub trait OpportunityEvaluator: Send + Sync {
    /// Read the venues and return the best qualifying trade, if any.
    ///
    /// Transport failures are errors; empty books and unprofitable spreads are
    /// `Ok(None)`.
    async fn evaluate(&self, venues: &VenuePair, params: &EvaluationParams) -> Result<Option<Opportunity>>;
}

/// Which venue of a pair the execution engine places first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FirstLeg {
    /// Place on venue A, then venue B
    #[default]
    A,
    /// Place on venue B, then venue A
    B,
}

/// The two venues a strategy trades, with the symbol used on each.
///
/// Evaluators read venue A first and prefer the long-A direction on ties.
/// Placement order is independent and set by `first_leg`.
#[derive(Clone)]
pub struct VenuePair {
    /// First venue
    pub a: Arc<dyn ExchangeConnector>,
    /// Symbol on the first venue
    pub symbol_a: String,
    /// Second venue
    pub b: Arc<dyn ExchangeConnector>,
    /// Symbol on the second venue
    pub symbol_b: String,
    /// Venue the engine places first
    pub first_leg: FirstLeg,
}

impl VenuePair {
    /// Pair two venues
    pub fn new(
        a: Arc<dyn ExchangeConnector>,
        symbol_a: impl Into<String>,
        b: Arc<dyn ExchangeConnector>,
        symbol_b: impl Into<String>,
    ) -> Self {
        Self {
            a,
            symbol_a: symbol_a.into(),
            b,
            symbol_b: symbol_b.into(),
            first_leg: FirstLeg::A,
        }
    }

    /// Same pair with a different placement order
    pub fn with_first_leg(mut self, first_leg: FirstLeg) -> Self {
        self.first_leg = first_leg;
        self
    }

    /// Venues and symbols in placement order
    pub fn execution_order(&self) -> [(&Arc<dyn ExchangeConnector>, &str); 2] {
        let a = (&self.a, self.symbol_a.as_str());
        let b = (&self.b, self.symbol_b.as_str());
        match self.first_leg {
            FirstLeg::A => [a, b],
            FirstLeg::B => [b, a],
        }
    }

    /// Fetch book A, and book B only when A is two-sided
    pub(crate) async fn fetch_books(&self) -> Result<Option<(OrderBookSnapshot, OrderBookSnapshot)>> {
        let book_a = self.a.fetch_book(&self.symbol_a).await?;
        if !book_a.is_two_sided() {
            tracing::warn!(exchange = %self.a.exchange(), symbol = %self.symbol_a, "Order book empty");
            return Ok(None);
        }

        let book_b = self.b.fetch_book(&self.symbol_b).await?;
        if !book_b.is_two_sided() {
            tracing::warn!(exchange = %self.b.exchange(), symbol = %self.symbol_b, "Order book empty");
            return Ok(None);
        }

        Ok(Some((book_a, book_b)))
    }
}

impl fmt::Debug for VenuePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VenuePair")
            .field("a", &self.a.exchange())
            .field("symbol_a", &self.symbol_a)
            .field("b", &self.b.exchange())
            .field("symbol_b", &self.symbol_b)
            .field("first_leg", &self.first_leg)
            .finish()
    }
}

/// Sizing, thresholds and fees an evaluation runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationParams {
    /// Base amount traded on each leg
    pub amount: Decimal,
    /// Worst-leg slippage allowed, in bps
    pub max_slippage_bps: Decimal,
    /// Minimum net profit in USD, inclusive
    pub min_profit_usd: Decimal,
    /// Fee rate on venue A
    pub fee_a: Decimal,
    /// Fee rate on venue B
    pub fee_b: Decimal,
    /// Holding horizon used to value a funding spread, in seconds
    pub hold_time_sec: u64,
}

/// A qualifying trade found by one evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opportunity {
    /// Strategy variant that found it
    pub kind: StrategyKind,
    /// Venue to buy on
    pub long_exchange: Exchange,
    /// Venue to sell on
    pub short_exchange: Exchange,
    /// Planned long entry price
    pub long_price: Decimal,
    /// Planned short entry price
    pub short_price: Decimal,
    /// Net expected profit in USD after fees
    pub profit: Decimal,
    /// Price spread (basis) or normalized funding spread (funding)
    pub spread: Decimal,
}
