//! Integration tests for the basis and funding arbitrage bot

mod test_execution_engine;
mod test_strategy_runner;
mod test_strategy_validation;

use async_trait::async_trait;
use funding_basis_arbitrage::{
    connectors::{Exchange, ExchangeConnector, OrderId, OrderSide, PaperConnector},
    data::{FundingInfo, OrderBookLevel, OrderBookSnapshot, Position},
    strategy::{EvaluationParams, VenuePair},
    Result,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Symbol used on the Drift paper venue
pub const DRIFT_SYMBOL: &str = "SOL-PERP";
/// Symbol used on the Hyperliquid paper venue
pub const HYPER_SYMBOL: &str = "SOL";

/// Test utilities for integration tests
pub struct TestUtils;

impl TestUtils {
    /// One-level book with ten units on each side
    pub fn book(bid: Decimal, ask: Decimal) -> OrderBookSnapshot {
        OrderBookSnapshot::new(
            vec![OrderBookLevel::new(bid, dec!(10))],
            vec![OrderBookLevel::new(ask, dec!(10))],
        )
    }

    /// Paper venue serving `book` and raw `funding` on its usual symbol
    pub async fn paper_venue(exchange: Exchange, book: OrderBookSnapshot, funding: Decimal) -> Arc<PaperConnector> {
        let symbol = Self::symbol(exchange);
        let venue = PaperConnector::new(exchange);
        venue.set_book(symbol, book).await;
        venue.set_funding(symbol, funding).await;
        Arc::new(venue)
    }

    /// Symbol used on `exchange` throughout the tests
    pub fn symbol(exchange: Exchange) -> &'static str {
        match exchange {
            Exchange::Drift => DRIFT_SYMBOL,
            Exchange::Hyperliquid => HYPER_SYMBOL,
        }
    }

    /// Pair two venues on their usual symbols, `a` first
    pub fn pair(a: Arc<dyn ExchangeConnector>, b: Arc<dyn ExchangeConnector>) -> VenuePair {
        let symbol_a = Self::symbol(a.exchange());
        let symbol_b = Self::symbol(b.exchange());
        VenuePair::new(a, symbol_a, b, symbol_b)
    }

    /// One unit, no fees, 50 cent floor, 50 bps slippage
    pub fn params() -> EvaluationParams {
        EvaluationParams {
            amount: dec!(1),
            max_slippage_bps: dec!(50),
            min_profit_usd: dec!(0.5),
            fee_a: Decimal::ZERO,
            fee_b: Decimal::ZERO,
            hold_time_sec: 3600,
        }
    }
}

/// Connector wrapper counting book fetches
pub struct CountingConnector {
    inner: Arc<PaperConnector>,
    book_fetches: AtomicUsize,
}

impl CountingConnector {
    /// Wrap a paper venue
    pub fn new(inner: Arc<PaperConnector>) -> Self {
        Self {
            inner,
            book_fetches: AtomicUsize::new(0),
        }
    }

    /// Number of `fetch_book` calls so far
    pub fn book_fetches(&self) -> usize {
        self.book_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExchangeConnector for CountingConnector {
    fn exchange(&self) -> Exchange {
        self.inner.exchange()
    }

    async fn fetch_book(&self, symbol: &str) -> Result<OrderBookSnapshot> {
        self.book_fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_book(symbol).await
    }

    async fn fetch_funding(&self, symbol: &str) -> Result<FundingInfo> {
        self.inner.fetch_funding(symbol).await
    }

    async fn place_order(&self, symbol: &str, side: OrderSide, amount: Decimal, price: Decimal) -> Result<OrderId> {
        self.inner.place_order(symbol, side, amount, price).await
    }

    async fn cancel_order(&self, order_id: &OrderId) -> Result<()> {
        self.inner.cancel_order(order_id).await
    }

    async fn get_position(&self, symbol: &str) -> Result<Position> {
        self.inner.get_position(symbol).await
    }
}
