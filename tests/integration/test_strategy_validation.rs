//! Opportunity evaluation against paper venues

use crate::{CountingConnector, TestUtils};
use funding_basis_arbitrage::{
    connectors::{Exchange, ExchangeConnector},
    data::{OrderBookLevel, OrderBookSnapshot},
    strategy::{
        pricing::vwap, BasisStrategy, FundingStrategy, OpportunityEvaluator, StrategyKind,
    },
    Result,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio_test::{assert_ok, block_on};

#[test]
fn test_vwap_never_beats_best_level() {
    let asks = vec![
        OrderBookLevel::new(dec!(101), dec!(0.5)),
        OrderBookLevel::new(dec!(102), dec!(1)),
        OrderBookLevel::new(dec!(105), dec!(2)),
    ];
    let bids = vec![
        OrderBookLevel::new(dec!(99), dec!(0.5)),
        OrderBookLevel::new(dec!(98), dec!(1)),
    ];

    for amount in [dec!(0.1), dec!(0.5), dec!(1), dec!(3.5), dec!(10)] {
        assert!(vwap(&asks, amount).unwrap() >= dec!(101));
        assert!(vwap(&bids, amount).unwrap() <= dec!(99));
    }

    // Past the listed depth the remainder is priced at the deepest level
    assert_eq!(vwap(&bids, dec!(2.5)).unwrap(), (dec!(49.5) + dec!(98) + dec!(98)) / dec!(2.5));
}

#[test]
fn test_basis_longs_cheaper_venue_a() {
    block_on(async {
        let drift = TestUtils::paper_venue(Exchange::Drift, TestUtils::book(dec!(99), dec!(101)), dec!(0)).await;
        let hyper = TestUtils::paper_venue(Exchange::Hyperliquid, TestUtils::book(dec!(102), dec!(104)), dec!(0)).await;
        let venues = TestUtils::pair(drift, hyper);

        let opportunity = assert_ok!(BasisStrategy.evaluate(&venues, &TestUtils::params()).await)
            .expect("opportunity");
        assert_eq!(opportunity.kind, StrategyKind::Basis);
        assert_eq!(opportunity.long_exchange, Exchange::Drift);
        assert_eq!(opportunity.short_exchange, Exchange::Hyperliquid);
        assert!(opportunity.profit > Decimal::ZERO);
    });
}

#[tokio::test]
async fn test_basis_mirrored_books_flip_direction() -> Result<()> {
    let drift = TestUtils::paper_venue(Exchange::Drift, TestUtils::book(dec!(102), dec!(104)), dec!(0)).await;
    let hyper = TestUtils::paper_venue(Exchange::Hyperliquid, TestUtils::book(dec!(103), dec!(101)), dec!(0)).await;
    let venues = TestUtils::pair(drift, hyper);

    let opportunity = BasisStrategy.evaluate(&venues, &TestUtils::params()).await?.expect("opportunity");
    assert_eq!(opportunity.long_exchange, Exchange::Hyperliquid);
    assert_eq!(opportunity.short_exchange, Exchange::Drift);
    Ok(())
}

#[tokio::test]
async fn test_empty_first_book_skips_second_fetch() -> Result<()> {
    let empty_side = OrderBookSnapshot::new(vec![OrderBookLevel::new(dec!(99), dec!(1))], vec![]);
    let drift = Arc::new(CountingConnector::new(
        TestUtils::paper_venue(Exchange::Drift, empty_side, dec!(0)).await,
    ));
    let hyper = Arc::new(CountingConnector::new(
        TestUtils::paper_venue(Exchange::Hyperliquid, TestUtils::book(dec!(102), dec!(104)), dec!(0)).await,
    ));
    let venues = TestUtils::pair(drift.clone(), hyper.clone());

    for kind in StrategyKind::ALL {
        assert!(kind.evaluate(&venues, &TestUtils::params()).await?.is_none());
    }
    assert_eq!(drift.book_fetches(), 2);
    assert_eq!(hyper.book_fetches(), 0);
    Ok(())
}

#[tokio::test]
async fn test_empty_second_book_yields_nothing() -> Result<()> {
    let drift = TestUtils::paper_venue(Exchange::Drift, TestUtils::book(dec!(99), dec!(101)), dec!(0)).await;
    let hyper = TestUtils::paper_venue(Exchange::Hyperliquid, OrderBookSnapshot::empty(), dec!(0)).await;
    let venues = TestUtils::pair(drift, hyper);

    assert!(BasisStrategy.evaluate(&venues, &TestUtils::params()).await?.is_none());
    assert!(FundingStrategy.evaluate(&venues, &TestUtils::params()).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_funding_spread_picks_cheaper_long() -> Result<()> {
    // Drift reports funding scaled by 1e9: 10_000_000 is +0.01
    let drift = TestUtils::paper_venue(Exchange::Drift, TestUtils::book(dec!(99.9), dec!(100.1)), dec!(10000000)).await;
    let hyper = TestUtils::paper_venue(Exchange::Hyperliquid, TestUtils::book(dec!(99.9), dec!(100.1)), dec!(-0.01)).await;
    let venues = TestUtils::pair(drift.clone(), hyper.clone());

    let opportunity = FundingStrategy.evaluate(&venues, &TestUtils::params()).await?.expect("opportunity");
    assert_eq!(opportunity.kind, StrategyKind::Funding);
    assert_eq!(opportunity.long_exchange, Exchange::Hyperliquid);
    assert_eq!(opportunity.short_exchange, Exchange::Drift);
    assert_eq!(opportunity.spread, dec!(0.02));
    assert!(opportunity.profit > Decimal::ZERO);

    drift.set_funding(TestUtils::symbol(Exchange::Drift), dec!(-10000000)).await;
    hyper.set_funding(TestUtils::symbol(Exchange::Hyperliquid), dec!(0.01)).await;

    let flipped = FundingStrategy.evaluate(&venues, &TestUtils::params()).await?.expect("opportunity");
    assert_eq!(flipped.long_exchange, Exchange::Drift);
    assert_eq!(flipped.short_exchange, Exchange::Hyperliquid);
    Ok(())
}

#[tokio::test]
async fn test_funding_profit_at_floor_is_accepted() -> Result<()> {
    let drift = TestUtils::paper_venue(Exchange::Drift, TestUtils::book(dec!(99.9), dec!(100.1)), dec!(5000000)).await;
    let hyper = TestUtils::paper_venue(Exchange::Hyperliquid, TestUtils::book(dec!(99.9), dec!(100.1)), dec!(0.005)).await;
    let venues = TestUtils::pair(drift, hyper);

    // Equal rates carry nothing, so only a zero floor accepts the trade
    assert!(FundingStrategy.evaluate(&venues, &TestUtils::params()).await?.is_none());

    let mut params = TestUtils::params();
    params.min_profit_usd = Decimal::ZERO;
    let opportunity = FundingStrategy.evaluate(&venues, &params).await?.expect("opportunity");
    assert_eq!(opportunity.profit, Decimal::ZERO);
    assert_eq!(opportunity.long_exchange, Exchange::Drift);
    assert_eq!(opportunity.long_price, dec!(100.1));
    assert_eq!(opportunity.short_price, dec!(99.9));
    Ok(())
}

#[tokio::test]
async fn test_connector_trait_objects_report_identity() {
    let drift: Arc<dyn ExchangeConnector> =
        TestUtils::paper_venue(Exchange::Drift, OrderBookSnapshot::empty(), dec!(0)).await;
    let funding = drift.fetch_funding(TestUtils::symbol(Exchange::Drift)).await.unwrap();
    assert_eq!(drift.exchange(), Exchange::Drift);
    assert_eq!(drift.exchange().normalize_funding(funding.rate), Decimal::ZERO);
}
