//! Paired execution against paper venues

use crate::{TestUtils, DRIFT_SYMBOL, HYPER_SYMBOL};
use funding_basis_arbitrage::{
    connectors::{Exchange, FillPolicy, OrderSide, PaperConnector},
    trading::{EngineConfig, ExecutionEngine, LegOrder, PairOutcome},
    utils::{ManualClock, MemoryJournal},
    Result,
};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    hyper: Arc<PaperConnector>,
    drift: Arc<PaperConnector>,
    journal: Arc<MemoryJournal>,
    clock: Arc<ManualClock>,
    engine: ExecutionEngine,
}

async fn harness(safe_mode_enabled: bool) -> Harness {
    let hyper = TestUtils::paper_venue(Exchange::Hyperliquid, TestUtils::book(dec!(99.9), dec!(100)), dec!(0)).await;
    let drift = TestUtils::paper_venue(Exchange::Drift, TestUtils::book(dec!(101), dec!(101.2)), dec!(0)).await;
    let journal = Arc::new(MemoryJournal::new());
    let clock = Arc::new(ManualClock::new());
    let config = EngineConfig {
        max_slippage_bps: dec!(10),
        order_submit_timeout: Duration::from_secs(5),
        order_cancel_timeout: Duration::from_secs(2),
        fill_poll_interval: Duration::from_secs(1),
        safe_mode_enabled,
    };
    let engine = ExecutionEngine::new(hyper.clone(), drift.clone(), config, journal.clone(), clock.clone());

    Harness {
        hyper,
        drift,
        journal,
        clock,
        engine,
    }
}

fn legs() -> (LegOrder, LegOrder) {
    (
        LegOrder::new(HYPER_SYMBOL, OrderSide::Buy, dec!(100)),
        LegOrder::new(DRIFT_SYMBOL, OrderSide::Sell, dec!(101)),
    )
}

#[tokio::test]
async fn test_both_legs_fill() -> Result<()> {
    let h = harness(true).await;
    let (leg_a, leg_b) = legs();

    let outcome = h.engine.execute_pair_trade(&leg_a, &leg_b, dec!(1)).await;

    let PairOutcome::Filled(record) = outcome else {
        panic!("expected fill, got {:?}", outcome);
    };
    assert_eq!(record.side_a, OrderSide::Buy);
    assert_eq!(record.exec_price_a, Some(dec!(100)));
    assert_eq!(record.exec_price_b, Some(dec!(101)));
    assert_eq!(h.journal.trades().len(), 1);
    assert!(h.hyper.cancelled().await.is_empty());
    assert!(!h.engine.is_safe_mode_triggered());
    Ok(())
}

#[tokio::test]
async fn test_second_leg_timeout_rolls_back_and_refuses_next_trade() -> Result<()> {
    let h = harness(true).await;
    h.drift.set_fill_policy(FillPolicy::Never).await;
    let (leg_a, leg_b) = legs();

    let outcome = h.engine.execute_pair_trade(&leg_a, &leg_b, dec!(1)).await;

    assert!(matches!(outcome, PairOutcome::RolledBack(_)));
    assert!(!outcome.is_success());
    assert_eq!(h.hyper.cancelled().await, vec![h.hyper.orders().await[0].order_id.clone()]);
    assert_eq!(h.drift.cancelled().await, vec![h.drift.orders().await[0].order_id.clone()]);
    assert!(h.engine.is_safe_mode_triggered());
    assert!(h.clock.elapsed() >= Duration::from_secs(5));

    let outcome = h.engine.execute_pair_trade(&leg_a, &leg_b, dec!(1)).await;
    assert_eq!(outcome, PairOutcome::Refused);
    assert_eq!(h.hyper.orders().await.len(), 1);
    assert_eq!(h.drift.orders().await.len(), 1);
    assert!(h.journal.has_event("Safe mode active"));
    Ok(())
}

#[tokio::test]
async fn test_rejected_first_leg_places_nothing_else() -> Result<()> {
    let h = harness(true).await;
    h.hyper.set_reject_orders(true).await;
    let (leg_a, leg_b) = legs();

    let outcome = h.engine.execute_pair_trade(&leg_a, &leg_b, dec!(1)).await;

    assert!(matches!(outcome, PairOutcome::RolledBack(_)));
    assert!(h.drift.orders().await.is_empty());
    assert!(h.hyper.cancelled().await.is_empty());
    assert!(h.engine.is_safe_mode_triggered());
    Ok(())
}

#[tokio::test]
async fn test_slippage_alert_keeps_trade_successful() -> Result<()> {
    let h = harness(true).await;
    // The book moved away from the planned price before placement
    h.hyper.set_book(HYPER_SYMBOL, TestUtils::book(dec!(104.9), dec!(105))).await;
    let (leg_a, leg_b) = legs();

    let outcome = h.engine.execute_pair_trade(&leg_a, &leg_b, dec!(1)).await;

    assert!(outcome.is_success());
    assert!(h.journal.has_event("ALERT: Slippage exceeded threshold"));
    assert_eq!(h.journal.trades()[0].exec_price_a, Some(dec!(105)));
    Ok(())
}

#[tokio::test]
async fn test_without_safe_mode_trading_continues_after_failure() -> Result<()> {
    let h = harness(false).await;
    h.drift.set_fill_policy(FillPolicy::Never).await;
    let (leg_a, leg_b) = legs();

    assert!(!h.engine.execute_pair_trade(&leg_a, &leg_b, dec!(1)).await.is_success());
    h.drift.set_fill_policy(FillPolicy::Immediate).await;

    assert!(h.engine.execute_pair_trade(&leg_a, &leg_b, dec!(1)).await.is_success());
    assert!(h.engine.is_safe_mode_triggered());
    Ok(())
}
