//! Strategy loops and the multi-strategy runner driven from a TOML config

use crate::TestUtils;
use funding_basis_arbitrage::{
    config::BotConfig,
    connectors::{Exchange, FillPolicy, PaperConnector},
    strategy::{ArbitrageStrategy, MultiStrategyRunner, TradingMode},
    utils::{JsonlJournal, ManualClock, MemoryJournal},
    Result,
};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

const CONFIG: &str = r#"
mode = "dry-run"
market = "SOL-PERP"
amount = 1
max_slippage_bps = 50
min_profit_usd = 0.5
poll_interval_sec = 5

[hyperliquid]
market = "SOL"

[strategies]
basis = true

[strategies.funding]
mode = "live"
min_profit_usd = 1
"#;

async fn venues() -> (Arc<PaperConnector>, Arc<PaperConnector>) {
    let hyper = TestUtils::paper_venue(Exchange::Hyperliquid, TestUtils::book(dec!(99.9), dec!(100)), dec!(-0.01)).await;
    let drift = TestUtils::paper_venue(Exchange::Drift, TestUtils::book(dec!(101), dec!(101.2)), dec!(10000000)).await;
    (hyper, drift)
}

#[tokio::test]
async fn test_runner_trades_each_strategy_in_its_own_mode() -> Result<()> {
    let config: BotConfig = toml::from_str(CONFIG)?;
    config.validate()?;
    let (hyper, drift) = venues().await;
    let journal = Arc::new(MemoryJournal::new());
    let clock = Arc::new(ManualClock::new());
    let shutdown = CancellationToken::new();

    let runner = Arc::new(MultiStrategyRunner::new(
        &config,
        TestUtils::pair(hyper.clone(), drift.clone()),
        journal.clone(),
        clock.clone(),
        shutdown.clone(),
    ));
    assert_eq!(runner.strategies().len(), 2);
    assert_eq!(runner.strategies()[0].mode(), TradingMode::Simulate);
    assert_eq!(runner.strategies()[1].mode(), TradingMode::Live);

    let handle = tokio::spawn({
        let runner = runner.clone();
        async move { runner.run().await }
    });

    while journal.opportunities().len() < 4 {
        tokio::task::yield_now().await;
    }
    shutdown.cancel();
    handle.await?;

    let kinds: Vec<String> = journal.opportunities().iter().map(|record| record.kind.clone()).collect();
    assert!(kinds.iter().any(|kind| kind == "Price Arbitrage"));
    assert!(kinds.iter().any(|kind| kind == "Funding Rate Arbitrage"));
    assert!(journal.has_event("Simulated trade"));
    assert!(journal.has_event("Trade executed successfully"));

    // Only the live funding strategy places orders
    let orders = hyper.orders().await;
    assert!(!orders.is_empty());
    assert_eq!(orders.len(), journal.trades().len());
    assert!(clock.elapsed() >= Duration::from_secs(5));
    Ok(())
}

#[tokio::test]
async fn test_single_strategy_writes_journal_files() -> Result<()> {
    let dir = tempdir()?;
    let mut config: BotConfig = toml::from_str(CONFIG)?;
    config.storage.events_file = dir.path().join("events.log");
    config.storage.trades_file = dir.path().join("trades.jsonl");
    config.storage.opportunities_file = dir.path().join("opportunities.jsonl");
    config.force_mode(TradingMode::Live);

    let (hyper, drift) = venues().await;
    let strategy = ArbitrageStrategy::new(
        config.resolve_strategy("basis")?,
        TestUtils::pair(hyper.clone(), drift.clone()),
        Arc::new(JsonlJournal::new(config.storage.journal_paths())),
        Arc::new(ManualClock::new()),
        CancellationToken::new(),
    );

    let opportunity = strategy.process_once().await?.expect("opportunity");
    assert_eq!(opportunity.long_exchange, Exchange::Hyperliquid);

    let trades = std::fs::read_to_string(&config.storage.trades_file)?;
    let trade: serde_json::Value = serde_json::from_str(trades.lines().next().expect("trade line"))?;
    assert_eq!(trade["symbol_a"], "SOL");
    assert_eq!(trade["side_a"], "buy");
    assert_eq!(trade["side_b"], "sell");

    let opportunities = std::fs::read_to_string(&config.storage.opportunities_file)?;
    let record: serde_json::Value = serde_json::from_str(opportunities.lines().next().expect("opportunity line"))?;
    assert_eq!(record["type"], "Price Arbitrage");
    assert_eq!(record["strategy"], "basis");
    assert_eq!(record["funding_rate_drift"], "0.010000");
    assert_eq!(record["funding_rate_hyperliquid"], "-0.010000");

    let events = std::fs::read_to_string(&config.storage.events_file)?;
    assert!(events.contains("Trade executed successfully"));
    Ok(())
}

#[tokio::test]
async fn test_safe_mode_latch_is_per_strategy() -> Result<()> {
    let mut config: BotConfig = toml::from_str(CONFIG)?;
    config.force_mode(TradingMode::Live);
    config.force_safe_mode();
    let (hyper, drift) = venues().await;
    drift.set_fill_policy(FillPolicy::Never).await;

    let runner = MultiStrategyRunner::new(
        &config,
        TestUtils::pair(hyper, drift),
        Arc::new(MemoryJournal::new()),
        Arc::new(ManualClock::new()),
        CancellationToken::new(),
    );

    let basis = &runner.strategies()[0];
    let funding = &runner.strategies()[1];
    basis.process_once().await?;

    assert!(basis.engine().is_safe_mode_triggered());
    assert!(!funding.engine().is_safe_mode_triggered());
    Ok(())
}

#[test]
fn test_shipped_config_is_valid() -> Result<()> {
    let config = BotConfig::from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/config/arbitrage.toml"))?;
    config.validate()?;

    assert_eq!(config.enabled_strategies(), vec!["basis", "funding"]);
    assert_eq!(config.market_for(Exchange::Hyperliquid), "SOL");
    assert_eq!(config.paper.venue(Exchange::Drift).book().best_ask(), Some(dec!(101.2)));
    Ok(())
}
