//! Per-strategy trading loop: evaluate, record, then trade or simulate

use super::{EvaluationParams, Opportunity, OpportunityEvaluator, StrategyKind, VenuePair};
use crate::{
    config::StrategyConfig,
    connectors::{Exchange, OrderSide},
    log_spread,
    trading::{ExecutionEngine, LegOrder, PairOutcome},
    utils::{metrics, Clock, Journal, OpportunityRecord},
    ArbitrageError, Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Whether found opportunities are traded or only recorded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradingMode {
    /// Place real orders through the execution engine
    #[default]
    #[serde(rename = "live")]
    Live,
    /// Record a simulated trade instead of placing orders
    #[serde(rename = "dry-run", alias = "simulate")]
    Simulate,
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradingMode::Live => write!(f, "live"),
            TradingMode::Simulate => write!(f, "dry-run"),
        }
    }
}

impl std::str::FromStr for TradingMode {
    type Err = ArbitrageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "live" => Ok(TradingMode::Live),
            "dry-run" | "dry_run" | "simulate" => Ok(TradingMode::Simulate),
            _ => Err(ArbitrageError::Config(format!("Unknown mode: {}", s))),
        }
    }
}

/// Strategy statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StrategyStatistics {
    /// Completed cycles
    pub cycles: u64,
    /// Cycles whose evaluation failed
    pub evaluation_errors: u64,
    /// Opportunities found
    pub opportunities_detected: u64,
    /// Paired trades that filled
    pub trades_executed: u64,
    /// Paired trades that did not fill
    pub trades_failed: u64,
    /// Opportunities recorded in dry-run mode
    pub trades_simulated: u64,
}

/// One configured strategy bound to a venue pair and its own execution engine
pub struct ArbitrageStrategy {
    config: StrategyConfig,
    venues: VenuePair,
    params: EvaluationParams,
    engine: ExecutionEngine,
    journal: Arc<dyn Journal>,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
    statistics: RwLock<StrategyStatistics>,
}

impl ArbitrageStrategy {
    /// Create a strategy evaluating `venues.a` against `venues.b`, placing
    /// legs in the pair's execution order
    pub fn new(
        config: StrategyConfig,
        venues: VenuePair,
        journal: Arc<dyn Journal>,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
    ) -> Self {
        let params = config.evaluation_params(venues.a.exchange(), venues.b.exchange());
        let [(first, _), (second, _)] = venues.execution_order();
        let engine = ExecutionEngine::new(
            first.clone(),
            second.clone(),
            config.engine_config(),
            journal.clone(),
            clock.clone(),
        );

        Self {
            config,
            venues,
            params,
            engine,
            journal,
            clock,
            shutdown,
            statistics: RwLock::new(StrategyStatistics::default()),
        }
    }

    /// Configured name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Strategy variant
    pub fn kind(&self) -> StrategyKind {
        self.config.kind
    }

    /// Live or dry run
    pub fn mode(&self) -> TradingMode {
        self.config.mode
    }

    /// The strategy's execution engine
    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    /// Snapshot of the counters
    pub async fn statistics(&self) -> StrategyStatistics {
        self.statistics.read().await.clone()
    }

    /// Signal the loop to exit at the next cycle boundary
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Run cycles until the shutdown token is cancelled
    pub async fn run(&self) {
        info!(
            strategy = %self.config.name,
            mode = %self.config.mode,
            pair = ?self.venues,
            "Starting strategy"
        );

        while !self.shutdown.is_cancelled() {
            if let Err(e) = self.process_once().await {
                error!(strategy = %self.config.name, "Evaluation failed: {:#}", e);
                self.statistics.write().await.evaluation_errors += 1;
            }
            self.statistics.write().await.cycles += 1;

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = self.clock.sleep(self.config.poll_interval()) => {}
            }
        }

        info!(strategy = %self.config.name, "Strategy stopped");
    }

    /// One evaluate-record-act cycle. Returns the opportunity acted on, if any.
    pub async fn process_once(&self) -> Result<Option<Opportunity>> {
        let Some(opportunity) = self.config.kind.evaluate(&self.venues, &self.params).await? else {
            info!(strategy = %self.config.name, "No opportunity found");
            self.journal.log_event("No opportunity found");
            return Ok(None);
        };

        self.statistics.write().await.opportunities_detected += 1;
        metrics::record_opportunity(&self.config.name);

        let funding = self.funding_snapshot().await;
        self.journal
            .log_opportunity(&OpportunityRecord::new(&self.config.name, &opportunity, &funding));
        log_spread!(
            info,
            self.config.kind.label(),
            opportunity.long_exchange,
            opportunity.short_exchange,
            opportunity.spread,
            long_price = %opportunity.long_price,
            short_price = %opportunity.short_price,
            profit = %opportunity.profit,
            "Opportunity found"
        );

        match self.config.mode {
            TradingMode::Live => {
                let outcome = self.execute(&opportunity).await;
                let mut stats = self.statistics.write().await;
                if outcome.is_success() {
                    stats.trades_executed += 1;
                    self.journal.log_event("Trade executed successfully");
                } else {
                    stats.trades_failed += 1;
                    self.journal.log_event("Trade execution failed");
                }
            }
            TradingMode::Simulate => {
                self.simulate(&opportunity);
                self.statistics.write().await.trades_simulated += 1;
            }
        }

        Ok(Some(opportunity))
    }

    /// Map an opportunity onto the venue pair and hand it to the engine.
    ///
    /// The first leg buys when its venue is the long venue and sells otherwise.
    pub async fn execute(&self, opportunity: &Opportunity) -> PairOutcome {
        let [(first, first_symbol), (_, second_symbol)] = self.venues.execution_order();
        let (first_leg, second_leg) = if opportunity.long_exchange == first.exchange() {
            (
                LegOrder::new(first_symbol, OrderSide::Buy, opportunity.long_price),
                LegOrder::new(second_symbol, OrderSide::Sell, opportunity.short_price),
            )
        } else {
            (
                LegOrder::new(first_symbol, OrderSide::Sell, opportunity.short_price),
                LegOrder::new(second_symbol, OrderSide::Buy, opportunity.long_price),
            )
        };

        self.engine.execute_pair_trade(&first_leg, &second_leg, self.config.amount).await
    }

    /// Record the opportunity as a simulated trade
    pub fn simulate(&self, opportunity: &Opportunity) {
        let message = format!(
            "Simulated trade: {} long {} @ {} short {} @ {} amount {} profit {}",
            self.config.kind.label(),
            opportunity.long_exchange,
            opportunity.long_price,
            opportunity.short_exchange,
            opportunity.short_price,
            self.config.amount,
            opportunity.profit
        );
        debug!("{}", message);
        self.journal.log_event(&message);
    }

    /// Normalized funding on each venue; unreadable venues are left out
    async fn funding_snapshot(&self) -> Vec<(Exchange, rust_decimal::Decimal)> {
        let mut rates = Vec::with_capacity(2);
        for (venue, symbol) in [(&self.venues.a, &self.venues.symbol_a), (&self.venues.b, &self.venues.symbol_b)] {
            let exchange = venue.exchange();
            match venue.fetch_funding(symbol).await {
                Ok(info) => rates.push((exchange, exchange.normalize_funding(info.rate))),
                Err(e) => warn!(%exchange, "Failed to fetch funding for opportunity record: {:#}", e),
            }
        }
        rates
    }
}
