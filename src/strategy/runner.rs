//! Runs every enabled strategy concurrently against the same venue pair

use super::{ArbitrageStrategy, VenuePair};
use crate::{
    config::BotConfig,
    utils::{Clock, Journal},
};
use futures_util::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Fan-out over the configured strategies
pub struct MultiStrategyRunner {
    strategies: Vec<ArbitrageStrategy>,
}

impl MultiStrategyRunner {
    /// Build one strategy per enabled entry of `config.strategies`, in order.
    ///
    /// Entries whose name is not a known strategy are skipped with a warning.
    /// Each strategy gets a child of `shutdown`: cancelling `shutdown` stops
    /// them all, while `ArbitrageStrategy::stop` stops only that strategy.
    pub fn new(
        config: &BotConfig,
        venues: VenuePair,
        journal: Arc<dyn Journal>,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
    ) -> Self {
        let strategies = config
            .enabled_strategies()
            .into_iter()
            .filter_map(|name| match config.resolve_strategy(name) {
                Ok(resolved) => Some(ArbitrageStrategy::new(
                    resolved,
                    venues.clone(),
                    journal.clone(),
                    clock.clone(),
                    shutdown.child_token(),
                )),
                Err(e) => {
                    warn!("Skipping strategy '{}': {:#}", name, e);
                    None
                }
            })
            .collect();

        Self { strategies }
    }

    /// Strategies in run order
    pub fn strategies(&self) -> &[ArbitrageStrategy] {
        &self.strategies
    }

    /// Await every strategy loop until each one is stopped
    pub async fn run(&self) {
        let names: Vec<&str> = self.strategies.iter().map(ArbitrageStrategy::name).collect();
        info!(strategies = ?names, "Starting strategy runner");

        join_all(self.strategies.iter().map(ArbitrageStrategy::run)).await;

        info!("All strategies stopped");
    }
}
