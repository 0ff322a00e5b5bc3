//! Paired execution engine
//!
//! Places one order on each venue, waits for both to show up in the venue
//! positions, and rolls back with a sticky safe-mode latch when either leg
//! fails to fill.

use crate::{
    connectors::{ExchangeConnector, OrderId, OrderSide},
    data::Position,
    log_leg,
    strategy::pricing::deviation_bps,
    utils::{metrics, Clock, Journal, TradeRecord},
    ArbitrageError, Result,
};
use anyhow::Context;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Execution settings, fixed for the lifetime of an engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Realized-vs-planned deviation that raises a slippage alert, in bps
    pub max_slippage_bps: Decimal,
    /// How long each leg may take to fill
    pub order_submit_timeout: Duration,
    /// Upper bound on a single cancellation during rollback
    pub order_cancel_timeout: Duration,
    /// Interval between position polls while waiting for a fill
    pub fill_poll_interval: Duration,
    /// Refuse new trades once the safe-mode latch is set
    pub safe_mode_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_slippage_bps: Decimal::ZERO,
            order_submit_timeout: Duration::from_secs(10),
            order_cancel_timeout: Duration::from_secs(5),
            fill_poll_interval: Duration::from_secs(1),
            safe_mode_enabled: false,
        }
    }
}

/// One side of a paired trade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegOrder {
    /// Symbol on the leg's venue
    pub symbol: String,
    /// Order side
    pub side: OrderSide,
    /// Planned price
    pub price: Decimal,
}

impl LegOrder {
    /// Build a leg
    pub fn new(symbol: impl Into<String>, side: OrderSide, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            price,
        }
    }
}

/// Result of one paired execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
    /// Both legs filled; realized prices are best-effort
    Filled(TradeRecord),
    /// Safe mode is latched, nothing was placed
    Refused,
    /// Baseline positions could not be read, nothing was placed
    Aborted(String),
    /// A leg failed to place or fill; placed orders were cancelled and safe mode latched
    RolledBack(String),
}

impl PairOutcome {
    /// True only when both legs filled
    pub fn is_success(&self) -> bool {
        matches!(self, PairOutcome::Filled(_))
    }

    fn metric_label(&self) -> &'static str {
        match self {
            PairOutcome::Filled(_) => "filled",
            PairOutcome::Refused => "refused",
            PairOutcome::Aborted(_) => "aborted",
            PairOutcome::RolledBack(_) => "rolled_back",
        }
    }
}

/// Execution phases, traced as the engine moves through them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// Nothing placed yet
    Idle,
    /// Both orders accepted
    LegsPlaced,
    /// Polling positions for fills
    AwaitingFills,
    /// Both legs filled
    Settled,
    /// Cancelling placed orders
    RollingBack,
    /// Rolled back, safe mode latched
    Failed,
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionState::Idle => "idle",
            ExecutionState::LegsPlaced => "legs_placed",
            ExecutionState::AwaitingFills => "awaiting_fills",
            ExecutionState::Settled => "settled",
            ExecutionState::RollingBack => "rolling_back",
            ExecutionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Coordinates order execution across two venues
pub struct ExecutionEngine {
    venue_a: Arc<dyn ExchangeConnector>,
    venue_b: Arc<dyn ExchangeConnector>,
    config: EngineConfig,
    journal: Arc<dyn Journal>,
    clock: Arc<dyn Clock>,
    safe_mode_triggered: AtomicBool,
}

impl ExecutionEngine {
    /// Create an engine trading `venue_a` (first leg) against `venue_b`
    pub fn new(
        venue_a: Arc<dyn ExchangeConnector>,
        venue_b: Arc<dyn ExchangeConnector>,
        config: EngineConfig,
        journal: Arc<dyn Journal>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            venue_a,
            venue_b,
            config,
            journal,
            clock,
            safe_mode_triggered: AtomicBool::new(false),
        }
    }

    /// Whether a failed trade has latched safe mode
    pub fn is_safe_mode_triggered(&self) -> bool {
        self.safe_mode_triggered.load(Ordering::SeqCst)
    }

    /// Engine settings
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Place `leg_a` then `leg_b` for `amount` each and wait for both fills.
    ///
    /// Never returns an error: every failure is folded into the outcome.
    pub async fn execute_pair_trade(&self, leg_a: &LegOrder, leg_b: &LegOrder, amount: Decimal) -> PairOutcome {
        let outcome = self.run_pair(leg_a, leg_b, amount).await;
        metrics::record_trade(outcome.metric_label());
        outcome
    }

    async fn run_pair(&self, leg_a: &LegOrder, leg_b: &LegOrder, amount: Decimal) -> PairOutcome {
        if self.config.safe_mode_enabled && self.is_safe_mode_triggered() {
            warn!("Safe mode active - refusing to place new orders");
            self.journal.log_event("Safe mode active - refusing to place new orders");
            return PairOutcome::Refused;
        }

        let baseline = async {
            let a = self.venue_a.get_position(&leg_a.symbol).await?;
            let b = self.venue_b.get_position(&leg_b.symbol).await?;
            Ok::<_, anyhow::Error>((a, b))
        };
        let (initial_a, initial_b) = match baseline.await {
            Ok(positions) => positions,
            Err(e) => {
                error!("Failed to snapshot positions before trading: {:#}", e);
                self.journal
                    .log_event(&format!("Execution aborted, baseline positions unavailable: {:#}", e));
                return PairOutcome::Aborted(format!("{:#}", e));
            }
        };
        self.transition(ExecutionState::Idle);

        let mut order_a = None;
        let mut order_b = None;
        let placed = self
            .place_and_fill(leg_a, leg_b, amount, (&initial_a, &initial_b), (&mut order_a, &mut order_b))
            .await;

        match placed {
            Ok(()) => {
                self.transition(ExecutionState::Settled);
                PairOutcome::Filled(self.settle(leg_a, leg_b, amount, &initial_a, &initial_b).await)
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                self.rollback(&reason, order_a, order_b).await;
                PairOutcome::RolledBack(reason)
            }
        }
    }

    async fn place_and_fill(
        &self,
        leg_a: &LegOrder,
        leg_b: &LegOrder,
        amount: Decimal,
        initial: (&Position, &Position),
        orders: (&mut Option<OrderId>, &mut Option<OrderId>),
    ) -> Result<()> {
        let exchange_a = self.venue_a.exchange();
        let exchange_b = self.venue_b.exchange();

        log_leg!(info, exchange_a, leg_a.symbol, leg_a.side, amount, leg_a.price, "Placing leg A");
        let id_a = self
            .venue_a
            .place_order(&leg_a.symbol, leg_a.side, amount, leg_a.price)
            .await
            .with_context(|| format!("placing {} order on {}", leg_a.side, exchange_a))?;
        *orders.0 = Some(id_a);

        log_leg!(info, exchange_b, leg_b.symbol, leg_b.side, amount, leg_b.price, "Placing leg B");
        let id_b = self
            .venue_b
            .place_order(&leg_b.symbol, leg_b.side, amount, leg_b.price)
            .await
            .with_context(|| format!("placing {} order on {}", leg_b.side, exchange_b))?;
        *orders.1 = Some(id_b);
        self.transition(ExecutionState::LegsPlaced);

        self.transition(ExecutionState::AwaitingFills);
        let filled_a = self.wait_fill(self.venue_a.as_ref(), leg_a, amount, initial.0).await;
        let filled_b = self.wait_fill(self.venue_b.as_ref(), leg_b, amount, initial.1).await;

        if !(filled_a && filled_b) {
            return Err(ArbitrageError::Timeout(format!(
                "Fill timeout ({} filled: {}, {} filled: {})",
                exchange_a, filled_a, exchange_b, filled_b
            ))
            .into());
        }
        Ok(())
    }

    /// Poll the leg's position until its base delta reaches the signed target
    /// or the submit timeout elapses. A failed poll counts as not filled.
    async fn wait_fill(
        &self,
        venue: &dyn ExchangeConnector,
        leg: &LegOrder,
        amount: Decimal,
        initial: &Position,
    ) -> bool {
        let deadline = self.clock.now() + self.config.order_submit_timeout;
        while self.clock.now() < deadline {
            let position = match venue.get_position(&leg.symbol).await {
                Ok(position) => position,
                Err(e) => {
                    error!(exchange = %venue.exchange(), "Failed to fetch position: {:#}", e);
                    return false;
                }
            };

            let delta = position.base_delta_since(initial);
            let filled = match leg.side {
                OrderSide::Buy => delta >= amount,
                OrderSide::Sell => delta <= -amount,
            };
            if filled {
                debug!(exchange = %venue.exchange(), %delta, "Leg filled");
                return true;
            }

            self.clock.sleep(self.config.fill_poll_interval).await;
        }

        warn!(exchange = %venue.exchange(), symbol = %leg.symbol, "Leg not filled before timeout");
        false
    }

    async fn settle(
        &self,
        leg_a: &LegOrder,
        leg_b: &LegOrder,
        amount: Decimal,
        initial_a: &Position,
        initial_b: &Position,
    ) -> TradeRecord {
        let exec_price_a = self.realized_price(self.venue_a.as_ref(), &leg_a.symbol, initial_a, amount).await;
        let exec_price_b = self.realized_price(self.venue_b.as_ref(), &leg_b.symbol, initial_b, amount).await;

        let record = TradeRecord {
            symbol_a: leg_a.symbol.clone(),
            symbol_b: leg_b.symbol.clone(),
            side_a: leg_a.side,
            side_b: leg_b.side,
            amount,
            price_a: leg_a.price,
            price_b: leg_b.price,
            exec_price_a,
            exec_price_b,
        };
        self.journal.log_trade(&record);

        self.check_slippage(self.venue_a.as_ref(), leg_a.price, exec_price_a);
        self.check_slippage(self.venue_b.as_ref(), leg_b.price, exec_price_b);

        info!(
            exec_price_a = ?exec_price_a,
            exec_price_b = ?exec_price_b,
            "Paired trade settled"
        );
        record
    }

    async fn realized_price(
        &self,
        venue: &dyn ExchangeConnector,
        symbol: &str,
        initial: &Position,
        amount: Decimal,
    ) -> Option<Decimal> {
        match venue.get_position(symbol).await {
            Ok(after) => after.fill_price_since(initial, amount),
            Err(e) => {
                warn!(exchange = %venue.exchange(), "Failed to re-read position after fill: {:#}", e);
                None
            }
        }
    }

    /// Raise an advisory alert when the realized price strays from the plan.
    /// Returns whether an alert was raised.
    fn check_slippage(&self, venue: &dyn ExchangeConnector, planned: Decimal, executed: Option<Decimal>) -> bool {
        let Some(executed) = executed else {
            return false;
        };
        let Some(slippage) = deviation_bps(planned, executed) else {
            return false;
        };
        if slippage <= self.config.max_slippage_bps {
            return false;
        }

        let exchange = venue.exchange();
        let message = format!(
            "ALERT: Slippage exceeded threshold! Leg: {} Planned price: {} Executed price: {} Slippage: {:.0} bps (max allowed: {} bps)",
            exchange, planned, executed, slippage, self.config.max_slippage_bps
        );
        warn!("{}", message);
        self.journal.log_event(&message);
        metrics::record_slippage_alert(exchange);
        true
    }

    async fn rollback(&self, reason: &str, order_a: Option<OrderId>, order_b: Option<OrderId>) {
        self.transition(ExecutionState::RollingBack);
        error!("Execution failed: {}", reason);
        self.journal.log_event(&format!("Execution failed: {}", reason));

        if let Some(id) = order_a {
            self.safe_cancel(self.venue_a.as_ref(), &id).await;
        }
        if let Some(id) = order_b {
            self.safe_cancel(self.venue_b.as_ref(), &id).await;
        }

        if !self.safe_mode_triggered.swap(true, Ordering::SeqCst) {
            metrics::record_safe_mode_trip();
        }
        warn!("Safe mode triggered");
        self.transition(ExecutionState::Failed);
    }

    /// Cancel an order, logging instead of propagating any failure
    async fn safe_cancel(&self, venue: &dyn ExchangeConnector, order_id: &OrderId) {
        let exchange = venue.exchange();
        match tokio::time::timeout(self.config.order_cancel_timeout, venue.cancel_order(order_id)).await {
            Ok(Ok(())) => info!(%exchange, %order_id, "Order cancelled"),
            Ok(Err(e)) => {
                warn!(%exchange, %order_id, "Failed to cancel order: {:#}", e);
                self.journal
                    .log_event(&format!("Failed to cancel order {}: {:#}", order_id, e));
            }
            Err(_) => {
                warn!(%exchange, %order_id, "Cancel timed out");
                self.journal
                    .log_event(&format!("Failed to cancel order {}: timed out", order_id));
            }
        }
    }

    fn transition(&self, state: ExecutionState) {
        debug!(%state, "Execution state");
    }
}
