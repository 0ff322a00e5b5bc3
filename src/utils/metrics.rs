//! Prometheus counters for opportunities, trades and breaker trips

use crate::{connectors::Exchange, ArbitrageError, Result};
use metrics::increment_counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Opportunities that passed evaluation, by strategy name
pub const OPPORTUNITIES_TOTAL: &str = "arb_opportunities_total";
/// Paired trade attempts, by outcome
pub const TRADES_TOTAL: &str = "arb_trades_total";
/// Post-trade slippage alerts, by exchange
pub const SLIPPAGE_ALERTS_TOTAL: &str = "arb_slippage_alerts_total";
/// Safe-mode latches tripped
pub const SAFE_MODE_TRIPS_TOTAL: &str = "arb_safe_mode_trips_total";

/// Install the Prometheus exporter listening on `listen`
pub fn init_prometheus(listen: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(listen)
        .install()
        .map_err(|e| ArbitrageError::Config(format!("Failed to start metrics exporter: {}", e)))?;

    info!("Prometheus metrics listening on {}", listen);
    Ok(())
}

/// Count an opportunity found by `strategy`
pub fn record_opportunity(strategy: &str) {
    increment_counter!(OPPORTUNITIES_TOTAL, "strategy" => strategy.to_string());
}

/// Count a paired trade attempt by outcome label
pub fn record_trade(outcome: &'static str) {
    increment_counter!(TRADES_TOTAL, "outcome" => outcome);
}

/// Count a slippage alert on `exchange`
pub fn record_slippage_alert(exchange: Exchange) {
    increment_counter!(SLIPPAGE_ALERTS_TOTAL, "exchange" => exchange.to_string());
}

/// Count a safe-mode trip
pub fn record_safe_mode_trip() {
    increment_counter!(SAFE_MODE_TRIPS_TOTAL);
}
