//! Drift / Hyperliquid Arbitrage Engine
//!
//! Detects price-basis and funding-rate spreads between two perpetual venues and
//! executes them as a matched pair of offsetting orders, rolling back and latching
//! a safe mode when only one leg fills.

#![cfg_attr(not(test), deny(missing_docs))]
#![warn(clippy::all)]

pub mod config;
pub mod connectors;
pub mod data;
pub mod strategy;
pub mod trading;
pub mod utils;

// Re-export commonly used types
pub use config::BotConfig;
pub use connectors::{Exchange, ExchangeConnector, OrderSide};
pub use data::{OrderBookLevel, OrderBookSnapshot, Position};
pub use strategy::{ArbitrageStrategy, MultiStrategyRunner, Opportunity, StrategyKind};
pub use trading::{ExecutionEngine, PairOutcome};

/// Result type used throughout the application
pub type Result<T> = anyhow::Result<T>;

/// Common error types for the arbitrage system
#[derive(thiserror::Error, Debug)]
pub enum ArbitrageError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    DataParsing(String),

    /// Trading error
    #[error("Trading error: {0}")]
    Trading(String),

    /// Timeout error
    #[error("Timeout error: {0}")]
    Timeout(String),
}

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
