//! Configuration management module

pub mod settings;

pub use settings::*;

use crate::{
    connectors::{Exchange, FillPolicy},
    data::{OrderBookLevel, OrderBookSnapshot},
    strategy::{EvaluationParams, StrategyKind, TradingMode},
    trading::EngineConfig,
    utils::JournalPaths,
    ArbitrageError, Result,
};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure for the arbitrage bot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Live trading or dry run
    #[serde(default)]
    pub mode: TradingMode,
    /// Refuse new trades after a failed paired trade
    #[serde(default)]
    pub safe_mode: bool,
    /// Market symbol, used on both venues unless overridden
    pub market: String,
    /// Base amount traded on each leg
    pub amount: Decimal,
    /// Worst-leg slippage allowed, in bps
    #[serde(default)]
    pub max_slippage_bps: Decimal,
    /// Minimum expected profit in USD
    #[serde(default)]
    pub min_profit_usd: Decimal,
    /// Funding holding horizon in seconds
    #[serde(default = "default_hold_time_sec")]
    pub hold_time_sec: u64,
    /// Delay between strategy cycles in seconds
    #[serde(default = "default_poll_interval_sec")]
    pub poll_interval_sec: f64,
    /// Taker fee rates
    #[serde(default)]
    pub fees: FeesConfig,
    /// Order timeouts
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    /// Drift venue settings
    #[serde(default)]
    pub drift: VenueConfig,
    /// Hyperliquid venue settings
    #[serde(default)]
    pub hyperliquid: VenueConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Journal file locations
    #[serde(default)]
    pub storage: StorageConfig,
    /// Prometheus exporter settings
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Paper venue seeds
    #[serde(default)]
    pub paper: PaperConfig,
    /// Strategies by name, in run order
    #[serde(default)]
    pub strategies: IndexMap<String, StrategyEntry>,
}

fn default_hold_time_sec() -> u64 {
    ConfigDefaults::HOLD_TIME_SEC
}

fn default_poll_interval_sec() -> f64 {
    ConfigDefaults::POLL_INTERVAL_SEC
}

/// Fee rate per venue
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeesConfig {
    /// Drift taker fee
    #[serde(default)]
    pub drift: Decimal,
    /// Hyperliquid taker fee
    #[serde(default)]
    pub hyperliquid: Decimal,
}

impl FeesConfig {
    /// Fee rate on `exchange`
    pub fn for_exchange(&self, exchange: Exchange) -> Decimal {
        match exchange {
            Exchange::Drift => self.drift,
            Exchange::Hyperliquid => self.hyperliquid,
        }
    }
}

/// Order timeouts in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    /// Time allowed for each leg to fill
    #[serde(default = "default_order_submit_sec")]
    pub order_submit_sec: u64,
    /// Upper bound on a single cancel
    #[serde(default = "default_order_cancel_sec")]
    pub order_cancel_sec: u64,
}

fn default_order_submit_sec() -> u64 {
    ConfigDefaults::ORDER_SUBMIT_SEC
}

fn default_order_cancel_sec() -> u64 {
    ConfigDefaults::ORDER_CANCEL_SEC
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            order_submit_sec: ConfigDefaults::ORDER_SUBMIT_SEC,
            order_cancel_sec: ConfigDefaults::ORDER_CANCEL_SEC,
        }
    }
}

/// Per-venue settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueConfig {
    /// Venue-specific market symbol, falls back to the global market
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level or filter directive
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Daily-rolling log file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// Write the log file as JSON lines
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    ConfigDefaults::LOG_LEVEL.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_file: None,
            json: false,
        }
    }
}

/// Journal file locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Plain-text event log
    pub events_file: PathBuf,
    /// JSON-lines trade log
    pub trades_file: PathBuf,
    /// JSON-lines opportunity log
    pub opportunities_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let paths = JournalPaths::default();
        Self {
            events_file: paths.events,
            trades_file: paths.trades,
            opportunities_file: paths.opportunities,
        }
    }
}

impl StorageConfig {
    /// Paths for the file journal
    pub fn journal_paths(&self) -> JournalPaths {
        JournalPaths {
            events: self.events_file.clone(),
            trades: self.trades_file.clone(),
            opportunities: self.opportunities_file.clone(),
        }
    }
}

/// Prometheus exporter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Start the exporter
    #[serde(default)]
    pub enabled: bool,
    /// Listen address
    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

fn default_metrics_listen() -> SocketAddr {
    ConfigDefaults::METRICS_LISTEN
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_metrics_listen(),
        }
    }
}

/// Seeds for the paper venues the binary trades against
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperConfig {
    /// Drift paper venue
    #[serde(default)]
    pub drift: PaperVenueConfig,
    /// Hyperliquid paper venue
    #[serde(default)]
    pub hyperliquid: PaperVenueConfig,
}

impl PaperConfig {
    /// Seed for `exchange`
    pub fn venue(&self, exchange: Exchange) -> &PaperVenueConfig {
        match exchange {
            Exchange::Drift => &self.drift,
            Exchange::Hyperliquid => &self.hyperliquid,
        }
    }
}

/// Book, funding and fill behavior of one paper venue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperVenueConfig {
    /// Bid levels as `[price, size]`
    #[serde(default)]
    pub bids: Vec<[Decimal; 2]>,
    /// Ask levels as `[price, size]`
    #[serde(default)]
    pub asks: Vec<[Decimal; 2]>,
    /// Raw venue funding value
    #[serde(default)]
    pub funding_rate: Decimal,
    /// Fill behavior
    #[serde(default)]
    pub fill: FillPolicy,
}

impl PaperVenueConfig {
    /// Order book built from the configured levels
    pub fn book(&self) -> OrderBookSnapshot {
        let levels = |raw: &[[Decimal; 2]]| -> Vec<OrderBookLevel> {
            raw.iter().map(|[price, size]| OrderBookLevel::new(*price, *size)).collect()
        };
        OrderBookSnapshot::new(levels(&self.bids), levels(&self.asks))
    }
}

/// Strategy table entry: a plain toggle or a table of overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrategyEntry {
    /// `name = true`
    Toggle(bool),
    /// `[strategies.name]`
    Overrides(StrategyOverrides),
}

impl StrategyEntry {
    /// Whether the strategy should run
    pub fn is_enabled(&self) -> bool {
        match self {
            StrategyEntry::Toggle(enabled) => *enabled,
            StrategyEntry::Overrides(overrides) => overrides.enabled,
        }
    }
}

/// Per-strategy overrides of the global settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyOverrides {
    /// Run this strategy
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Mode override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<TradingMode>,
    /// Safe-mode override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_mode: Option<bool>,
    /// Amount override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    /// Slippage limit override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_slippage_bps: Option<Decimal>,
    /// Profit floor override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_profit_usd: Option<Decimal>,
    /// Holding horizon override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_time_sec: Option<u64>,
    /// Poll interval override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_sec: Option<f64>,
    /// Fee override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fees: Option<FeesConfig>,
    /// Timeout override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeouts: Option<TimeoutsConfig>,
}

fn default_enabled() -> bool {
    true
}

/// Settings of one strategy after merging its overrides into the globals
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    /// Configured name
    pub name: String,
    /// Strategy variant
    pub kind: StrategyKind,
    /// Live trading or dry run
    pub mode: TradingMode,
    /// Refuse trades after a failure
    pub safe_mode: bool,
    /// Base amount per leg
    pub amount: Decimal,
    /// Worst-leg slippage allowed, in bps
    pub max_slippage_bps: Decimal,
    /// Minimum expected profit in USD
    pub min_profit_usd: Decimal,
    /// Funding holding horizon in seconds
    pub hold_time_sec: u64,
    /// Delay between cycles in seconds
    pub poll_interval_sec: f64,
    /// Fee rates
    pub fees: FeesConfig,
    /// Order timeouts
    pub timeouts: TimeoutsConfig,
}

impl StrategyConfig {
    /// Delay between cycles
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_sec)
    }

    /// Evaluation inputs for a pair trading `exchange_a` against `exchange_b`
    pub fn evaluation_params(&self, exchange_a: Exchange, exchange_b: Exchange) -> EvaluationParams {
        EvaluationParams {
            amount: self.amount,
            max_slippage_bps: self.max_slippage_bps,
            min_profit_usd: self.min_profit_usd,
            fee_a: self.fees.for_exchange(exchange_a),
            fee_b: self.fees.for_exchange(exchange_b),
            hold_time_sec: self.hold_time_sec,
        }
    }

    /// Execution engine settings
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_slippage_bps: self.max_slippage_bps,
            order_submit_timeout: Duration::from_secs(self.timeouts.order_submit_sec),
            order_cancel_timeout: Duration::from_secs(self.timeouts.order_cancel_sec),
            fill_poll_interval: Duration::from_millis(ConfigDefaults::FILL_POLL_INTERVAL_MS),
            safe_mode_enabled: self.safe_mode,
        }
    }

    fn validate(&self) -> Result<()> {
        let context = |e: anyhow::Error| e.context(format!("strategy '{}'", self.name));

        ConfigValidator::validate_positive(self.amount, "amount").map_err(context)?;
        ConfigValidator::validate_non_negative(self.max_slippage_bps, "max_slippage_bps").map_err(context)?;
        ConfigValidator::validate_non_negative(self.min_profit_usd, "min_profit_usd").map_err(context)?;
        ConfigValidator::validate_non_negative(self.fees.drift, "fees.drift").map_err(context)?;
        ConfigValidator::validate_non_negative(self.fees.hyperliquid, "fees.hyperliquid").map_err(context)?;

        if !(self.poll_interval_sec.is_finite() && self.poll_interval_sec > 0.0) {
            return Err(context(
                ArbitrageError::Config("poll_interval_sec must be positive".to_string()).into(),
            ));
        }
        if self.timeouts.order_submit_sec == 0 || self.timeouts.order_cancel_sec == 0 {
            return Err(context(
                ArbitrageError::Config("Order timeouts must be greater than 0".to_string()).into(),
            ));
        }

        Ok(())
    }
}

impl BotConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ArbitrageError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: BotConfig = toml::from_str(&content)
            .map_err(|e| ArbitrageError::Config(format!("Failed to parse config: {}", e)))?;

        config.expand_env_vars()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        ConfigValidator::validate_market(&self.market, "market")?;
        ConfigValidator::validate_market(&self.market_for(Exchange::Drift), "drift.market")?;
        ConfigValidator::validate_market(&self.market_for(Exchange::Hyperliquid), "hyperliquid.market")?;
        ConfigValidator::validate_log_level(&self.logging.level)?;

        for name in self.strategies.keys() {
            StrategyKind::from_str(name)?;
        }

        let enabled = self.enabled_strategies();
        if enabled.is_empty() {
            return Err(ArbitrageError::Config("At least one strategy must be enabled".to_string()).into());
        }

        for name in enabled {
            self.resolve_strategy(name)?.validate()?;
        }

        Ok(())
    }

    /// Names of enabled strategies, in configuration order
    pub fn enabled_strategies(&self) -> Vec<&str> {
        self.strategies
            .iter()
            .filter(|(_, entry)| entry.is_enabled())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Merge the named strategy's overrides into the global settings.
    ///
    /// Names missing from the strategy table resolve to the globals alone.
    pub fn resolve_strategy(&self, name: &str) -> Result<StrategyConfig> {
        let kind = StrategyKind::from_str(name)?;
        let mut resolved = StrategyConfig {
            name: name.to_string(),
            kind,
            mode: self.mode,
            safe_mode: self.safe_mode,
            amount: self.amount,
            max_slippage_bps: self.max_slippage_bps,
            min_profit_usd: self.min_profit_usd,
            hold_time_sec: self.hold_time_sec,
            poll_interval_sec: self.poll_interval_sec,
            fees: self.fees,
            timeouts: self.timeouts,
        };

        if let Some(StrategyEntry::Overrides(overrides)) = self.strategies.get(name) {
            resolved.mode = overrides.mode.unwrap_or(resolved.mode);
            resolved.safe_mode = overrides.safe_mode.unwrap_or(resolved.safe_mode);
            resolved.amount = overrides.amount.unwrap_or(resolved.amount);
            resolved.max_slippage_bps = overrides.max_slippage_bps.unwrap_or(resolved.max_slippage_bps);
            resolved.min_profit_usd = overrides.min_profit_usd.unwrap_or(resolved.min_profit_usd);
            resolved.hold_time_sec = overrides.hold_time_sec.unwrap_or(resolved.hold_time_sec);
            resolved.poll_interval_sec = overrides.poll_interval_sec.unwrap_or(resolved.poll_interval_sec);
            resolved.fees = overrides.fees.unwrap_or(resolved.fees);
            resolved.timeouts = overrides.timeouts.unwrap_or(resolved.timeouts);
        }

        Ok(resolved)
    }

    /// Market symbol used on `exchange`
    pub fn market_for(&self, exchange: Exchange) -> String {
        let venue = match exchange {
            Exchange::Drift => &self.drift,
            Exchange::Hyperliquid => &self.hyperliquid,
        };
        venue.market.clone().unwrap_or_else(|| self.market.clone())
    }

    /// Run every strategy in `mode`, overriding per-strategy modes
    pub fn force_mode(&mut self, mode: TradingMode) {
        self.mode = mode;
        for entry in self.strategies.values_mut() {
            if let StrategyEntry::Overrides(overrides) = entry {
                overrides.mode = None;
            }
        }
    }

    /// Enable safe mode on every strategy, overriding per-strategy settings
    pub fn force_safe_mode(&mut self) {
        self.safe_mode = true;
        for entry in self.strategies.values_mut() {
            if let StrategyEntry::Overrides(overrides) = entry {
                overrides.safe_mode = None;
            }
        }
    }

    /// Expand `${VAR}` references in path settings
    fn expand_env_vars(&mut self) -> Result<()> {
        if let Some(log_file) = &self.logging.log_file {
            self.logging.log_file = Some(EnvExpander::expand_path(log_file)?);
        }
        self.storage.events_file = EnvExpander::expand_path(&self.storage.events_file)?;
        self.storage.trades_file = EnvExpander::expand_path(&self.storage.trades_file)?;
        self.storage.opportunities_file = EnvExpander::expand_path(&self.storage.opportunities_file)?;
        Ok(())
    }
}
