//! Append-only event, trade and opportunity records

use crate::{
    connectors::{Exchange, OrderSide},
    strategy::Opportunity,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Sink for trading records. Calls are fire-and-forget: implementations
/// swallow their own failures.
pub trait Journal: Send + Sync {
    /// Free-form event line
    fn log_event(&self, message: &str);

    /// Settled paired trade
    fn log_trade(&self, trade: &TradeRecord);

    /// Opportunity found by an evaluation
    fn log_opportunity(&self, opportunity: &OpportunityRecord);
}

/// Settled paired trade with planned and realized prices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Symbol traded on the first leg
    pub symbol_a: String,
    /// Symbol traded on the second leg
    pub symbol_b: String,
    /// Side on the first leg
    pub side_a: OrderSide,
    /// Side on the second leg
    pub side_b: OrderSide,
    /// Base amount per leg
    pub amount: Decimal,
    /// Planned price on the first leg
    pub price_a: Decimal,
    /// Planned price on the second leg
    pub price_b: Decimal,
    /// Realized price on the first leg, when reconstructable
    pub exec_price_a: Option<Decimal>,
    /// Realized price on the second leg, when reconstructable
    pub exec_price_b: Option<Decimal>,
}

/// Opportunity as written to the opportunity log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpportunityRecord {
    /// Label of the strategy variant
    #[serde(rename = "type")]
    pub kind: String,
    /// Configured strategy name
    pub strategy: String,
    /// Venue to buy on
    pub long_exchange: Exchange,
    /// Venue to sell on
    pub short_exchange: Exchange,
    /// Planned long price
    pub long_price: Decimal,
    /// Planned short price
    pub short_price: Decimal,
    /// Expected net profit
    pub profit: Decimal,
    /// Price or funding spread
    pub spread: Decimal,
    /// Normalized funding per venue, six decimals, keyed `funding_rate_<venue>`
    #[serde(flatten)]
    pub funding_rates: BTreeMap<String, String>,
}

impl OpportunityRecord {
    /// Build a record from an evaluated opportunity and whatever funding was readable
    pub fn new(strategy: &str, opportunity: &Opportunity, funding: &[(Exchange, Decimal)]) -> Self {
        Self {
            kind: opportunity.kind.label().to_string(),
            strategy: strategy.to_string(),
            long_exchange: opportunity.long_exchange,
            short_exchange: opportunity.short_exchange,
            long_price: opportunity.long_price,
            short_price: opportunity.short_price,
            profit: opportunity.profit,
            spread: opportunity.spread,
            funding_rates: funding
                .iter()
                .map(|(exchange, rate)| (format!("funding_rate_{}", exchange), format!("{:.6}", rate)))
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct Stamped<'a, T: Serialize> {
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    record: &'a T,
}

/// File locations used by [`JsonlJournal`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalPaths {
    /// Plain-text event log
    pub events: PathBuf,
    /// JSON-lines trade log
    pub trades: PathBuf,
    /// JSON-lines opportunity log
    pub opportunities: PathBuf,
}

impl Default for JournalPaths {
    fn default() -> Self {
        Self {
            events: PathBuf::from("storage/events.log"),
            trades: PathBuf::from("storage/trades.jsonl"),
            opportunities: PathBuf::from("storage/opportunities.jsonl"),
        }
    }
}

/// Journal appending timestamped lines to local files
#[derive(Debug)]
pub struct JsonlJournal {
    paths: JournalPaths,
    write_lock: Mutex<()>,
}

impl JsonlJournal {
    /// Journal writing to `paths`; directories are created on first write
    pub fn new(paths: JournalPaths) -> Self {
        Self {
            paths,
            write_lock: Mutex::new(()),
        }
    }

    fn append(&self, path: &Path, line: &str) {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let result = (|| -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            writeln!(file, "{}", line)
        })();

        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "Failed to append journal record");
        }
    }

    fn append_json<T: Serialize>(&self, path: &Path, record: &T) {
        let stamped = Stamped {
            timestamp: Utc::now(),
            record,
        };
        match serde_json::to_string(&stamped) {
            Ok(line) => self.append(path, &line),
            Err(e) => warn!(error = %e, "Failed to serialize journal record"),
        }
    }
}

impl Journal for JsonlJournal {
    fn log_event(&self, message: &str) {
        let line = format!("{} {}", Utc::now().to_rfc3339(), message);
        self.append(&self.paths.events, &line);
    }

    fn log_trade(&self, trade: &TradeRecord) {
        self.append_json(&self.paths.trades, trade);
    }

    fn log_opportunity(&self, opportunity: &OpportunityRecord) {
        self.append_json(&self.paths.opportunities, opportunity);
    }
}

/// Journal keeping everything in memory
#[derive(Debug, Default)]
pub struct MemoryJournal {
    events: Mutex<Vec<String>>,
    trades: Mutex<Vec<TradeRecord>>,
    opportunities: Mutex<Vec<OpportunityRecord>>,
}

impl MemoryJournal {
    /// Empty journal
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Trades recorded so far
    pub fn trades(&self) -> Vec<TradeRecord> {
        self.trades.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Opportunities recorded so far
    pub fn opportunities(&self) -> Vec<OpportunityRecord> {
        self.opportunities.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// True if any event contains `needle`
    pub fn has_event(&self, needle: &str) -> bool {
        self.events().iter().any(|event| event.contains(needle))
    }
}

impl Journal for MemoryJournal {
    fn log_event(&self, message: &str) {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).push(message.to_string());
    }

    fn log_trade(&self, trade: &TradeRecord) {
        self.trades.lock().unwrap_or_else(|p| p.into_inner()).push(trade.clone());
    }

    fn log_opportunity(&self, opportunity: &OpportunityRecord) {
        self.opportunities
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(opportunity.clone());
    }
}
