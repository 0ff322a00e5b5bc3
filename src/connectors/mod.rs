//! Exchange connector interface and the in-process paper venue

pub mod paper;
pub mod traits;

pub use paper::{FillPolicy, PaperConnector};
pub use traits::*;

use crate::ArbitrageError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported exchanges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    /// Drift perpetuals (Solana)
    Drift,
    /// Hyperliquid perpetuals
    Hyperliquid,
}

impl Exchange {
    /// Divisor turning the venue's raw funding value into a fractional rate.
    ///
    /// Drift reports funding with 1e9 fixed-point precision, Hyperliquid
    /// reports the fraction directly. A new venue must declare its own scale.
    pub fn funding_scale(&self) -> Decimal {
        match self {
            Exchange::Drift => Decimal::from(1_000_000_000u64),
            Exchange::Hyperliquid => Decimal::ONE,
        }
    }

    /// Normalize a raw funding value into a fractional rate
    pub fn normalize_funding(&self, raw: Decimal) -> Decimal {
        raw / self.funding_scale()
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exchange::Drift => write!(f, "drift"),
            Exchange::Hyperliquid => write!(f, "hyperliquid"),
        }
    }
}

impl std::str::FromStr for Exchange {
    type Err = ArbitrageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drift" => Ok(Exchange::Drift),
            "hyperliquid" => Ok(Exchange::Hyperliquid),
            _ => Err(ArbitrageError::Config(format!("Unknown exchange: {}", s))),
        }
    }
}
