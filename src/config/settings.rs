//! Settings management utilities

use crate::{ArbitrageError, Result};
use rust_decimal::Decimal;
use std::env;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Environment variable expansion utility
pub struct EnvExpander;

impl EnvExpander {
    /// Expand `${VAR_NAME}` references in a string
    pub fn expand(input: &str) -> Result<String> {
        let mut result = input.to_string();

        while let Some(start) = result.find("${") {
            if let Some(end) = result[start..].find('}') {
                let var_name = &result[start + 2..start + end];
                let var_value = env::var(var_name).map_err(|_| {
                    ArbitrageError::Config(format!("Environment variable '{}' not found", var_name))
                })?;

                result.replace_range(start..start + end + 1, &var_value);
            } else {
                return Err(ArbitrageError::Config("Unclosed environment variable reference".to_string()).into());
            }
        }

        Ok(result)
    }

    /// Expand references in a path; non UTF-8 paths are returned unchanged
    pub fn expand_path(path: &Path) -> Result<PathBuf> {
        match path.to_str() {
            Some(raw) => Ok(PathBuf::from(Self::expand(raw)?)),
            None => Ok(path.to_path_buf()),
        }
    }
}

/// Configuration validation utilities
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a market symbol such as `SOL-PERP`
    pub fn validate_market(market: &str, name: &str) -> Result<()> {
        if market.trim().is_empty() {
            return Err(ArbitrageError::Config(format!("{} cannot be empty", name)).into());
        }

        if !market.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '/') {
            return Err(ArbitrageError::Config(format!(
                "{} must contain only alphanumeric characters, '-' or '/'",
                name
            ))
            .into());
        }

        Ok(())
    }

    /// Validate a strictly positive value
    pub fn validate_positive(value: Decimal, name: &str) -> Result<()> {
        if value <= Decimal::ZERO {
            return Err(ArbitrageError::Config(format!("{} must be positive", name)).into());
        }
        Ok(())
    }

    /// Validate a value that may be zero but not negative
    pub fn validate_non_negative(value: Decimal, name: &str) -> Result<()> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(ArbitrageError::Config(format!("{} cannot be negative", name)).into());
        }
        Ok(())
    }

    /// Validate a log level or filter directive
    pub fn validate_log_level(level: &str) -> Result<()> {
        EnvFilter::try_new(level)
            .map_err(|e| ArbitrageError::Config(format!("Invalid log level '{}': {}", level, e)))?;
        Ok(())
    }
}

/// Configuration defaults
pub struct ConfigDefaults;

impl ConfigDefaults {
    /// Holding horizon used to value funding spreads, in seconds
    pub const HOLD_TIME_SEC: u64 = 3600;

    /// Delay between strategy cycles, in seconds
    pub const POLL_INTERVAL_SEC: f64 = 1.0;

    /// Time allowed for each leg to fill, in seconds
    pub const ORDER_SUBMIT_SEC: u64 = 10;

    /// Upper bound on a single cancel, in seconds
    pub const ORDER_CANCEL_SEC: u64 = 5;

    /// Interval between fill polls, in milliseconds
    pub const FILL_POLL_INTERVAL_MS: u64 = 1000;

    /// Default log level
    pub const LOG_LEVEL: &'static str = "info";

    /// Default Prometheus listen address
    pub const METRICS_LISTEN: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 9000));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::env;

    #[test]
    fn test_env_expansion() {
        env::set_var("ARB_SETTINGS_TEST_DIR", "/var/lib/arb");

        let result = EnvExpander::expand("${ARB_SETTINGS_TEST_DIR}/events.log").unwrap();
        assert_eq!(result, "/var/lib/arb/events.log");

        let path = EnvExpander::expand_path(Path::new("${ARB_SETTINGS_TEST_DIR}/trades.jsonl")).unwrap();
        assert_eq!(path, PathBuf::from("/var/lib/arb/trades.jsonl"));

        env::remove_var("ARB_SETTINGS_TEST_DIR");
    }

    #[test]
    fn test_env_expansion_errors() {
        assert!(EnvExpander::expand("prefix_${ARB_SETTINGS_MISSING}_suffix").is_err());
        assert!(EnvExpander::expand("prefix_${UNCLOSED").is_err());
        assert_eq!(EnvExpander::expand("plain/path.log").unwrap(), "plain/path.log");
    }

    #[test]
    fn test_market_validation() {
        assert!(ConfigValidator::validate_market("SOL-PERP", "market").is_ok());
        assert!(ConfigValidator::validate_market("SOL", "market").is_ok());
        assert!(ConfigValidator::validate_market("", "market").is_err());
        assert!(ConfigValidator::validate_market("SOL PERP", "market").is_err());
    }

    #[test]
    fn test_numeric_validation() {
        assert!(ConfigValidator::validate_positive(dec!(0.1), "amount").is_ok());
        assert!(ConfigValidator::validate_positive(Decimal::ZERO, "amount").is_err());
        assert!(ConfigValidator::validate_positive(dec!(-1), "amount").is_err());

        assert!(ConfigValidator::validate_non_negative(Decimal::ZERO, "fee").is_ok());
        assert!(ConfigValidator::validate_non_negative(dec!(0.0005), "fee").is_ok());
        assert!(ConfigValidator::validate_non_negative(dec!(-0.0001), "fee").is_err());
    }

    #[test]
    fn test_log_level_validation() {
        assert!(ConfigValidator::validate_log_level("info").is_ok());
        assert!(ConfigValidator::validate_log_level("funding_basis_arbitrage=debug").is_ok());
        assert!(ConfigValidator::validate_log_level("funding_basis_arbitrage=verbose").is_err());
    }
}
