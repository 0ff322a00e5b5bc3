//! Logging utilities

use crate::{ArbitrageError, Result};
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Initialize logging system.
///
/// Console output always; a daily-rolling file when `log_file` is given,
/// written as JSON lines when `json` is set. `RUST_LOG` takes precedence
/// over `log_level`.
pub fn init(log_level: &str, log_file: Option<&Path>, json: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let console_layer = fmt::layer().with_target(true).with_thread_ids(true);

    let (text_layer, json_layer) = match log_file {
        Some(path) => {
            let directory = path.parent().unwrap_or(Path::new("."));
            std::fs::create_dir_all(directory)?;
            let file_name = path.file_name().unwrap_or(std::ffi::OsStr::new("arbitrage.log"));
            let appender = RollingFileAppender::new(Rotation::DAILY, directory, file_name);

            if json {
                let layer = fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(appender);
                (None, Some(layer))
            } else {
                let layer = fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false)
                    .with_writer(appender);
                (Some(layer), None)
            }
        }
        None => (None, None),
    };

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(text_layer)
        .with(json_layer)
        .try_init()
        .map_err(|e| ArbitrageError::Config(format!("Failed to initialize logging: {}", e)))?;

    Ok(())
}

/// Log one leg of a paired trade with structured fields
#[macro_export]
macro_rules! log_leg {
    ($level:ident, $exchange:expr, $symbol:expr, $side:expr, $amount:expr, $price:expr, $($field:tt)*) => {
        tracing::$level!(
            exchange = %$exchange,
            symbol = %$symbol,
            side = %$side,
            amount = %$amount,
            price = %$price,
            $($field)*
        );
    };
}

/// Log an opportunity's spread with structured fields
#[macro_export]
macro_rules! log_spread {
    ($level:ident, $strategy:expr, $long:expr, $short:expr, $spread:expr, $($field:tt)*) => {
        tracing::$level!(
            strategy = %$strategy,
            long_exchange = %$long,
            short_exchange = %$short,
            spread = %$spread,
            $($field)*
        );
    };
}
