use clap::{Parser, Subcommand};
use funding_basis_arbitrage::{
    config::BotConfig,
    connectors::{Exchange, PaperConnector},
    strategy::{ArbitrageStrategy, FirstLeg, MultiStrategyRunner, StrategyKind, TradingMode, VenuePair},
    utils::{logger, metrics, Clock, Journal, JsonlJournal, TokioClock},
    Result, APP_NAME, VERSION,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "arbitrage")]
#[command(about = "Drift/Hyperliquid basis and funding-rate arbitrage bot")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/arbitrage.toml")]
    config: PathBuf,

    /// Log level, overrides the configured level
    #[arg(short, long)]
    log_level: Option<String>,

    /// Log file path, overrides the configured file
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured strategies
    Run {
        /// Run only this strategy (basis or funding)
        #[arg(long)]
        strategy: Option<StrategyKind>,

        /// Execution mode override (live or dry-run)
        #[arg(long)]
        mode: Option<TradingMode>,

        /// Shortcut for --mode dry-run
        #[arg(long)]
        dry_run: bool,

        /// Force safe mode on
        #[arg(long)]
        safe_mode: bool,
    },
    /// Validate configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = BotConfig::from_file(&cli.config)?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(log_file) = cli.log_file {
        config.logging.log_file = Some(log_file);
    }

    logger::init(
        &config.logging.level,
        config.logging.log_file.as_deref(),
        config.logging.json,
    )?;
    info!("Starting {} v{}", APP_NAME, VERSION);
    info!("Configuration loaded from: {}", cli.config.display());

    match cli.command {
        Commands::Run {
            strategy,
            mode,
            dry_run,
            safe_mode,
        } => {
            if let Some(mode) = mode {
                config.force_mode(mode);
            }
            if dry_run {
                config.force_mode(TradingMode::Simulate);
            }
            if cfg!(feature = "dry-run-only") || !cfg!(feature = "live-trading") {
                config.force_mode(TradingMode::Simulate);
            }
            if safe_mode {
                config.force_safe_mode();
            }
            run(config, strategy).await
        }
        Commands::Validate => validate_config(&config),
    }
}

async fn run(config: BotConfig, selected: Option<StrategyKind>) -> Result<()> {
    config.validate()?;

    if config.metrics.enabled {
        metrics::init_prometheus(config.metrics.listen)?;
    }

    let venues = venue_pair(&config).await;
    let journal: Arc<dyn Journal> = Arc::new(JsonlJournal::new(config.storage.journal_paths()));
    let clock: Arc<dyn Clock> = Arc::new(TokioClock);

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown requested");
                    shutdown.cancel();
                }
                Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
            }
        }
    });

    let enabled = config.enabled_strategies();
    let single = match selected {
        Some(kind) => Some(kind.to_string()),
        None if enabled.len() == 1 => Some(enabled[0].to_string()),
        None => None,
    };

    match single {
        Some(name) => {
            let resolved = config.resolve_strategy(&name)?;
            info!("Running strategy '{}' in {} mode", name, resolved.mode);
            ArbitrageStrategy::new(resolved, venues, journal, clock, shutdown).run().await;
        }
        None => {
            let runner = MultiStrategyRunner::new(&config, venues, journal, clock, shutdown);
            runner.run().await;
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Drift is evaluated first; the Hyperliquid leg is placed first
async fn venue_pair(config: &BotConfig) -> VenuePair {
    VenuePair::new(
        paper_venue(config, Exchange::Drift).await,
        config.market_for(Exchange::Drift),
        paper_venue(config, Exchange::Hyperliquid).await,
        config.market_for(Exchange::Hyperliquid),
    )
    .with_first_leg(FirstLeg::B)
}

async fn paper_venue(config: &BotConfig, exchange: Exchange) -> Arc<PaperConnector> {
    let seed = config.paper.venue(exchange);
    let symbol = config.market_for(exchange);
    let venue = PaperConnector::new(exchange);

    venue.set_book(&symbol, seed.book()).await;
    venue.set_funding(&symbol, seed.funding_rate).await;
    venue.set_fill_policy(seed.fill).await;
    info!(%exchange, %symbol, fill = ?seed.fill, "Paper venue ready");

    Arc::new(venue)
}

fn validate_config(config: &BotConfig) -> Result<()> {
    info!("Validating configuration...");

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {:#}", e);
        return Err(e);
    }

    for name in config.enabled_strategies() {
        let resolved = config.resolve_strategy(name)?;
        info!(
            strategy = %name,
            mode = %resolved.mode,
            amount = %resolved.amount,
            min_profit_usd = %resolved.min_profit_usd,
            "Strategy configured"
        );
    }
    println!("Configuration validation passed!");

    Ok(())
}
