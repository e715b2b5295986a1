//! Crypto.com Exchange client - main entry point
//!
//! This binary provides three subcommands:
//! - download: Download historical candlestick data to CSV
//! - export-orders: Export order history to a deduplicated CSV
//! - balance: Show the current portfolio summary

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "cryptocom-client")]
#[command(about = "Crypto.com Exchange API client with history download and CSV export", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download historical candlestick data to CSV
    Download {
        /// Instruments to download (comma-separated). E.g., "BTC_USD,ETH_USD"
        #[arg(short, long, default_value = "BTC_USD,ETH_USD")]
        instruments: String,

        /// Timeframe intervals (comma-separated). E.g., "1h,4h,1D"
        #[arg(short, long, default_value = "1h,1D")]
        timeframes: String,

        /// Number of days of history to fetch (0 = all available)
        #[arg(short, long, default_value = "180")]
        days: u32,

        /// Output directory
        #[arg(short, long, default_value = "data")]
        output: String,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Export order history to CSV (appends and deduplicates by order id)
    ExportOrders {
        /// Number of past days to download
        #[arg(short, long, default_value = "1")]
        days: u32,

        /// Restrict the export to one instrument
        #[arg(short, long)]
        instrument: Option<String>,

        /// Output CSV file
        #[arg(short, long, default_value = "data/order_history.csv")]
        output: PathBuf,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show the current portfolio summary
    Balance {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Filter out noisy external crates unless RUST_LOG says otherwise
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    // Credentials may live in a .env file during development
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Download { .. } => "download",
        Commands::ExportOrders { .. } => "export_orders",
        Commands::Balance { .. } => "balance",
    };

    setup_logging(cli.verbose, command_name)?;

    match cli.command {
        Commands::Download {
            instruments,
            timeframes,
            days,
            output,
            config,
        } => commands::download::run(instruments, timeframes, days, output, config.as_deref()),

        Commands::ExportOrders {
            days,
            instrument,
            output,
            config,
        } => commands::export::run(days, instrument, output, config.as_deref()),

        Commands::Balance { config } => commands::balance::run(config.as_deref()),
    }
}
