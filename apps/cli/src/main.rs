//! Spendcast CLI - cloud spend forecasting and anomaly detection
//!
//! This CLI provides a `spendcast` command that fetches daily cost data from a
//! billing API, forecasts it, and flags days that rose above the forecaster's
//! confidence band.

mod commands;

use clap::{Parser, Subcommand};
use spendcast_core::Settings;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{anomalies, costs, forecast, reports, run};

/// Spendcast - cloud spend forecasting and anomaly detection
#[derive(Parser, Debug)]
#[command(
    name = "spendcast",
    author,
    version,
    about = "Spendcast - forecast cloud spend and explain anomalies",
    long_about = "Spendcast fetches daily cost data from a billing API, sends it to a forecasting service \
                  and flags the days that rose above the forecast's confidence band."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Configuration file applied on top of ~/.spendcast/config.toml and ./.spendcastrc
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List cost reports available to the billing token
    Reports {
        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch daily costs and summarize them
    Costs(costs::CostsArgs),

    /// Forecast daily costs beyond the last observed day
    Forecast(forecast::ForecastArgs),

    /// Flag days above the in-sample confidence band
    Anomalies(anomalies::AnomaliesArgs),

    /// Fetch, forecast, detect and optionally explain in one go
    Run(run::RunArgs),
}

fn parse_level(raw: &str) -> Level {
    match raw.to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let settings = Settings::load(args.config.as_deref())?;

    // Initialize tracing
    let level = parse_level(args.log_level.as_deref().or(settings.log_level.as_deref()).unwrap_or("info"));
    let subscriber =
        FmtSubscriber::builder().with_max_level(level).without_time().with_target(false).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Reports { json } => reports::execute(&settings, json).await,
        Command::Costs(cmd) => costs::execute(settings, cmd).await,
        Command::Forecast(cmd) => forecast::execute(settings, cmd).await,
        Command::Anomalies(cmd) => anomalies::execute(settings, cmd).await,
        Command::Run(cmd) => run::execute(settings, cmd).await,
    }
}
