//! Forecast command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use spendcast_core::Settings;
use std::path::PathBuf;
use tabled::{Table, Tabled, settings::Style};

use super::{SourceArgs, build_pipeline, header, usd, write_chart};

#[derive(Args, Debug)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Days to forecast (overrides pipeline.horizon)
    #[arg(long)]
    pub horizon: Option<u32>,

    /// Do not attach the month-start feature
    #[arg(long)]
    pub no_exogenous: bool,

    /// Write the chart spec as JSON to this file
    #[arg(long)]
    pub chart: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the forecast command.
pub async fn execute(settings: Settings, args: ForecastArgs) -> Result<()> {
    let mut pipeline = build_pipeline(settings, &args.source, |o| {
        if let Some(horizon) = args.horizon {
            o.horizon = horizon;
        }
        if args.no_exogenous {
            o.exogenous = false;
        }
    })?;

    pipeline.fetch_costs().await.context("Failed to fetch costs")?;
    pipeline.forecast().await.context("Failed to forecast costs")?;

    let Some(result) = pipeline.session().forecast.as_ref() else {
        return Ok(());
    };

    if let Some(path) = &args.chart
        && let Some(chart) = pipeline.forecast_chart()
    {
        write_chart(path, &chart)?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    header("spendcast forecast");
    println!("  {} {}", "Series:".bold(), pipeline.session().active_label().cyan());
    if !result.has_bounds() {
        println!("  {}", "Forecaster returned no confidence bounds; showing zeros.".yellow());
    }
    println!();

    #[derive(Tabled)]
    struct ForecastRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Forecast")]
        point: String,
        #[tabled(rename = "Lower")]
        lower: String,
        #[tabled(rename = "Upper")]
        upper: String,
    }

    let lower = result.lower_or_zeros();
    let upper = result.upper_or_zeros();
    let rows: Vec<ForecastRow> = result
        .timestamps()
        .iter()
        .zip(result.point())
        .zip(lower.iter().zip(&upper))
        .map(|((date, point), (lo, hi))| ForecastRow {
            date: date.to_string(),
            point: usd(*point),
            lower: usd(*lo),
            upper: usd(*hi),
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
    Ok(())
}
