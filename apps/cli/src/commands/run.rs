//! Full pipeline command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use spendcast_core::{Settings, format_anomaly_date};

use super::{SourceArgs, build_pipeline, header};

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Explain the anomalies (overrides pipeline.explain)
    #[arg(long)]
    pub explain: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the run command.
pub async fn execute(settings: Settings, args: RunArgs) -> Result<()> {
    let explain = args.explain;
    let mut pipeline = build_pipeline(settings, &args.source, |o| o.explain |= explain)?;
    let summary = pipeline.run().await.context("Pipeline run failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    header("spendcast run");
    println!("  {} {}", "Series:".bold(), pipeline.session().active_label().cyan());
    println!("  {} {}", "Observed days:".bold(), summary.observations);
    println!("  {} {}", "Forecast days:".bold(), summary.forecast_steps);

    if summary.anomalies.is_empty() {
        println!("  {} {}", "Anomalies:".bold(), "none".green());
    } else {
        println!("  {} {}", "Anomalies:".bold(), summary.anomalies.len().to_string().red());
        for date in &summary.anomalies {
            println!("    {} {}", "•".red(), format_anomaly_date(*date));
        }
    }

    if let Some(explanation) = &summary.explanation {
        println!();
        println!("{}", "Explanation".bold());
        println!("{explanation}");
    }

    Ok(())
}
