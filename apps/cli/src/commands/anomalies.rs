//! Anomaly detection command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::json;
use spendcast_core::{Settings, format_anomaly_date};
use std::path::PathBuf;
use tabled::{Table, Tabled, settings::Style};

use super::{SourceArgs, build_pipeline, header, usd, write_chart};

#[derive(Args, Debug)]
pub struct AnomaliesArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Ask the text generator to explain the anomalies
    #[arg(long)]
    pub explain: bool,

    /// Write the chart spec as JSON to this file
    #[arg(long)]
    pub chart: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the anomalies command.
pub async fn execute(settings: Settings, args: AnomaliesArgs) -> Result<()> {
    let mut pipeline = build_pipeline(settings, &args.source, |_| {})?;

    pipeline.fetch_costs().await.context("Failed to fetch costs")?;
    pipeline.detect_anomalies().await.context("Failed to detect anomalies")?;
    if args.explain {
        pipeline.explain_anomalies().await.context("Failed to explain anomalies")?;
    }

    let session = pipeline.session();
    let Some(report) = session.anomalies.as_ref() else {
        return Ok(());
    };

    if let Some(path) = &args.chart
        && let Some(chart) = pipeline.insample_chart()
    {
        write_chart(path, &chart)?;
    }

    if args.json {
        let value = json!({
            "series": session.active_label(),
            "compared_days": report.dates.len(),
            "anomalies": report.anomalies,
            "explanation": session.explanation,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    header("spendcast anomalies");
    println!(
        "  {} {} ({} days compared)",
        "Series:".bold(),
        session.active_label().cyan(),
        report.dates.len()
    );
    println!();

    if report.is_empty() {
        println!("  {}", "No days above the confidence interval.".green());
    } else {
        #[derive(Tabled)]
        struct AnomalyRow {
            #[tabled(rename = "Date")]
            date: String,
            #[tabled(rename = "Observed")]
            observed: String,
            #[tabled(rename = "Upper bound")]
            upper: String,
        }

        let rows: Vec<AnomalyRow> = report
            .anomalies
            .iter()
            .map(|a| AnomalyRow {
                date: format_anomaly_date(a.date),
                observed: usd(a.observed),
                upper: usd(a.upper),
            })
            .collect();

        println!("{}", Table::new(rows).with(Style::rounded()));
        println!("  {} {}", "Anomalies:".bold(), report.len().to_string().red());
    }

    if let Some(explanation) = &session.explanation {
        println!();
        println!("{}", "Explanation".bold());
        println!("{explanation}");
    }

    Ok(())
}
