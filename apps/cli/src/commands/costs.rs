//! Cost fetching command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::json;
use spendcast_abstraction::Series;
use spendcast_core::{FetchedCosts, Settings};
use tabled::{Table, Tabled, settings::Style};

use super::{SourceArgs, build_pipeline, header, usd};

#[derive(Args, Debug)]
pub struct CostsArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Show one row per group instead of the daily total
    #[arg(long)]
    pub per_group: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the costs command.
pub async fn execute(settings: Settings, args: CostsArgs) -> Result<()> {
    let per_group = args.per_group;
    let mut pipeline = build_pipeline(settings, &args.source, |o| o.per_group = per_group)?;
    pipeline.fetch_costs().await.context("Failed to fetch costs")?;

    let session = pipeline.session();
    let Some(costs) = session.costs.as_ref() else {
        return Ok(());
    };

    if args.json {
        let value = match costs {
            FetchedCosts::Total(series) => json!({ "total": series }),
            FetchedCosts::Grouped(grouped) => json!({ "groups": grouped }),
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    header("spendcast costs");

    match costs {
        FetchedCosts::Total(series) => print_series(series),
        FetchedCosts::Grouped(_) if args.source.group.is_some() => {
            println!("  {} {}", "Group:".bold(), session.active_label().cyan());
            print_series(session.active_series()?);
        }
        FetchedCosts::Grouped(grouped) => print_groups(grouped.iter()),
    }

    Ok(())
}

fn print_series(series: &Series) {
    if series.is_empty() {
        println!("  {}", "No cost records returned.".yellow());
        return;
    }

    #[derive(Tabled)]
    struct DayRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Amount")]
        amount: String,
    }

    let rows: Vec<DayRow> = series
        .iter()
        .map(|(date, amount)| DayRow { date: date.to_string(), amount: usd(amount) })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));

    let total: f64 = series.values().sum();
    println!();
    println!("  {} {} over {} days", "Total:".bold(), usd(total).green(), series.len());
}

fn print_groups<'a>(groups: impl Iterator<Item = (&'a str, &'a Series)>) {
    #[derive(Tabled)]
    struct GroupRow {
        #[tabled(rename = "Group")]
        group: String,
        #[tabled(rename = "Days")]
        days: usize,
        #[tabled(rename = "Total")]
        total: String,
        #[tabled(rename = "Peak")]
        peak: String,
    }

    let rows: Vec<GroupRow> = groups
        .map(|(key, series)| GroupRow {
            group: key.to_string(),
            days: series.len(),
            total: usd(series.values().sum()),
            peak: series.max_value().map_or_else(|| "-".to_string(), usd),
        })
        .collect();

    if rows.is_empty() {
        println!("  {}", "No cost records returned.".yellow());
        return;
    }
    println!("{}", Table::new(rows).with(Style::rounded()));
}
