//! Report listing command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use spendcast_core::{Collaborators, Settings};
use tabled::{Table, Tabled, settings::Style};

use super::header;

/// Execute the reports command.
pub async fn execute(settings: &Settings, json_output: bool) -> Result<()> {
    let collaborators = Collaborators::from_settings(settings)?;
    let reports = collaborators.billing.list_reports().await.context("Failed to list reports")?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    header("spendcast reports");

    if reports.is_empty() {
        println!("  {}", "No reports found.".yellow());
        return Ok(());
    }

    #[derive(Tabled)]
    struct ReportRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Workspace")]
        workspace: String,
    }

    let rows: Vec<ReportRow> = reports
        .into_iter()
        .map(|report| ReportRow {
            id: report.id,
            title: report.title,
            workspace: report.workspace.unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
    Ok(())
}
