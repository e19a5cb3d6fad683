//! Command implementations for the Spendcast CLI.

pub mod anomalies;
pub mod costs;
pub mod forecast;
pub mod reports;
pub mod run;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use spendcast_core::chart::ChartSpec;
use spendcast_core::{Collaborators, Pipeline, PipelineOptions, Settings};
use std::path::Path;

/// Flags selecting which cost data to fetch.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Report id (overrides pipeline.report_id)
    #[arg(long)]
    pub report: Option<String>,

    /// Grouping dimension (account_id, service, provider)
    #[arg(long)]
    pub grouping: Option<String>,

    /// First day to fetch (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<String>,

    /// Page of the billing API result to fetch
    #[arg(long)]
    pub page: Option<u32>,

    /// Work on a single group instead of the total
    #[arg(long)]
    pub group: Option<String>,
}

impl SourceArgs {
    /// Writes flag overrides into the settings.
    fn apply(&self, settings: &mut Settings) {
        if let Some(report) = &self.report {
            settings.pipeline.report_id.clone_from(report);
        }
        if let Some(grouping) = &self.grouping {
            settings.pipeline.grouping.clone_from(grouping);
        }
        if let Some(start_date) = &self.start_date {
            settings.pipeline.start_date = Some(start_date.clone());
        }
    }
}

/// Builds the pipeline for one command.
///
/// Grouping, start date and the overridden forecast parameters are validated
/// here, before any request is sent.
pub fn build_pipeline(
    mut settings: Settings,
    source: &SourceArgs,
    customize: impl FnOnce(&mut PipelineOptions),
) -> Result<Pipeline> {
    source.apply(&mut settings);

    let mut options = PipelineOptions::from_settings(&settings)?;
    options.page = source.page;
    options.group.clone_from(&source.group);
    customize(&mut options);
    options.validate()?;

    let collaborators =
        Collaborators::from_settings(&settings).context("Failed to set up collaborators")?;
    Ok(Pipeline::new(options, collaborators))
}

/// Writes a chart spec as pretty JSON.
pub fn write_chart(path: &Path, chart: &ChartSpec) -> Result<()> {
    let content = serde_json::to_string_pretty(chart).context("Failed to serialize chart")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write chart to {}", path.display()))?;
    println!("  {} {}", "Chart written to".dimmed(), path.display().to_string().cyan());
    Ok(())
}

/// Prints a command header.
pub fn header(title: &str) {
    println!("{}", title.bold().cyan());
    println!();
}

/// Formats an amount in USD.
pub fn usd(amount: f64) -> String {
    format!("${amount:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use spendcast_abstraction::GroupingDimension;

    #[test]
    fn test_source_args_override_settings() {
        let source = SourceArgs {
            report: Some("42".to_string()),
            grouping: Some("provider".to_string()),
            page: Some(2),
            group: Some("aws".to_string()),
            ..SourceArgs::default()
        };

        let pipeline = build_pipeline(Settings::default(), &source, |o| o.horizon = 7).unwrap();

        let options = pipeline.options();
        assert_eq!(options.report_id, "42");
        assert_eq!(options.grouping, GroupingDimension::Provider);
        assert_eq!(options.page, Some(2));
        assert_eq!(options.group.as_deref(), Some("aws"));
        assert_eq!(options.horizon, 7);
    }

    #[test]
    fn test_unsupported_grouping_is_rejected() {
        let source = SourceArgs { grouping: Some("region".to_string()), ..SourceArgs::default() };
        let err = build_pipeline(Settings::default(), &source, |_| {}).err().unwrap();
        assert!(err.to_string().contains("Unsupported grouping 'region'"));
    }

    #[test]
    fn test_zero_horizon_override_is_rejected() {
        let err = build_pipeline(Settings::default(), &SourceArgs::default(), |o| o.horizon = 0)
            .err()
            .unwrap();
        assert!(err.to_string().contains("horizon must be greater than 0"));
    }

    #[test]
    fn test_usd() {
        assert_eq!(usd(12.345), "$12.35");
    }
}
