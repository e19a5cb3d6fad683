//! Anomaly narration.

use chrono::{Datelike, NaiveDate};
use spendcast_abstraction::{CollaboratorError, TextGenerator};
use tracing::debug;

/// English ordinal suffix for a day of month.
#[must_use]
pub const fn ordinal_suffix(day: u32) -> &'static str {
    match day % 100 {
        11..=13 => "th",
        _ => match day % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    }
}

/// Renders a date as e.g. "Monday 1st of May 2023".
#[must_use]
pub fn format_anomaly_date(date: NaiveDate) -> String {
    format!(
        "{} {}{} of {}",
        date.format("%A"),
        date.day(),
        ordinal_suffix(date.day()),
        date.format("%B %Y")
    )
}

/// Builds the explanation prompt for a list of anomalous dates.
#[must_use]
pub fn build_prompt(dates: &[NaiveDate]) -> String {
    if dates.is_empty() {
        return "No anomalies were detected in the cloud spend series. In one short paragraph, \
                summarize what a stable spend pattern usually indicates."
            .to_string();
    }

    let formatted: Vec<String> = dates.iter().copied().map(format_anomaly_date).collect();
    format!(
        "Cloud spend rose above the expected confidence interval on the following days: {}. \
         In one short paragraph, explain likely causes for these anomalies.",
        formatted.join(", ")
    )
}

/// Asks the text generator to explain `dates` and returns its reply verbatim.
///
/// # Errors
/// Propagates the collaborator's error.
pub async fn narrate(
    generator: &dyn TextGenerator,
    dates: &[NaiveDate],
) -> Result<String, CollaboratorError> {
    let prompt = build_prompt(dates);
    debug!(anomalies = dates.len(), "Requesting anomaly explanation");
    generator.generate_text(&prompt).await
}
