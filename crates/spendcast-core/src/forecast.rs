//! Forecast request assembly.

use spendcast_abstraction::{ForecastMode, ForecastRequest, Series};

use crate::exogenous::month_start_features;
use crate::pipeline::PipelineOptions;

/// Builds the request for `mode` from the active series and pipeline options.
///
/// Forward requests carry month-start features when `options.exogenous` is set;
/// in-sample requests carry them only when `options.insample_exogenous` is set.
#[must_use]
pub fn build_request(series: &Series, mode: ForecastMode, options: &PipelineOptions) -> ForecastRequest {
    let with_features = match mode {
        ForecastMode::Forward => options.exogenous,
        ForecastMode::InSample => options.insample_exogenous,
    };

    let request = ForecastRequest::new(series.clone(), options.horizon)
        .with_levels(vec![options.level])
        .with_finetune_steps(options.finetune_steps);

    if with_features {
        request.with_exogenous(month_start_features(series, options.horizon))
    } else {
        request
    }
}
