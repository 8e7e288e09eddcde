//! A Monte Carlo risk-assessment engine for energy-retrofit project
//! financing: draws correlated market trajectories from three-point
//! forecasts, runs each through a cash-flow kernel, and aggregates the
//! resulting NPV/IRR/ROI/PBP/DPP ensembles into an audience-shaped envelope.
//!
//! ```
//! use risk_engine::{run_risk_assessment, load_market_forecasts, Indicator, OutputLevel, ProjectInputs};
//!
//! let forecasts = load_market_forecasts().unwrap();
//! let inputs = ProjectInputs {
//!     capex: 60_000.0,
//!     annual_maintenance_cost: 2_000.0,
//!     annual_energy_savings: 27_400.0,
//!     project_lifetime: 20,
//!     loan_amount: 25_000.0,
//!     loan_term: 15,
//! };
//! let envelope = run_risk_assessment(
//!     &inputs,
//!     &forecasts,
//!     OutputLevel::Private,
//!     &Indicator::ALL,
//!     10_000,
//!     42,
//! ).unwrap();
//! let _ = serde_json::to_string_pretty(&envelope).unwrap();
//! ```

pub mod aggregate;
pub mod config;
pub mod distributions;
pub mod envelope;
pub mod error;
pub mod kernel;
pub mod sampler;
pub mod types;

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{info_span, warn};

pub use config::load_market_forecasts;
pub use envelope::ResultEnvelope;
pub use error::RiskAssessmentError;
pub use kernel::ScenarioIndicators;
pub use types::{Indicator, MarketForecasts, OutputLevel, ProjectInputs};

use distributions::MarketDistributions;
use envelope::AggregationInputs;
use kernel::CashFlowBreakdown;
use sampler::MarketSamples;

/// Deterministic point-forecast trajectory: the moderate (P50) path with no
/// sampling noise. `electricity.mu` is log-space, so the median multiplier is
/// its exponential.
fn median_trajectory(dist: &MarketDistributions) -> (Vec<f64>, Vec<f64>, Vec<f64>, f64) {
    let inflation = dist.inflation.mu.clone();
    let interest = dist.interest.mu.clone();
    let electricity: Vec<f64> = dist.electricity.mu.iter().map(|m| m.exp()).collect();
    let discount = dist.discount.mu[0];
    (inflation, interest, electricity, discount)
}

fn scenario_indicators(
    inputs: &ProjectInputs,
    samples: &MarketSamples,
    index: usize,
) -> ScenarioIndicators {
    let flows = kernel::build_cash_flow_series(
        inputs,
        &samples.inflation[index],
        &samples.interest[index],
        &samples.electricity[index],
    );
    kernel::compute_indicators(&flows, samples.discount[index])
}

fn indicator_value(indicators: &ScenarioIndicators, indicator: Indicator) -> f64 {
    match indicator {
        Indicator::Npv => indicators.npv,
        Indicator::Irr => indicators.irr,
        Indicator::Roi => indicators.roi,
        Indicator::Pbp => indicators.pbp,
        Indicator::Dpp => indicators.dpp,
    }
}

/// Runs the full pipeline — validation, distribution building, trajectory
/// sampling, per-scenario kernel evaluation, and result aggregation — and
/// returns the envelope matching `output_level`.
///
/// Per-scenario kernel evaluation runs across a `rayon` thread pool; sampling
/// itself is already deterministic and chunked (see `sampler::sample_trajectories`),
/// so the only remaining parallel stage here is embarrassingly parallel over
/// independent scenarios and needs no further seed bookkeeping.
pub fn run_risk_assessment(
    inputs: &ProjectInputs,
    forecasts: &MarketForecasts,
    output_level: OutputLevel,
    indicators: &[Indicator],
    n_sims: usize,
    seed: u64,
) -> Result<ResultEnvelope, RiskAssessmentError> {
    let span = info_span!(
        "run_risk_assessment",
        n_sims,
        project_lifetime = inputs.project_lifetime,
        output_level = ?output_level,
    );
    let _guard = span.enter();

    inputs.validate(n_sims)?;
    let dist = distributions::build_distribution_params(forecasts, inputs.project_lifetime)?;

    let samples = sampler::sample_trajectories(&dist, n_sims, seed);

    let per_scenario: Vec<ScenarioIndicators> = (0..n_sims)
        .into_par_iter()
        .map(|i| scenario_indicators(inputs, &samples, i))
        .collect();

    let mut indicator_values: BTreeMap<Indicator, Vec<f64>> = BTreeMap::new();
    for &indicator in indicators {
        let values: Vec<f64> = per_scenario
            .iter()
            .map(|s| indicator_value(s, indicator))
            .collect();
        let finite = values.iter().filter(|v| v.is_finite()).count();
        if finite < n_sims / 2 {
            warn!(
                indicator = indicator.key(),
                finite,
                n_sims,
                "more than half of scenarios produced a non-finite value for this indicator"
            );
        }
        indicator_values.insert(indicator, values);
    }

    let (median_inflation, median_interest, median_electricity, _median_discount) =
        median_trajectory(&dist);
    let median_breakdown: CashFlowBreakdown = kernel::build_cash_flow_breakdown(
        inputs,
        &median_inflation,
        &median_interest,
        &median_electricity,
    );

    let loan_rate_percent = median_interest.first().copied().unwrap_or(0.0) * 100.0;

    let agg = AggregationInputs {
        inputs,
        n_sims,
        requested: indicators,
        indicator_values: &indicator_values,
        median_breakdown: &median_breakdown,
        loan_rate_percent,
    };

    Ok(match output_level {
        OutputLevel::Private => ResultEnvelope::Private(envelope::build_private_envelope(&agg)),
        OutputLevel::Professional => {
            ResultEnvelope::Professional(envelope::build_professional_envelope(&agg))
        }
    })
}
