//! Loads the embedded market-forecast tables.
//!
//! The tables are compiled into the binary via `include_str!` and parsed once;
//! `load_market_forecasts` does no filesystem I/O at runtime. This keeps the
//! loader an external collaborator the kernel never touches directly (see the
//! embedded-forecasts design note), while still letting forecast updates ship
//! as a data-file diff instead of a source-code change.

use crate::error::RiskAssessmentError;
use crate::types::MarketForecasts;

const EMBEDDED_FORECASTS_TOML: &str = include_str!("../config/forecasts.toml");

/// Parses and validates the embedded forecast tables. Called once at process
/// start; the result is immutable and may be shared across requests without
/// synchronization.
pub fn load_market_forecasts() -> Result<MarketForecasts, RiskAssessmentError> {
    parse_forecasts(EMBEDDED_FORECASTS_TOML)
}

fn parse_forecasts(raw: &str) -> Result<MarketForecasts, RiskAssessmentError> {
    toml::from_str(raw).map_err(|err| {
        RiskAssessmentError::invalid_forecast(format!("failed to parse forecast table: {err}"))
    })
}
