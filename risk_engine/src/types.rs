//! Core domain records: `ProjectInputs`, `MarketForecasts`, and the small
//! enums controlling which indicators and which audience envelope a request
//! asks for.

use serde::Deserialize;

use crate::error::RiskAssessmentError;

pub const MIN_PROJECT_LIFETIME: usize = 1;
pub const MAX_PROJECT_LIFETIME: usize = 30;
pub const MIN_N_SIMS: usize = 1_000;
pub const MAX_N_SIMS: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLevel {
    Private,
    Professional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Indicator {
    Npv,
    Irr,
    Roi,
    Pbp,
    Dpp,
}

impl Indicator {
    pub const ALL: [Indicator; 5] = [
        Indicator::Npv,
        Indicator::Irr,
        Indicator::Roi,
        Indicator::Pbp,
        Indicator::Dpp,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Indicator::Npv => "NPV",
            Indicator::Irr => "IRR",
            Indicator::Roi => "ROI",
            Indicator::Pbp => "PBP",
            Indicator::Dpp => "DPP",
        }
    }
}

/// A project's static financial inputs. Validated once at the entry boundary
/// and discarded after the request completes.
#[derive(Debug, Clone)]
pub struct ProjectInputs {
    pub capex: f64,
    pub annual_maintenance_cost: f64,
    pub annual_energy_savings: f64,
    pub project_lifetime: usize,
    pub loan_amount: f64,
    pub loan_term: usize,
}

impl ProjectInputs {
    /// Validates the fields fixed by this record plus the two scalar request
    /// parameters (`n_sims`, `seed`) that the entry boundary validates
    /// alongside it. `seed` has no range restriction; it is accepted here
    /// only so the full `InvalidInputs` surface lives in one place.
    pub fn validate(&self, n_sims: usize) -> Result<(), RiskAssessmentError> {
        if !(self.capex > 0.0) {
            return Err(RiskAssessmentError::invalid_inputs(format!(
                "capex must be > 0, got {}",
                self.capex
            )));
        }
        if self.annual_maintenance_cost < 0.0 {
            return Err(RiskAssessmentError::invalid_inputs(format!(
                "annual_maintenance_cost must be >= 0, got {}",
                self.annual_maintenance_cost
            )));
        }
        if !(self.annual_energy_savings > 0.0) {
            return Err(RiskAssessmentError::invalid_inputs(format!(
                "annual_energy_savings must be > 0, got {}",
                self.annual_energy_savings
            )));
        }
        if !(MIN_PROJECT_LIFETIME..=MAX_PROJECT_LIFETIME).contains(&self.project_lifetime) {
            return Err(RiskAssessmentError::invalid_inputs(format!(
                "project_lifetime must be in [{MIN_PROJECT_LIFETIME}, {MAX_PROJECT_LIFETIME}], got {}",
                self.project_lifetime
            )));
        }
        if self.loan_amount < 0.0 || self.loan_amount > self.capex {
            return Err(RiskAssessmentError::invalid_inputs(format!(
                "loan_amount must be in [0, capex={}], got {}",
                self.capex, self.loan_amount
            )));
        }
        if self.loan_term > self.project_lifetime {
            return Err(RiskAssessmentError::invalid_inputs(format!(
                "loan_term must be <= project_lifetime={}, got {}",
                self.project_lifetime, self.loan_term
            )));
        }
        if self.loan_amount > 0.0 && self.loan_term == 0 {
            return Err(RiskAssessmentError::invalid_inputs(
                "loan_term must be > 0 when loan_amount > 0".to_string(),
            ));
        }
        if !(MIN_N_SIMS..=MAX_N_SIMS).contains(&n_sims) {
            return Err(RiskAssessmentError::invalid_inputs(format!(
                "n_sims must be in [{MIN_N_SIMS}, {MAX_N_SIMS}], got {n_sims}"
            )));
        }
        Ok(())
    }
}

/// One variable's three-point, year-indexed forecast: (P10, P50, P90) per year.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreeScenario {
    pub pessimistic: Vec<f64>,
    pub moderate: Vec<f64>,
    pub optimistic: Vec<f64>,
}

/// The four market-forecast tables consumed by the Market Distribution
/// Builder. Process-wide, read-only once loaded — see `config::load_market_forecasts`.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketForecasts {
    pub inflation: ThreeScenario,
    pub electricity_price: ThreeScenario,
    pub interest_rate: ThreeScenario,
    pub discount_rate: ThreeScenario,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_inputs() -> ProjectInputs {
        ProjectInputs {
            capex: 60000.0,
            annual_maintenance_cost: 2000.0,
            annual_energy_savings: 27400.0,
            project_lifetime: 20,
            loan_amount: 25000.0,
            loan_term: 15,
        }
    }

    #[test]
    fn valid_inputs_pass() {
        assert!(valid_inputs().validate(10_000).is_ok());
    }

    #[test]
    fn loan_over_capex_is_rejected() {
        let mut inputs = valid_inputs();
        inputs.loan_amount = inputs.capex + 1000.0;
        assert!(inputs.validate(10_000).is_err());
    }

    #[test]
    fn loan_without_term_is_rejected() {
        let mut inputs = valid_inputs();
        inputs.loan_term = 0;
        assert!(inputs.validate(10_000).is_err());
    }

    #[test]
    fn loan_term_longer_than_lifetime_is_rejected() {
        let mut inputs = valid_inputs();
        inputs.loan_term = inputs.project_lifetime + 1;
        assert!(inputs.validate(10_000).is_err());
    }

    #[test]
    fn n_sims_out_of_range_is_rejected() {
        let inputs = valid_inputs();
        assert!(inputs.validate(500).is_err());
        assert!(inputs.validate(200_000).is_err());
    }

    #[test]
    fn zero_loan_amount_with_zero_term_is_valid() {
        let mut inputs = valid_inputs();
        inputs.loan_amount = 0.0;
        inputs.loan_term = 0;
        assert!(inputs.validate(10_000).is_ok());
    }
}
