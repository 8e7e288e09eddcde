//! Market Distribution Builder (component §4.1): turns three-scenario
//! forecasts into year-resolved parametric distribution parameters.

use crate::error::RiskAssessmentError;
use crate::types::{MarketForecasts, ThreeScenario};

/// Inverse standard-normal CDF at 0.9.
pub const Z90: f64 = 1.2815515655446004;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionKind {
    Normal,
    LogNormal,
}

/// Year-resolved parameters for one market variable. `mu`/`sigma` hold
/// log-space parameters when `kind == LogNormal`.
#[derive(Debug, Clone)]
pub struct DistributionParams {
    pub kind: DistributionKind,
    pub mu: Vec<f64>,
    pub sigma: Vec<f64>,
}

pub struct MarketDistributions {
    pub inflation: DistributionParams,
    pub interest: DistributionParams,
    pub discount: DistributionParams,
    pub electricity: DistributionParams,
}

fn pad_or_truncate(values: &[f64], project_lifetime: usize) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    if values.len() >= project_lifetime {
        values[..project_lifetime].to_vec()
    } else {
        let mut padded = values.to_vec();
        let last = *padded.last().unwrap();
        padded.resize(project_lifetime, last);
        padded
    }
}

fn aligned_triple(
    name: &str,
    scenario: &ThreeScenario,
    project_lifetime: usize,
) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>), RiskAssessmentError> {
    let pessimistic = pad_or_truncate(&scenario.pessimistic, project_lifetime);
    let moderate = pad_or_truncate(&scenario.moderate, project_lifetime);
    let optimistic = pad_or_truncate(&scenario.optimistic, project_lifetime);
    if pessimistic.is_empty() || moderate.is_empty() || optimistic.is_empty() {
        return Err(RiskAssessmentError::invalid_forecast(format!(
            "{name} forecast has an empty pessimistic/moderate/optimistic array"
        )));
    }
    Ok((pessimistic, moderate, optimistic))
}

fn build_normal(
    name: &str,
    scenario: &ThreeScenario,
    project_lifetime: usize,
) -> Result<DistributionParams, RiskAssessmentError> {
    let (pessimistic, moderate, optimistic) = aligned_triple(name, scenario, project_lifetime)?;

    let mut mu = Vec::with_capacity(project_lifetime);
    let mut sigma = Vec::with_capacity(project_lifetime);
    for t in 0..project_lifetime {
        let (pess, moder, opt) = (pessimistic[t], moderate[t], optimistic[t]);
        if !(pess <= moder && moder <= opt) {
            return Err(RiskAssessmentError::invalid_forecast(format!(
                "{name} forecast not ordered at year {t}: pessimistic={pess}, moderate={moder}, optimistic={opt}"
            )));
        }
        mu.push(moder);
        sigma.push((opt - pess) / (2.0 * Z90));
    }
    Ok(DistributionParams {
        kind: DistributionKind::Normal,
        mu,
        sigma,
    })
}

fn build_lognormal(
    scenario: &ThreeScenario,
    project_lifetime: usize,
) -> Result<DistributionParams, RiskAssessmentError> {
    let (pessimistic, moderate, optimistic) =
        aligned_triple("electricity_price", scenario, project_lifetime)?;

    let mut mu = Vec::with_capacity(project_lifetime);
    let mut sigma = Vec::with_capacity(project_lifetime);
    for t in 0..project_lifetime {
        let (pess, moder, opt) = (pessimistic[t], moderate[t], optimistic[t]);
        if pess <= 0.0 || moder <= 0.0 || opt <= 0.0 {
            return Err(RiskAssessmentError::invalid_forecast(format!(
                "electricity_price forecast must be strictly positive at year {t}: pessimistic={pess}, moderate={moder}, optimistic={opt}"
            )));
        }
        if !(pess <= moder && moder <= opt) {
            return Err(RiskAssessmentError::invalid_forecast(format!(
                "electricity_price forecast not ordered at year {t}: pessimistic={pess}, moderate={moder}, optimistic={opt}"
            )));
        }
        mu.push(moder.ln());
        sigma.push((opt.ln() - pess.ln()) / (2.0 * Z90));
    }
    Ok(DistributionParams {
        kind: DistributionKind::LogNormal,
        mu,
        sigma,
    })
}

/// Builds all four variables' distribution parameters, padded/truncated to
/// `project_lifetime` years and validated for ordering and positivity.
pub fn build_distribution_params(
    forecasts: &MarketForecasts,
    project_lifetime: usize,
) -> Result<MarketDistributions, RiskAssessmentError> {
    Ok(MarketDistributions {
        inflation: build_normal("inflation", &forecasts.inflation, project_lifetime)?,
        interest: build_normal("interest_rate", &forecasts.interest_rate, project_lifetime)?,
        discount: build_normal("discount_rate", &forecasts.discount_rate, project_lifetime)?,
        electricity: build_lognormal(&forecasts.electricity_price, project_lifetime)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(pess: &[f64], moder: &[f64], opt: &[f64]) -> ThreeScenario {
        ThreeScenario {
            pessimistic: pess.to_vec(),
            moderate: moder.to_vec(),
            optimistic: opt.to_vec(),
        }
    }

    #[test]
    fn pads_short_arrays_by_repeating_final_element() {
        let s = scenario(&[0.01, 0.02], &[0.02, 0.03], &[0.04, 0.05]);
        let params = build_normal("x", &s, 5).unwrap();
        assert_eq!(params.mu, vec![0.02, 0.03, 0.03, 0.03, 0.03]);
    }

    #[test]
    fn truncates_long_arrays() {
        let s = scenario(&[0.0; 10], &[0.0; 10], &[0.0; 10]);
        let params = build_normal("x", &s, 3).unwrap();
        assert_eq!(params.mu.len(), 3);
    }

    #[test]
    fn unordered_triple_is_rejected() {
        let s = scenario(&[0.05], &[0.02], &[0.03]);
        assert!(build_normal("x", &s, 1).is_err());
    }

    #[test]
    fn empty_forecast_is_rejected() {
        let s = scenario(&[], &[], &[]);
        assert!(build_normal("x", &s, 5).is_err());
    }

    #[test]
    fn non_positive_electricity_price_is_rejected() {
        let s = scenario(&[-0.1], &[0.2], &[0.3]);
        assert!(build_lognormal(&s, 1).is_err());
    }

    #[test]
    fn lognormal_mu_is_log_of_moderate() {
        let s = scenario(&[0.15], &[0.2], &[0.3]);
        let params = build_lognormal(&s, 1).unwrap();
        assert!((params.mu[0] - 0.2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn sigma_derivation_matches_z90() {
        let s = scenario(&[0.1], &[0.2], &[0.3]);
        let params = build_normal("x", &s, 1).unwrap();
        let expected = (0.3 - 0.1) / (2.0 * Z90);
        assert!((params.sigma[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn discount_scalar_triple_broadcasts_via_pad_policy() {
        let s = scenario(&[0.02], &[0.05], &[0.09]);
        let params = build_normal("discount_rate", &s, 20).unwrap();
        assert_eq!(params.mu.len(), 20);
        assert!(params.mu.iter().all(|&m| (m - 0.05).abs() < 1e-12));
    }
}
