//! Result Aggregator (component §4.4, envelope half): assembles the
//! audience-tagged `ResultEnvelope` — "private" or "professional" — from the
//! indicator ensembles, the median-scenario cash-flow breakdown, and the
//! requested indicator subset.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::aggregate::{percentile_map, pr_less_than, pr_positive, build_histogram, PercentileMap};
use crate::kernel::CashFlowBreakdown;
use crate::types::{Indicator, ProjectInputs};

/// Point forecast for an indicator is its ensemble P50 — the same value
/// already sitting in `percentiles[indicator]["P50"]` — never a fresh kernel
/// evaluation on some fixed trajectory; the five indicators are nonlinear in
/// the sampled market variables, so median-of-inputs would diverge from the
/// ensemble's actual median-of-outputs.
fn p50_of(map: &PercentileMap) -> Option<f64> {
    map.get("P50").copied()
}

fn nan_to_null(v: f64) -> Option<f64> {
    if v.is_finite() { Some(v) } else { None }
}

#[derive(Debug, Serialize)]
pub struct ChartConfig {
    pub xlabel: String,
    pub ylabel: String,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct HistogramStatistics {
    pub mean: f64,
    pub std: f64,
    #[serde(rename = "P10")]
    pub p10: f64,
    #[serde(rename = "P50")]
    pub p50: f64,
    #[serde(rename = "P90")]
    pub p90: f64,
}

#[derive(Debug, Serialize)]
pub struct Bins {
    pub centers: Vec<f64>,
    pub counts: Vec<u64>,
    pub edges: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct ChartMetadataEntry {
    pub bins: Bins,
    pub statistics: HistogramStatistics,
    pub chart_config: ChartConfig,
}

#[derive(Debug, Serialize)]
pub struct CashFlowData {
    pub years: Vec<usize>,
    pub initial_investment: f64,
    pub annual_inflows: Vec<f64>,
    pub annual_outflows: Vec<f64>,
    pub annual_net_cash_flow: Vec<f64>,
    pub cumulative_cash_flow: Vec<f64>,
    pub breakeven_year: Option<usize>,
    pub loan_term: usize,
}

#[derive(Debug, Serialize)]
pub struct Metadata {
    pub n_sims: usize,
    pub project_lifetime: usize,
    pub capex: f64,
    pub annual_maintenance_cost: f64,
    pub annual_energy_savings: f64,
    pub loan_amount: f64,
    pub loan_term: usize,
    pub annual_loan_payment: f64,
    pub loan_rate_percent: f64,
    pub low_confidence: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_flow_data: Option<CashFlowData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_metadata: Option<BTreeMap<String, ChartMetadataEntry>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ResultEnvelope {
    Private(PrivateEnvelope),
    Professional(ProfessionalEnvelope),
}

#[derive(Debug, Serialize)]
pub struct PrivateEnvelope {
    pub point_forecasts: BTreeMap<String, Option<f64>>,
    pub percentiles: BTreeMap<String, PercentileMap>,
    pub metadata: Metadata,
}

#[derive(Debug, Serialize)]
pub struct ProfessionalEnvelope {
    pub point_forecasts: BTreeMap<String, Option<f64>>,
    pub percentiles: BTreeMap<String, PercentileMap>,
    pub probabilities: BTreeMap<String, f64>,
    pub metadata: Metadata,
}

/// Everything the aggregator needs to build either envelope flavor, gathered
/// in one place so `lib.rs`'s `run_risk_assessment` stays a thin pipeline.
pub struct AggregationInputs<'a> {
    pub inputs: &'a ProjectInputs,
    pub n_sims: usize,
    pub requested: &'a [Indicator],
    pub indicator_values: &'a BTreeMap<Indicator, Vec<f64>>,
    pub median_breakdown: &'a CashFlowBreakdown,
    pub loan_rate_percent: f64,
}

fn finite_count(values: &[f64]) -> usize {
    values.iter().filter(|v| v.is_finite()).count()
}

fn is_low_confidence(agg: &AggregationInputs) -> bool {
    agg.requested.iter().any(|indicator| {
        agg.indicator_values
            .get(indicator)
            .map(|values| finite_count(values) < 100)
            .unwrap_or(true)
    })
}

fn annual_loan_payment(agg: &AggregationInputs) -> f64 {
    let breakdown = agg.median_breakdown;
    if agg.inputs.loan_term == 0 {
        0.0
    } else {
        breakdown.debt_service.get(1).copied().unwrap_or(0.0)
    }
}

fn build_cash_flow_data(agg: &AggregationInputs) -> CashFlowData {
    let breakdown = agg.median_breakdown;
    let t = agg.inputs.project_lifetime;

    let mut annual_inflows = vec![0.0; t + 1];
    let mut annual_outflows = vec![0.0; t + 1];
    annual_outflows[0] = agg.inputs.capex - agg.inputs.loan_amount;
    for year in 1..=t {
        annual_inflows[year] = breakdown.savings[year];
        annual_outflows[year] = breakdown.maintenance[year] + breakdown.debt_service[year];
    }

    let annual_net_cash_flow: Vec<f64> = (0..=t)
        .map(|year| annual_inflows[year] - annual_outflows[year])
        .collect();

    let mut cumulative_cash_flow = vec![0.0; t + 1];
    let mut running = 0.0;
    for year in 0..=t {
        running += annual_net_cash_flow[year];
        cumulative_cash_flow[year] = running;
    }

    let breakeven_year = (0..=t).find(|&year| cumulative_cash_flow[year] >= 0.0);

    CashFlowData {
        years: (0..=t).collect(),
        initial_investment: agg.inputs.capex,
        annual_inflows,
        annual_outflows,
        annual_net_cash_flow,
        cumulative_cash_flow,
        breakeven_year,
        loan_term: agg.inputs.loan_term,
    }
}

fn monthly_avg_savings(agg: &AggregationInputs) -> f64 {
    let t = agg.inputs.project_lifetime;
    let total: f64 = agg.median_breakdown.savings[1..=t].iter().sum();
    total / (12.0 * t as f64)
}

fn metadata(agg: &AggregationInputs, cash_flow_data: Option<CashFlowData>, chart_metadata: Option<BTreeMap<String, ChartMetadataEntry>>) -> Metadata {
    Metadata {
        n_sims: agg.n_sims,
        project_lifetime: agg.inputs.project_lifetime,
        capex: agg.inputs.capex,
        annual_maintenance_cost: agg.inputs.annual_maintenance_cost,
        annual_energy_savings: agg.inputs.annual_energy_savings,
        loan_amount: agg.inputs.loan_amount,
        loan_term: agg.inputs.loan_term,
        annual_loan_payment: annual_loan_payment(agg),
        loan_rate_percent: agg.loan_rate_percent,
        low_confidence: is_low_confidence(agg),
        cash_flow_data,
        chart_metadata,
    }
}

pub fn build_private_envelope(agg: &AggregationInputs) -> PrivateEnvelope {
    let mut point_forecasts = BTreeMap::new();
    let mut percentiles = BTreeMap::new();
    for &indicator in agg.requested {
        if let Some(values) = agg.indicator_values.get(&indicator) {
            let map = percentile_map(values);
            point_forecasts.insert(indicator.key().to_string(), p50_of(&map));
            percentiles.insert(indicator.key().to_string(), map);
        } else {
            point_forecasts.insert(indicator.key().to_string(), None);
        }
    }
    let success_rate = agg
        .indicator_values
        .get(&Indicator::Npv)
        .map(|values| pr_positive(values))
        .unwrap_or(f64::NAN);
    point_forecasts.insert(
        "MonthlyAvgSavings".to_string(),
        nan_to_null(monthly_avg_savings(agg)),
    );
    point_forecasts.insert("SuccessRate".to_string(), nan_to_null(success_rate));

    let cash_flow_data = build_cash_flow_data(agg);
    PrivateEnvelope {
        point_forecasts,
        percentiles,
        metadata: metadata(agg, Some(cash_flow_data), None),
    }
}

fn chart_config(indicator: Indicator) -> ChartConfig {
    ChartConfig {
        xlabel: indicator.key().to_string(),
        ylabel: "Frequency".to_string(),
        title: format!("{} distribution", indicator.key()),
    }
}

pub fn build_professional_envelope(agg: &AggregationInputs) -> ProfessionalEnvelope {
    let mut point_forecasts = BTreeMap::new();
    let mut percentiles = BTreeMap::new();
    let mut chart_metadata = BTreeMap::new();

    for &indicator in agg.requested {
        if let Some(values) = agg.indicator_values.get(&indicator) {
            let map = percentile_map(values);
            point_forecasts.insert(indicator.key().to_string(), p50_of(&map));
            percentiles.insert(indicator.key().to_string(), map);
            let hist = build_histogram(values);
            chart_metadata.insert(
                indicator.key().to_string(),
                ChartMetadataEntry {
                    bins: Bins {
                        centers: hist.centers,
                        counts: hist.counts,
                        edges: hist.edges,
                    },
                    statistics: HistogramStatistics {
                        mean: hist.mean,
                        std: hist.std,
                        p10: hist.p10,
                        p50: hist.p50,
                        p90: hist.p90,
                    },
                    chart_config: chart_config(indicator),
                },
            );
        } else {
            point_forecasts.insert(indicator.key().to_string(), None);
        }
    }

    let mut probabilities = BTreeMap::new();
    let t = agg.inputs.project_lifetime;
    if let Some(values) = agg.indicator_values.get(&Indicator::Npv) {
        probabilities.insert("Pr(NPV > 0)".to_string(), pr_positive(values));
    }
    if let Some(values) = agg.indicator_values.get(&Indicator::Pbp) {
        probabilities.insert(
            format!("Pr(PBP < {t}y)"),
            pr_less_than(values, t as f64, agg.n_sims),
        );
    }
    if let Some(values) = agg.indicator_values.get(&Indicator::Dpp) {
        probabilities.insert(
            format!("Pr(DPP < {t}y)"),
            pr_less_than(values, t as f64, agg.n_sims),
        );
    }

    ProfessionalEnvelope {
        point_forecasts,
        percentiles,
        probabilities,
        metadata: metadata(agg, None, Some(chart_metadata)),
    }
}
