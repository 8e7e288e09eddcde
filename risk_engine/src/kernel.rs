//! Cash-Flow & Indicator Kernel (component §4.3): per-scenario cash-flow
//! construction plus the five financial indicators.
//!
//! The kernel is stateless beyond per-call scratch space. No function here
//! panics on a malformed scenario; every failure mode folds into NaN so a
//! single pathological draw never poisons the rest of the ensemble (see the
//! "State" paragraph of the component design).

use crate::error::KernelFailure;
use crate::types::ProjectInputs;
use tracing::debug;

const IRR_INITIAL_GUESS: f64 = 0.1;
const IRR_MAX_NEWTON_ITERS: u32 = 100;
const IRR_TOLERANCE: f64 = 1e-7;
const IRR_BISECTION_LO: f64 = -0.99;
const IRR_BISECTION_HI: f64 = 10.0;
const IRR_MAX_BISECTION_ITERS: u32 = 200;

#[derive(Debug, Clone, Copy)]
pub struct ScenarioIndicators {
    pub npv: f64,
    pub irr: f64,
    pub roi: f64,
    pub pbp: f64,
    pub dpp: f64,
}

/// Builds the (T+1)-length net cash-flow series for one scenario. `inflation`,
/// `interest`, and `electricity` are each length T, indexed by year-1 (i.e.
/// `inflation[0]` is year 1's draw).
pub fn build_cash_flow_series(
    inputs: &ProjectInputs,
    inflation: &[f64],
    interest: &[f64],
    electricity: &[f64],
) -> Vec<f64> {
    let t = inputs.project_lifetime;
    let mut flows = vec![0.0; t + 1];
    flows[0] = -(inputs.capex - inputs.loan_amount);

    let principal = constant_principal(inputs);
    let mut cumulative_inflation = 1.0;

    for year in 1..=t {
        cumulative_inflation *= 1.0 + inflation[year - 1];
        let savings = inputs.annual_energy_savings * electricity[year - 1];
        let maintenance = inputs.annual_maintenance_cost * cumulative_inflation;
        let operating = savings - maintenance;
        let debt_service = debt_service_for_year(inputs, principal, interest[year - 1], year);
        flows[year] = operating - debt_service;
    }

    flows
}

/// Per-year breakdown of the median-scenario cash flow, used only by the
/// aggregator's private cash-flow timeline (computed once, not per scenario).
pub struct CashFlowBreakdown {
    pub flows: Vec<f64>,
    pub savings: Vec<f64>,
    pub maintenance: Vec<f64>,
    pub debt_service: Vec<f64>,
}

pub fn build_cash_flow_breakdown(
    inputs: &ProjectInputs,
    inflation: &[f64],
    interest: &[f64],
    electricity: &[f64],
) -> CashFlowBreakdown {
    let t = inputs.project_lifetime;
    let mut flows = vec![0.0; t + 1];
    let mut savings = vec![0.0; t + 1];
    let mut maintenance = vec![0.0; t + 1];
    let mut debt_service = vec![0.0; t + 1];

    flows[0] = -(inputs.capex - inputs.loan_amount);

    let principal = constant_principal(inputs);
    let mut cumulative_inflation = 1.0;

    for year in 1..=t {
        cumulative_inflation *= 1.0 + inflation[year - 1];
        savings[year] = inputs.annual_energy_savings * electricity[year - 1];
        maintenance[year] = inputs.annual_maintenance_cost * cumulative_inflation;
        debt_service[year] = debt_service_for_year(inputs, principal, interest[year - 1], year);
        flows[year] = savings[year] - maintenance[year] - debt_service[year];
    }

    CashFlowBreakdown {
        flows,
        savings,
        maintenance,
        debt_service,
    }
}

fn constant_principal(inputs: &ProjectInputs) -> f64 {
    if inputs.loan_amount > 0.0 && inputs.loan_term > 0 {
        inputs.loan_amount / inputs.loan_term as f64
    } else {
        0.0
    }
}

fn debt_service_for_year(inputs: &ProjectInputs, principal: f64, interest_rate: f64, year: usize) -> f64 {
    if inputs.loan_amount > 0.0 && year <= inputs.loan_term {
        let outstanding_before_year = inputs.loan_amount - principal * (year as f64 - 1.0);
        let interest_payment = outstanding_before_year * interest_rate;
        principal + interest_payment
    } else {
        0.0
    }
}

fn is_degenerate(flows: &[f64]) -> bool {
    flows.len() < 2 || flows[1..].iter().all(|&f| f == 0.0)
}

/// NPV at discount rate `r`. NaN if `1 + r <= 0`.
pub fn npv(r: f64, flows: &[f64]) -> f64 {
    if 1.0 + r <= 0.0 {
        debug!(failure = KernelFailure::DiscountBelowNegativeOne.as_str(), "npv");
        return f64::NAN;
    }
    flows
        .iter()
        .enumerate()
        .map(|(t, flow)| flow / (1.0 + r).powi(t as i32))
        .sum()
}

fn npv_at(flows: &[f64], r: f64) -> f64 {
    if 1.0 + r <= 0.0 {
        return f64::NAN;
    }
    flows
        .iter()
        .enumerate()
        .map(|(t, flow)| flow / (1.0 + r).powi(t as i32))
        .sum()
}

fn dnpv_at(flows: &[f64], r: f64) -> f64 {
    flows
        .iter()
        .enumerate()
        .skip(1)
        .map(|(t, flow)| -(t as f64) * flow / (1.0 + r).powi(t as i32 + 1))
        .sum()
}

/// IRR via Newton-Raphson seeded at 10%, analytic derivative, falling back to
/// bisection over `[-0.99, 10.0]` if Newton leaves the domain or stalls.
/// Returns NaN if the cash flows never change sign or no root is found.
pub fn irr(flows: &[f64]) -> f64 {
    let has_positive = flows.iter().any(|&f| f > 0.0);
    let has_negative = flows.iter().any(|&f| f < 0.0);
    if !(has_positive && has_negative) {
        debug!(failure = KernelFailure::NoSignChange.as_str(), "irr");
        return f64::NAN;
    }

    if let Some(root) = newton_raphson_irr(flows) {
        return root;
    }
    match bisection_irr(flows) {
        Some(root) => root,
        None => {
            debug!(failure = KernelFailure::SolverDidNotConverge.as_str(), "irr");
            f64::NAN
        }
    }
}

fn newton_raphson_irr(flows: &[f64]) -> Option<f64> {
    let mut r = IRR_INITIAL_GUESS;
    for _ in 0..IRR_MAX_NEWTON_ITERS {
        if 1.0 + r <= 0.0 {
            return None;
        }
        let f = npv_at(flows, r);
        if f.abs() < IRR_TOLERANCE {
            return Some(r);
        }
        let df = dnpv_at(flows, r);
        if df.abs() < 1e-12 {
            return None;
        }
        let next = r - f / df;
        if !next.is_finite() || next <= -1.0 {
            return None;
        }
        r = next;
    }
    None
}

fn bisection_irr(flows: &[f64]) -> Option<f64> {
    let mut lo = IRR_BISECTION_LO;
    let mut hi = IRR_BISECTION_HI;
    let mut f_lo = npv_at(flows, lo);
    let f_hi = npv_at(flows, hi);
    if !f_lo.is_finite() || !f_hi.is_finite() || f_lo.signum() == f_hi.signum() {
        return None;
    }
    for _ in 0..IRR_MAX_BISECTION_ITERS {
        let mid = (lo + hi) / 2.0;
        let f_mid = npv_at(flows, mid);
        if f_mid.abs() < IRR_TOLERANCE {
            return Some(mid);
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    Some((lo + hi) / 2.0)
}

/// ROI = (sum of years 1..T - |year 0|) / |year 0|. NaN if year-0 flow is 0.
pub fn roi(flows: &[f64]) -> f64 {
    if flows.is_empty() || flows[0] == 0.0 {
        debug!(failure = KernelFailure::ZeroYearZeroFlow.as_str(), "roi");
        return f64::NAN;
    }
    let sum_rest: f64 = flows[1..].iter().sum();
    (sum_rest - flows[0].abs()) / flows[0].abs()
}

fn simple_payback(flows: &[f64]) -> f64 {
    if flows.is_empty() {
        return f64::NAN;
    }
    if flows[0] >= 0.0 {
        return 0.0;
    }
    let mut cumulative = flows[0];
    for t in 1..flows.len() {
        let previous = cumulative;
        cumulative += flows[t];
        if cumulative >= 0.0 {
            return (t as f64 - 1.0) + (-previous) / flows[t];
        }
    }
    debug!(failure = KernelFailure::NoPaybackWithinLifetime.as_str(), "payback");
    f64::NAN
}

/// Simple (undiscounted) payback period, in years.
pub fn pbp(flows: &[f64]) -> f64 {
    simple_payback(flows)
}

/// Discounted payback period: simple payback applied to `flows[t]/(1+r)^t`.
pub fn dpp(flows: &[f64], r: f64) -> f64 {
    if 1.0 + r <= 0.0 {
        debug!(failure = KernelFailure::DiscountBelowNegativeOne.as_str(), "dpp");
        return f64::NAN;
    }
    let discounted: Vec<f64> = flows
        .iter()
        .enumerate()
        .map(|(t, flow)| flow / (1.0 + r).powi(t as i32))
        .collect();
    simple_payback(&discounted)
}

/// Computes all five indicators for one scenario's cash-flow series and
/// discount rate. Empty or all-zero-after-year-0 cash flows yield NaN across
/// the board (the kernel's explicit degenerate-series policy).
pub fn compute_indicators(flows: &[f64], discount_rate: f64) -> ScenarioIndicators {
    if is_degenerate(flows) {
        debug!(failure = KernelFailure::DegenerateCashFlow.as_str(), "compute_indicators");
        return ScenarioIndicators {
            npv: f64::NAN,
            irr: f64::NAN,
            roi: f64::NAN,
            pbp: f64::NAN,
            dpp: f64::NAN,
        };
    }
    ScenarioIndicators {
        npv: npv(discount_rate, flows),
        irr: irr(flows),
        roi: roi(flows),
        pbp: pbp(flows),
        dpp: dpp(flows, discount_rate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs_no_loan() -> ProjectInputs {
        ProjectInputs {
            capex: 50000.0,
            annual_maintenance_cost: 1500.0,
            annual_energy_savings: 20000.0,
            project_lifetime: 15,
            loan_amount: 0.0,
            loan_term: 0,
        }
    }

    fn inputs_with_loan() -> ProjectInputs {
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
    fn cash_flow_series_has_correct_length() {
        let inputs = inputs_no_loan();
        let t = inputs.project_lifetime;
        let flows = build_cash_flow_series(&inputs, &vec![0.02; t], &vec![0.04; t], &vec![0.2; t]);
        assert_eq!(flows.len(), t + 1);
    }

    #[test]
    fn year_zero_flow_equals_negative_equity_outflow() {
        let inputs = inputs_with_loan();
        let t = inputs.project_lifetime;
        let flows = build_cash_flow_series(&inputs, &vec![0.02; t], &vec![0.04; t], &vec![0.2; t]);
        assert_eq!(flows[0], -(inputs.capex - inputs.loan_amount));
    }

    #[test]
    fn loan_amount_zero_matches_omitting_loan_path() {
        let mut with_zero_loan = inputs_no_loan();
        with_zero_loan.loan_amount = 0.0;
        with_zero_loan.loan_term = 0;
        let mut without_loan_field_set = inputs_no_loan();
        without_loan_field_set.loan_amount = 0.0;
        without_loan_field_set.loan_term = 5; // irrelevant when loan_amount is 0

        let t = with_zero_loan.project_lifetime;
        let inflation = vec![0.02; t];
        let interest = vec![0.04; t];
        let electricity = vec![0.2; t];

        let a = build_cash_flow_series(&with_zero_loan, &inflation, &interest, &electricity);
        let b = build_cash_flow_series(&without_loan_field_set, &inflation, &interest, &electricity);
        assert_eq!(a, b);
    }

    #[test]
    fn debt_service_declines_with_constant_principal_amortization() {
        let inputs = inputs_with_loan();
        let t = inputs.project_lifetime;
        let breakdown =
            build_cash_flow_breakdown(&inputs, &vec![0.0; t], &vec![0.05; t], &vec![0.2; t]);
        // Interest portion should shrink year over year while loan is outstanding.
        let ds1 = breakdown.debt_service[1];
        let ds2 = breakdown.debt_service[2];
        assert!(ds1 > ds2);
        // No debt service after loan_term.
        assert_eq!(breakdown.debt_service[inputs.loan_term + 1], 0.0);
    }

    #[test]
    fn npv_is_nan_when_discount_leq_negative_one() {
        assert!(npv(-1.0, &[-100.0, 50.0, 60.0]).is_nan());
        assert!(npv(-1.5, &[-100.0, 50.0, 60.0]).is_nan());
    }

    #[test]
    fn npv_matches_hand_computed_value() {
        let flows = vec![-100.0, 60.0, 60.0];
        let value = npv(0.1, &flows);
        let expected = -100.0 + 60.0 / 1.1 + 60.0 / 1.1f64.powi(2);
        assert!((value - expected).abs() < 1e-9);
    }

    #[test]
    fn irr_recovers_known_rate() {
        // -100 at t=0, 121 at t=2: NPV(0.1, flows) = -100 + 121/1.1^2 = 0 exactly.
        let flows = vec![-100.0, 0.0, 121.0];
        let computed = irr(&flows);
        assert!((computed - 0.1).abs() < 1e-5);
    }

    #[test]
    fn irr_is_nan_without_sign_change() {
        assert!(irr(&[100.0, 50.0, 60.0]).is_nan());
        assert!(irr(&[-100.0, -50.0, -60.0]).is_nan());
    }

    #[test]
    fn roi_matches_hand_computed_value() {
        let flows = vec![-100.0, 40.0, 40.0, 40.0];
        let value = roi(&flows);
        assert!((value - 0.2).abs() < 1e-12); // (120 - 100) / 100
    }

    #[test]
    fn roi_is_nan_when_year_zero_is_zero() {
        assert!(roi(&[0.0, 10.0, 10.0]).is_nan());
    }

    #[test]
    fn pbp_finds_fractional_crossing_year() {
        let flows = vec![-100.0, 40.0, 40.0, 40.0];
        // Cumulative: -100, -60, -20, 20 -> crosses between year 2 and 3.
        let value = pbp(&flows);
        assert!((value - (2.0 + 20.0 / 40.0)).abs() < 1e-9);
    }

    #[test]
    fn pbp_is_zero_when_year_zero_flow_is_nonnegative() {
        assert_eq!(pbp(&[10.0, -5.0, -5.0]), 0.0);
    }

    #[test]
    fn pbp_is_nan_when_never_recovers() {
        assert!(pbp(&[-100.0, 1.0, 1.0, 1.0]).is_nan());
    }

    #[test]
    fn dpp_is_never_smaller_than_pbp_for_positive_discount() {
        let flows = vec![-100.0, 40.0, 40.0, 40.0];
        let pbp_value = pbp(&flows);
        let dpp_value = dpp(&flows, 0.08);
        assert!(dpp_value >= pbp_value);
    }

    #[test]
    fn degenerate_cash_flow_yields_all_nan_indicators() {
        let indicators = compute_indicators(&[-100.0, 0.0, 0.0, 0.0], 0.05);
        assert!(indicators.npv.is_nan());
        assert!(indicators.irr.is_nan());
        assert!(indicators.roi.is_nan());
        assert!(indicators.pbp.is_nan());
        assert!(indicators.dpp.is_nan());
    }

    #[test]
    fn single_element_cash_flow_is_degenerate() {
        let indicators = compute_indicators(&[-100.0], 0.05);
        assert!(indicators.npv.is_nan());
    }
}
