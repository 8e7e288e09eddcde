//! Public and internal error types.
//!
//! `RiskAssessmentError` is the only error type that crosses the
//! `run_risk_assessment` boundary — see the "Propagation policy" in the
//! component design this crate implements. Per-scenario numeric failures
//! never become a `RiskAssessmentError`; they are represented by the private
//! [`KernelFailure`] enum purely so the kernel can attach context to a
//! `tracing::debug!` event before folding the failure into NaN.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RiskAssessmentError {
    #[error("invalid inputs: {message}")]
    InvalidInputs { message: String },

    #[error("invalid forecast: {message}")]
    InvalidForecast { message: String },
}

impl RiskAssessmentError {
    pub fn invalid_inputs(message: impl Into<String>) -> Self {
        RiskAssessmentError::InvalidInputs {
            message: message.into(),
        }
    }

    pub fn invalid_forecast(message: impl Into<String>) -> Self {
        RiskAssessmentError::InvalidForecast {
            message: message.into(),
        }
    }
}

/// Internal labels for why a single scenario's kernel evaluation produced NaN.
/// Never surfaced publicly; used only to give `tracing::debug!` events context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KernelFailure {
    DiscountBelowNegativeOne,
    NoSignChange,
    SolverDidNotConverge,
    ZeroYearZeroFlow,
    NoPaybackWithinLifetime,
    DegenerateCashFlow,
}

impl KernelFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            KernelFailure::DiscountBelowNegativeOne => "discount rate at or below -100%",
            KernelFailure::NoSignChange => "cash flows never change sign",
            KernelFailure::SolverDidNotConverge => "iterative solver did not converge",
            KernelFailure::ZeroYearZeroFlow => "year-0 cash flow is zero",
            KernelFailure::NoPaybackWithinLifetime => "no payback within project lifetime",
            KernelFailure::DegenerateCashFlow => "cash flow is empty or all-zero after year 0",
        }
    }
}
