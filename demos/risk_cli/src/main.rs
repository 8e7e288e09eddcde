//! Command-line front end for `risk_engine`. Parses project inputs, runs the
//! Monte Carlo risk assessment against the embedded market forecasts, and
//! prints the resulting envelope as pretty JSON.

use clap::{Parser, ValueEnum};
use risk_engine::{load_market_forecasts, run_risk_assessment, Indicator, OutputLevel, ProjectInputs};
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum IndicatorArg {
    Npv,
    Irr,
    Roi,
    Pbp,
    Dpp,
}

impl From<IndicatorArg> for Indicator {
    fn from(value: IndicatorArg) -> Self {
        match value {
            IndicatorArg::Npv => Indicator::Npv,
            IndicatorArg::Irr => Indicator::Irr,
            IndicatorArg::Roi => Indicator::Roi,
            IndicatorArg::Pbp => Indicator::Pbp,
            IndicatorArg::Dpp => Indicator::Dpp,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "risk_cli",
    about = "Monte Carlo risk assessment for energy-retrofit project financing"
)]
struct Args {
    /// Upfront capital expenditure.
    #[arg(long)]
    capex: f64,

    /// Annual maintenance cost in year 1, inflated in later years.
    #[arg(long)]
    annual_maintenance_cost: f64,

    /// Annual energy savings in year 1, before the electricity-price multiplier.
    #[arg(long)]
    annual_energy_savings: f64,

    /// Project lifetime in years.
    #[arg(long)]
    project_lifetime: usize,

    /// Portion of capex financed by a constant-principal loan.
    #[arg(long, default_value_t = 0.0)]
    loan_amount: f64,

    /// Loan term in years.
    #[arg(long, default_value_t = 0)]
    loan_term: usize,

    /// Number of Monte Carlo scenarios.
    #[arg(long, default_value_t = 10_000)]
    n_sims: usize,

    /// PRNG seed; identical seeds reproduce identical results.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Output envelope audience.
    #[arg(long, value_enum, default_value_t = Audience::Private)]
    audience: Audience,

    /// Indicators to include; defaults to all five when omitted.
    #[arg(long, value_enum)]
    indicator: Vec<IndicatorArg>,
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
enum Audience {
    Private,
    Professional,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let inputs = ProjectInputs {
        capex: args.capex,
        annual_maintenance_cost: args.annual_maintenance_cost,
        annual_energy_savings: args.annual_energy_savings,
        project_lifetime: args.project_lifetime,
        loan_amount: args.loan_amount,
        loan_term: args.loan_term,
    };

    let output_level = match args.audience {
        Audience::Private => OutputLevel::Private,
        Audience::Professional => OutputLevel::Professional,
    };

    let indicators: Vec<Indicator> = if args.indicator.is_empty() {
        Indicator::ALL.to_vec()
    } else {
        args.indicator.into_iter().map(Indicator::from).collect()
    };

    let forecasts = match load_market_forecasts() {
        Ok(forecasts) => forecasts,
        Err(err) => {
            eprintln!("failed to load market forecasts: {err}");
            std::process::exit(1);
        }
    };

    match run_risk_assessment(
        &inputs,
        &forecasts,
        output_level,
        &indicators,
        args.n_sims,
        args.seed,
    ) {
        Ok(envelope) => {
            println!("{}", serde_json::to_string_pretty(&envelope).unwrap());
        }
        Err(err) => {
            eprintln!("risk assessment failed: {err}");
            std::process::exit(1);
        }
    }
}
