use clap::Args;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;

use esg_portfolio_core::analytics::analyzer::analyze;
use esg_portfolio_core::analytics::performance::project;

use crate::commands::{load_config, load_returns};

/// Arguments for scoring explicit weights
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Returns CSV written by `prepare`
    #[arg(long)]
    pub returns: String,

    /// Comma-separated weights, aligned with --tickers or with the file's columns
    #[arg(long, required = true, value_delimiter = ',', allow_hyphen_values = true)]
    pub weights: Vec<Decimal>,

    /// Comma-separated basket the weights refer to
    #[arg(long, value_delimiter = ',')]
    pub tickers: Option<Vec<String>>,

    /// Annual risk-free rate (overrides the config file)
    #[arg(long)]
    pub risk_free_rate: Option<Decimal>,

    /// Analysis settings (JSON or YAML)
    #[arg(long)]
    pub config: Option<String>,
}

fn to_f64(value: Decimal, what: &str) -> Result<f64, Box<dyn std::error::Error>> {
    value
        .to_f64()
        .ok_or_else(|| format!("{} {} is not representable as f64", what, value).into())
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut config = load_config(args.config.as_deref())?.analysis;
    if let Some(rf) = args.risk_free_rate {
        config.risk_free_rate = to_f64(rf, "risk-free rate")?;
    }

    let returns = load_returns(&args.returns, args.tickers.as_deref())?;
    let weights = args
        .weights
        .iter()
        .map(|w| to_f64(*w, "weight"))
        .collect::<Result<Vec<f64>, _>>()?;

    let analysis = analyze(&returns, &weights, &config)?;
    let performance = project(&returns, &weights)?.points();

    let mut value = serde_json::to_value(analysis)?;
    if let Some(result) = value.get_mut("result").and_then(Value::as_object_mut) {
        result.insert("performance".into(), serde_json::to_value(performance)?);
    }
    Ok(value)
}
