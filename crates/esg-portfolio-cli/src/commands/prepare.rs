use clap::Args;
use serde_json::{json, Value};

use esg_portfolio_core::currency::normalizer::normalize;
use esg_portfolio_core::returns::builder::build_returns;
use esg_portfolio_core::Currency;

use crate::commands::load_registry;
use crate::input::csv_table;

/// Arguments for building the returns table
#[derive(Args)]
pub struct PrepareArgs {
    /// Prices CSV: Date column, then one column per ticker in native currency
    #[arg(long)]
    pub prices: String,

    /// FX CSV: Date column, then one column per pair code (e.g. USDEUR)
    #[arg(long)]
    pub fx: String,

    /// Asset registry JSON (list of assets); defaults to the built-in universe
    #[arg(long)]
    pub registry: Option<String>,

    /// Currency every price is converted into
    #[arg(long, default_value = "EUR")]
    pub currency: Currency,

    /// Path of the returns CSV to write
    #[arg(long, default_value = "returns.csv")]
    pub out: String,
}

pub fn run_prepare(args: PrepareArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let registry = load_registry(args.registry.as_deref())?;
    let prices = csv_table::read_date_table_file(&args.prices)?;
    let fx = csv_table::read_date_table_file(&args.fx)?;

    let normalized = normalize(&prices, &fx, &registry, &args.currency)?;
    let built = build_returns(&normalized.result.prices)?;
    csv_table::write_returns_file(&args.out, &built.result.returns)?;

    let returns = &built.result.returns;
    let mut warnings = normalized.warnings;
    warnings.extend(built.warnings.iter().cloned());

    Ok(json!({
        "result": {
            "output_path": args.out,
            "target_currency": args.currency,
            "assets": returns.n_assets(),
            "observations": returns.len(),
            "first_date": returns.dates().first(),
            "last_date": returns.dates().last(),
            "weekend_rows_dropped": built.result.weekend_rows_dropped,
            "incomplete_rows_dropped": built.result.incomplete_rows_dropped,
            "infinite_values_zeroed": built.result.infinite_values_zeroed,
            "conversions": normalized.result.conversions,
            "missing_rates": normalized.result.missing_rates,
        },
        "methodology": "FX normalization (direct pair preferred over inverse), daily simple returns on weekdays, complete rows only",
        "warnings": warnings,
    }))
}
