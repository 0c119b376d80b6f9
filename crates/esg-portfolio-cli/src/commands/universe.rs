use clap::Args;
use serde_json::Value;

use crate::commands::load_registry;

/// Arguments for listing the asset registry
#[derive(Args)]
pub struct UniverseArgs {
    /// Asset registry JSON; defaults to the built-in universe
    #[arg(long)]
    pub registry: Option<String>,

    /// Only list assets quoted in this currency
    #[arg(long)]
    pub currency: Option<esg_portfolio_core::Currency>,
}

pub fn run_universe(args: UniverseArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let registry = load_registry(args.registry.as_deref())?;
    let assets: Vec<_> = registry
        .assets()
        .filter(|a| args.currency.as_ref().map_or(true, |c| &a.currency == c))
        .collect();
    Ok(serde_json::to_value(assets)?)
}
