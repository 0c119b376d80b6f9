pub mod analyze;
pub mod optimize;
pub mod prepare;
pub mod universe;

use serde::{Deserialize, Serialize};

use esg_portfolio_core::analytics::analyzer::AnalysisConfig;
use esg_portfolio_core::optimization::objective::ObjectiveConstants;
use esg_portfolio_core::optimization::sqp::SolverConfig;
use esg_portfolio_core::returns::series::ReturnSeries;
use esg_portfolio_core::universe::registry::AssetRegistry;

use crate::input;

/// Tunables loaded with `--config` (JSON or YAML). Every section is
/// optional and falls back to its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub analysis: AnalysisConfig,
    pub objective: ObjectiveConstants,
    pub solver: SolverConfig,
}

pub fn load_config(path: Option<&str>) -> Result<RunConfig, Box<dyn std::error::Error>> {
    match path {
        Some(p) => input::file::read_config(p),
        None => Ok(RunConfig::default()),
    }
}

/// Registry from a JSON list of assets, or the built-in universe.
pub fn load_registry(path: Option<&str>) -> Result<AssetRegistry, Box<dyn std::error::Error>> {
    match path {
        Some(p) => input::file::read_json(p),
        None => Ok(AssetRegistry::sustainable_universe()),
    }
}

/// Returns table, optionally restricted to a basket of tickers.
pub fn load_returns(
    path: &str,
    basket: Option<&[String]>,
) -> Result<ReturnSeries, Box<dyn std::error::Error>> {
    let returns = input::csv_table::load_returns_file(path)?;
    match basket {
        Some(tickers) if !tickers.is_empty() => Ok(returns.select(tickers)?),
        _ => Ok(returns),
    }
}
