use clap::Args;
use serde_json::Value;
use tracing::info;

use esg_portfolio_core::analytics::strategy::run_strategy;
use esg_portfolio_core::optimization::optimizer::{OptimizeRequest, StrategyMode};
use esg_portfolio_core::universe::esg::EsgScores;

use crate::commands::{load_registry, load_returns, RunConfig};
use crate::input;

/// Arguments for a strategy run
#[derive(Args)]
pub struct OptimizeArgs {
    /// Returns CSV written by `prepare`
    #[arg(long)]
    pub returns: String,

    /// Strategy: max_return, min_volatility, esg, equal_weight
    #[arg(long)]
    pub mode: Option<StrategyMode>,

    /// Per-asset weight cap (e.g. 0.25)
    #[arg(long)]
    pub max_weight: Option<f64>,

    /// Comma-separated basket of tickers to restrict the universe to
    #[arg(long, value_delimiter = ',')]
    pub tickers: Option<Vec<String>>,

    /// JSON object mapping ticker to ESG score
    #[arg(long)]
    pub esg_scores: Option<String>,

    /// Asset registry JSON whose esg_score fields back the esg mode
    #[arg(long)]
    pub registry: Option<String>,

    /// Free-form annotation echoed in the report
    #[arg(long)]
    pub notes: Option<String>,

    /// Full request as JSON; read from stdin when piped and --mode is absent
    #[arg(long)]
    pub input: Option<String>,

    /// Analysis, objective and solver settings (JSON or YAML)
    #[arg(long)]
    pub config: Option<String>,
}

/// Flag overrides applied on top of the request, whatever its source.
struct Overrides {
    mode: Option<StrategyMode>,
    max_weight: Option<f64>,
    notes: Option<String>,
}

/// A supplied config sets the objective, solver and trading days; without
/// one the request keeps its own. Flags win over both.
fn apply_overrides(request: &mut OptimizeRequest, config: Option<&RunConfig>, flags: Overrides) {
    if let Some(config) = config {
        request.objective = config.objective;
        request.solver = config.solver;
        request.trading_days = config.analysis.trading_days;
    }
    if let Some(mode) = flags.mode {
        request.mode = mode;
    }
    if let Some(cap) = flags.max_weight {
        request.max_weight_per_asset = cap;
    }
    if let Some(notes) = flags.notes {
        request.notes = Some(notes);
    }
}

pub fn run_optimize(args: OptimizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config: Option<RunConfig> = match args.config {
        Some(ref path) => Some(input::file::read_config(path)?),
        None => None,
    };

    let mut request: OptimizeRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(mode) = args.mode {
        OptimizeRequest::new(mode)
    } else if let Some(req) = input::stdin::read_stdin_json()? {
        req
    } else {
        return Err("--mode, --input <request.json> or a request on stdin is required".into());
    };

    apply_overrides(
        &mut request,
        config.as_ref(),
        Overrides {
            mode: args.mode,
            max_weight: args.max_weight,
            notes: args.notes.clone(),
        },
    );
    let mut analysis = config.map(|c| c.analysis).unwrap_or_default();
    analysis.trading_days = request.trading_days;

    if request.mode == StrategyMode::Esg && request.esg_scores.is_none() {
        let scores: EsgScores = match args.esg_scores {
            Some(ref path) => input::file::read_json(path)?,
            None => load_registry(args.registry.as_deref())?.esg_scores(),
        };
        request.esg_scores = Some(scores);
    }

    let returns = load_returns(&args.returns, args.tickers.as_deref())?;
    info!(
        mode = %request.mode,
        assets = returns.n_assets(),
        observations = returns.len(),
        "running strategy"
    );

    let result = run_strategy(&returns, &request, &analysis)?;
    Ok(serde_json::to_value(result)?)
}
