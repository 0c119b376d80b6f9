use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::PortfolioError;
use crate::optimization::objective::{BlendedObjective, ObjectiveConstants, ObjectiveTerms};
use crate::optimization::sqp::{minimize_on_simplex, SolverConfig};
use crate::returns::series::ReturnSeries;
use crate::types::{with_metadata, ComputationOutput, Ticker};
use crate::universe::esg::EsgScores;
use crate::{PortfolioResult, TRADING_DAYS_PER_YEAR};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Portfolio construction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyMode {
    /// Maximize `w.R - risk_aversion * sigma(w)`.
    MaxReturn,
    /// Minimize `sigma(w) - return_tilt * w.R`. A soft blend, not the
    /// pure minimum-variance portfolio.
    MinVolatility,
    /// Maximize `esg_return_coef * w.R - risk_aversion * sigma(w) + esg_coef * w.S`.
    Esg,
    /// `1/n` per asset, no solve.
    EqualWeight,
}

impl StrategyMode {
    pub fn label(&self) -> &'static str {
        match self {
            StrategyMode::MaxReturn => "max_return",
            StrategyMode::MinVolatility => "min_volatility",
            StrategyMode::Esg => "esg",
            StrategyMode::EqualWeight => "equal_weight",
        }
    }

    /// Objective coefficients for the solved modes; `None` for equal weight.
    pub fn terms(&self, constants: &ObjectiveConstants) -> Option<ObjectiveTerms> {
        match self {
            StrategyMode::MaxReturn => Some(ObjectiveTerms {
                return_coef: 1.0,
                esg_coef: 0.0,
                risk_coef: constants.risk_aversion,
            }),
            StrategyMode::MinVolatility => Some(ObjectiveTerms {
                return_coef: constants.return_tilt,
                esg_coef: 0.0,
                risk_coef: 1.0,
            }),
            StrategyMode::Esg => Some(ObjectiveTerms {
                return_coef: constants.esg_return_coef,
                esg_coef: constants.esg_coef,
                risk_coef: constants.risk_aversion,
            }),
            StrategyMode::EqualWeight => None,
        }
    }
}

impl fmt::Display for StrategyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StrategyMode {
    type Err = PortfolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "max_return" => Ok(StrategyMode::MaxReturn),
            "min_volatility" => Ok(StrategyMode::MinVolatility),
            "esg" => Ok(StrategyMode::Esg),
            "equal_weight" | "custom" => Ok(StrategyMode::EqualWeight),
            other => Err(PortfolioError::InvalidInput {
                field: "mode".into(),
                reason: format!(
                    "Unknown mode '{}'. Use: max_return, min_volatility, esg, equal_weight",
                    other
                ),
            }),
        }
    }
}

fn default_max_weight() -> f64 {
    1.0
}

fn default_trading_days() -> u32 {
    TRADING_DAYS_PER_YEAR
}

/// Parameters of one optimization call. Stateless: everything the solve
/// depends on is in here or in the return series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeRequest {
    pub mode: StrategyMode,
    /// Per-asset weight cap (ignored by equal weight).
    #[serde(default = "default_max_weight")]
    pub max_weight_per_asset: f64,
    /// Required for `esg` mode; must cover every ticker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub esg_scores: Option<EsgScores>,
    /// Free-form caller annotation, echoed back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub objective: ObjectiveConstants,
    #[serde(default)]
    pub solver: SolverConfig,
    /// Annualization factor for mean and covariance.
    #[serde(default = "default_trading_days")]
    pub trading_days: u32,
}

impl OptimizeRequest {
    pub fn new(mode: StrategyMode) -> Self {
        Self {
            mode,
            max_weight_per_asset: default_max_weight(),
            esg_scores: None,
            notes: None,
            objective: ObjectiveConstants::default(),
            solver: SolverConfig::default(),
            trading_days: TRADING_DAYS_PER_YEAR,
        }
    }

    pub fn with_max_weight(mut self, cap: f64) -> Self {
        self.max_weight_per_asset = cap;
        self
    }

    pub fn with_esg_scores(mut self, scores: EsgScores) -> Self {
        self.esg_scores = Some(scores);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeOutput {
    pub mode: StrategyMode,
    /// Aligned 1:1 with `tickers`.
    pub tickers: Vec<Ticker>,
    pub weights: Vec<f64>,
    /// False when the solver stopped on its iteration or line-search limit;
    /// the weights are then its last feasible iterate.
    pub converged: bool,
    pub iterations: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms: Option<ObjectiveTerms>,
    pub solver_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Long-only, fully-invested weights for `request.mode`.
///
/// Solved modes minimize a blended objective over
/// `{ 0 <= w_i <= cap, sum(w) = 1 }` by SQP from equal weights, using the
/// annualized mean (`mean * trading_days`) and sample covariance
/// (`cov * trading_days`) of `returns`. Equal weight returns `1/n`.
pub fn optimize(
    returns: &ReturnSeries,
    request: &OptimizeRequest,
) -> PortfolioResult<ComputationOutput<OptimizeOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let n = returns.n_assets();
    if n == 0 {
        return Err(PortfolioError::InsufficientData(
            "At least one asset required".into(),
        ));
    }
    let equal = vec![1.0 / n as f64; n];

    let output = match request.mode.terms(&request.objective) {
        None => {
            if request.max_weight_per_asset < 1.0 / n as f64 {
                warnings.push(format!(
                    "Equal weighting ignores max_weight_per_asset ({})",
                    request.max_weight_per_asset
                ));
            }
            OptimizeOutput {
                mode: request.mode,
                tickers: returns.tickers().to_vec(),
                weights: equal,
                converged: true,
                iterations: 0,
                objective_value: None,
                terms: None,
                solver_message: "Equal weighting (no optimization)".into(),
                notes: request.notes.clone(),
            }
        }
        Some(terms) => {
            let cap = validate_cap(request.max_weight_per_asset, n)?;
            if returns.len() < 2 {
                return Err(PortfolioError::InsufficientData(
                    "At least 2 return observations required to estimate covariance".into(),
                ));
            }

            let esg = if request.mode == StrategyMode::Esg {
                let scores = request.esg_scores.as_ref().ok_or_else(|| {
                    PortfolioError::InvalidInput {
                        field: "esg_scores".into(),
                        reason: "ESG scores are required for esg mode".into(),
                    }
                })?;
                Some(scores.aligned_to(returns.tickers())?)
            } else {
                None
            };

            let factor = request.trading_days as f64;
            let mu: Vec<f64> = returns.mean_returns().iter().map(|m| m * factor).collect();
            let cov: Vec<Vec<f64>> = returns
                .covariance_matrix()
                .into_iter()
                .map(|row| row.into_iter().map(|c| c * factor).collect())
                .collect();

            let objective = BlendedObjective::new(&mu, &cov, esg.as_deref(), terms);
            let lower = vec![0.0; n];
            let upper = vec![cap; n];
            let outcome = minimize_on_simplex(&objective, equal, &lower, &upper, &request.solver);

            debug!(
                mode = %request.mode,
                iterations = outcome.iterations,
                converged = outcome.converged,
                objective = outcome.objective_value,
                "portfolio optimization finished"
            );
            if !outcome.converged {
                warn!(mode = %request.mode, message = %outcome.message, "solver did not converge");
                warnings.push(format!(
                    "Solver did not converge after {} iterations: {}",
                    outcome.iterations, outcome.message
                ));
            }

            let weights = outcome.x.iter().map(|w| w.clamp(0.0, cap)).collect();
            OptimizeOutput {
                mode: request.mode,
                tickers: returns.tickers().to_vec(),
                weights,
                converged: outcome.converged,
                iterations: outcome.iterations,
                objective_value: Some(outcome.objective_value),
                terms: Some(terms),
                solver_message: outcome.message,
                notes: request.notes.clone(),
            }
        }
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Constrained blended mean-variance/ESG optimization (SQP, damped BFGS)",
        &serde_json::json!({
            "mode": request.mode.label(),
            "n_assets": n,
            "observations": returns.len(),
            "max_weight_per_asset": request.max_weight_per_asset,
            "trading_days": request.trading_days,
            "initial_guess": "equal_weight",
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Effective cap for solved modes. Caps above 1 behave as 1.
fn validate_cap(cap: f64, n: usize) -> PortfolioResult<f64> {
    if !cap.is_finite() || cap <= 0.0 {
        return Err(PortfolioError::InvalidInput {
            field: "max_weight_per_asset".into(),
            reason: format!("Must be a positive number, got {}", cap),
        });
    }
    let cap = cap.min(1.0);
    if cap * (n as f64) < 1.0 - 1e-12 {
        return Err(PortfolioError::InfeasibleConstraints(format!(
            "{} assets capped at {} cannot sum to 1",
            n, cap
        )));
    }
    Ok(cap)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
