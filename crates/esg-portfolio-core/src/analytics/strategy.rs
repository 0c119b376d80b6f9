use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::analytics::analyzer::{analyze, AllocationEntry, AnalysisConfig, DisplayMetrics, MetricsRecord};
use crate::analytics::performance::{project, PerformancePoint};
use crate::optimization::optimizer::{optimize, OptimizeRequest, StrategyMode};
use crate::returns::series::ReturnSeries;
use crate::types::{with_metadata, ComputationOutput, Ticker};
use crate::PortfolioResult;

/// Everything a dashboard needs for one strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyReport {
    pub mode: StrategyMode,
    pub tickers: Vec<Ticker>,
    pub weights: Vec<f64>,
    pub converged: bool,
    pub metrics: MetricsRecord,
    pub display: DisplayMetrics,
    pub allocation: Vec<AllocationEntry>,
    pub performance: Vec<PerformancePoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Optimize, analyze and project in one call.
///
/// Warnings of each stage are carried over into the returned envelope.
pub fn run_strategy(
    returns: &ReturnSeries,
    request: &OptimizeRequest,
    config: &AnalysisConfig,
) -> PortfolioResult<ComputationOutput<StrategyReport>> {
    let start = Instant::now();

    let optimized = optimize(returns, request)?;
    let mut warnings = optimized.warnings;
    let weights = optimized.result.weights;

    let analysis = analyze(returns, &weights, config)?;
    warnings.extend(analysis.warnings);
    let performance = project(returns, &weights)?.points();

    let report = StrategyReport {
        mode: optimized.result.mode,
        tickers: optimized.result.tickers,
        weights,
        converged: optimized.result.converged,
        metrics: analysis.result.metrics,
        display: analysis.result.display,
        allocation: analysis.result.allocation,
        performance,
        notes: optimized.result.notes,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Strategy optimization with annualized metrics and cumulative performance",
        &serde_json::json!({
            "mode": request.mode.label(),
            "max_weight_per_asset": request.max_weight_per_asset,
            "risk_free_rate": config.risk_free_rate,
            "trading_days": config.trading_days,
            "solver_iterations": optimized.result.iterations,
        }),
        warnings,
        elapsed,
        report,
    ))
}
