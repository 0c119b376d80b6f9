use rust_decimal::prelude::*;
use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::returns::series::ReturnSeries;
use crate::types::{with_metadata, ComputationOutput, Rate, Ticker};
use crate::{PortfolioResult, TRADING_DAYS_PER_YEAR};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Constants used to score a weight vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub trading_days: u32,
    pub risk_free_rate: Rate,
    /// Weights at or below this are left out of the allocation report.
    pub materiality_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            trading_days: TRADING_DAYS_PER_YEAR,
            risk_free_rate: 0.04,
            materiality_threshold: 1e-4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub annual_return: Rate,
    pub annual_volatility: Rate,
    pub sharpe_ratio: f64,
}

/// Metrics as shown to users: returns and volatility in percent, all
/// rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayMetrics {
    pub annual_return_pct: Decimal,
    pub annual_volatility_pct: Decimal,
    pub sharpe_ratio: Decimal,
}

impl MetricsRecord {
    pub fn display(&self) -> DisplayMetrics {
        DisplayMetrics {
            annual_return_pct: round2(self.annual_return * 100.0),
            annual_volatility_pct: round2(self.annual_volatility * 100.0),
            sharpe_ratio: round2(self.sharpe_ratio),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationEntry {
    pub ticker: Ticker,
    pub weight: f64,
    /// e.g. `"12.34%"`
    pub percentage: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub metrics: MetricsRecord,
    pub display: DisplayMetrics,
    /// Material positions in column order.
    pub allocation: Vec<AllocationEntry>,
    pub observations: usize,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Score `weights` against the historical `returns`.
///
/// Daily portfolio returns are `returns @ weights`; annual return is
/// `mean * trading_days`, annual volatility `std * sqrt(trading_days)`
/// (sample std), Sharpe `(annual_return - rf) / annual_volatility`, or 0
/// when volatility is 0.
pub fn analyze(
    returns: &ReturnSeries,
    weights: &[f64],
    config: &AnalysisConfig,
) -> PortfolioResult<ComputationOutput<AnalysisOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let daily = returns.weighted(weights)?;
    let metrics = portfolio_metrics(&daily, config);
    let allocation = allocation_report(returns.tickers(), weights, config.materiality_threshold);

    if daily.len() < 2 {
        warnings.push("Fewer than 2 observations: volatility reported as 0".into());
    }
    let total: f64 = weights.iter().sum();
    if (total - 1.0).abs() > 1e-6 {
        warnings.push(format!("Weights sum to {:.6}, not 1", total));
    }

    let output = AnalysisOutput {
        metrics,
        display: metrics.display(),
        allocation,
        observations: daily.len(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Annualized return, volatility and Sharpe ratio of a weighted portfolio",
        &serde_json::json!({
            "trading_days": config.trading_days,
            "risk_free_rate": config.risk_free_rate,
            "materiality_threshold": config.materiality_threshold,
            "n_assets": returns.n_assets(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Annualized metrics of a daily return series.
pub fn portfolio_metrics(daily: &[f64], config: &AnalysisConfig) -> MetricsRecord {
    let factor = config.trading_days as f64;
    let n = daily.len();
    let mean = if n == 0 {
        0.0
    } else {
        daily.iter().sum::<f64>() / n as f64
    };
    let std = sample_std(daily, mean);

    let annual_return = mean * factor;
    let annual_volatility = std * factor.sqrt();
    let sharpe_ratio = if annual_volatility == 0.0 {
        0.0
    } else {
        (annual_return - config.risk_free_rate) / annual_volatility
    };

    MetricsRecord {
        annual_return,
        annual_volatility,
        sharpe_ratio,
    }
}

/// Tickers whose weight exceeds `threshold`, in column order.
pub fn allocation_report(tickers: &[Ticker], weights: &[f64], threshold: f64) -> Vec<AllocationEntry> {
    tickers
        .iter()
        .zip(weights)
        .filter(|(_, w)| **w > threshold)
        .map(|(t, w)| AllocationEntry {
            ticker: t.clone(),
            weight: *w,
            percentage: format!("{:.2}%", round2(w * 100.0)),
        })
        .collect()
}

/// Sample standard deviation (n-1). Exactly 0 for a constant series.
fn sample_std(data: &[f64], mean: f64) -> f64 {
    let n = data.len();
    if n < 2 || data.iter().all(|x| *x == data[0]) {
        return 0.0;
    }
    let sum_sq: f64 = data.iter().map(|x| (x - mean) * (x - mean)).sum();
    (sum_sq / (n - 1) as f64).sqrt()
}

fn round2(x: f64) -> Decimal {
    Decimal::from_f64(x)
        .unwrap_or(Decimal::ZERO)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn two_assets() -> ReturnSeries {
        ReturnSeries::new(
            vec!["A".into(), "B".into()],
            vec![
                (d(2), vec![0.01, 0.002]),
                (d(3), vec![-0.02, 0.001]),
                (d(4), vec![0.015, 0.003]),
                (d(5), vec![0.005, -0.001]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_metrics_formula() {
        let r = two_assets();
        let out = analyze(&r, &[0.5, 0.5], &AnalysisConfig::default())
            .unwrap()
            .result;
        let daily = [0.006, -0.0095, 0.009, 0.002];
        let mean = daily.iter().sum::<f64>() / 4.0;
        let var = daily.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / 3.0;
        let vol = var.sqrt() * 252f64.sqrt();
        let ret = mean * 252.0;
        assert!((out.metrics.annual_return - ret).abs() < 1e-12);
        assert!((out.metrics.annual_volatility - vol).abs() < 1e-12);
        assert!((out.metrics.sharpe_ratio - (ret - 0.04) / vol).abs() < 1e-9);
        assert_eq!(out.observations, 4);
    }

    #[test]
    fn test_sharpe_zero_for_constant_returns() {
        let r = ReturnSeries::new(
            vec!["A".into()],
            vec![(d(2), vec![0.01]), (d(3), vec![0.01]), (d(4), vec![0.01])],
        )
        .unwrap();
        let out = analyze(&r, &[1.0], &AnalysisConfig::default()).unwrap().result;
        assert_eq!(out.metrics.annual_volatility, 0.0);
        assert_eq!(out.metrics.sharpe_ratio, 0.0);
        assert!((out.metrics.annual_return - 2.52).abs() < 1e-12);
    }

    #[test]
    fn test_allocation_threshold_and_order() {
        let tickers: Vec<Ticker> = ["A", "B", "C", "D"].iter().map(|t| t.to_string()).collect();
        let weights = [0.3, 0.0001, 0.6998, 0.0001005];
        let report = allocation_report(&tickers, &weights, 1e-4);
        let names: Vec<&str> = report.iter().map(|e| e.ticker.as_str()).collect();
        assert_eq!(names, vec!["A", "C", "D"]);
        assert_eq!(report[0].percentage, "30.00%");
        assert_eq!(report[1].percentage, "69.98%");
        assert_eq!(report[2].percentage, "0.01%");
    }

    #[test]
    fn test_allocation_percentages_sum() {
        let tickers: Vec<Ticker> = ["A", "B", "C"].iter().map(|t| t.to_string()).collect();
        let weights = [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0];
        let report = allocation_report(&tickers, &weights, 1e-4);
        let total: f64 = report
            .iter()
            .map(|e| e.percentage.trim_end_matches('%').parse::<f64>().unwrap())
            .sum();
        assert!((total - 100.0).abs() <= 0.005 * report.len() as f64);
    }

    #[test]
    fn test_display_rounding() {
        let m = MetricsRecord {
            annual_return: 0.123456,
            annual_volatility: 0.2,
            sharpe_ratio: 0.41728,
        };
        assert_eq!(
            m.display(),
            DisplayMetrics {
                annual_return_pct: dec!(12.35),
                annual_volatility_pct: dec!(20.00),
                sharpe_ratio: dec!(0.42),
            }
        );
    }

    #[test]
    fn test_weight_length_mismatch() {
        let r = two_assets();
        assert!(analyze(&r, &[1.0], &AnalysisConfig::default()).is_err());
    }

    #[test]
    fn test_unnormalized_weights_warned() {
        let r = two_assets();
        let out = analyze(&r, &[0.5, 0.4], &AnalysisConfig::default()).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("sum")));
    }
}
