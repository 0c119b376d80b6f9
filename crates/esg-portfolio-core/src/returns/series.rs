use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::PortfolioError;
use crate::types::Ticker;
use crate::PortfolioResult;

/// Rectangular table of daily simple returns.
///
/// Invariants (checked on construction): dates are unique, ascending and
/// weekdays; every row has one finite value per ticker. Once built the
/// series is read-only and can be shared across optimization calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawReturnSeries")]
pub struct ReturnSeries {
    tickers: Vec<Ticker>,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<f64>>,
}

#[derive(Deserialize)]
struct RawReturnSeries {
    tickers: Vec<Ticker>,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<f64>>,
}

impl TryFrom<RawReturnSeries> for ReturnSeries {
    type Error = PortfolioError;

    fn try_from(raw: RawReturnSeries) -> Result<Self, Self::Error> {
        if raw.dates.len() != raw.rows.len() {
            return Err(PortfolioError::InvalidInput {
                field: "rows".into(),
                reason: format!("{} dates but {} rows", raw.dates.len(), raw.rows.len()),
            });
        }
        ReturnSeries::new(raw.tickers, raw.dates.into_iter().zip(raw.rows).collect())
    }
}

pub fn is_weekday(date: &NaiveDate) -> bool {
    date.weekday().num_days_from_monday() < 5
}

impl ReturnSeries {
    /// Build a series from (date, row) pairs; rows are sorted by date.
    pub fn new(tickers: Vec<Ticker>, mut rows: Vec<(NaiveDate, Vec<f64>)>) -> PortfolioResult<Self> {
        for (i, t) in tickers.iter().enumerate() {
            if tickers[..i].contains(t) {
                return Err(PortfolioError::InvalidInput {
                    field: "tickers".into(),
                    reason: format!("Duplicate ticker '{}'", t),
                });
            }
        }

        rows.sort_by_key(|(d, _)| *d);
        for pair in rows.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(PortfolioError::DateError(format!(
                    "Duplicate date {}",
                    pair[0].0
                )));
            }
        }

        for (date, values) in &rows {
            if !is_weekday(date) {
                return Err(PortfolioError::DateError(format!(
                    "{} is not a business day",
                    date
                )));
            }
            if values.len() != tickers.len() {
                return Err(PortfolioError::InvalidInput {
                    field: format!("row {}", date),
                    reason: format!("Expected {} values but got {}", tickers.len(), values.len()),
                });
            }
            if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
                return Err(PortfolioError::InvalidInput {
                    field: format!("row {}", date),
                    reason: format!("Non-finite return for '{}'", tickers[pos]),
                });
            }
        }

        let (dates, rows) = rows.into_iter().unzip();
        Ok(Self {
            tickers,
            dates,
            rows,
        })
    }

    pub fn tickers(&self) -> &[Ticker] {
        &self.tickers
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn n_assets(&self) -> usize {
        self.tickers.len()
    }

    /// Number of dates.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, idx: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[idx]).collect()
    }

    pub fn ticker_index(&self, ticker: &str) -> Option<usize> {
        self.tickers.iter().position(|t| t == ticker)
    }

    /// Restrict to a caller-chosen basket, in the basket's order.
    pub fn select(&self, basket: &[Ticker]) -> PortfolioResult<ReturnSeries> {
        let idx: Vec<usize> = basket
            .iter()
            .map(|t| {
                self.ticker_index(t).ok_or_else(|| PortfolioError::InvalidInput {
                    field: "basket".into(),
                    reason: format!("Ticker '{}' is not in the return series", t),
                })
            })
            .collect::<PortfolioResult<_>>()?;

        let rows = self
            .dates
            .iter()
            .zip(&self.rows)
            .map(|(d, r)| (*d, idx.iter().map(|&i| r[i]).collect()))
            .collect();
        ReturnSeries::new(basket.to_vec(), rows)
    }

    /// Dot product of each row with `weights`.
    pub fn weighted(&self, weights: &[f64]) -> PortfolioResult<Vec<f64>> {
        if weights.len() != self.n_assets() {
            return Err(PortfolioError::InvalidInput {
                field: "weights".into(),
                reason: format!(
                    "Expected {} weights but got {}",
                    self.n_assets(),
                    weights.len()
                ),
            });
        }
        Ok(self
            .rows
            .iter()
            .map(|r| r.iter().zip(weights).map(|(x, w)| x * w).sum())
            .collect())
    }

    /// Per-asset mean daily return.
    pub fn mean_returns(&self) -> Vec<f64> {
        let n = self.len() as f64;
        (0..self.n_assets())
            .map(|j| {
                if self.is_empty() {
                    0.0
                } else {
                    self.rows.iter().map(|r| r[j]).sum::<f64>() / n
                }
            })
            .collect()
    }

    /// Sample covariance matrix of daily returns (n-1 denominator).
    #[allow(clippy::needless_range_loop)]
    pub fn covariance_matrix(&self) -> Vec<Vec<f64>> {
        let k = self.n_assets();
        let mut cov = vec![vec![0.0; k]; k];
        let n = self.len();
        if n < 2 {
            return cov;
        }
        let means = self.mean_returns();
        for i in 0..k {
            for j in i..k {
                let s: f64 = self
                    .rows
                    .iter()
                    .map(|r| (r[i] - means[i]) * (r[j] - means[j]))
                    .sum();
                let c = s / (n - 1) as f64;
                cov[i][j] = c;
                cov[j][i] = c;
            }
        }
        cov
    }
}
