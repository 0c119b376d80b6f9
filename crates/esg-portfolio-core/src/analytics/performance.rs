use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::returns::series::ReturnSeries;
use crate::PortfolioResult;

/// One point of the growth-of-one-unit curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformancePoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Daily portfolio returns, from which the cumulative curve is produced
/// on demand. Each call to [`PerformanceProjection::iter`] starts over.
#[derive(Debug, Clone)]
pub struct PerformanceProjection {
    dates: Vec<NaiveDate>,
    daily: Vec<f64>,
}

impl PerformanceProjection {
    /// Cumulative product of `(1 + r)`; the first point is `1 + r_0`.
    pub fn iter(&self) -> impl Iterator<Item = PerformancePoint> + '_ {
        self.dates
            .iter()
            .zip(&self.daily)
            .scan(1.0_f64, |growth, (date, r)| {
                *growth *= 1.0 + r;
                Some(PerformancePoint {
                    date: *date,
                    value: *growth,
                })
            })
    }

    pub fn points(&self) -> Vec<PerformancePoint> {
        self.iter().collect()
    }

    pub fn daily_returns(&self) -> &[f64] {
        &self.daily
    }

    /// Final value of the curve, 1.0 for an empty series.
    pub fn terminal_value(&self) -> f64 {
        self.iter().last().map_or(1.0, |p| p.value)
    }

    pub fn len(&self) -> usize {
        self.daily.len()
    }

    pub fn is_empty(&self) -> bool {
        self.daily.is_empty()
    }
}

impl<'a> IntoIterator for &'a PerformanceProjection {
    type Item = PerformancePoint;
    type IntoIter = Box<dyn Iterator<Item = PerformancePoint> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Growth of one unit invested in `weights` over the in-sample dates.
pub fn project(returns: &ReturnSeries, weights: &[f64]) -> PortfolioResult<PerformanceProjection> {
    let daily = returns.weighted(weights)?;
    debug!(points = daily.len(), "projected cumulative performance");
    Ok(PerformanceProjection {
        dates: returns.dates().to_vec(),
        daily,
    })
}
