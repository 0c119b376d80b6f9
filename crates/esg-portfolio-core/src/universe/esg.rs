use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::PortfolioError;
use crate::types::Ticker;
use crate::PortfolioResult;

/// Ticker -> integer ESG score (small positive scale, higher is better).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EsgScores(BTreeMap<Ticker, u32>);

impl EsgScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ticker: impl Into<Ticker>, score: u32) {
        self.0.insert(ticker.into(), score);
    }

    pub fn get(&self, ticker: &str) -> Option<u32> {
        self.0.get(ticker).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Score vector aligned to `tickers`. Every ticker must be scored.
    pub fn aligned_to(&self, tickers: &[Ticker]) -> PortfolioResult<Vec<f64>> {
        tickers
            .iter()
            .map(|t| {
                self.get(t)
                    .map(f64::from)
                    .ok_or_else(|| PortfolioError::MissingEsgScore { ticker: t.clone() })
            })
            .collect()
    }
}

impl FromIterator<(Ticker, u32)> for EsgScores {
    fn from_iter<I: IntoIterator<Item = (Ticker, u32)>>(iter: I) -> Self {
        EsgScores(iter.into_iter().collect())
    }
}
