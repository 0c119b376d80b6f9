use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::PortfolioError;
use crate::PortfolioResult;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = f64;

/// Ticker symbol, unique within a universe.
pub type Ticker = String;

/// ISO-4217 currency code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Currency {
    #[default]
    USD,
    EUR,
    GBP,
    CHF,
    JPY,
    HKD,
    SGD,
    SEK,
    TWD,
    CNY,
    PLN,
    INR,
    CAD,
    AUD,
    Other(String),
}

impl Currency {
    pub fn code(&self) -> &str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::CHF => "CHF",
            Currency::JPY => "JPY",
            Currency::HKD => "HKD",
            Currency::SGD => "SGD",
            Currency::SEK => "SEK",
            Currency::TWD => "TWD",
            Currency::CNY => "CNY",
            Currency::PLN => "PLN",
            Currency::INR => "INR",
            Currency::CAD => "CAD",
            Currency::AUD => "AUD",
            Currency::Other(code) => code,
        }
    }

    /// Six-letter pair code quoting `self` in units of `quote`, e.g. `USDEUR`.
    pub fn pair_code(&self, quote: &Currency) -> String {
        format!("{}{}", self.code(), quote.code())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = PortfolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PortfolioError::InvalidInput {
                field: "currency".into(),
                reason: format!("'{}' is not a three-letter ISO code", s),
            });
        }
        Ok(match code.as_str() {
            "USD" => Currency::USD,
            "EUR" => Currency::EUR,
            "GBP" => Currency::GBP,
            "CHF" => Currency::CHF,
            "JPY" => Currency::JPY,
            "HKD" => Currency::HKD,
            "SGD" => Currency::SGD,
            "SEK" => Currency::SEK,
            "TWD" => Currency::TWD,
            "CNY" => Currency::CNY,
            "PLN" => Currency::PLN,
            "INR" => Currency::INR,
            "CAD" => Currency::CAD,
            "AUD" => Currency::AUD,
            _ => Currency::Other(code),
        })
    }
}

impl TryFrom<String> for Currency {
    type Error = PortfolioError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self {
        c.code().to_string()
    }
}

/// Dense date x column table of optional floats.
///
/// Used for both price tables (columns are tickers) and FX rate tables
/// (columns are six-letter pair codes). Dates are unique and iterate in
/// ascending order; each row is aligned 1:1 with `columns`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDateTable")]
pub struct DateTable {
    pub columns: Vec<String>,
    pub rows: BTreeMap<NaiveDate, Vec<Option<f64>>>,
}

#[derive(Deserialize)]
struct RawDateTable {
    columns: Vec<String>,
    #[serde(default)]
    rows: BTreeMap<NaiveDate, Vec<Option<f64>>>,
}

impl TryFrom<RawDateTable> for DateTable {
    type Error = PortfolioError;

    fn try_from(raw: RawDateTable) -> Result<Self, Self::Error> {
        let table = DateTable {
            columns: raw.columns,
            rows: raw.rows,
        };
        table.check_shape("table")?;
        Ok(table)
    }
}

/// Dates x tickers, prices in each asset's native currency.
pub type PriceTable = DateTable;

/// Dates x currency-pair codes.
pub type FxRateTable = DateTable;

impl DateTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: BTreeMap::new(),
        }
    }

    /// Insert (or replace) the row for `date`.
    pub fn insert_row(&mut self, date: NaiveDate, values: Vec<Option<f64>>) -> PortfolioResult<()> {
        if values.len() != self.columns.len() {
            return Err(PortfolioError::InvalidInput {
                field: format!("row {}", date),
                reason: format!(
                    "Expected {} values but got {}",
                    self.columns.len(),
                    values.len()
                ),
            });
        }
        self.rows.insert(date, values);
        Ok(())
    }

    /// Every row must have one value per column.
    pub fn check_shape(&self, field: &str) -> PortfolioResult<()> {
        let k = self.columns.len();
        match self.rows.iter().find(|(_, row)| row.len() != k) {
            Some((date, row)) => Err(PortfolioError::InvalidInput {
                field: field.to_string(),
                reason: format!("Row {} has {} values for {} columns", date, row.len(), k),
            }),
            None => Ok(()),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.rows.keys()
    }

    pub fn value(&self, date: &NaiveDate, column: &str) -> Option<f64> {
        let idx = self.column_index(column)?;
        self.rows.get(date).and_then(|row| row[idx])
    }

    /// One column as (date, value) pairs in date order.
    pub fn column(&self, name: &str) -> Option<Vec<(NaiveDate, Option<f64>)>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|(d, row)| (*d, row[idx])).collect())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "ieee754_f64".to_string(),
        },
    }
}
