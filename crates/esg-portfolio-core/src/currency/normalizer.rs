use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::types::{with_metadata, ComputationOutput, Currency, FxRateTable, PriceTable, Ticker};
use crate::universe::registry::AssetRegistry;
use crate::PortfolioResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How a single price column was brought into the target currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ConversionMethod {
    /// Already quoted in the target currency; values copied untouched.
    Passthrough,
    /// `{native}{target}` column found: price * rate.
    Direct { pair: String },
    /// `{target}{native}` column found: price / rate.
    Inverse { pair: String },
    /// No usable pair; native prices kept.
    Unconverted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConversion {
    pub ticker: Ticker,
    pub native: Currency,
    pub method: ConversionMethod,
}

/// A conversion that could not be performed. Reported, never thrown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingRate {
    pub ticker: Ticker,
    pub from: Currency,
    pub to: Currency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeOutput {
    /// Same shape as the input table, values in the target currency
    /// (except for columns listed in `missing_rates`).
    pub prices: PriceTable,
    pub target_currency: Currency,
    pub conversions: Vec<ColumnConversion>,
    pub missing_rates: Vec<MissingRate>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Convert every price column into `target` using pairwise FX rates.
///
/// FX rows are restricted to the dates present in `prices`. For each
/// foreign column the direct pair `{native}{target}` is preferred over the
/// inverse pair `{target}{native}`; candidate columns are scanned in
/// lexicographic order. A price on a date without a usable rate becomes
/// missing. Tickers absent from `registry` fail with `UnknownCurrency`
/// before any conversion happens.
pub fn normalize(
    prices: &PriceTable,
    fx_rates: &FxRateTable,
    registry: &AssetRegistry,
    target: &Currency,
) -> PortfolioResult<ComputationOutput<NormalizeOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    prices.check_shape("prices")?;
    fx_rates.check_shape("fx_rates")?;

    let natives: Vec<Currency> = prices
        .columns
        .iter()
        .map(|t| registry.currency_of(t).cloned())
        .collect::<PortfolioResult<_>>()?;

    let mut pair_order: Vec<(usize, &str)> = fx_rates
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| (i, c.as_str()))
        .collect();
    pair_order.sort_by(|a, b| a.1.cmp(b.1).then(a.0.cmp(&b.0)));

    let shared_dates = prices
        .dates()
        .filter(|d| fx_rates.rows.contains_key(d))
        .count();
    debug!(
        price_dates = prices.len(),
        fx_dates = fx_rates.len(),
        shared_dates,
        "restricting FX table to price dates"
    );

    let mut converted = prices.clone();
    let mut conversions = Vec::with_capacity(prices.columns.len());
    let mut missing_rates = Vec::new();

    for (col, ticker) in prices.columns.iter().enumerate() {
        let native = &natives[col];

        let method = if native == target {
            ConversionMethod::Passthrough
        } else {
            let direct = native.pair_code(target);
            let inverse = target.pair_code(native);
            let find = |code: &str| {
                pair_order
                    .iter()
                    .find(|(_, name)| *name == code)
                    .map(|(idx, _)| *idx)
            };

            if let Some(fx_col) = find(&direct) {
                let gaps = apply_rate(&mut converted, fx_rates, col, fx_col, |p, r| p * r);
                report_gaps(&mut warnings, ticker, &direct, gaps);
                ConversionMethod::Direct { pair: direct }
            } else if let Some(fx_col) = find(&inverse) {
                let gaps = apply_rate(&mut converted, fx_rates, col, fx_col, |p, r| p / r);
                report_gaps(&mut warnings, ticker, &inverse, gaps);
                ConversionMethod::Inverse { pair: inverse }
            } else {
                warn!(%ticker, from = %native, to = %target, "exchange rate not found");
                warnings.push(format!(
                    "Exchange rate not found for {} -> {} ({} left unconverted)",
                    native, target, ticker
                ));
                missing_rates.push(MissingRate {
                    ticker: ticker.clone(),
                    from: native.clone(),
                    to: target.clone(),
                });
                ConversionMethod::Unconverted
            }
        };

        conversions.push(ColumnConversion {
            ticker: ticker.clone(),
            native: native.clone(),
            method,
        });
    }

    let output = NormalizeOutput {
        prices: converted,
        target_currency: target.clone(),
        conversions,
        missing_rates,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Currency normalization (direct pair preferred over inverse)",
        &serde_json::json!({
            "target_currency": target.code(),
            "n_assets": prices.columns.len(),
            "n_dates": prices.len(),
            "fx_dates_used": shared_dates,
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Rescale one price column in place. Returns the number of dates that had
/// a price but no usable rate (those prices become missing).
fn apply_rate(
    table: &mut PriceTable,
    fx_rates: &FxRateTable,
    col: usize,
    fx_col: usize,
    op: impl Fn(f64, f64) -> f64,
) -> usize {
    let mut gaps = 0;
    for (date, row) in table.rows.iter_mut() {
        let Some(price) = row[col] else { continue };
        let rate = fx_rates
            .rows
            .get(date)
            .and_then(|fx_row| fx_row[fx_col])
            .filter(|r| r.is_finite() && *r > 0.0);
        row[col] = match rate {
            Some(r) => Some(op(price, r)),
            None => {
                gaps += 1;
                None
            }
        };
    }
    gaps
}

fn report_gaps(warnings: &mut Vec<String>, ticker: &str, pair: &str, gaps: usize) {
    if gaps > 0 {
        warn!(%ticker, %pair, gaps, "dates without FX rate");
        warnings.push(format!(
            "{} date(s) for {} have no {} rate; those prices are treated as missing",
            gaps, ticker, pair
        ));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
