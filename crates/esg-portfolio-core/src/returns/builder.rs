use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::error::PortfolioError;
use crate::returns::series::{is_weekday, ReturnSeries};
use crate::types::{with_metadata, ComputationOutput, PriceTable};
use crate::PortfolioResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReturnsOutput {
    pub returns: ReturnSeries,
    /// Saturday/Sunday rows removed.
    pub weekend_rows_dropped: usize,
    /// Weekday rows removed because at least one asset had no return
    /// (includes the first date when it falls on a weekday).
    pub incomplete_rows_dropped: usize,
    /// Infinite returns (moves off a zero price) replaced by 0.
    pub infinite_values_zeroed: usize,
}

/// Daily simple returns from (currency-normalized) prices.
///
/// `r[t] = (p[t] - p[prev]) / p[prev]` where `prev` is the last date with
/// a price for that asset. Infinite results become 0, undefined ones
/// (0/0, no prior price, missing price) are missing. Weekend rows are
/// dropped, then any row missing a value for any asset.
pub fn build_returns(prices: &PriceTable) -> PortfolioResult<ComputationOutput<BuildReturnsOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    prices.check_shape("prices")?;

    let k = prices.columns.len();
    if k == 0 {
        return Err(PortfolioError::InsufficientData(
            "Price table has no asset columns".into(),
        ));
    }
    if prices.len() < 2 {
        return Err(PortfolioError::InsufficientData(
            "At least 2 price dates required to compute returns".into(),
        ));
    }

    let mut last_price: Vec<Option<f64>> = vec![None; k];
    let mut infinite_values_zeroed = 0usize;
    let mut raw: Vec<(NaiveDate, Vec<Option<f64>>)> = Vec::with_capacity(prices.len());

    for (date, row) in &prices.rows {
        let mut out = Vec::with_capacity(k);
        for (j, price) in row.iter().enumerate() {
            let r = match (*price, last_price[j]) {
                (Some(p), Some(prev)) => {
                    let r = (p - prev) / prev;
                    if r.is_infinite() {
                        infinite_values_zeroed += 1;
                        Some(0.0)
                    } else if r.is_nan() {
                        None
                    } else {
                        Some(r)
                    }
                }
                _ => None,
            };
            if price.is_some() {
                last_price[j] = *price;
            }
            out.push(r);
        }
        raw.push((*date, out));
    }

    let before = raw.len();
    raw.retain(|(d, _)| is_weekday(d));
    let weekend_rows_dropped = before - raw.len();

    // The first price date never has a return; any other gap is data loss.
    let first_date = prices.rows.keys().next().copied();
    let weekdays = raw.len();
    let mut lost_rows = 0usize;
    let complete: Vec<(NaiveDate, Vec<f64>)> = raw
        .into_iter()
        .filter_map(|(d, row)| match row.into_iter().collect::<Option<Vec<f64>>>() {
            Some(r) => Some((d, r)),
            None => {
                if Some(d) != first_date {
                    lost_rows += 1;
                }
                None
            }
        })
        .collect();
    let incomplete_rows_dropped = weekdays - complete.len();

    if complete.is_empty() {
        return Err(PortfolioError::InsufficientData(
            "No business day has a return for every asset".into(),
        ));
    }

    if infinite_values_zeroed > 0 {
        warnings.push(format!(
            "{} infinite return(s) from zero prices replaced by 0",
            infinite_values_zeroed
        ));
    }
    if lost_rows > 0 {
        warnings.push(format!(
            "{} business day(s) dropped for missing values",
            lost_rows
        ));
    }

    debug!(
        price_rows = prices.len(),
        return_rows = complete.len(),
        weekend_rows_dropped,
        incomplete_rows_dropped,
        "built return series"
    );

    let returns = ReturnSeries::new(prices.columns.clone(), complete)?;
    let output = BuildReturnsOutput {
        returns,
        weekend_rows_dropped,
        incomplete_rows_dropped,
        infinite_values_zeroed,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Daily simple returns, weekdays with complete data",
        &serde_json::json!({
            "n_assets": k,
            "price_dates": prices.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn table(rows: &[(u32, Vec<Option<f64>>)]) -> PriceTable {
        let mut t = PriceTable::new(vec!["A".into(), "B".into()]);
        for (day, vals) in rows {
            t.insert_row(d(*day), vals.clone()).unwrap();
        }
        t
    }

    #[test]
    fn test_simple_pct_change() {
        let t = table(&[
            (2, vec![Some(100.0), Some(50.0)]),
            (3, vec![Some(110.0), Some(50.0)]),
            (4, vec![Some(99.0), Some(55.0)]),
        ]);
        let out = build_returns(&t).unwrap().result;
        let r = &out.returns;
        assert_eq!(r.len(), 2);
        assert_eq!(r.dates()[0], d(3));
        assert!((r.rows()[0][0] - 0.10).abs() < 1e-12);
        assert_eq!(r.rows()[0][1], 0.0);
        assert!((r.rows()[1][0] + 0.10).abs() < 1e-12);
        assert!((r.rows()[1][1] - 0.10).abs() < 1e-12);
        assert_eq!(out.incomplete_rows_dropped, 1);
    }

    #[test]
    fn test_weekends_dropped() {
        // Jan 5 2024 is a Friday; 6-7 weekend; 8 Monday
        let t = table(&[
            (5, vec![Some(10.0), Some(10.0)]),
            (6, vec![Some(11.0), Some(10.0)]),
            (7, vec![Some(11.0), Some(10.0)]),
            (8, vec![Some(12.0), Some(10.0)]),
        ]);
        let out = build_returns(&t).unwrap().result;
        assert_eq!(out.returns.dates(), &[d(8)]);
        assert_eq!(out.weekend_rows_dropped, 2);
        // Monday's return is measured against Sunday's price.
        assert!((out.returns.rows()[0][0] - 1.0 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_infinite_zeroed_and_nan_dropped() {
        let t = table(&[
            (2, vec![Some(0.0), Some(0.0)]),
            (3, vec![Some(5.0), Some(1.0)]),
            (4, vec![Some(5.0), Some(1.0)]),
        ]);
        let result = build_returns(&t).unwrap();
        let out = &result.result;
        assert_eq!(out.infinite_values_zeroed, 2);
        assert_eq!(out.returns.rows()[0], vec![0.0, 0.0]);
        assert!(!result.warnings.is_empty());

        // 0 -> 0 is undefined and removes the row
        let t = table(&[
            (2, vec![Some(0.0), Some(1.0)]),
            (3, vec![Some(0.0), Some(2.0)]),
            (4, vec![Some(1.0), Some(2.0)]),
        ]);
        let out = build_returns(&t).unwrap().result;
        assert_eq!(out.returns.dates(), &[d(4)]);
    }

    #[test]
    fn test_missing_price_drops_row() {
        let t = table(&[
            (2, vec![Some(10.0), Some(10.0)]),
            (3, vec![Some(11.0), None]),
            (4, vec![Some(12.0), Some(12.0)]),
        ]);
        let result = build_returns(&t).unwrap();
        let out = &result.result;
        assert_eq!(out.returns.dates(), &[d(4)]);
        // B measured against its last available price (Jan 2)
        assert!((out.returns.rows()[0][1] - 0.2).abs() < 1e-12);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_single_row_rejected() {
        let t = table(&[(2, vec![Some(1.0), Some(1.0)])]);
        assert!(build_returns(&t).is_err());
    }

    #[test]
    fn test_all_incomplete_rejected() {
        let t = table(&[(2, vec![Some(1.0), None]), (3, vec![Some(1.0), None])]);
        assert!(matches!(
            build_returns(&t).unwrap_err(),
            PortfolioError::InsufficientData(_)
        ));
    }

    #[test]
    fn test_gap_after_weekend_start_is_reported() {
        // Sat 6, Mon 8, Tue 9 (B missing), Wed 10
        let t = table(&[
            (6, vec![Some(10.0), Some(10.0)]),
            (8, vec![Some(11.0), Some(11.0)]),
            (9, vec![Some(12.0), None]),
            (10, vec![Some(13.0), Some(12.0)]),
        ]);
        let result = build_returns(&t).unwrap();
        let out = &result.result;
        assert_eq!(out.weekend_rows_dropped, 1);
        assert_eq!(out.incomplete_rows_dropped, 1);
        assert_eq!(out.returns.dates(), &[d(8), d(10)]);
        assert_eq!(
            result.warnings,
            vec!["1 business day(s) dropped for missing values".to_string()]
        );
    }

    #[test]
    fn test_ragged_table_rejected() {
        let ragged = PriceTable {
            columns: vec!["A".into(), "B".into()],
            rows: [
                (d(2), vec![Some(1.0)]),
                (d(3), vec![Some(1.0), Some(2.0)]),
            ]
            .into_iter()
            .collect(),
        };
        match build_returns(&ragged).unwrap_err() {
            PortfolioError::InvalidInput { field, .. } => assert_eq!(field, "prices"),
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }
}
