use approx::assert_relative_eq;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use esg_portfolio_core::analytics::analyzer::{analyze, AnalysisConfig};
use esg_portfolio_core::analytics::performance::project;
use esg_portfolio_core::analytics::strategy::run_strategy;
use esg_portfolio_core::currency::normalizer::{normalize, ConversionMethod};
use esg_portfolio_core::optimization::optimizer::{optimize, OptimizeRequest, StrategyMode};
use esg_portfolio_core::returns::builder::build_returns;
use esg_portfolio_core::returns::series::ReturnSeries;
use esg_portfolio_core::universe::esg::EsgScores;
use esg_portfolio_core::universe::registry::AssetRegistry;
use esg_portfolio_core::{Currency, FxRateTable, PortfolioError, PriceTable};

// ===========================================================================
// Helpers
// ===========================================================================

fn weekdays_from(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let mut out = Vec::with_capacity(n);
    let mut d = start;
    while out.len() < n {
        if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            out.push(d);
        }
        d += Duration::days(1);
    }
    out
}

fn returns_table(tickers: &[&str], columns: &[Vec<f64>]) -> ReturnSeries {
    let dates = weekdays_from(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(), columns[0].len());
    let rows = dates
        .into_iter()
        .enumerate()
        .map(|(i, d)| (d, columns.iter().map(|c| c[i]).collect()))
        .collect();
    ReturnSeries::new(tickers.iter().map(|t| t.to_string()).collect(), rows).unwrap()
}

fn weight_of(tickers: &[String], weights: &[f64], ticker: &str) -> f64 {
    let idx = tickers.iter().position(|t| t == ticker).unwrap();
    weights[idx]
}

/// Deterministic pseudo-random daily returns.
fn synthetic_column(seed: u64, drift: f64, scale: f64, n: usize) -> Vec<f64> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let u = (state >> 11) as f64 / (1u64 << 53) as f64;
            drift + scale * (u - 0.5)
        })
        .collect()
}

fn six_assets() -> ReturnSeries {
    returns_table(
        &["ASML", "NVO", "SAP", "TSM", "SU", "ROG"],
        &[
            synthetic_column(1, 0.0012, 0.04, 60),
            synthetic_column(2, 0.0008, 0.03, 60),
            synthetic_column(3, 0.0005, 0.02, 60),
            synthetic_column(4, 0.0010, 0.05, 60),
            synthetic_column(5, 0.0003, 0.01, 60),
            synthetic_column(6, 0.0001, 0.015, 60),
        ],
    )
}

// ===========================================================================
// End-to-end scenarios
// ===========================================================================

#[test]
fn test_min_volatility_prefers_zero_variance_asset() {
    // A is pure noise around zero; B never moves.
    let r = returns_table(
        &["A", "B"],
        &[vec![0.01, -0.01, 0.02, -0.02, 0.0], vec![0.0; 5]],
    );
    let out = optimize(&r, &OptimizeRequest::new(StrategyMode::MinVolatility))
        .unwrap()
        .result;
    assert!(out.weights[1] > 0.99, "weights {:?}", out.weights);
    assert!((out.weights.iter().sum::<f64>() - 1.0).abs() < 1e-6);
}

#[test]
fn test_min_volatility_return_tilt_can_dominate() {
    // Annualized: sd(A) ~ 0.181 while 0.2 * mean(A) ~ 0.302, so the
    // soft blend is minimized by holding A.
    let r = returns_table(
        &["A", "B"],
        &[vec![0.01, -0.01, 0.02, 0.0, 0.01], vec![0.0; 5]],
    );
    let out = optimize(&r, &OptimizeRequest::new(StrategyMode::MinVolatility))
        .unwrap()
        .result;
    assert!(out.weights[0] > 0.99, "weights {:?}", out.weights);
}

#[test]
fn test_missing_fx_pair_leaves_asset_unconverted() {
    let registry = AssetRegistry::new()
        .with("AIR", Currency::EUR)
        .with("KMI", Currency::USD)
        .with("ADM", Currency::GBP);

    let dates = weekdays_from(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 6);
    let mut prices = PriceTable::new(vec!["AIR".into(), "KMI".into(), "ADM".into()]);
    let mut fx = FxRateTable::new(vec!["GBPEUR".into(), "EURJPY".into()]);
    for (i, d) in dates.iter().enumerate() {
        let step = i as f64;
        prices
            .insert_row(*d, vec![Some(150.0 + step), Some(20.0 + 0.1 * step), Some(30.0 - 0.2 * step)])
            .unwrap();
        fx.insert_row(*d, vec![Some(1.17), Some(160.0)]).unwrap();
    }

    let normalized = normalize(&prices, &fx, &registry, &Currency::EUR).unwrap();
    assert_eq!(normalized.result.missing_rates.len(), 1);
    assert_eq!(normalized.result.missing_rates[0].ticker, "KMI");
    assert_eq!(normalized.result.missing_rates[0].from, Currency::USD);
    assert_eq!(
        normalized.result.conversions[1].method,
        ConversionMethod::Unconverted
    );
    assert!(!normalized.warnings.is_empty());
    assert_eq!(normalized.result.prices.value(&dates[0], "KMI"), Some(20.0));

    let built = build_returns(&normalized.result.prices).unwrap().result;
    assert_eq!(built.returns.n_assets(), 3);
    assert_eq!(built.returns.len(), 5);
    let adm = built.returns.column(2);
    assert_relative_eq!(adm[0], (29.8 * 1.17 - 30.0 * 1.17) / (30.0 * 1.17), epsilon = 1e-12);
}

#[test]
fn test_single_asset_tracks_own_growth() {
    let r = returns_table(&["SOLO"], &[vec![0.02, -0.01, 0.005, 0.03, -0.015, 0.0]]);
    let projection = project(&r, &[1.0]).unwrap();

    let mut own = 1.0;
    for (point, ret) in projection.iter().zip(r.column(0)) {
        own *= 1.0 + ret;
        assert_eq!(point.value, own);
    }
    assert_eq!(projection.len(), 6);
}

// ===========================================================================
// Full pipeline
// ===========================================================================

#[test]
fn test_prices_to_strategy_report() {
    let registry = AssetRegistry::new()
        .with("NESN", Currency::CHF)
        .with("AIR", Currency::EUR)
        .with("MSFT", Currency::USD);

    // Calendar days including a weekend; the weekend rows must vanish.
    let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let mut prices = PriceTable::new(vec!["NESN".into(), "AIR".into(), "MSFT".into()]);
    let mut fx = FxRateTable::new(vec!["CHFEUR".into(), "EURUSD".into()]);
    for i in 0..21 {
        let d = start + Duration::days(i);
        let t = i as f64;
        prices
            .insert_row(
                d,
                vec![
                    Some(95.0 + (t * 0.7).sin()),
                    Some(160.0 + 0.5 * t + (t * 1.3).cos()),
                    Some(410.0 + 2.0 * (t * 0.4).sin() + 0.3 * t),
                ],
            )
            .unwrap();
        fx.insert_row(d, vec![Some(1.02 + 0.001 * t), Some(1.08)]).unwrap();
    }

    let normalized = normalize(&prices, &fx, &registry, &Currency::EUR).unwrap();
    assert!(normalized.result.missing_rates.is_empty());
    assert!(matches!(
        normalized.result.conversions[2].method,
        ConversionMethod::Inverse { .. }
    ));

    let built = build_returns(&normalized.result.prices).unwrap().result;
    assert_eq!(built.weekend_rows_dropped, 6);
    assert!(built
        .returns
        .dates()
        .iter()
        .all(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)));

    let request = OptimizeRequest::new(StrategyMode::MaxReturn).with_max_weight(0.5);
    let report = run_strategy(&built.returns, &request, &AnalysisConfig::default())
        .unwrap()
        .result;
    assert_eq!(report.performance.len(), built.returns.len());
    for w in &report.weights {
        assert!(*w >= 0.0 && *w <= 0.5 + 1e-9, "weights {:?}", report.weights);
    }
    assert!((report.weights.iter().sum::<f64>() - 1.0).abs() < 1e-6);
}

// ===========================================================================
// Properties
// ===========================================================================

#[test]
fn test_cap_of_a_quarter_respected_by_every_mode() {
    let r = six_assets();
    let scores: EsgScores = [("ASML", 8), ("NVO", 5), ("SAP", 7), ("TSM", 3), ("SU", 9), ("ROG", 6)]
        .into_iter()
        .map(|(t, s)| (t.to_string(), s))
        .collect();

    for mode in [
        StrategyMode::MaxReturn,
        StrategyMode::MinVolatility,
        StrategyMode::Esg,
    ] {
        let request = OptimizeRequest::new(mode)
            .with_max_weight(0.25)
            .with_esg_scores(scores.clone());
        let out = optimize(&r, &request).unwrap().result;
        for w in &out.weights {
            assert!(
                *w >= 0.0 && *w <= 0.25 + 1e-9,
                "{} weights {:?}",
                mode,
                out.weights
            );
        }
        assert!(
            (out.weights.iter().sum::<f64>() - 1.0).abs() < 1e-6,
            "{} weights {:?}",
            mode,
            out.weights
        );
    }
}

#[test]
fn test_esg_mode_rewards_best_scores() {
    let r = six_assets();
    let scores: EsgScores = [("ASML", 1), ("NVO", 1), ("SAP", 1), ("TSM", 1), ("SU", 10), ("ROG", 1)]
        .into_iter()
        .map(|(t, s)| (t.to_string(), s))
        .collect();
    let request = OptimizeRequest::new(StrategyMode::Esg)
        .with_max_weight(0.4)
        .with_esg_scores(scores);
    let out = optimize(&r, &request).unwrap().result;
    assert!(
        (weight_of(&out.tickers, &out.weights, "SU") - 0.4).abs() < 1e-6,
        "weights {:?}",
        out.weights
    );
}

#[test]
fn test_equal_weight_custom_basket() {
    let r = six_assets();
    let basket = r.select(&["SU".to_string(), "ASML".to_string(), "TSM".to_string()]).unwrap();
    let out = optimize(&basket, &OptimizeRequest::new(StrategyMode::EqualWeight))
        .unwrap()
        .result;
    assert_eq!(out.tickers, vec!["SU", "ASML", "TSM"]);
    assert_eq!(out.weights, vec![1.0 / 3.0; 3]);
}

#[test]
fn test_allocation_report_materiality() {
    let r = six_assets();
    let weights = [0.5, 0.0, 0.2999, 0.0001, 0.2, 0.0];
    let out = analyze(&r, &weights, &AnalysisConfig::default()).unwrap().result;
    let names: Vec<&str> = out.allocation.iter().map(|e| e.ticker.as_str()).collect();
    assert_eq!(names, vec!["ASML", "SAP", "SU"]);

    let reported: f64 = out
        .allocation
        .iter()
        .map(|e| e.percentage.trim_end_matches('%').parse::<f64>().unwrap())
        .sum();
    let material: f64 = out.allocation.iter().map(|e| e.weight * 100.0).sum();
    assert!((reported - material).abs() <= 0.005 * out.allocation.len() as f64);
}

#[test]
fn test_constant_portfolio_has_zero_sharpe() {
    let r = returns_table(&["CASH"], &[vec![0.0002; 10]]);
    let out = analyze(&r, &[1.0], &AnalysisConfig::default()).unwrap().result;
    assert_eq!(out.metrics.annual_volatility, 0.0);
    assert_eq!(out.metrics.sharpe_ratio, 0.0);
}

// ===========================================================================
// Configuration errors
// ===========================================================================

#[test]
fn test_unknown_currency_is_fatal() {
    let mut prices = PriceTable::new(vec!["ZZZ".into()]);
    prices
        .insert_row(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), vec![Some(1.0)])
        .unwrap();
    let err = normalize(
        &prices,
        &FxRateTable::default(),
        &AssetRegistry::sustainable_universe(),
        &Currency::EUR,
    )
    .unwrap_err();
    assert!(matches!(err, PortfolioError::UnknownCurrency { ref ticker } if ticker == "ZZZ"));
}

#[test]
fn test_esg_mode_without_full_coverage_is_fatal() {
    let r = six_assets();
    let scores: EsgScores = [("ASML", 8)]
        .into_iter()
        .map(|(t, s)| (t.to_string(), s))
        .collect();
    let err = optimize(&r, &OptimizeRequest::new(StrategyMode::Esg).with_esg_scores(scores))
        .unwrap_err();
    assert!(matches!(err, PortfolioError::MissingEsgScore { .. }));
}

#[test]
fn test_infeasible_cap_is_fatal() {
    let r = six_assets();
    let err = optimize(&r, &OptimizeRequest::new(StrategyMode::MaxReturn).with_max_weight(0.1))
        .unwrap_err();
    assert!(matches!(err, PortfolioError::InfeasibleConstraints(_)));
}
