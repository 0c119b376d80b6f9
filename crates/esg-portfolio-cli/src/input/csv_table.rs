use chrono::NaiveDate;
use std::fs::File;
use std::io::{Read, Write};
use tracing::{debug, warn};

use esg_portfolio_core::returns::series::ReturnSeries;
use esg_portfolio_core::DateTable;

use crate::input::file::resolve_path;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// `YYYY-MM-DD`, ignoring any time-of-day suffix (`T...` or ` ...`).
pub fn parse_date(cell: &str) -> CliResult<NaiveDate> {
    let day = cell
        .trim()
        .split(|c: char| c == 'T' || c == ' ')
        .next()
        .unwrap_or_default();
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| format!("Invalid date '{}': {}", cell, e).into())
}

/// Empty cells and `NaN` are missing values.
fn parse_cell(cell: &str) -> CliResult<Option<f64>> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    let v: f64 = cell
        .parse()
        .map_err(|e| format!("Invalid number '{}': {}", cell, e))?;
    Ok(Some(v))
}

/// Date-indexed table: first column is the date, the rest are values.
pub fn read_date_table<R: Read>(reader: R) -> CliResult<DateTable> {
    let mut rdr = csv::ReaderBuilder::new().flexible(false).from_reader(reader);
    let headers = rdr.headers()?.clone();
    if headers.len() < 2 {
        return Err("CSV needs a date column and at least one value column".into());
    }
    let columns: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();
    let mut table = DateTable::new(columns);

    for record in rdr.records() {
        let record = record?;
        let date = parse_date(record.get(0).unwrap_or_default())?;
        let values = record
            .iter()
            .skip(1)
            .map(parse_cell)
            .collect::<CliResult<Vec<_>>>()?;
        if table.rows.contains_key(&date) {
            warn!(%date, "duplicate date in CSV, keeping the last row");
        }
        table.insert_row(date, values)?;
    }
    debug!(rows = table.len(), columns = table.columns.len(), "read date table");
    Ok(table)
}

pub fn read_date_table_file(path: &str) -> CliResult<DateTable> {
    let canonical = resolve_path(path)?;
    let file = File::open(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    read_date_table(file).map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e).into())
}

/// Load a persisted returns table: gaps are forward-filled, rows with no
/// values at all are dropped. Leading rows a column cannot be filled for
/// are dropped as well.
pub fn load_returns<R: Read>(reader: R) -> CliResult<ReturnSeries> {
    let table = read_date_table(reader)?;
    let k = table.columns.len();

    let mut last: Vec<Option<f64>> = vec![None; k];
    let mut rows = Vec::with_capacity(table.len());
    let mut empty_rows = 0usize;
    let mut unfillable_rows = 0usize;

    for (date, row) in &table.rows {
        if row.iter().all(Option::is_none) {
            empty_rows += 1;
            continue;
        }
        for (slot, value) in last.iter_mut().zip(row) {
            if value.is_some() {
                *slot = *value;
            }
        }
        match last.iter().copied().collect::<Option<Vec<f64>>>() {
            Some(values) => rows.push((*date, values)),
            None => unfillable_rows += 1,
        }
    }

    if unfillable_rows > 0 {
        warn!(rows = unfillable_rows, "dropped leading rows with no value to forward-fill");
    }
    debug!(kept = rows.len(), empty_rows, unfillable_rows, "loaded returns table");

    Ok(ReturnSeries::new(table.columns, rows)?)
}

pub fn load_returns_file(path: &str) -> CliResult<ReturnSeries> {
    let canonical = resolve_path(path)?;
    let file = File::open(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    load_returns(file).map_err(|e| format!("Failed to load '{}': {}", canonical.display(), e).into())
}

/// `Date` column followed by one column per ticker.
pub fn write_returns<W: Write>(writer: W, returns: &ReturnSeries) -> CliResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = Vec::with_capacity(returns.n_assets() + 1);
    header.push("Date".to_string());
    header.extend(returns.tickers().iter().cloned());
    wtr.write_record(&header)?;

    for (date, row) in returns.dates().iter().zip(returns.rows()) {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(date.format("%Y-%m-%d").to_string());
        record.extend(row.iter().map(|v| v.to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_returns_file(path: &str, returns: &ReturnSeries) -> CliResult<()> {
    let file = File::create(path).map_err(|e| format!("Failed to create '{}': {}", path, e))?;
    write_returns(file, returns)
}
