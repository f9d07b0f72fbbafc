//! Wide time-series tables (JHU CSSE layout).
//!
//! The layout is a block of identifier columns (`UID`, `FIPS`,
//! `Province_State`, optionally `Population`, ...) followed by one column per
//! day, headed `m/d/yy`. Cells are kept as text here; numeric conversion
//! happens when the table is pivoted to long form.

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;

/// A wide table with its date columns located.
#[derive(Debug, Clone)]
pub struct WideTable {
    pub headers: Vec<String>,
    /// `(column index, date)` for every header that parses as a date.
    pub date_columns: Vec<(usize, NaiveDate)>,
    pub rows: Vec<csv::StringRecord>,
}

impl WideTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.date_columns.iter().map(|(_, d)| *d).min()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.date_columns.iter().map(|(_, d)| *d).max()
    }
}

/// Parses a date header such as `1/22/20`.
pub fn parse_date_header(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%m/%d/%y").ok()
}

/// Reads a wide table and locates its date columns.
///
/// # Errors
///
/// Fails on CSV errors, on ragged rows, or when no header parses as a date.
pub fn parse_wide_table(bytes: &[u8]) -> Result<WideTable> {
    let mut rdr = csv::Reader::from_reader(bytes);
    let headers: Vec<String> = rdr
        .headers()
        .context("reading time series header")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let date_columns: Vec<(usize, NaiveDate)> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| parse_date_header(h).map(|d| (i, d)))
        .collect();

    if date_columns.is_empty() {
        bail!("time series table has no date columns");
    }

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("time series row {}", idx + 1))?;
        rows.push(record);
    }

    Ok(WideTable {
        headers,
        date_columns,
        rows,
    })
}
