//! CSV parsers for the raw datasets.
//!
//! Each parser takes the raw bytes produced by [`crate::fetch::load_source`]
//! and returns typed rows. Malformed rows are errors; nothing is skipped
//! silently.

pub mod incidents;
pub mod rucc;
pub mod timeseries;

pub use incidents::{Incident, parse_incidents};
pub use rucc::{CountyRucc, RuccAttribute, RuccTable, parse_rucc};
pub use timeseries::{WideTable, parse_wide_table};

/// Parses a county FIPS code written as `01001`, `1001` or `1001.0`.
pub(crate) fn parse_fips(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(v) = raw.parse::<u32>() {
        return Some(v);
    }
    let v = raw.parse::<f64>().ok()?;
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
        Some(v as u32)
    } else {
        None
    }
}

/// Parses a numeric cell, tolerating thousands separators.
pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fips_variants() {
        assert_eq!(parse_fips("01001"), Some(1001));
        assert_eq!(parse_fips("1001.0"), Some(1001));
        assert_eq!(parse_fips(" 36061 "), Some(36061));
        assert_eq!(parse_fips(""), None);
        assert_eq!(parse_fips("1001.5"), None);
        assert_eq!(parse_fips("abc"), None);
    }

    #[test]
    fn test_parse_number_with_commas() {
        assert_eq!(parse_number("55,869"), Some(55869.0));
        assert_eq!(parse_number("3.5"), Some(3.5));
        assert_eq!(parse_number("  "), None);
        assert_eq!(parse_number("n/a"), None);
    }
}
