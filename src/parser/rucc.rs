//! USDA Rural-Urban Continuum Codes.
//!
//! Two layouts are in circulation. The 2023 release is long
//! (`FIPS,State,County_Name,Attribute,Value`), earlier releases are wide with
//! a `RUCC_<year>` column. County names contain Latin-1 characters in some
//! releases, so cells are decoded lossily.

use anyhow::{Context, Result, bail};
use serde::Serialize;

use super::{parse_fips, parse_number};

/// One county's continuum code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountyRucc {
    pub fips: u32,
    pub state_abbr: String,
    pub rucc: u8,
    pub population: Option<f64>,
}

/// One `(county, attribute, value)` cell of the long layout.
#[derive(Debug, Clone, PartialEq)]
pub struct RuccAttribute {
    pub fips: u32,
    pub state_abbr: String,
    pub attribute: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub enum RuccTable {
    Long(Vec<RuccAttribute>),
    Wide(Vec<CountyRucc>),
}

/// Parses either RUCC layout, deciding by the header row.
pub fn parse_rucc(bytes: &[u8]) -> Result<RuccTable> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    let headers: Vec<String> = rdr
        .byte_headers()
        .context("reading RUCC header")?
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim().to_string())
        .collect();

    let col = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let fips_col = col("FIPS").context("RUCC table has no FIPS column")?;
    let state_col = col("State").context("RUCC table has no State column")?;

    let mut records = Vec::new();
    for (idx, result) in rdr.byte_records().enumerate() {
        let record = result.with_context(|| format!("RUCC row {}", idx + 1))?;
        let cells: Vec<String> = record
            .iter()
            .map(|c| String::from_utf8_lossy(c).trim().to_string())
            .collect();
        records.push((idx + 1, cells));
    }

    let cell = |cells: &[String], i: usize| cells.get(i).cloned().unwrap_or_default();

    if let (Some(attr_col), Some(value_col)) = (col("Attribute"), col("Value")) {
        let mut out = Vec::with_capacity(records.len());
        for (row, cells) in records {
            let fips = parse_fips(&cell(&cells, fips_col))
                .with_context(|| format!("RUCC row {row}: bad FIPS"))?;
            out.push(RuccAttribute {
                fips,
                state_abbr: cell(&cells, state_col),
                attribute: cell(&cells, attr_col),
                value: cell(&cells, value_col),
            });
        }
        return Ok(RuccTable::Long(out));
    }

    let rucc_col = headers
        .iter()
        .position(|h| h.to_ascii_uppercase().starts_with("RUCC_"));
    let Some(rucc_col) = rucc_col else {
        bail!("RUCC table has neither Attribute/Value nor a RUCC_<year> column");
    };
    let pop_col = headers
        .iter()
        .position(|h| h.to_ascii_lowercase().starts_with("population"));

    let mut out = Vec::with_capacity(records.len());
    for (row, cells) in records {
        let fips = parse_fips(&cell(&cells, fips_col))
            .with_context(|| format!("RUCC row {row}: bad FIPS"))?;
        let rucc = parse_code(&cell(&cells, rucc_col))
            .with_context(|| format!("RUCC row {row}"))?;
        out.push(CountyRucc {
            fips,
            state_abbr: cell(&cells, state_col),
            rucc,
            population: pop_col.and_then(|c| parse_number(&cell(&cells, c))),
        });
    }
    Ok(RuccTable::Wide(out))
}

/// Parses a continuum code; valid codes are 1 through 9.
pub(crate) fn parse_code(raw: &str) -> Result<u8> {
    let code = parse_number(raw).with_context(|| format!("bad RUCC value {raw:?}"))?;
    if code.fract() != 0.0 || !(1.0..=9.0).contains(&code) {
        bail!("RUCC value {raw:?} outside 1..=9");
    }
    Ok(code as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_long_layout() {
        let csv = "\
FIPS,State,County_Name,Attribute,Value
01001,AL,Autauga County,Population_2020,\"58,805\"
01001,AL,Autauga County,RUCC_2023,2
01001,AL,Autauga County,Description,Metro - Counties in metro areas of 250000 to 1 million population
";
        let RuccTable::Long(rows) = parse_rucc(csv.as_bytes()).unwrap() else {
            panic!("expected long layout");
        };
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].fips, 1001);
        assert_eq!(rows[0].attribute, "Population_2020");
        assert_eq!(rows[0].value, "58,805");
    }

    #[test]
    fn test_parse_wide_layout() {
        let csv: &[u8] = b"\
FIPS,State,County_Name,Population_2010,RUCC_2013,Description
01001,AL,Autauga County,54571,2,Metro
35013,NM,Do\xf1a Ana County,209233,3,Metro
";
        let RuccTable::Wide(rows) = parse_rucc(csv).unwrap() else {
            panic!("expected wide layout");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].fips, 35013);
        assert_eq!(rows[1].rucc, 3);
        assert_eq!(rows[1].population, Some(209233.0));
    }

    #[test]
    fn test_wide_layout_rejects_out_of_range_code() {
        let csv = "FIPS,State,RUCC_2013\n01001,AL,12\n";
        assert!(parse_rucc(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_unknown_layout_is_error() {
        let csv = "FIPS,State,Something\n01001,AL,1\n";
        assert!(parse_rucc(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_code_bounds() {
        assert_eq!(parse_code("1").unwrap(), 1);
        assert_eq!(parse_code("9").unwrap(), 9);
        assert!(parse_code("0").is_err());
        assert!(parse_code("2.5").is_err());
    }
}
