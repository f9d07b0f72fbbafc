//! NYPD shooting incident records.

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

/// A single shooting incident, reduced to the columns the report uses.
#[derive(Debug, Clone, PartialEq)]
pub struct Incident {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub borough: String,
    pub murder: bool,
}

#[derive(Debug, Deserialize)]
struct RawIncident {
    #[serde(rename = "OCCUR_DATE")]
    occur_date: String,
    #[serde(rename = "OCCUR_TIME")]
    occur_time: String,
    #[serde(rename = "BORO", default)]
    boro: String,
    #[serde(rename = "STATISTICAL_MURDER_FLAG", default)]
    murder_flag: String,
}

/// Parses the NYPD incident CSV. Columns other than date, time, borough and
/// murder flag are ignored.
///
/// # Errors
///
/// Returns an error naming the 1-based data row when a date, time or flag
/// cannot be parsed.
pub fn parse_incidents(bytes: &[u8]) -> Result<Vec<Incident>> {
    let mut rdr = csv::Reader::from_reader(bytes);
    let mut incidents = Vec::new();

    for (idx, result) in rdr.deserialize::<RawIncident>().enumerate() {
        let row = idx + 1;
        let raw = result.with_context(|| format!("incident row {row}"))?;

        let date = NaiveDate::parse_from_str(raw.occur_date.trim(), "%m/%d/%Y")
            .with_context(|| format!("incident row {row}: bad OCCUR_DATE {:?}", raw.occur_date))?;
        let time = parse_time(&raw.occur_time)
            .with_context(|| format!("incident row {row}: bad OCCUR_TIME {:?}", raw.occur_time))?;
        let murder = parse_flag(&raw.murder_flag)
            .with_context(|| format!("incident row {row}"))?;

        incidents.push(Incident {
            date,
            time,
            borough: raw.boro.trim().to_uppercase(),
            murder,
        });
    }

    Ok(incidents)
}

fn parse_time(raw: &str) -> Result<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(Into::into)
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "y" | "yes" | "1" => Ok(true),
        "false" | "n" | "no" | "0" | "" => Ok(false),
        other => bail!("bad STATISTICAL_MURDER_FLAG {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    const SAMPLE: &str = "\
INCIDENT_KEY,OCCUR_DATE,OCCUR_TIME,BORO,STATISTICAL_MURDER_FLAG,VIC_SEX
1,01/02/2023,23:15:00,BRONX,false,M
2,01/03/2023,04:05:00,Queens,true,F
3,01/04/2023,12:00,BROOKLYN,N,M
";

    #[test]
    fn test_parse_sample() {
        let incidents = parse_incidents(SAMPLE.as_bytes()).unwrap();
        assert_eq!(incidents.len(), 3);

        assert_eq!(incidents[0].date, NaiveDate::from_ymd_opt(2023, 1, 2).unwrap());
        assert_eq!(incidents[0].time.hour(), 23);
        assert!(!incidents[0].murder);

        assert_eq!(incidents[1].borough, "QUEENS");
        assert!(incidents[1].murder);

        assert_eq!(incidents[2].time.minute(), 0);
        assert!(!incidents[2].murder);
    }

    #[test]
    fn test_bad_date_is_error() {
        let csv = "OCCUR_DATE,OCCUR_TIME,BORO,STATISTICAL_MURDER_FLAG\n2023-01-02,10:00:00,BRONX,false\n";
        let err = parse_incidents(csv.as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("row 1"));
    }

    #[test]
    fn test_missing_time_column_is_error() {
        let csv = "OCCUR_DATE,BORO\n01/02/2023,BRONX\n";
        assert!(parse_incidents(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_bad_flag_is_error() {
        assert!(parse_flag("maybe").is_err());
        assert!(parse_flag("TRUE").unwrap());
    }
}
