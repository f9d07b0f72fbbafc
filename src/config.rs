//! Default data sources and output layout.

use std::path::{Path, PathBuf};

/// NYPD Shooting Incident Data (Historic), NYC Open Data.
pub const NYPD_INCIDENTS_URL: &str =
    "https://data.cityofnewyork.us/api/views/833y-fsy8/rows.csv?accessType=DOWNLOAD";

/// JHU CSSE cumulative confirmed cases by US county.
pub const JHU_CONFIRMED_US_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_confirmed_US.csv";

/// JHU CSSE cumulative deaths by US county, with a `Population` column.
pub const JHU_DEATHS_US_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_deaths_US.csv";

/// USDA ERS Rural-Urban Continuum Codes, 2023 edition (long layout).
pub const USDA_RUCC_URL: &str =
    "https://ers.usda.gov/sites/default/files/_laserfiche/DataFiles/53251/Ruralurbancontinuumcodes2023.csv";

pub const DEFAULT_OUTPUT_DIR: &str = "reports";
pub const DEFAULT_LOG_FILE: &str = "logs/eda_reports.log";

/// Environment variable holding an optional NYC Open Data app token.
pub const APP_TOKEN_ENV: &str = "NYC_OPEN_DATA_APP_TOKEN";

/// Where a single report writes its artifacts.
#[derive(Debug, Clone)]
pub struct ReportLayout {
    dir: PathBuf,
}

impl ReportLayout {
    pub fn new(base: impl AsRef<Path>, report: &str) -> Self {
        Self {
            dir: base.as_ref().join(report),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn create(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = ReportLayout::new("out", "covid");
        assert_eq!(layout.dir(), Path::new("out/covid"));
        assert_eq!(layout.file("report.md"), Path::new("out/covid/report.md"));
    }
}
