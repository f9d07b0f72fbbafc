//! NYPD shootings by hour of week, modelled with daily and weekly Fourier
//! terms.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ReportLayout;
use crate::features::{DAILY, FourierSpec, WEEKLY, fourier_columns};
use crate::fetch::{HttpClient, load_source};
use crate::output::{write_json, write_table};
use crate::parser::{Incident, parse_incidents};
use crate::render::MarkdownReport;
use crate::render::markdown::format_num;
use crate::render::plots::{Curve, heatmap, scatter_with_fits};
use crate::reshape::{HourOfWeekBucket, bucket_hour_of_week};

use super::ModelSummary;

pub const REPORT_NAME: &str = "shootings";
const DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// The fitted models: daily cycle alone, then daily plus weekly.
pub const MODELS: [(&str, &[FourierSpec]); 2] = [
    ("Daily cycle", &[DAILY]),
    ("Daily and weekly cycles", &[DAILY, WEEKLY]),
];

#[derive(Debug, Clone)]
pub struct ShootingsOptions {
    pub incidents: String,
    pub borough: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShootingsAnalysis {
    pub incidents_read: usize,
    pub incidents_used: u64,
    pub borough: Option<String>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub buckets: Vec<HourOfWeekBucket>,
    pub models: Vec<ModelSummary>,
}

impl ShootingsAnalysis {
    /// Busiest buckets first.
    pub fn peak_buckets(&self, n: usize) -> Vec<&HourOfWeekBucket> {
        let mut sorted: Vec<&HourOfWeekBucket> = self.buckets.iter().collect();
        sorted.sort_by(|a, b| b.count.cmp(&a.count).then(a.hour_of_week.cmp(&b.hour_of_week)));
        sorted.truncate(n);
        sorted
    }
}

/// Buckets incidents by hour of week and fits both Fourier models to the
/// counts.
#[tracing::instrument(skip(incidents), fields(incidents = incidents.len()))]
pub fn analyze(incidents: &[Incident], borough: Option<&str>) -> Result<ShootingsAnalysis> {
    let buckets = bucket_hour_of_week(incidents, borough);
    let used: u64 = buckets.iter().map(|b| b.count).sum();
    if used == 0 {
        warn!(borough, "No incidents matched the borough filter");
    }

    let selected = incidents
        .iter()
        .filter(|i| borough.is_none_or(|b| i.borough.eq_ignore_ascii_case(b.trim())));
    let first_date = selected.clone().map(|i| i.date).min();
    let last_date = selected.map(|i| i.date).max();

    let index: Vec<f64> = buckets.iter().map(|b| b.hour_of_week as f64).collect();
    let counts: Vec<f64> = buckets.iter().map(|b| b.count as f64).collect();

    let mut models = Vec::with_capacity(MODELS.len());
    for (name, specs) in MODELS {
        let (names, columns) = fourier_columns(&index, specs);
        let summary = ModelSummary::fit_columns(name, "count", &counts, &names, &columns)
            .with_context(|| format!("fitting model '{name}'"))?;
        info!(
            model = name,
            r_squared = summary.fit.r_squared,
            f_p_value = summary.fit.f_p_value,
            "Model fitted"
        );
        models.push(summary);
    }

    Ok(ShootingsAnalysis {
        incidents_read: incidents.len(),
        incidents_used: used,
        borough: borough.map(|b| b.trim().to_uppercase()),
        first_date,
        last_date,
        buckets,
        models,
    })
}

/// Fetches, analyzes and writes the shootings report.
#[tracing::instrument(skip(client, layout), fields(source = %options.incidents))]
pub async fn run<C: HttpClient>(
    client: &C,
    options: &ShootingsOptions,
    layout: &ReportLayout,
) -> Result<ShootingsAnalysis> {
    let bytes = load_source(client, &options.incidents).await?;
    let incidents = parse_incidents(&bytes).context("parsing NYPD incidents")?;
    info!(rows = incidents.len(), "Incidents parsed");

    let analysis = analyze(&incidents, options.borough.as_deref())?;
    write_artifacts(&analysis, &options.incidents, layout)?;
    Ok(analysis)
}

/// Renders plots, the Markdown report, the JSON summary and the bucket CSV.
pub fn write_artifacts(
    analysis: &ShootingsAnalysis,
    source: &str,
    layout: &ReportLayout,
) -> Result<()> {
    layout
        .create()
        .with_context(|| format!("creating {}", layout.dir().display()))?;

    write_table(&layout.file("hour_of_week.csv"), &analysis.buckets)?;

    let points: Vec<(f64, f64)> = analysis
        .buckets
        .iter()
        .map(|b| (b.hour_of_week as f64, b.count as f64))
        .collect();
    let curves: Vec<Curve<'_>> = analysis
        .models
        .iter()
        .map(|m| Curve {
            label: &m.name,
            points: points
                .iter()
                .zip(m.fit.fitted_for_input(points.len()))
                .map(|(&(x, _), y)| (x, y))
                .collect(),
        })
        .collect();
    scatter_with_fits(
        &points,
        &curves,
        "Shootings by hour of week",
        "Hour of week (0 = Monday 00:00)",
        "Incidents",
        &layout.file("hour_of_week_fit.svg"),
    )?;

    let mut grid = vec![vec![0.0; 24]; 7];
    for b in &analysis.buckets {
        grid[b.day as usize][b.hour as usize] = b.count as f64;
    }
    heatmap(
        &grid,
        &DAY_NAMES,
        "Shootings by day and hour",
        "Hour of day",
        &layout.file("day_hour_heatmap.svg"),
    )?;

    build_markdown(analysis, source).write_to(&layout.file("report.md"))?;
    write_json(&layout.file("summary.json"), analysis)?;

    info!(dir = %layout.dir().display(), "Shootings report written");
    Ok(())
}

fn build_markdown(analysis: &ShootingsAnalysis, source: &str) -> MarkdownReport {
    let mut report = MarkdownReport::new("NYPD shootings by hour of week");
    report.paragraph(&format!("Generated {}.", Utc::now().format("%Y-%m-%d %H:%M UTC")));

    report.heading(2, "Data");
    let span = match (analysis.first_date, analysis.last_date) {
        (Some(first), Some(last)) => format!("{first} to {last}"),
        _ => "no incidents".to_string(),
    };
    report.bullets(&[
        format!("Source: {source}"),
        format!("Incidents read: {}", analysis.incidents_read),
        format!(
            "Borough: {}",
            analysis.borough.as_deref().unwrap_or("all boroughs")
        ),
        format!("Incidents counted: {}", analysis.incidents_used),
        format!("Date range: {span}"),
    ]);

    report.heading(2, "Busiest hours");
    let rows: Vec<Vec<String>> = analysis
        .peak_buckets(10)
        .into_iter()
        .map(|b| {
            vec![
                DAY_NAMES[b.day as usize].to_string(),
                format!("{:02}:00", b.hour),
                b.count.to_string(),
                b.murders.to_string(),
                format_num(b.rate_per_week),
            ]
        })
        .collect();
    report.table(&["Day", "Hour", "Incidents", "Murders", "Per week"], &rows);
    report.image("Incidents by day and hour", "day_hour_heatmap.svg");

    report.heading(2, "Models");
    report.paragraph(
        "Incident counts per hour-of-week bucket regressed on sine and cosine terms \
         with a 24 hour period, then with a 168 hour period added.",
    );
    for m in &analysis.models {
        report.model_summary(&m.name, &m.formula, &m.fit);
    }
    report.image("Observed counts with fitted curves", "hour_of_week_fit.svg");

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveTime};

    /// Four weeks of incidents whose frequency follows a daily cycle.
    fn synthetic_incidents() -> Vec<Incident> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let mut out = Vec::new();
        for day in 0..28 {
            let date = start + Duration::days(day);
            for hour in 0..24u32 {
                let n = if (0..4).contains(&hour) || hour >= 20 {
                    3
                } else {
                    1
                };
                for _ in 0..n {
                    out.push(Incident {
                        date,
                        time: NaiveTime::from_hms_opt(hour, 15, 0).unwrap(),
                        borough: if hour % 2 == 0 { "BRONX" } else { "BROOKLYN" }
                            .to_string(),
                        murder: hour == 2,
                    });
                }
            }
        }
        out
    }

    #[test]
    fn test_analyze_buckets_and_models() {
        let incidents = synthetic_incidents();
        let analysis = analyze(&incidents, None).unwrap();

        assert_eq!(analysis.buckets.len(), 168);
        assert_eq!(analysis.incidents_used as usize, incidents.len());
        assert_eq!(analysis.models.len(), 2);
        assert_eq!(analysis.models[0].fit.coefficients.len(), 5);
        assert_eq!(analysis.models[1].fit.coefficients.len(), 9);
        // adding regressors never lowers R²
        assert!(analysis.models[1].fit.r_squared >= analysis.models[0].fit.r_squared - 1e-12);
        // the daily cycle is strong
        assert!(analysis.models[0].fit.r_squared > 0.5);
        assert_eq!(analysis.first_date, NaiveDate::from_ymd_opt(2023, 1, 2));
    }

    #[test]
    fn test_analyze_borough_filter() {
        let incidents = synthetic_incidents();
        let analysis = analyze(&incidents, Some("bronx")).unwrap();
        let bronx = incidents.iter().filter(|i| i.borough == "BRONX").count();
        assert_eq!(analysis.incidents_used as usize, bronx);
        assert_eq!(analysis.borough.as_deref(), Some("BRONX"));
    }

    #[test]
    fn test_analyze_is_deterministic() {
        let incidents = synthetic_incidents();
        let a = analyze(&incidents, None).unwrap();
        let b = analyze(&incidents, None).unwrap();
        for (ma, mb) in a.models.iter().zip(&b.models) {
            assert_eq!(ma.fit.coefficients, mb.fit.coefficients);
        }
    }

    #[test]
    fn test_peak_buckets_sorted() {
        let analysis = analyze(&synthetic_incidents(), None).unwrap();
        let peaks = analysis.peak_buckets(3);
        assert_eq!(peaks.len(), 3);
        assert!(peaks[0].count >= peaks[1].count && peaks[1].count >= peaks[2].count);
    }

    #[test]
    fn test_write_artifacts() {
        let name = format!("eda_reports_test_shootings_{}", std::process::id());
        let dir = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        let layout = ReportLayout::new(&dir, REPORT_NAME);

        let analysis = analyze(&synthetic_incidents(), None).unwrap();
        write_artifacts(&analysis, "synthetic", &layout).unwrap();

        for file in [
            "hour_of_week.csv",
            "hour_of_week_fit.svg",
            "day_hour_heatmap.svg",
            "report.md",
            "summary.json",
        ] {
            assert!(layout.file(file).exists(), "missing {file}");
        }
        let report = std::fs::read_to_string(layout.file("report.md")).unwrap();
        assert!(report.contains("### Daily cycle"));
        assert!(report.contains("daily_sin1"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
