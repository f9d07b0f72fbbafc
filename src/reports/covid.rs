//! COVID-19 cases and deaths per million by state against rurality.
//!
//! County time series are pivoted long, summed to states on one date and
//! joined with a state rurality score: the population-weighted mean RUCC of
//! the state's counties, standardized across states.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ReportLayout;
use crate::features::{per_million, standardize};
use crate::fetch::{HttpClient, load_source};
use crate::model::utility::weighted_mean;
use crate::output::{write_json, write_table};
use crate::parser::{CountyRucc, WideTable, parse_rucc, parse_wide_table};
use crate::render::MarkdownReport;
use crate::render::markdown::format_num;
use crate::render::plots::{Curve, bar_chart, scatter_with_fits};
use crate::reshape::{
    LongRecord, StateTotals, aggregate_states, inner_join, latest_common_date, pivot_longer,
    rucc_counties, state_totals,
};

use super::{JoinDiagnostics, ModelSummary};

pub const REPORT_NAME: &str = "covid";

#[derive(Debug, Clone)]
pub struct CovidOptions {
    pub confirmed: String,
    pub deaths: String,
    pub rucc: String,
    pub as_of: Option<NaiveDate>,
}

/// One state's totals, rates and rurality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateRow {
    pub state: String,
    pub population: f64,
    pub cases: f64,
    pub deaths: f64,
    pub cases_per_million: f64,
    pub deaths_per_million: f64,
    pub rurality: f64,
    pub rurality_z: f64,
    pub counties_matched: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CovidAnalysis {
    pub as_of: NaiveDate,
    pub states: Vec<StateRow>,
    /// States dropped for a missing or zero population.
    pub excluded_states: Vec<String>,
    /// Cases table ⋈ deaths table, by state.
    pub series_join: JoinDiagnostics,
    /// COVID counties ⋈ RUCC counties, by FIPS.
    pub county_join: JoinDiagnostics,
    /// COVID counties without a RUCC code, per state.
    pub unmatched_counties: BTreeMap<String, usize>,
    /// State totals ⋈ state rurality, by state.
    pub state_join: JoinDiagnostics,
    pub models: Vec<ModelSummary>,
}

/// Rurality score for one state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateRurality {
    pub rurality: f64,
    pub counties: usize,
}

/// Population-weighted mean RUCC per state over counties present in both
/// the COVID series and the RUCC table.
///
/// Weights prefer the RUCC population, then the COVID population, then 1.
pub fn state_rurality(
    county_series: &[LongRecord],
    rucc: &[CountyRucc],
) -> (BTreeMap<String, StateRurality>, JoinDiagnostics) {
    let counties = county_series
        .iter()
        .filter_map(|r| r.fips.map(|f| (f, (r.state.clone(), r.population))));
    let codes = rucc.iter().map(|c| (c.fips, c.clone()));
    let joined = inner_join(counties, codes);
    let diagnostics = JoinDiagnostics::from_join(&joined, |fips| format!("{fips:05}"));

    let mut grouped: BTreeMap<String, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for (_, (state, covid_population), county) in &joined.matched {
        let weight = county
            .population
            .filter(|p| p.is_finite() && *p > 0.0)
            .or(covid_population.filter(|p| p.is_finite() && *p > 0.0))
            .unwrap_or(1.0);
        let entry = grouped.entry(state.clone()).or_default();
        entry.0.push(county.rucc as f64);
        entry.1.push(weight);
    }

    let scores = grouped
        .into_iter()
        .map(|(state, (codes, weights))| {
            (
                state,
                StateRurality {
                    rurality: weighted_mean(&codes, &weights),
                    counties: codes.len(),
                },
            )
        })
        .collect();

    (scores, diagnostics)
}

/// Counts, per state, the distinct COVID counties with no RUCC code.
///
/// Renamed or re-drawn county equivalents (Connecticut's planning regions
/// in RUCC 2023 against JHU's legacy counties) show up here.
pub fn unmatched_counties(
    county_series: &[LongRecord],
    rucc: &[CountyRucc],
) -> BTreeMap<String, usize> {
    let coded: BTreeSet<u32> = rucc.iter().map(|c| c.fips).collect();
    let missing: BTreeSet<(&str, u32)> = county_series
        .iter()
        .filter_map(|r| r.fips.map(|f| (r.state.as_str(), f)))
        .filter(|(_, f)| !coded.contains(f))
        .collect();

    let mut counts = BTreeMap::new();
    for (state, _) in missing {
        *counts.entry(state.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Builds the state table and fits both rate models.
#[tracing::instrument(skip_all, fields(as_of))]
pub fn analyze(
    confirmed: &WideTable,
    deaths: &WideTable,
    rucc: &[CountyRucc],
    as_of: Option<NaiveDate>,
) -> Result<CovidAnalysis> {
    let as_of = match as_of {
        Some(date) => date,
        None => latest_common_date(confirmed, deaths)
            .context("cases and deaths tables share no dates")?,
    };
    for (name, table) in [("confirmed", confirmed), ("deaths", deaths)] {
        if !table.date_columns.iter().any(|(_, d)| *d == as_of) {
            bail!("{name} table has no column for {as_of}");
        }
    }
    tracing::Span::current().record("as_of", tracing::field::display(as_of));

    let cases_long = pivot_longer(confirmed, |d| d == as_of)
        .context("pivoting confirmed cases")?;
    let deaths_long = pivot_longer(deaths, |d| d == as_of)
        .context("pivoting deaths")?;

    let series = aggregate_states(&cases_long, &deaths_long, as_of);
    let series_join = JoinDiagnostics::from_join(&series, String::clone);
    if series.unmatched() > 0 {
        warn!(
            cases_only = ?series_join.left_only,
            deaths_only = ?series_join.right_only,
            "States missing from one of the series"
        );
    }

    let (excluded, totals): (Vec<StateTotals>, Vec<StateTotals>) = state_totals(&series)
        .into_iter()
        .partition(|t| !(t.population.is_finite() && t.population > 0.0));
    let excluded_states: Vec<String> = excluded.into_iter().map(|t| t.state).collect();
    if !excluded_states.is_empty() {
        info!(states = ?excluded_states, "Excluded states without population");
    }

    let (rurality, county_join) = state_rurality(&deaths_long, rucc);
    info!(
        matched = county_join.matched,
        covid_only = county_join.left_only.len(),
        rucc_only = county_join.right_only.len(),
        "County join"
    );
    let unmatched = unmatched_counties(&deaths_long, rucc);

    let joined = inner_join(
        totals.into_iter().map(|t| (t.state.clone(), t)),
        rurality,
    );
    let state_join = JoinDiagnostics::from_join(&joined, String::clone);
    if !state_join.left_only.is_empty() {
        warn!(states = ?state_join.left_only, "States without rurality score");
    }

    let z = standardize(
        &joined
            .matched
            .iter()
            .map(|(_, _, r)| r.rurality)
            .collect::<Vec<_>>(),
    );

    let states: Vec<StateRow> = joined
        .matched
        .into_iter()
        .zip(z)
        .map(|((state, t, r), rurality_z)| StateRow {
            state,
            population: t.population,
            cases: t.cases,
            deaths: t.deaths,
            cases_per_million: per_million(t.cases, t.population),
            deaths_per_million: per_million(t.deaths, t.population),
            rurality: r.rurality,
            rurality_z,
            counties_matched: r.counties,
        })
        .collect();
    info!(states = states.len(), "State table built");

    let z_column = vec![states.iter().map(|s| s.rurality_z).collect::<Vec<_>>()];
    let regressors = vec!["rurality_z".to_string()];
    let responses: [(&str, &str, Vec<f64>); 2] = [
        (
            "Deaths per million",
            "deaths_per_million",
            states.iter().map(|s| s.deaths_per_million).collect(),
        ),
        (
            "Cases per million",
            "cases_per_million",
            states.iter().map(|s| s.cases_per_million).collect(),
        ),
    ];

    let mut models = Vec::with_capacity(responses.len());
    for (name, response_name, response) in responses {
        let summary =
            ModelSummary::fit_columns(name, response_name, &response, &regressors, &z_column)
                .with_context(|| format!("fitting model '{name}'"))?;
        info!(
            model = name,
            r_squared = summary.fit.r_squared,
            f_p_value = summary.fit.f_p_value,
            "Model fitted"
        );
        models.push(summary);
    }

    Ok(CovidAnalysis {
        as_of,
        states,
        excluded_states,
        series_join,
        county_join,
        unmatched_counties: unmatched,
        state_join,
        models,
    })
}

/// Fetches all three datasets, analyzes and writes the COVID report.
#[tracing::instrument(skip(client, layout))]
pub async fn run<C: HttpClient>(
    client: &C,
    options: &CovidOptions,
    layout: &ReportLayout,
) -> Result<CovidAnalysis> {
    let confirmed = parse_wide_table(&load_source(client, &options.confirmed).await?)
        .context("parsing confirmed cases")?;
    let deaths = parse_wide_table(&load_source(client, &options.deaths).await?)
        .context("parsing deaths")?;
    let rucc = rucc_counties(
        parse_rucc(&load_source(client, &options.rucc).await?).context("parsing RUCC codes")?,
    )?;
    info!(
        confirmed_rows = confirmed.rows.len(),
        deaths_rows = deaths.rows.len(),
        rucc_counties = rucc.len(),
        first_date = ?confirmed.first_date(),
        last_date = ?confirmed.last_date(),
        "Datasets parsed"
    );

    let analysis = analyze(&confirmed, &deaths, &rucc, options.as_of)?;
    let sources = [
        options.confirmed.as_str(),
        options.deaths.as_str(),
        options.rucc.as_str(),
    ];
    write_artifacts(&analysis, &sources, layout)?;
    Ok(analysis)
}

/// Renders plots, the Markdown report, the JSON summary and the state CSV.
pub fn write_artifacts(
    analysis: &CovidAnalysis,
    sources: &[&str],
    layout: &ReportLayout,
) -> Result<()> {
    layout
        .create()
        .with_context(|| format!("creating {}", layout.dir().display()))?;

    write_table(&layout.file("states.csv"), &analysis.states)?;

    let plots = [
        ("deaths_vs_rurality.svg", 0usize, "Deaths per million"),
        ("cases_vs_rurality.svg", 1usize, "Cases per million"),
    ];
    for (file, model_idx, y_label) in plots {
        let Some(model) = analysis.models.get(model_idx) else {
            continue;
        };
        let points: Vec<(f64, f64)> = analysis
            .states
            .iter()
            .map(|s| {
                let y = if model_idx == 0 {
                    s.deaths_per_million
                } else {
                    s.cases_per_million
                };
                (s.rurality_z, y)
            })
            .collect();
        let line = fit_line(model, &points)?;
        scatter_with_fits(
            &points,
            &[Curve {
                label: "OLS fit",
                points: line,
            }],
            &format!("{y_label} vs rurality ({})", analysis.as_of),
            "Rurality (standardized)",
            y_label,
            &layout.file(file),
        )?;
    }

    let mut bars: Vec<(String, f64)> = analysis
        .states
        .iter()
        .map(|s| (s.state.clone(), s.deaths_per_million))
        .collect();
    bars.sort_by(|a, b| b.1.total_cmp(&a.1));
    bar_chart(
        &bars,
        &format!("Deaths per million by state ({})", analysis.as_of),
        "Deaths per million",
        &layout.file("deaths_by_state.svg"),
    )?;

    build_markdown(analysis, sources).write_to(&layout.file("report.md"))?;
    write_json(&layout.file("summary.json"), analysis)?;

    info!(dir = %layout.dir().display(), "COVID report written");
    Ok(())
}

/// Two-point fitted line spanning the finite x range of `points`.
fn fit_line(model: &ModelSummary, points: &[(f64, f64)]) -> Result<Vec<(f64, f64)>> {
    let xs: Vec<f64> = points.iter().map(|p| p.0).filter(|x| x.is_finite()).collect();
    let lo = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !lo.is_finite() {
        return Ok(Vec::new());
    }
    let grid = ndarray::array![[lo], [hi]];
    let ys = model.fit.predict(grid.view())?;
    Ok(vec![(lo, ys[0]), (hi, ys[1])])
}

fn build_markdown(analysis: &CovidAnalysis, sources: &[&str]) -> MarkdownReport {
    let mut report = MarkdownReport::new("COVID-19 outcomes and rurality by US state");
    report.paragraph(&format!("Generated {}.", Utc::now().format("%Y-%m-%d %H:%M UTC")));

    report.heading(2, "Data");
    let mut items: Vec<String> = sources.iter().map(|s| format!("Source: {s}")).collect();
    items.extend([
        format!("Cumulative totals as of {}", analysis.as_of),
        format!("States analysed: {}", analysis.states.len()),
        format!(
            "Excluded for missing population: {}",
            JoinDiagnostics::preview(&analysis.excluded_states, 10)
        ),
    ]);
    report.bullets(&items);

    report.heading(2, "Joins");
    let join_row = |name: &str, d: &JoinDiagnostics| {
        vec![
            name.to_string(),
            d.matched.to_string(),
            JoinDiagnostics::preview(&d.left_only, 5),
            JoinDiagnostics::preview(&d.right_only, 5),
        ]
    };
    report.table(
        &["Join", "Matched", "Left only", "Right only"],
        &[
            join_row("cases ⋈ deaths (state)", &analysis.series_join),
            join_row("COVID ⋈ RUCC (county FIPS)", &analysis.county_join),
            join_row("totals ⋈ rurality (state)", &analysis.state_join),
        ],
    );
    if !analysis.unmatched_counties.is_empty() {
        let per_state: Vec<String> = analysis
            .unmatched_counties
            .iter()
            .map(|(state, n)| format!("{state} ({n})"))
            .collect();
        report.paragraph(&format!(
            "COVID counties without a RUCC code, by state: {}.",
            per_state.join(", ")
        ));
    }
    if !analysis.state_join.left_only.is_empty() {
        report.paragraph(&format!(
            "No county of these states matched a RUCC code, so they are left out of \
             both models: {}.",
            analysis.state_join.left_only.join(", ")
        ));
    }

    report.heading(2, "States");
    let mut ranked: Vec<&StateRow> = analysis.states.iter().collect();
    ranked.sort_by(|a, b| b.deaths_per_million.total_cmp(&a.deaths_per_million));
    let rows: Vec<Vec<String>> = ranked
        .iter()
        .map(|s| {
            vec![
                s.state.clone(),
                format!("{:.0}", s.population),
                format_num(s.cases_per_million),
                format_num(s.deaths_per_million),
                format_num(s.rurality),
                format_num(s.rurality_z),
            ]
        })
        .collect();
    report.table(
        &[
            "State",
            "Population",
            "Cases / M",
            "Deaths / M",
            "Mean RUCC",
            "Rurality z",
        ],
        &rows,
    );
    report.image("Deaths per million by state", "deaths_by_state.svg");

    report.heading(2, "Models");
    report.paragraph(
        "Per-million rates regressed on the standardized population-weighted mean \
         Rural-Urban Continuum Code (higher is more rural).",
    );
    for m in &analysis.models {
        report.model_summary(&m.name, &m.formula, &m.fit);
    }
    report.image("Deaths per million against rurality", "deaths_vs_rurality.svg");
    report.image("Cases per million against rurality", "cases_vs_rurality.svg");

    report
}
