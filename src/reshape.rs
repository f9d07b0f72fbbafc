//! Reshaping raw rows into keyed tables: hour-of-week buckets, long/wide
//! pivots, county to state aggregation and keyed joins.

use anyhow::{Context, Result, bail};
use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::parser::rucc::parse_code;
use crate::parser::{CountyRucc, Incident, RuccAttribute, RuccTable, WideTable};
use crate::parser::{parse_fips, parse_number};

pub const HOURS_PER_WEEK: usize = 168;

/// Incident count for one hour of the week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourOfWeekBucket {
    pub hour_of_week: u8,
    /// Days since Monday.
    pub day: u8,
    pub hour: u8,
    pub count: u64,
    pub murders: u64,
    pub rate_per_week: f64,
}

/// `day_from_monday * 24 + hour`, in `0..168`.
pub fn hour_of_week(date: NaiveDate, time: NaiveTime) -> u8 {
    (date.weekday().num_days_from_monday() * 24 + time.hour()) as u8
}

/// Number of weeks spanned by `dates`, inclusive of both ends.
pub fn weeks_observed(dates: impl IntoIterator<Item = NaiveDate>) -> f64 {
    let mut span: Option<(NaiveDate, NaiveDate)> = None;
    for date in dates {
        span = Some(match span {
            Some((first, last)) => (first.min(date), last.max(date)),
            None => (date, date),
        });
    }
    match span {
        Some((first, last)) => ((last - first).num_days() + 1) as f64 / 7.0,
        None => 0.0,
    }
}

/// Counts incidents per hour-of-week.
///
/// Always returns exactly 168 rows ordered by `hour_of_week`; buckets with
/// no incidents are present with a zero count. When `borough` is given only
/// incidents from that borough (case-insensitive) are counted, and the
/// observation window is taken from those incidents.
pub fn bucket_hour_of_week(
    incidents: &[Incident],
    borough: Option<&str>,
) -> Vec<HourOfWeekBucket> {
    let wanted = borough.map(|b| b.trim().to_uppercase());
    let selected: Vec<&Incident> = incidents
        .iter()
        .filter(|i| wanted.as_deref().is_none_or(|b| i.borough == b))
        .collect();

    let mut counts = [0u64; HOURS_PER_WEEK];
    let mut murders = [0u64; HOURS_PER_WEEK];
    for incident in &selected {
        let idx = hour_of_week(incident.date, incident.time) as usize;
        counts[idx] += 1;
        if incident.murder {
            murders[idx] += 1;
        }
    }

    let weeks = weeks_observed(selected.iter().map(|i| i.date));
    debug!(incidents = selected.len(), weeks, "Bucketed incidents by hour of week");

    (0..HOURS_PER_WEEK)
        .map(|idx| HourOfWeekBucket {
            hour_of_week: idx as u8,
            day: (idx / 24) as u8,
            hour: (idx % 24) as u8,
            count: counts[idx],
            murders: murders[idx],
            rate_per_week: if weeks > 0.0 {
                counts[idx] as f64 / weeks
            } else {
                0.0
            },
        })
        .collect()
}

/// One `(county, date)` cell of a time-series table.
#[derive(Debug, Clone, PartialEq)]
pub struct LongRecord {
    pub fips: Option<u32>,
    pub state: String,
    pub population: Option<f64>,
    pub date: NaiveDate,
    pub value: f64,
}

/// Pivots a wide time-series table to long form, keeping only the dates
/// accepted by `keep_date`. Empty cells are skipped.
///
/// # Errors
///
/// Fails when the table lacks a `Province_State` column or a kept cell is
/// not numeric.
pub fn pivot_longer(
    table: &WideTable,
    keep_date: impl Fn(NaiveDate) -> bool,
) -> Result<Vec<LongRecord>> {
    let state_col = table
        .column("Province_State")
        .context("time series table has no Province_State column")?;
    let fips_col = table.column("FIPS");
    let pop_col = table.column("Population");

    let kept: Vec<(usize, NaiveDate)> = table
        .date_columns
        .iter()
        .copied()
        .filter(|(_, d)| keep_date(*d))
        .collect();

    let mut out = Vec::with_capacity(table.rows.len() * kept.len());
    for (row_idx, row) in table.rows.iter().enumerate() {
        let state = row.get(state_col).unwrap_or_default().trim().to_string();
        let fips = fips_col.and_then(|c| row.get(c)).and_then(parse_fips);
        let population = pop_col.and_then(|c| row.get(c)).and_then(parse_number);

        for (col, date) in &kept {
            let raw = row.get(*col).unwrap_or_default();
            if raw.trim().is_empty() {
                continue;
            }
            let Some(value) = parse_number(raw) else {
                bail!("time series row {}: non-numeric value {raw:?} for {date}", row_idx + 1);
            };
            out.push(LongRecord {
                fips,
                state: state.clone(),
                population,
                date: *date,
                value,
            });
        }
    }

    Ok(out)
}

/// Pivots long RUCC attributes to one row per county.
///
/// Uses the first attribute starting with `RUCC_` and the first starting with
/// `Population`; other attributes are ignored. Counties without a code are
/// dropped.
pub fn pivot_wider(attributes: &[RuccAttribute]) -> Result<Vec<CountyRucc>> {
    let mut by_county: BTreeMap<u32, (String, Option<u8>, Option<f64>)> = BTreeMap::new();

    for attr in attributes {
        let entry = by_county
            .entry(attr.fips)
            .or_insert_with(|| (attr.state_abbr.clone(), None, None));
        let name = attr.attribute.to_ascii_uppercase();

        if name.starts_with("RUCC_") && entry.1.is_none() {
            let code = parse_code(&attr.value).with_context(|| format!("county {:05}", attr.fips))?;
            entry.1 = Some(code);
        } else if name.starts_with("POPULATION") && entry.2.is_none() {
            entry.2 = parse_number(&attr.value);
        }
    }

    Ok(by_county
        .into_iter()
        .filter_map(|(fips, (state_abbr, rucc, population))| {
            rucc.map(|rucc| CountyRucc {
                fips,
                state_abbr,
                rucc,
                population,
            })
        })
        .collect())
}

/// One county row per code regardless of the release layout.
pub fn rucc_counties(table: RuccTable) -> Result<Vec<CountyRucc>> {
    match table {
        RuccTable::Long(attributes) => pivot_wider(&attributes),
        RuccTable::Wide(counties) => Ok(counties),
    }
}

/// Cumulative totals for one state on a single date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateTotals {
    pub state: String,
    pub population: f64,
    pub cases: f64,
    pub deaths: f64,
    pub counties: usize,
}

/// Sums a long table per state for one date.
pub fn sum_by_state(
    records: &[LongRecord],
    date: NaiveDate,
) -> BTreeMap<String, (f64, f64, usize)> {
    let mut sums: BTreeMap<String, (f64, f64, usize)> = BTreeMap::new();
    for r in records.iter().filter(|r| r.date == date) {
        let entry = sums.entry(r.state.clone()).or_default();
        entry.0 += r.value;
        entry.1 += r.population.unwrap_or(0.0);
        entry.2 += 1;
    }
    sums
}

/// Aggregates county cases and deaths to state totals on `as_of`.
///
/// Population is taken from the deaths table. States present in only one of
/// the tables are returned in `JoinResult::left_only`/`right_only`.
pub fn aggregate_states(
    cases: &[LongRecord],
    deaths: &[LongRecord],
    as_of: NaiveDate,
) -> JoinResult<String, (f64, f64, usize), (f64, f64, usize)> {
    inner_join(sum_by_state(cases, as_of), sum_by_state(deaths, as_of))
}

/// Flattens joined per-state sums into [`StateTotals`].
pub fn state_totals(
    joined: &JoinResult<String, (f64, f64, usize), (f64, f64, usize)>,
) -> Vec<StateTotals> {
    joined
        .matched
        .iter()
        .map(|(state, (cases, _, _), (deaths, population, counties))| StateTotals {
            state: state.clone(),
            population: *population,
            cases: *cases,
            deaths: *deaths,
            counties: *counties,
        })
        .collect()
}

/// Latest date present in both tables.
pub fn latest_common_date(a: &WideTable, b: &WideTable) -> Option<NaiveDate> {
    let dates: BTreeSet<NaiveDate> = a.date_columns.iter().map(|(_, d)| *d).collect();
    b.date_columns
        .iter()
        .map(|(_, d)| *d)
        .filter(|d| dates.contains(d))
        .max()
}

/// Result of an inner join, with the keys that found no partner.
#[derive(Debug, Clone)]
pub struct JoinResult<K, L, R> {
    pub matched: Vec<(K, L, R)>,
    pub left_only: Vec<K>,
    pub right_only: Vec<K>,
}

impl<K, L, R> JoinResult<K, L, R> {
    pub fn unmatched(&self) -> usize {
        self.left_only.len() + self.right_only.len()
    }
}

/// Inner join on `K`, preserving left order.
///
/// Every left row whose key exists on the right is emitted once per matching
/// right row, so rows present on both sides are never dropped.
pub fn inner_join<K, L, R>(
    left: impl IntoIterator<Item = (K, L)>,
    right: impl IntoIterator<Item = (K, R)>,
) -> JoinResult<K, L, R>
where
    K: Eq + std::hash::Hash + Ord + Clone,
    L: Clone,
    R: Clone,
{
    let mut right_by_key: HashMap<K, Vec<R>> = HashMap::new();
    let mut right_keys: Vec<K> = Vec::new();
    for (k, r) in right {
        let rows = right_by_key.entry(k.clone()).or_default();
        if rows.is_empty() {
            right_keys.push(k);
        }
        rows.push(r);
    }

    let mut matched = Vec::new();
    let mut left_only = Vec::new();
    let mut seen: BTreeSet<K> = BTreeSet::new();

    for (k, l) in left {
        match right_by_key.get(&k) {
            Some(rows) => {
                for r in rows {
                    matched.push((k.clone(), l.clone(), r.clone()));
                }
                seen.insert(k);
            }
            None => left_only.push(k),
        }
    }

    let right_only = right_keys.into_iter().filter(|k| !seen.contains(k)).collect();

    JoinResult {
        matched,
        left_only,
        right_only,
    }
}
