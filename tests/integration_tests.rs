use chrono::NaiveDate;
use eda_reports::config::ReportLayout;
use eda_reports::fetch::BasicClient;
use eda_reports::reports::covid::{self, CovidOptions};
use eda_reports::reports::shootings::{self, ShootingsOptions};
use std::path::PathBuf;

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

fn fresh_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn test_scratch_dirs_are_per_process() {
    let dir = fresh_dir("eda_reports_it_scratch");
    let name = dir.file_name().unwrap().to_string_lossy().into_owned();
    let expected = format!("eda_reports_it_scratch_{}", std::process::id());
    assert_eq!(name, expected);
}

#[tokio::test]
async fn test_shootings_pipeline() {
    let dir = fresh_dir("eda_reports_it_shootings");
    let layout = ReportLayout::new(&dir, shootings::REPORT_NAME);
    let client = BasicClient::new().expect("client");
    let options = ShootingsOptions {
        incidents: fixture("incidents.csv"),
        borough: None,
    };

    let analysis = shootings::run(&client, &options, &layout)
        .await
        .expect("shootings pipeline failed");

    assert_eq!(analysis.incidents_read, 100);
    assert_eq!(analysis.incidents_used, 100);
    assert_eq!(analysis.buckets.len(), 168);
    assert_eq!(analysis.first_date, NaiveDate::from_ymd_opt(2022, 1, 3));
    assert_eq!(analysis.models.len(), 2);

    let csv = std::fs::read_to_string(layout.file("hour_of_week.csv")).unwrap();
    assert_eq!(csv.lines().count(), 169);
    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(layout.file("summary.json")).unwrap())
            .unwrap();
    assert_eq!(summary["models"].as_array().unwrap().len(), 2);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_shootings_pipeline_borough() {
    let dir = fresh_dir("eda_reports_it_shootings_borough");
    let layout = ReportLayout::new(&dir, shootings::REPORT_NAME);
    let client = BasicClient::new().expect("client");
    let options = ShootingsOptions {
        incidents: fixture("incidents.csv"),
        borough: Some("Brooklyn".to_string()),
    };

    let analysis = shootings::run(&client, &options, &layout).await.unwrap();

    assert!(analysis.incidents_used < 100);
    assert_eq!(analysis.borough.as_deref(), Some("BROOKLYN"));
    assert_eq!(analysis.buckets.len(), 168);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_covid_pipeline() {
    let dir = fresh_dir("eda_reports_it_covid");
    let layout = ReportLayout::new(&dir, covid::REPORT_NAME);
    let client = BasicClient::new().expect("client");
    let options = CovidOptions {
        confirmed: fixture("confirmed.csv"),
        deaths: fixture("deaths.csv"),
        rucc: fixture("rucc.csv"),
        as_of: None,
    };

    let analysis = covid::run(&client, &options, &layout)
        .await
        .expect("covid pipeline failed");

    assert_eq!(analysis.as_of, NaiveDate::from_ymd_opt(2023, 3, 9).unwrap());
    let states: Vec<&str> = analysis.states.iter().map(|s| s.state.as_str()).collect();
    assert_eq!(states, vec!["Alabama", "Arizona", "Montana", "New York"]);
    assert_eq!(analysis.excluded_states, vec!["Diamond Princess"]);

    // every county present in both tables is matched
    assert_eq!(analysis.county_join.matched, 10);
    assert_eq!(analysis.county_join.left_only, vec!["80001", "88888"]);
    assert_eq!(analysis.county_join.right_only, vec!["56001"]);

    let alabama = &analysis.states[0];
    assert_eq!(alabama.deaths, 1058.0);
    assert_eq!(alabama.population, 303789.0);
    assert!((alabama.deaths_per_million - 1058.0 / 303789.0 * 1e6).abs() < 1e-9);

    for s in &analysis.states {
        assert!(s.cases_per_million >= 0.0 && s.deaths_per_million >= 0.0);
        assert!((1.0..=9.0).contains(&s.rurality));
    }
    assert_eq!(analysis.models.len(), 2);
    assert_eq!(analysis.models[0].fit.n_obs, 4);

    for file in [
        "states.csv",
        "deaths_vs_rurality.svg",
        "cases_vs_rurality.svg",
        "deaths_by_state.svg",
        "report.md",
        "summary.json",
    ] {
        assert!(layout.file(file).exists(), "missing {file}");
    }

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_covid_pipeline_explicit_date() {
    let dir = fresh_dir("eda_reports_it_covid_date");
    let layout = ReportLayout::new(&dir, covid::REPORT_NAME);
    let client = BasicClient::new().expect("client");
    let options = CovidOptions {
        confirmed: fixture("confirmed.csv"),
        deaths: fixture("deaths.csv"),
        rucc: fixture("rucc.csv"),
        as_of: NaiveDate::from_ymd_opt(2023, 3, 7),
    };

    let analysis = covid::run(&client, &options, &layout).await.unwrap();
    let alabama = &analysis.states[0];
    assert_eq!(alabama.deaths, 1057.0);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_missing_source_is_error() {
    let dir = fresh_dir("eda_reports_it_missing");
    let layout = ReportLayout::new(&dir, shootings::REPORT_NAME);
    let client = BasicClient::new().expect("client");
    let options = ShootingsOptions {
        incidents: fixture("does_not_exist.csv"),
        borough: None,
    };

    let err = shootings::run(&client, &options, &layout).await.unwrap_err();
    assert!(format!("{err:#}").contains("does_not_exist.csv"));
}
