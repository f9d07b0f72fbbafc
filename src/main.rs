//! CLI entry point for the exploratory data-analysis reports.
//!
//! Provides one subcommand per report (NYPD shootings by hour of week,
//! COVID-19 outcomes against rurality) and one that runs both.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use eda_reports::config::{self, ReportLayout};
use eda_reports::fetch::{BasicClient, HttpClient, auth::ApiKey};
use eda_reports::output::print_pretty;
use eda_reports::reports::covid::{self, CovidOptions};
use eda_reports::reports::shootings::{self, ShootingsOptions};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{debug, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "eda_reports")]
#[command(about = "Exploratory reports on public NYPD and COVID-19 data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// NYPD shooting incidents by hour of week with Fourier fits
    Shootings {
        /// Incident CSV: path or URL
        #[arg(long, value_name = "FILE_OR_URL", default_value = config::NYPD_INCIDENTS_URL)]
        incidents: String,

        /// Only count incidents in this borough (e.g. "Bronx")
        #[arg(long)]
        borough: Option<String>,

        /// Directory to write reports into
        #[arg(short, long, default_value = config::DEFAULT_OUTPUT_DIR)]
        output_dir: String,
    },
    /// COVID-19 cases and deaths per million by state against rurality
    Covid {
        /// JHU confirmed cases time series: path or URL
        #[arg(long, value_name = "FILE_OR_URL", default_value = config::JHU_CONFIRMED_US_URL)]
        confirmed: String,

        /// JHU deaths time series: path or URL
        #[arg(long, value_name = "FILE_OR_URL", default_value = config::JHU_DEATHS_US_URL)]
        deaths: String,

        /// USDA Rural-Urban Continuum Codes: path or URL
        #[arg(long, value_name = "FILE_OR_URL", default_value = config::USDA_RUCC_URL)]
        rucc: String,

        /// Date of the cumulative totals (defaults to the latest common date)
        #[arg(long, value_name = "YYYY-MM-DD")]
        as_of: Option<NaiveDate>,

        /// Directory to write reports into
        #[arg(short, long, default_value = config::DEFAULT_OUTPUT_DIR)]
        output_dir: String,
    },
    /// Run both reports with default sources
    All {
        /// Directory to write reports into
        #[arg(short, long, default_value = config::DEFAULT_OUTPUT_DIR)]
        output_dir: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| config::DEFAULT_LOG_FILE.to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("eda_reports.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let client = build_client()?;

    match cli.command {
        Commands::Shootings {
            incidents,
            borough,
            output_dir,
        } => {
            let options = ShootingsOptions { incidents, borough };
            run_shootings(&client, &options, &output_dir).await?;
        }
        Commands::Covid {
            confirmed,
            deaths,
            rucc,
            as_of,
            output_dir,
        } => {
            let options = CovidOptions {
                confirmed,
                deaths,
                rucc,
                as_of,
            };
            run_covid(&client, &options, &output_dir).await?;
        }
        Commands::All { output_dir } => {
            let shootings_options = ShootingsOptions {
                incidents: config::NYPD_INCIDENTS_URL.to_string(),
                borough: None,
            };
            run_shootings(&client, &shootings_options, &output_dir).await?;

            let covid_options = CovidOptions {
                confirmed: config::JHU_CONFIRMED_US_URL.to_string(),
                deaths: config::JHU_DEATHS_US_URL.to_string(),
                rucc: config::USDA_RUCC_URL.to_string(),
                as_of: None,
            };
            run_covid(&client, &covid_options, &output_dir).await?;
        }
    }

    Ok(())
}

/// Plain client, or one sending the NYC Open Data app token when it is set.
fn build_client() -> Result<Box<dyn HttpClient>> {
    let basic = BasicClient::new().context("failed to build HTTP client")?;
    match std::env::var(config::APP_TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => {
            debug!(env = config::APP_TOKEN_ENV, "Using app token");
            Ok(Box::new(ApiKey::socrata(basic, token.trim())?))
        }
        _ => Ok(Box::new(basic)),
    }
}

async fn run_shootings<C: HttpClient>(
    client: &C,
    options: &ShootingsOptions,
    output_dir: &str,
) -> Result<()> {
    let layout = ReportLayout::new(output_dir, shootings::REPORT_NAME);
    let analysis = shootings::run(client, options, &layout).await?;
    print_pretty(&analysis.models);

    for m in &analysis.models {
        info!(
            model = %m.name,
            r_squared = m.fit.r_squared,
            adj_r_squared = m.fit.adj_r_squared,
            "Shootings model"
        );
    }
    info!(
        incidents = analysis.incidents_used,
        dir = %layout.dir().display(),
        "Shootings report complete"
    );
    Ok(())
}

async fn run_covid<C: HttpClient>(
    client: &C,
    options: &CovidOptions,
    output_dir: &str,
) -> Result<()> {
    let layout = ReportLayout::new(output_dir, covid::REPORT_NAME);
    let analysis = covid::run(client, options, &layout).await?;
    print_pretty(&analysis.models);

    for m in &analysis.models {
        info!(
            model = %m.name,
            r_squared = m.fit.r_squared,
            adj_r_squared = m.fit.adj_r_squared,
            "COVID model"
        );
    }
    info!(
        as_of = %analysis.as_of,
        states = analysis.states.len(),
        dir = %layout.dir().display(),
        "COVID report complete"
    );
    Ok(())
}
