//! Persisting derived tables and summaries.
//!
//! Derived tables go to CSV, run summaries to pretty-printed JSON.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use csv::WriterBuilder;
use std::fs::File;
use std::path::Path;

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty(value: &impl std::fmt::Debug) {
    debug!("{:#?}", value);
}

/// Writes `rows` to a fresh CSV file with a header row, replacing any
/// existing file.
pub fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    debug!(path = %path.display(), rows = rows.len(), "Writing CSV table");

    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Writes `value` as pretty-printed JSON.
pub fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Summary written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    #[derive(Debug, Serialize)]
    struct Row {
        state: String,
        rate: f64,
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(format!("{}_{name}", std::process::id()))
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&vec![1, 2, 3]);
    }

    #[test]
    fn test_write_table_header_and_rows() {
        let path = temp_path("eda_reports_test_table.csv");
        let _ = fs::remove_file(&path);

        let rows = vec![
            Row {
                state: "Alabama".to_string(),
                rate: 1.5,
            },
            Row {
                state: "Alaska".to_string(),
                rate: 2.0,
            },
        ];
        write_table(&path, &rows).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines, vec!["state,rate", "Alabama,1.5", "Alaska,2.0"]);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_table_overwrites() {
        let path = temp_path("eda_reports_test_overwrite.csv");
        let row = Row {
            state: "Ohio".to_string(),
            rate: 0.0,
        };
        write_table(&path, std::slice::from_ref(&row)).unwrap();
        write_table(&path, std::slice::from_ref(&row)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_json() {
        let path = temp_path("eda_reports_test_summary.json");
        let row = Row {
            state: "Utah".to_string(),
            rate: 3.25,
        };
        write_json(&path, &row).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["state"], "Utah");
        assert_eq!(value["rate"], 3.25);

        fs::remove_file(&path).unwrap();
    }
}
