//! The two end-to-end reports.
//!
//! Each report is split into a pure `analyze` step (rows in, tables and
//! fitted models out) and a `write_artifacts` step that renders plots, the
//! Markdown document, the JSON summary and the derived CSV table.

pub mod covid;
pub mod shootings;
pub mod types;

pub use types::{JoinDiagnostics, ModelSummary};
