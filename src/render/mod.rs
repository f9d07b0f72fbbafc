//! Presentation: SVG plots and the Markdown report document.

pub mod markdown;
pub mod plots;

pub use markdown::MarkdownReport;
pub use plots::PlotError;
