//! SVG charts built with [`plotters`].
//!
//! The SVG backend writes text as `<text>` elements, so no system fonts are
//! needed at render time.

use plotters::prelude::*;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during plot generation
#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Failed to create drawing area: {0}")]
    DrawingArea(String),

    #[error("Failed to configure chart: {0}")]
    ChartConfig(String),

    #[error("Failed to draw chart elements: {0}")]
    Drawing(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

type Result<T> = core::result::Result<T, PlotError>;

/// A named line drawn over the scatter points.
pub struct Curve<'a> {
    pub label: &'a str,
    pub points: Vec<(f64, f64)>,
}

const WIDTH: u32 = 1200;
const HEIGHT: u32 = 800;

fn is_finite_point(p: &(f64, f64)) -> bool {
    p.0.is_finite() && p.1.is_finite()
}

/// Finite `(min, max)` of `values` padded by 5%, or `None` if none are finite.
fn padded_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return None;
    }
    let span = if hi > lo { hi - lo } else { lo.abs().max(1.0) };
    Some((lo - span * 0.05, hi + span * 0.05))
}

/// Scatter plot of `points` with fitted `curves` overlaid.
///
/// Non-finite points are skipped.
pub fn scatter_with_fits(
    points: &[(f64, f64)],
    curves: &[Curve<'_>],
    title: &str,
    x_label: &str,
    y_label: &str,
    output_path: &Path,
) -> Result<()> {
    let observed: Vec<(f64, f64)> = points.iter().copied().filter(is_finite_point).collect();
    let extent: Vec<(f64, f64)> = observed
        .iter()
        .copied()
        .chain(
            curves
                .iter()
                .flat_map(|c| c.points.iter().copied())
                .filter(is_finite_point),
        )
        .collect();

    let (x_min, x_max) = padded_range(extent.iter().map(|p| p.0))
        .ok_or_else(|| PlotError::InvalidData(format!("{title}: no finite points")))?;
    let (y_min, y_max) = padded_range(extent.iter().map(|p| p.1))
        .ok_or_else(|| PlotError::InvalidData(format!("{title}: no finite points")))?;

    let root = SVGBackend::new(output_path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .label_style(("sans-serif", 16))
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    chart
        .draw_series(
            observed
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 3, BLUE.mix(0.6).filled())),
        )
        .map_err(|e| PlotError::Drawing(e.to_string()))?
        .label("observed")
        .legend(|(x, y)| Circle::new((x + 10, y), 3, BLUE.filled()));

    for (i, curve) in curves.iter().enumerate() {
        let color = Palette99::pick(i + 1).to_rgba();
        chart
            .draw_series(LineSeries::new(
                curve.points.iter().copied().filter(is_finite_point),
                color.stroke_width(2),
            ))
            .map_err(|e| PlotError::Drawing(e.to_string()))?
            .label(curve.label)
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    root.present()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;
    Ok(())
}

/// White-to-red shade for `value` within `[0, max]`.
pub fn heat_color(value: f64, max: f64) -> RGBColor {
    let t = if max > 0.0 && value.is_finite() {
        (value / max).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let fade = |c: u8| (255.0 - (255.0 - c as f64) * t).round() as u8;
    RGBColor(fade(165), fade(0), fade(38))
}

/// Grid heatmap; `grid[row][col]`, rows labelled by `row_labels`.
pub fn heatmap(
    grid: &[Vec<f64>],
    row_labels: &[&str],
    title: &str,
    x_label: &str,
    output_path: &Path,
) -> Result<()> {
    let rows = grid.len();
    let cols = grid.first().map_or(0, Vec::len);
    if rows == 0 || cols == 0 {
        return Err(PlotError::InvalidData(format!("{title}: empty grid")));
    }
    if grid.iter().any(|r| r.len() != cols) || row_labels.len() != rows {
        return Err(PlotError::InvalidData(format!("{title}: ragged grid")));
    }

    let max = grid
        .iter()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0f64, f64::max);

    let root = SVGBackend::new(output_path, (WIDTH, 500)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0..cols as i32, 0..rows as i32)
        .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(x_label)
        .x_labels(cols)
        .y_labels(rows)
        .y_label_formatter(&|r| {
            row_labels
                .get(*r as usize)
                .map_or(String::new(), |s| s.to_string())
        })
        .label_style(("sans-serif", 14))
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    chart
        .draw_series(grid.iter().enumerate().flat_map(|(r, row)| {
            row.iter().enumerate().map(move |(c, &v)| {
                Rectangle::new(
                    [(c as i32, r as i32), (c as i32 + 1, r as i32 + 1)],
                    heat_color(v, max).filled(),
                )
            })
        }))
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    root.present()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;
    Ok(())
}

/// Horizontal bar chart, one bar per `(label, value)` in the given order.
pub fn bar_chart(
    bars: &[(String, f64)],
    title: &str,
    x_label: &str,
    output_path: &Path,
) -> Result<()> {
    let shown: Vec<&(String, f64)> = bars.iter().filter(|(_, v)| v.is_finite()).collect();
    if shown.is_empty() {
        return Err(PlotError::InvalidData(format!("{title}: no finite values")));
    }
    let max = shown.iter().map(|(_, v)| *v).fold(0.0f64, f64::max).max(1.0);
    let n = shown.len() as i32;
    let height = 120 + 18 * shown.len() as u32;

    let root = SVGBackend::new(output_path, (1000, height)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 26))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(160)
        .build_cartesian_2d(0.0..max * 1.05, 0..n)
        .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

    // Top bar is the first entry.
    let label_for = |i: &i32| {
        let idx = (n - 1 - *i) as usize;
        shown.get(idx).map_or(String::new(), |(l, _)| l.clone())
    };

    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_desc(x_label)
        .y_labels(shown.len())
        .y_label_formatter(&label_for)
        .label_style(("sans-serif", 13))
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    chart
        .draw_series(shown.iter().enumerate().map(|(i, (_, v))| {
            let y = n - 1 - i as i32;
            Rectangle::new([(0.0, y), (*v, y + 1)], BLUE.mix(0.7).filled())
        }))
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    root.present()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;
    Ok(())
}
