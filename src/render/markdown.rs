//! A minimal Markdown document builder for the generated reports.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

use crate::model::OlsFit;

#[derive(Debug, Default, Clone)]
pub struct MarkdownReport {
    body: String,
}

impl MarkdownReport {
    pub fn new(title: &str) -> Self {
        let mut report = Self::default();
        report.heading(1, title);
        report
    }

    pub fn heading(&mut self, level: usize, text: &str) -> &mut Self {
        let _ = writeln!(self.body, "{} {text}\n", "#".repeat(level.clamp(1, 6)));
        self
    }

    pub fn paragraph(&mut self, text: &str) -> &mut Self {
        let _ = writeln!(self.body, "{text}\n");
        self
    }

    pub fn bullets<S: AsRef<str>>(&mut self, items: &[S]) -> &mut Self {
        for item in items {
            let _ = writeln!(self.body, "- {}", item.as_ref());
        }
        self.body.push('\n');
        self
    }

    pub fn image(&mut self, alt: &str, file: &str) -> &mut Self {
        let _ = writeln!(self.body, "![{alt}]({file})\n");
        self
    }

    /// Pipe table. Cells and headers containing `|` are escaped.
    pub fn table<S: AsRef<str>>(&mut self, headers: &[&str], rows: &[Vec<S>]) -> &mut Self {
        let escape = |s: &str| s.replace('|', "\\|");
        let header: Vec<String> = headers.iter().map(|h| escape(h)).collect();
        let _ = writeln!(self.body, "| {} |", header.join(" | "));
        let _ = writeln!(
            self.body,
            "|{}|",
            headers.iter().map(|_| "---").collect::<Vec<_>>().join("|")
        );
        for row in rows {
            let cells: Vec<String> = row.iter().map(|c| escape(c.as_ref())).collect();
            let _ = writeln!(self.body, "| {} |", cells.join(" | "));
        }
        self.body.push('\n');
        self
    }

    /// Coefficient table plus fit statistics, laid out like a regression
    /// printout.
    pub fn model_summary(&mut self, name: &str, formula: &str, fit: &OlsFit) -> &mut Self {
        self.heading(3, name);
        self.paragraph(&format!("`{formula}`"));

        let rows: Vec<Vec<String>> = fit
            .coefficients
            .iter()
            .map(|c| {
                vec![
                    c.name.clone(),
                    format_num(c.estimate),
                    format_num(c.std_error),
                    format_num(c.t_value),
                    format_p(c.p_value),
                    c.signif.clone(),
                ]
            })
            .collect();
        self.table(
            &["Term", "Estimate", "Std. Error", "t value", "Pr(>|t|)", ""],
            &rows,
        );

        let mut stats = vec![
            format!(
                "Residual standard error: {} on {} degrees of freedom",
                format_num(fit.residual_std_error),
                fit.df_residual
            ),
            format!(
                "R²: {}, adjusted R²: {}",
                format_num(fit.r_squared),
                format_num(fit.adj_r_squared)
            ),
            format!(
                "F statistic: {}, p value: {}",
                format_num(fit.f_statistic),
                format_p(fit.f_p_value)
            ),
            format!("Observations: {}", fit.n_obs),
        ];
        if fit.n_dropped > 0 {
            stats.push(format!("{} rows dropped for missing values", fit.n_dropped));
        }
        self.bullets(&stats);
        self.paragraph("Signif. codes: `***` < 0.001, `**` < 0.01, `*` < 0.05, `.` < 0.1");
        self
    }

    pub fn as_str(&self) -> &str {
        &self.body
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.body)
            .with_context(|| format!("failed to write report {}", path.display()))
    }
}

/// Four significant decimals, switching to scientific notation for very
/// large or small magnitudes.
pub fn format_num(v: f64) -> String {
    if !v.is_finite() {
        return "NA".to_string();
    }
    let a = v.abs();
    if a != 0.0 && !(1e-4..1e6).contains(&a) {
        format!("{v:.3e}")
    } else {
        format!("{v:.4}")
    }
}

pub fn format_p(p: f64) -> String {
    if !p.is_finite() {
        "NA".to_string()
    } else if p < 2e-16 {
        "< 2e-16".to_string()
    } else {
        format_num(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fit;
    use ndarray::array;

    #[test]
    fn test_format_num() {
        assert_eq!(format_num(1.23456), "1.2346");
        assert_eq!(format_num(0.0), "0.0000");
        assert_eq!(format_num(f64::NAN), "NA");
        assert_eq!(format_num(1.5e7), "1.500e7");
        assert_eq!(format_p(1e-20), "< 2e-16");
    }

    #[test]
    fn test_table_escapes_pipes() {
        let mut report = MarkdownReport::new("T");
        report.table(&["a", "b"], &[vec!["x|y", "z"]]);
        assert!(report.as_str().contains("| x\\|y | z |"));
        assert!(report.as_str().contains("|---|---|"));
    }

    #[test]
    fn test_model_summary_lists_terms() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![2.0, 4.0, 5.0, 4.0, 5.0];
        let model = fit(&["x"], x.view(), y.view()).unwrap();

        let mut report = MarkdownReport::new("Models");
        report.model_summary("Simple", "y ~ x", &model);
        let text = report.as_str();

        assert!(text.starts_with("# Models"));
        assert!(text.contains("### Simple"));
        assert!(text.contains("| (Intercept) | 2.2000 |"));
        assert!(text.contains("on 3 degrees of freedom"));
    }
}
