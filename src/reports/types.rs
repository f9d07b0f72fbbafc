//! Summary types shared by the reports.

use serde::Serialize;

use crate::model::{OlsError, OlsFit, fit};
use crate::reshape::JoinResult;

/// A fitted model with the labels used when printing it.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub name: String,
    pub formula: String,
    pub fit: OlsFit,
}

impl ModelSummary {
    /// Fits `response ~ columns` and labels the result.
    pub fn fit_columns(
        name: &str,
        response_name: &str,
        response: &[f64],
        names: &[String],
        columns: &[Vec<f64>],
    ) -> Result<Self, OlsError> {
        let x = crate::model::ols::column_stack(columns)?;
        let labels: Vec<&str> = names.iter().map(String::as_str).collect();
        let fit = fit(&labels, x.view(), ndarray::ArrayView1::from(response))?;

        Ok(Self {
            name: name.to_string(),
            formula: format!("{response_name} ~ {}", names.join(" + ")),
            fit,
        })
    }
}

/// How a keyed join went, for reporting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JoinDiagnostics {
    pub matched: usize,
    pub left_only: Vec<String>,
    pub right_only: Vec<String>,
}

impl JoinDiagnostics {
    pub fn from_join<K, L, R>(join: &JoinResult<K, L, R>, key: impl Fn(&K) -> String) -> Self {
        Self {
            matched: join.matched.len(),
            left_only: join.left_only.iter().map(&key).collect(),
            right_only: join.right_only.iter().map(&key).collect(),
        }
    }

    /// Up to `limit` keys joined by commas, with a count of the rest.
    pub fn preview(keys: &[String], limit: usize) -> String {
        if keys.is_empty() {
            return "none".to_string();
        }
        let shown = keys.iter().take(limit).cloned().collect::<Vec<_>>().join(", ");
        if keys.len() > limit {
            format!("{shown} and {} more", keys.len() - limit)
        } else {
            shown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reshape::inner_join;

    #[test]
    fn test_fit_columns_formula() {
        let summary = ModelSummary::fit_columns(
            "m",
            "y",
            &[1.0, 3.0, 5.0, 7.0],
            &["x".to_string()],
            &[vec![0.0, 1.0, 2.0, 3.0]],
        )
        .unwrap();
        assert_eq!(summary.formula, "y ~ x");
        assert!((summary.fit.coefficients[1].estimate - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_diagnostics_from_join() {
        let join = inner_join(vec![(1u32, ()), (2, ())], vec![(2u32, ()), (3, ())]);
        let diag = JoinDiagnostics::from_join(&join, |k| format!("{k:05}"));
        assert_eq!(diag.matched, 1);
        assert_eq!(diag.left_only, vec!["00001"]);
        assert_eq!(diag.right_only, vec!["00003"]);
    }

    #[test]
    fn test_preview() {
        let keys: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(JoinDiagnostics::preview(&keys, 2), "a, b and 1 more");
        assert_eq!(JoinDiagnostics::preview(&keys, 5), "a, b, c");
        assert_eq!(JoinDiagnostics::preview(&[], 5), "none");
    }
}
