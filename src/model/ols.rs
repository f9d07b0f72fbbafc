//! Ordinary least squares with coefficient significance.
//!
//! Solves the normal equations `β = (XᵀX)⁻¹ Xᵀy` through a Cholesky
//! factorization of `XᵀX`. An intercept column is always prepended. Rows
//! containing a non-finite value in `y` or any regressor are dropped first.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};
use thiserror::Error;

use super::signif::signif_code;

pub const INTERCEPT: &str = "(Intercept)";

/// Relative pivot tolerance for detecting collinear columns.
const RANK_TOLERANCE: f64 = 1e-10;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OlsError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Need more rows than parameters: {rows} rows for {params} parameters")]
    InsufficientData { rows: usize, params: usize },

    #[error("Design matrix is rank deficient: column '{column}' is collinear with earlier columns")]
    RankDeficient { column: String },
}

/// One row of the coefficient table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coefficient {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_value: f64,
    pub p_value: f64,
    pub signif: String,
}

/// A fitted linear model.
#[derive(Debug, Clone, Serialize)]
pub struct OlsFit {
    pub coefficients: Vec<Coefficient>,
    /// Fitted values for the rows that were kept, in input order.
    #[serde(skip)]
    pub fitted: Array1<f64>,
    #[serde(skip)]
    pub residuals: Array1<f64>,
    /// Input row indices used in the fit.
    #[serde(skip)]
    pub kept_rows: Vec<usize>,
    pub n_obs: usize,
    pub n_dropped: usize,
    pub df_residual: usize,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub residual_std_error: f64,
    pub f_statistic: f64,
    pub f_p_value: f64,
}

/// Fits `y ~ 1 + x[:, 0] + ... + x[:, k-1]`.
///
/// `names` labels the columns of `x` and must have one entry per column.
///
/// # Errors
///
/// - [`OlsError::DimensionMismatch`] when `names`, `x` and `y` disagree in size.
/// - [`OlsError::InsufficientData`] when, after dropping non-finite rows,
///   there are not more rows than parameters.
/// - [`OlsError::RankDeficient`] when a column is a linear combination of
///   the columns before it.
pub fn fit(names: &[&str], x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<OlsFit, OlsError> {
    if x.nrows() != y.len() {
        return Err(OlsError::DimensionMismatch {
            expected: x.nrows(),
            got: y.len(),
        });
    }
    if names.len() != x.ncols() {
        return Err(OlsError::DimensionMismatch {
            expected: x.ncols(),
            got: names.len(),
        });
    }

    let kept_rows: Vec<usize> = (0..x.nrows())
        .filter(|&i| y[i].is_finite() && x.row(i).iter().all(|v| v.is_finite()))
        .collect();
    let n = kept_rows.len();
    let p = x.ncols() + 1;
    if n <= p {
        return Err(OlsError::InsufficientData { rows: n, params: p });
    }

    let mut design = Array2::<f64>::ones((n, p));
    let mut response = Array1::<f64>::zeros(n);
    for (r, &i) in kept_rows.iter().enumerate() {
        design.row_mut(r).slice_mut(ndarray::s![1..]).assign(&x.row(i));
        response[r] = y[i];
    }

    let mut term_names = Vec::with_capacity(p);
    term_names.push(INTERCEPT.to_string());
    term_names.extend(names.iter().map(|s| s.to_string()));

    let xtx = design.t().dot(&design);
    let xty = design.t().dot(&response);

    let chol = cholesky(&xtx).map_err(|col| OlsError::RankDeficient {
        column: term_names[col].clone(),
    })?;
    let beta = cholesky_solve(&chol, &xty);
    let xtx_inv = cholesky_inverse(&chol);

    let fitted = design.dot(&beta);
    let residuals = &response - &fitted;

    let df = n - p;
    let rss: f64 = residuals.iter().map(|r| r * r).sum();
    let y_mean = response.mean().unwrap_or(0.0);
    let tss: f64 = response.iter().map(|v| (v - y_mean).powi(2)).sum();
    let sigma2 = rss / df as f64;

    let r_squared = if tss > 0.0 { 1.0 - rss / tss } else { f64::NAN };
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (n - 1) as f64 / df as f64;

    let t_dist = StudentsT::new(0.0, 1.0, df as f64).ok();
    let coefficients = term_names
        .into_iter()
        .enumerate()
        .map(|(j, name)| {
            let estimate = beta[j];
            let std_error = (sigma2 * xtx_inv[[j, j]]).max(0.0).sqrt();
            let t_value = estimate / std_error;
            let p_value = two_sided_p(t_dist.as_ref(), t_value);
            Coefficient {
                name,
                estimate,
                std_error,
                t_value,
                p_value,
                signif: signif_code(p_value).to_string(),
            }
        })
        .collect();

    let (f_statistic, f_p_value) = if p > 1 && tss > 0.0 {
        let f = ((tss - rss) / (p - 1) as f64) / sigma2;
        let p_val = FisherSnedecor::new((p - 1) as f64, df as f64)
            .ok()
            .map_or(f64::NAN, |dist| upper_tail(&dist, f));
        (f, p_val)
    } else {
        (f64::NAN, f64::NAN)
    };

    Ok(OlsFit {
        coefficients,
        fitted,
        residuals,
        n_dropped: x.nrows() - n,
        kept_rows,
        n_obs: n,
        df_residual: df,
        r_squared,
        adj_r_squared,
        residual_std_error: sigma2.sqrt(),
        f_statistic,
        f_p_value,
    })
}

impl OlsFit {
    /// Predicts the response for new regressor rows (without the intercept
    /// column).
    pub fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, OlsError> {
        let k = self.coefficients.len() - 1;
        if x.ncols() != k {
            return Err(OlsError::DimensionMismatch {
                expected: k,
                got: x.ncols(),
            });
        }
        let slopes: Array1<f64> = self.coefficients[1..].iter().map(|c| c.estimate).collect();
        Ok(x.dot(&slopes) + self.coefficients[0].estimate)
    }

    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }

    /// Fitted values spread back over the input rows; dropped rows are NaN.
    pub fn fitted_for_input(&self, n_rows: usize) -> Array1<f64> {
        let mut out = Array1::from_elem(n_rows, f64::NAN);
        for (&row, &value) in self.kept_rows.iter().zip(self.fitted.iter()) {
            if row < n_rows {
                out[row] = value;
            }
        }
        out
    }
}

fn two_sided_p(dist: Option<&StudentsT>, t: f64) -> f64 {
    match dist {
        Some(_) if t.is_infinite() => 0.0,
        Some(d) if t.is_finite() => (2.0 * d.sf(t.abs())).min(1.0),
        _ => f64::NAN,
    }
}

fn upper_tail(dist: &FisherSnedecor, f: f64) -> f64 {
    if f.is_infinite() {
        0.0
    } else if f.is_finite() {
        dist.sf(f.max(0.0))
    } else {
        f64::NAN
    }
}

/// Lower-triangular `L` with `A = L Lᵀ`. On failure returns the index of
/// the column whose pivot vanished.
fn cholesky(a: &Array2<f64>) -> Result<Array2<f64>, usize> {
    let n = a.nrows();
    let scale = a
        .diag()
        .iter()
        .fold(0.0f64, |acc, v| acc.max(v.abs()))
        .max(f64::MIN_POSITIVE);
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= RANK_TOLERANCE * scale {
                    return Err(i);
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    Ok(l)
}

/// Solves `L Lᵀ x = b`.
fn cholesky_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();

    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * z[j];
        }
        z[i] = (b[i] - sum) / l[[i, i]];
    }

    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (z[i] - sum) / l[[i, i]];
    }

    x
}

fn cholesky_inverse(l: &Array2<f64>) -> Array2<f64> {
    let n = l.nrows();
    let mut inv = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut e = Array1::<f64>::zeros(n);
        e[j] = 1.0;
        inv.column_mut(j).assign(&cholesky_solve(l, &e));
    }
    inv
}

/// Stacks equally long columns into a matrix.
pub fn column_stack(columns: &[Vec<f64>]) -> Result<Array2<f64>, OlsError> {
    let rows = columns.first().map_or(0, Vec::len);
    let mut out = Array2::<f64>::zeros((rows, columns.len()));
    for (j, col) in columns.iter().enumerate() {
        if col.len() != rows {
            return Err(OlsError::DimensionMismatch {
                expected: rows,
                got: col.len(),
            });
        }
        out.index_axis_mut(Axis(1), j)
            .assign(&ArrayView1::from(col.as_slice()));
    }
    Ok(out)
}
