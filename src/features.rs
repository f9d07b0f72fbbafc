//! Derived columns: Fourier terms, per-capita rates and standardized scores.
//!
//! Everything here is a pure function of its inputs. Non-finite inputs
//! propagate as `NaN` instead of raising errors.

use std::f64::consts::TAU;

use crate::model::utility::{mean, sample_stddev};

/// A set of sine/cosine pairs at one period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FourierSpec {
    pub label: &'static str,
    pub period: f64,
    pub harmonics: u32,
}

/// Two harmonics of the 24 hour cycle.
pub const DAILY: FourierSpec = FourierSpec {
    label: "daily",
    period: 24.0,
    harmonics: 2,
};

/// Two harmonics of the 168 hour cycle.
pub const WEEKLY: FourierSpec = FourierSpec {
    label: "weekly",
    period: 168.0,
    harmonics: 2,
};

/// `[sin(2πk·i/P), cos(2πk·i/P)]` for `k = 1..=harmonics`.
pub fn fourier_terms(index: f64, period: f64, harmonics: u32) -> Vec<f64> {
    let mut out = Vec::with_capacity(2 * harmonics as usize);
    for k in 1..=harmonics {
        let angle = TAU * k as f64 * index / period;
        out.push(angle.sin());
        out.push(angle.cos());
    }
    out
}

/// Column names matching [`fourier_terms`], e.g. `daily_sin1`, `daily_cos1`.
pub fn fourier_names(spec: &FourierSpec) -> Vec<String> {
    (1..=spec.harmonics)
        .flat_map(|k| [format!("{}_sin{k}", spec.label), format!("{}_cos{k}", spec.label)])
        .collect()
}

/// Builds one column per Fourier term across all `specs`, evaluated at each
/// index. Returns `(names, columns)`.
pub fn fourier_columns(indices: &[f64], specs: &[FourierSpec]) -> (Vec<String>, Vec<Vec<f64>>) {
    let names: Vec<String> = specs.iter().flat_map(fourier_names).collect();
    let mut columns = vec![Vec::with_capacity(indices.len()); names.len()];

    for &i in indices {
        let row = specs
            .iter()
            .flat_map(|s| fourier_terms(i, s.period, s.harmonics));
        for (col, value) in columns.iter_mut().zip(row) {
            col.push(value);
        }
    }

    (names, columns)
}

/// `count / population * 1e6`; `NaN` when the population is not positive.
pub fn per_million(count: f64, population: f64) -> f64 {
    if population.is_finite() && population > 0.0 {
        count / population * 1e6
    } else {
        f64::NAN
    }
}

/// Z scores using the sample standard deviation.
///
/// Non-finite inputs are left out of the mean and deviation and map to
/// `NaN`. With fewer than two finite values, or zero spread, every output is
/// `NaN`.
pub fn standardize(values: &[f64]) -> Vec<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let m = mean(&finite);
    let sd = sample_stddev(&finite, m);

    if !sd.is_finite() || sd == 0.0 {
        return vec![f64::NAN; values.len()];
    }

    values
        .iter()
        .map(|v| if v.is_finite() { (v - m) / sd } else { f64::NAN })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::utility::mean;

    #[test]
    fn test_fourier_terms_are_periodic() {
        let a = fourier_terms(5.0, 24.0, 3);
        let b = fourier_terms(29.0, 24.0, 3);
        assert_eq!(a.len(), 6);
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_fourier_terms_at_zero() {
        assert_eq!(fourier_terms(0.0, 168.0, 2), vec![0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_fourier_quarter_period() {
        let t = fourier_terms(6.0, 24.0, 1);
        assert!((t[0] - 1.0).abs() < 1e-12);
        assert!(t[1].abs() < 1e-12);
    }

    #[test]
    fn test_fourier_columns_layout() {
        let (names, cols) = fourier_columns(&[0.0, 1.0, 2.0], &[DAILY, WEEKLY]);
        assert_eq!(
            names,
            vec![
                "daily_sin1", "daily_cos1", "daily_sin2", "daily_cos2",
                "weekly_sin1", "weekly_cos1", "weekly_sin2", "weekly_cos2",
            ]
        );
        assert_eq!(cols.len(), 8);
        assert!(cols.iter().all(|c| c.len() == 3));
        assert_eq!(cols[1][0], 1.0);
    }

    #[test]
    fn test_per_million() {
        assert_eq!(per_million(5.0, 1_000_000.0), 5.0);
        assert_eq!(per_million(1.0, 4.0), 250_000.0);
        assert!(per_million(1.0, 0.0).is_nan());
        assert!(per_million(1.0, f64::NAN).is_nan());
    }

    #[test]
    fn test_standardize_mean_zero_sd_one() {
        let z = standardize(&[1.0, 2.0, 3.0, 4.0, 10.0]);
        assert!(mean(&z).abs() < 1e-12);
        let var = z.iter().map(|v| v * v).sum::<f64>() / (z.len() - 1) as f64;
        assert!((var - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_standardize_propagates_nan() {
        let z = standardize(&[1.0, f64::NAN, 3.0]);
        assert!(z[1].is_nan());
        assert!((z[0] + z[2]).abs() < 1e-12);
    }

    #[test]
    fn test_standardize_constant_is_nan() {
        assert!(standardize(&[2.0, 2.0, 2.0]).iter().all(|v| v.is_nan()));
        assert!(standardize(&[2.0]).iter().all(|v| v.is_nan()));
    }
}
