//! Scalar statistics and least-squares lines.
//!
//! [`ScalarStats`] summarises one numeric column across many runs and merges
//! associatively, so per-thread partial summaries can be combined in any
//! grouping. [`LinearFit`] is the first-degree polynomial fit used for facet
//! growth rates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Statistics for a single scalar column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalarStats {
    /// Arithmetic mean
    pub mean: f64,
    /// Population variance (σ²)
    pub variance: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
    /// Number of samples contributing to these stats
    pub sample_count: u64,
}

impl Default for ScalarStats {
    fn default() -> Self {
        Self::empty()
    }
}

impl ScalarStats {
    /// Create stats from a single value.
    #[must_use]
    pub fn from_value(value: f64) -> Self {
        Self {
            mean: value,
            variance: 0.0,
            min: value,
            max: value,
            sample_count: 1,
        }
    }

    /// Create empty stats.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            mean: 0.0,
            variance: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sample_count: 0,
        }
    }

    /// Summarise every finite value of `values`; NaN/infinite entries are ignored.
    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(Self::empty(), |acc, v| Self::merge(&acc, &Self::from_value(v)))
    }

    /// Merge two stats using weighted combination.
    ///
    /// Uses the parallel form of Welford's algorithm for combining variances.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn merge(a: &Self, b: &Self) -> Self {
        if a.sample_count == 0 {
            return *b;
        }
        if b.sample_count == 0 {
            return *a;
        }

        let n_a = a.sample_count as f64;
        let n_b = b.sample_count as f64;
        let n_total = n_a + n_b;

        let delta = b.mean - a.mean;
        let mean = a.mean + delta * (n_b / n_total);

        let variance = (a.variance * n_a + b.variance * n_b + delta * delta * n_a * n_b / n_total)
            / n_total;

        Self {
            mean,
            variance,
            min: a.min.min(b.min),
            max: a.max.max(b.max),
            sample_count: a.sample_count + b.sample_count,
        }
    }

    /// Standard deviation.
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }
}

/// Why a line could not be fitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FitError {
    /// `x` and `y` have different lengths.
    #[error("x has {x} samples but y has {y}")]
    LengthMismatch {
        /// Number of x samples
        x: usize,
        /// Number of y samples
        y: usize,
    },
    /// Fewer than two finite samples.
    #[error("need at least 2 samples, found {0}")]
    TooFewSamples(usize),
    /// Every x is identical, so the slope is undefined.
    #[error("x values have zero variance")]
    ZeroVariance,
}

/// `y = slope * x + intercept`, fitted by ordinary least squares.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    /// Rate of change of y with x
    pub slope: f64,
    /// Value of y at x = 0
    pub intercept: f64,
}

impl LinearFit {
    /// Fit a line through `(x[i], y[i])`, skipping pairs with a non-finite member.
    ///
    /// Sample spacing need not be uniform.
    ///
    /// # Errors
    ///
    /// Returns [`FitError`] for mismatched inputs, fewer than two usable
    /// samples, or constant `x`.
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(x: &[f64], y: &[f64]) -> Result<Self, FitError> {
        if x.len() != y.len() {
            return Err(FitError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }

        let samples: Vec<(f64, f64)> = x
            .iter()
            .zip(y)
            .map(|(&a, &b)| (a, b))
            .filter(|(a, b)| a.is_finite() && b.is_finite())
            .collect();
        if samples.len() < 2 {
            return Err(FitError::TooFewSamples(samples.len()));
        }

        let n = samples.len() as f64;
        let mean_x = samples.iter().map(|s| s.0).sum::<f64>() / n;
        let mean_y = samples.iter().map(|s| s.1).sum::<f64>() / n;

        let (sxy, sxx) = samples.iter().fold((0.0, 0.0), |(sxy, sxx), &(a, b)| {
            let dx = a - mean_x;
            (sxy + dx * (b - mean_y), sxx + dx * dx)
        });
        if sxx <= f64::EPSILON * n * mean_x.abs().max(1.0).powi(2) {
            return Err(FitError::ZeroVariance);
        }

        let slope = sxy / sxx;
        Ok(Self {
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }

    /// Evaluate the line at `x`.
    #[must_use]
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_scalar_stats_merge() {
        let a = ScalarStats::from_value(10.0);
        let b = ScalarStats::from_value(20.0);
        let merged = ScalarStats::merge(&a, &b);

        assert_eq!(merged.mean, 15.0);
        assert_eq!(merged.min, 10.0);
        assert_eq!(merged.max, 20.0);
        assert_eq!(merged.sample_count, 2);
        // Variance should be 25.0 ((10-15)² + (20-15)²) / 2
        assert!((merged.variance - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_scalar_stats_merge_empty() {
        let a = ScalarStats::empty();
        let b = ScalarStats::from_value(10.0);
        let merged = ScalarStats::merge(&a, &b);

        assert_eq!(merged.mean, 10.0);
        assert_eq!(merged.sample_count, 1);
    }

    #[test]
    fn test_from_values_skips_non_finite() {
        let stats = ScalarStats::from_values([1.0, f64::NAN, 3.0, f64::INFINITY]);
        assert_eq!(stats.sample_count, 2);
        assert_eq!(stats.mean, 2.0);
        assert!((stats.std_dev() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_fit_exact_line() {
        let x = [0.0, 1.0, 2.5, 7.0];
        let y: Vec<f64> = x.iter().map(|t| 3.0 * t - 2.0).collect();
        let fit = LinearFit::fit(&x, &y).unwrap();
        assert!((fit.slope - 3.0).abs() < 1e-12);
        assert!((fit.intercept + 2.0).abs() < 1e-12);
        assert!((fit.predict(10.0) - 28.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_fit_errors() {
        assert_eq!(
            LinearFit::fit(&[1.0, 2.0], &[1.0]),
            Err(FitError::LengthMismatch { x: 2, y: 1 })
        );
        assert_eq!(LinearFit::fit(&[1.0], &[1.0]), Err(FitError::TooFewSamples(1)));
        assert_eq!(
            LinearFit::fit(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]),
            Err(FitError::ZeroVariance)
        );
    }

    proptest! {
        #[test]
        fn prop_merge_matches_direct(values in proptest::collection::vec(-1e3f64..1e3, 2..50)) {
            let split = values.len() / 2;
            let left = ScalarStats::from_values(values[..split].iter().copied());
            let right = ScalarStats::from_values(values[split..].iter().copied());
            let merged = ScalarStats::merge(&left, &right);
            let direct = ScalarStats::from_values(values.iter().copied());
            prop_assert!((merged.mean - direct.mean).abs() < 1e-9);
            prop_assert!((merged.variance - direct.variance).abs() < 1e-6);
        }

        #[test]
        fn prop_fit_recovers_slope_with_irregular_spacing(
            rate in -50.0f64..50.0,
            offset in -100.0f64..100.0,
            gaps in proptest::collection::vec(0.01f64..10.0, 2..40),
        ) {
            let mut t = 0.0;
            let mut x = vec![t];
            for g in &gaps {
                t += g;
                x.push(t);
            }
            let y: Vec<f64> = x.iter().map(|v| rate * v + offset).collect();
            let fit = LinearFit::fit(&x, &y).unwrap();
            prop_assert!((fit.slope - rate).abs() < 1e-8 * rate.abs().max(1.0));
        }
    }
}
