//! Sliding-window statistics over sampled signals.
//!
//! Windows are contiguous, fixed-length and advance one sample at a time.
//! A signal of `N` samples yields `N - w + 1` windows of size `w`; shorter
//! signals are rejected before any computation.

use crate::error::StatsError;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::f64::consts::SQRT_2;

/// Split `signal` into overlapping windows of `window` samples.
///
/// Window `i` covers `signal[i..i + window]`.
pub fn sliding_windows(signal: &[f64], window: usize) -> Result<Vec<&[f64]>, StatsError> {
    check_window(window, 1)?;
    if signal.len() < window {
        return Err(StatsError::InsufficientSamples {
            len: signal.len(),
            window,
        });
    }
    Ok(signal.windows(window).collect())
}

fn check_window(window: usize, min: usize) -> Result<(), StatsError> {
    if window < min {
        return Err(StatsError::InvalidWindow { window, min });
    }
    Ok(())
}

/// What to do with windows whose SD1 is exactly zero when forming SD2/SD1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroDispersionPolicy {
    /// Replace both SD1 and SD2 by 1 so the ratio is 1.
    ///
    /// This is a numerical-stability clamp, not a data-quality signal.
    #[default]
    ClampToUnity,
    /// Drop the window from the ratio series.
    Exclude,
}

/// Windowed Poincaré dispersion of a beat-interval series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispersion {
    /// Short-term dispersion, perpendicular to the identity line
    pub sd1: Vec<f64>,
    /// Long-term dispersion, along the identity line
    pub sd2: Vec<f64>,
}

/// A ratio series keyed by the window each value came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CsiSeries {
    /// Index of the source window for each value
    pub window_index: Vec<usize>,
    /// SD2/SD1 per retained window
    pub values: Vec<f64>,
}

impl CsiSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Dispersion {
    /// Number of windows.
    pub fn len(&self) -> usize {
        self.sd1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sd1.is_empty()
    }

    /// Elementwise SD2/SD1 with zero-SD1 windows handled per `policy`.
    pub fn ratio(&self, policy: ZeroDispersionPolicy) -> CsiSeries {
        let mut series = CsiSeries::default();

        for (i, (&sd1, &sd2)) in self.sd1.iter().zip(&self.sd2).enumerate() {
            if sd1 == 0.0 {
                match policy {
                    ZeroDispersionPolicy::ClampToUnity => {
                        series.window_index.push(i);
                        series.values.push(1.0);
                    }
                    ZeroDispersionPolicy::Exclude => {}
                }
                continue;
            }
            series.window_index.push(i);
            series.values.push(sd2 / sd1);
        }

        series
    }
}

/// Compute SD1 and SD2 for each window of consecutive beat-interval pairs.
///
/// With `x = beats[..N-1]` and `y = beats[1..]`, window `i` pairs
/// `x[i..i+w]` with `y[i..i+w]`, giving `N - w` windows. Standard deviations
/// are sample estimates (n - 1 denominator), so `window` must be at least 2.
/// Values are returned raw; zero handling happens in [`Dispersion::ratio`].
pub fn poincare_dispersion(beats: &[f64], window: usize) -> Result<Dispersion, StatsError> {
    check_window(window, 2)?;
    if beats.len() <= window {
        return Err(StatsError::InsufficientSamples {
            len: beats.len(),
            window: window + 1,
        });
    }

    let xs = sliding_windows(&beats[..beats.len() - 1], window)?;
    let ys = sliding_windows(&beats[1..], window)?;

    let mut sd1 = Vec::with_capacity(xs.len());
    let mut sd2 = Vec::with_capacity(xs.len());

    for (x, y) in xs.into_iter().zip(ys) {
        let mean_x = x.mean();
        let mean_y = y.mean();

        let perpendicular = x
            .iter()
            .zip(y)
            .map(|(a, b)| (a - b) + (mean_y - mean_x))
            .std_dev();
        let parallel = x
            .iter()
            .zip(y)
            .map(|(a, b)| (a + b) - (mean_x + mean_y))
            .std_dev();

        sd1.push(perpendicular / SQRT_2);
        sd2.push(parallel / SQRT_2);
    }

    Ok(Dispersion { sd1, sd2 })
}

/// Variance of the first difference inside each sliding window.
///
/// Captures local "jerk" energy of an acceleration trace. Each window of
/// `w` samples contributes the population variance (divisor `w - 1`, the
/// number of differences) of its `w - 1` differences, so `window` must be
/// at least 2.
///
/// This differs from [`poincare_dispersion`], which uses the sample
/// estimator. Detection thresholds are calibrated against the population
/// value: differences `[0, 0, 9]` give 18 here, not 27.
pub fn windowed_sample_variance(signal: &[f64], window: usize) -> Result<Vec<f64>, StatsError> {
    check_window(window, 2)?;

    Ok(sliding_windows(signal, window)?
        .into_iter()
        .map(|w| w.windows(2).map(|p| p[1] - p[0]).population_variance())
        .collect())
}

/// Summary of a windowed-variance series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarianceSummary {
    pub max: f64,
    pub min: f64,
    pub mean: f64,
    /// Population variance of the variance series
    pub variance: f64,
}

impl VarianceSummary {
    pub fn as_array(&self) -> [f64; 4] {
        [self.max, self.min, self.mean, self.variance]
    }
}

/// Compute the windowed variance of `signal` and summarize it.
pub fn variance_statistics(signal: &[f64], window: usize) -> Result<VarianceSummary, StatsError> {
    let var = windowed_sample_variance(signal, window)?;

    Ok(VarianceSummary {
        max: var.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        min: var.iter().copied().fold(f64::INFINITY, f64::min),
        mean: var.iter().mean(),
        variance: var.iter().population_variance(),
    })
}

/// Non-overlapping block means of `block` samples; a trailing partial block
/// is dropped.
pub fn moving_average(signal: &[f64], block: usize) -> Result<Vec<f64>, StatsError> {
    check_window(block, 1)?;
    if signal.len() < block {
        return Err(StatsError::InsufficientSamples {
            len: signal.len(),
            window: block,
        });
    }
    Ok(signal.chunks_exact(block).map(|c| c.mean()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn test_sliding_window_count() {
        let signal: Vec<f64> = (0..10).map(f64::from).collect();
        for w in 1..=10 {
            let windows = sliding_windows(&signal, w).unwrap();
            assert_eq!(windows.len(), signal.len() - w + 1);
            assert_eq!(windows[0], &signal[..w]);
            assert_eq!(*windows.last().unwrap(), &signal[signal.len() - w..]);
        }
    }

    #[test]
    fn test_sliding_window_too_short() {
        let signal = [1.0, 2.0, 3.0];
        assert_eq!(
            sliding_windows(&signal, 4),
            Err(StatsError::InsufficientSamples { len: 3, window: 4 })
        );
        assert_eq!(
            sliding_windows(&signal, 0),
            Err(StatsError::InvalidWindow { window: 0, min: 1 })
        );
    }

    #[test]
    fn test_constant_beats_have_zero_dispersion() {
        let beats = vec![0.75; 20];
        let dispersion = poincare_dispersion(&beats, 5).unwrap();

        assert_eq!(dispersion.len(), 15);
        assert!(dispersion.sd1.iter().all(|&v| v == 0.0));
        assert!(dispersion.sd2.iter().all(|&v| v.abs() < TOLERANCE));

        let ratio = dispersion.ratio(ZeroDispersionPolicy::ClampToUnity);
        assert_eq!(ratio.len(), 15);
        assert!(ratio.values.iter().all(|&v| v == 1.0));

        let excluded = dispersion.ratio(ZeroDispersionPolicy::Exclude);
        assert!(excluded.is_empty());
    }

    #[test]
    fn test_alternating_beats_disperse_perpendicular() {
        // Alternating intervals sit on a line perpendicular to the identity
        // line, so all spread is short-term.
        let beats = [0.8, 0.9, 0.8, 0.9, 0.8, 0.9];
        let dispersion = poincare_dispersion(&beats, 3).unwrap();

        assert_eq!(dispersion.len(), 3);
        for (&sd1, &sd2) in dispersion.sd1.iter().zip(&dispersion.sd2) {
            assert!(sd1 > 0.05, "sd1 = {sd1}");
            assert!(sd2.abs() < 1e-6, "sd2 = {sd2}");
            assert!(sd1 > sd2);
        }
        // x - y = [-0.1, 0.1, -0.1] shifted by 1/30: sample sd / sqrt(2)
        let expected = (0.04_f64 / 3.0).sqrt() / SQRT_2;
        assert!((dispersion.sd1[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_linear_trend_disperses_along_identity() {
        let beats: Vec<f64> = (0..12).map(|i| 0.6 + 0.01 * i as f64).collect();
        let dispersion = poincare_dispersion(&beats, 4).unwrap();

        for (&sd1, &sd2) in dispersion.sd1.iter().zip(&dispersion.sd2) {
            assert!(sd1 < 1e-6);
            assert!(sd2 > 0.01);
        }
    }

    #[test]
    fn test_poincare_needs_one_extra_beat() {
        assert!(poincare_dispersion(&[0.8, 0.9, 0.8], 3).is_err());
        assert_eq!(poincare_dispersion(&[0.8, 0.9, 0.8, 0.9], 3).unwrap().len(), 1);
        assert_eq!(
            poincare_dispersion(&[0.8, 0.9, 0.8], 1),
            Err(StatsError::InvalidWindow { window: 1, min: 2 })
        );
        assert!(poincare_dispersion(&[], 3).is_err());
    }

    #[test]
    fn test_windowed_variance_of_step() {
        let signal = [1.0, 1.0, 1.0, 1.0, 10.0, 10.0, 10.0, 10.0];
        let var = windowed_sample_variance(&signal, 4).unwrap();

        assert_eq!(var.len(), 5);
        assert_eq!(var[0], 0.0);
        assert_eq!(var[4], 0.0);
        // Differences [0, 0, 9] in any order: population variance 18
        for v in &var[1..4] {
            assert!((v - 18.0).abs() < TOLERANCE);
        }
    }

    #[test]
    fn test_variance_statistics() {
        let signal = [1.0, 1.0, 1.0, 1.0, 10.0, 10.0, 10.0, 10.0];
        let summary = variance_statistics(&signal, 4).unwrap();

        assert!((summary.max - 18.0).abs() < TOLERANCE);
        assert_eq!(summary.min, 0.0);
        assert!((summary.mean - 54.0 / 5.0).abs() < TOLERANCE);
        // Values [0, 18, 18, 18, 0] around mean 10.8
        let expected = (2.0 * 10.8_f64.powi(2) + 3.0 * 7.2_f64.powi(2)) / 5.0;
        assert!((summary.variance - expected).abs() < 1e-6);
    }

    #[test]
    fn test_moving_average_blocks() {
        let signal = [1.0, 3.0, 5.0, 7.0, 9.0];
        assert_eq!(moving_average(&signal, 2).unwrap(), vec![2.0, 6.0]);
        assert_eq!(moving_average(&signal, 1).unwrap(), signal.to_vec());
        assert!(moving_average(&signal, 6).is_err());
    }
}
