//! Histogram summaries with fitted reference distributions.
//!
//! Changes in acceleration are compared against a Laplace density and
//! beat intervals against an Erlang density. Fits are descriptive only.

use crate::core::hrv::beat_intervals;
use crate::core::windowing::moving_average;
use crate::error::StatsError;
use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, Erlang, Laplace};
use statrs::statistics::{Data, OrderStatistics, Statistics};

/// Erlang shape used for beat-interval histograms.
pub const ERLANG_SHAPE: u64 = 55;

/// Divisor turning the mean beat interval into the Erlang scale.
const ERLANG_SCALE_DIVISOR: f64 = 50.0;

/// Percentile of the differences bounding the histogram range.
const RANGE_PERCENTILE: usize = 99;

/// A density-normalized histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Bin edges, ascending; one more than the number of bins
    pub edges: Vec<f64>,
    /// Density per bin; integrates to 1 over the range
    pub density: Vec<f64>,
}

impl Histogram {
    /// Histogram of `values` over `edges`. Values outside the range are
    /// ignored; the last bin includes its right edge.
    pub fn with_edges(values: &[f64], edges: Vec<f64>) -> Result<Self, StatsError> {
        if edges.len() < 2 {
            return Err(StatsError::Degenerate("a histogram needs two edges".to_string()));
        }
        let lo = edges[0];
        let hi = edges[edges.len() - 1];
        if hi <= lo {
            return Err(StatsError::Degenerate(format!("empty range [{lo}, {hi}]")));
        }

        let bins = edges.len() - 1;
        let mut counts = vec![0usize; bins];
        for &v in values {
            if v < lo || v > hi {
                continue;
            }
            let idx = edges[1..].partition_point(|&e| e <= v).min(bins - 1);
            counts[idx] += 1;
        }

        let total: usize = counts.iter().sum();
        let density = counts
            .iter()
            .zip(edges.windows(2))
            .map(|(&c, e)| {
                if total == 0 {
                    0.0
                } else {
                    c as f64 / (total as f64 * (e[1] - e[0]))
                }
            })
            .collect();

        Ok(Self { edges, density })
    }
}

/// `count` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Laplace fit to a set of differences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaplaceFit {
    pub location: f64,
    pub scale: f64,
    /// Density at each histogram edge
    pub pdf: Vec<f64>,
}

/// Distribution of first differences of a signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifferenceDistribution {
    /// Histogram range is `[-limit, limit]`
    pub limit: f64,
    pub histogram: Histogram,
    pub fit: LaplaceFit,
}

/// Histogram the first differences of `signal` and fit a Laplace density.
///
/// With `block > 1` the differences are first averaged over
/// non-overlapping blocks. The range is symmetric about zero and bounded
/// by the 99th percentile of the differences; the fit uses only values
/// strictly inside it, with scale `sigma / sqrt(2)` from the sample sigma.
pub fn difference_histogram(
    signal: &[f64],
    block: usize,
    edges: usize,
) -> Result<DifferenceDistribution, StatsError> {
    if signal.len() < 2 {
        return Err(StatsError::InsufficientSamples {
            len: signal.len(),
            window: 2,
        });
    }
    let mut diffs: Vec<f64> = signal.windows(2).map(|p| p[1] - p[0]).collect();
    if block > 1 {
        diffs = moving_average(&diffs, block)?;
    }

    let limit = Data::new(diffs.clone()).percentile(RANGE_PERCENTILE);
    if !(limit > 0.0) {
        return Err(StatsError::Degenerate(format!(
            "difference range limit {limit} is not positive"
        )));
    }

    let inside: Vec<f64> = diffs.iter().copied().filter(|d| d.abs() < limit).collect();
    if inside.len() < 2 {
        return Err(StatsError::Degenerate(
            "too few differences inside the range to fit".to_string(),
        ));
    }
    let location = inside.iter().mean();
    let scale = inside.iter().std_dev() / std::f64::consts::SQRT_2;

    let laplace =
        Laplace::new(location, scale).map_err(|e| StatsError::Degenerate(e.to_string()))?;

    let histogram = Histogram::with_edges(&diffs, linspace(-limit, limit, edges))?;
    let pdf = histogram.edges.iter().map(|&x| laplace.pdf(x)).collect();

    Ok(DifferenceDistribution {
        limit,
        histogram,
        fit: LaplaceFit {
            location,
            scale,
            pdf,
        },
    })
}

/// Distribution of beat intervals with a reference Erlang density.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatDistribution {
    /// Mean beat interval (ms)
    pub mean_ms: f64,
    pub histogram: Histogram,
    pub erlang_shape: u64,
    /// Erlang rate (1/ms)
    pub erlang_rate: f64,
    /// Density at each histogram edge
    pub pdf: Vec<f64>,
}

/// Histogram beat intervals (ms) derived from heart rate and compare them
/// with an Erlang density of shape 55 and rate `50 / mean`.
pub fn beat_interval_histogram(
    heart_rate: &[f64],
    edges: usize,
) -> Result<BeatDistribution, StatsError> {
    if heart_rate.len() < 2 {
        return Err(StatsError::InsufficientSamples {
            len: heart_rate.len(),
            window: 2,
        });
    }
    let beats_ms: Vec<f64> = beat_intervals(heart_rate)
        .into_iter()
        .map(|b| b * 1000.0)
        .collect();

    let lo = beats_ms.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = beats_ms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean_ms = beats_ms.iter().mean();
    let erlang_rate = ERLANG_SCALE_DIVISOR / mean_ms;

    let erlang = Erlang::new(ERLANG_SHAPE, erlang_rate)
        .map_err(|e| StatsError::Degenerate(e.to_string()))?;

    let histogram = Histogram::with_edges(&beats_ms, linspace(lo, hi, edges))?;
    let pdf = histogram.edges.iter().map(|&x| erlang.pdf(x)).collect();

    Ok(BeatDistribution {
        mean_ms,
        histogram,
        erlang_shape: ERLANG_SHAPE,
        erlang_rate,
        pdf,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(2.0, 3.0, 1), vec![2.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_histogram_density_integrates_to_one() {
        let values = [0.1, 0.2, 0.2, 0.7, 1.0, 1.5];
        let hist = Histogram::with_edges(&values, linspace(0.0, 1.0, 5)).unwrap();

        assert_eq!(hist.density.len(), 4);
        let area: f64 = hist
            .density
            .iter()
            .zip(hist.edges.windows(2))
            .map(|(d, e)| d * (e[1] - e[0]))
            .sum();
        assert!((area - 1.0).abs() < 1e-12);
        // 1.0 lands in the last bin, 1.5 is out of range
        assert!(hist.density[3] > 0.0);
    }

    #[test]
    fn test_histogram_rejects_empty_range() {
        assert!(Histogram::with_edges(&[1.0], vec![1.0, 1.0]).is_err());
        assert!(Histogram::with_edges(&[1.0], vec![1.0]).is_err());
    }

    #[test]
    fn test_difference_histogram_is_centered() {
        let signal: Vec<f64> = (0..400)
            .map(|i| ((i * 37) % 101) as f64 / 50.0 - 1.0)
            .collect();
        let dist = difference_histogram(&signal, 1, 40).unwrap();

        assert!(dist.limit > 0.0);
        assert_eq!(dist.histogram.edges.len(), 40);
        assert_eq!(dist.fit.pdf.len(), 40);
        assert!(dist.fit.scale > 0.0);
        assert!(dist.fit.pdf.iter().all(|p| p.is_finite() && *p >= 0.0));
    }

    #[test]
    fn test_difference_histogram_rejects_constant_signal() {
        assert!(matches!(
            difference_histogram(&[3.0; 50], 1, 40),
            Err(StatsError::Degenerate(_))
        ));
    }

    #[test]
    fn test_beat_interval_histogram() {
        let rates: Vec<f64> = (0..200).map(|i| 60.0 + (i % 20) as f64).collect();
        let dist = beat_interval_histogram(&rates, 30).unwrap();

        assert_eq!(dist.histogram.edges.len(), 30);
        assert_eq!(dist.erlang_shape, ERLANG_SHAPE);
        assert!((dist.erlang_rate - 50.0 / dist.mean_ms).abs() < 1e-12);
        assert!(dist.mean_ms > 60_000.0 / 80.0 && dist.mean_ms < 1000.0);
    }
}
