//! Heart-rate variability from Poincaré (Lorenz) plots.
//!
//! Watch heart-rate samples are averages over many beats, so the beat
//! intervals derived here, and the CSI computed from them, are
//! approximations of true beat-to-beat values.

use crate::core::windowing::{poincare_dispersion, CsiSeries, ZeroDispersionPolicy};
use crate::error::StatsError;
use crate::model::HeartData;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Common CSI window lengths are 30, 50 and 100 beats.
pub const DEFAULT_CSI_WINDOW: usize = 50;

/// Convert heart rate (bpm) to beat intervals in seconds.
pub fn beat_intervals(heart_rate: &[f64]) -> Vec<f64> {
    heart_rate.iter().map(|hr| 60.0 / hr).collect()
}

/// Cardiac sympathetic index (SD2/SD1) over sliding windows.
///
/// With `from_watch` set, `series` is heart rate in bpm and is converted
/// to beat intervals first; otherwise it already holds beat intervals.
pub fn csi(
    series: &[f64],
    window: usize,
    from_watch: bool,
    policy: ZeroDispersionPolicy,
) -> Result<CsiSeries, StatsError> {
    let dispersion = if from_watch {
        poincare_dispersion(&beat_intervals(series), window)?
    } else {
        poincare_dispersion(series, window)?
    };
    Ok(dispersion.ratio(policy))
}

/// CSI values aligned to session time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CsiTrace {
    /// Session time at the end of each window (s)
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

/// Whole-series Poincaré descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoincareSummary {
    pub sd1: f64,
    pub sd2: f64,
    /// Mean of the first coordinate (beat i)
    pub centroid_x: f64,
    /// Mean of the second coordinate (beat i + 1)
    pub centroid_y: f64,
}

/// SD1/SD2 over the whole beat-interval series as one window.
pub fn poincare_summary(beats: &[f64]) -> Result<PoincareSummary, StatsError> {
    let window = beats.len().saturating_sub(1);
    let dispersion = poincare_dispersion(beats, window)?;

    Ok(PoincareSummary {
        sd1: dispersion.sd1[0],
        sd2: dispersion.sd2[0],
        centroid_x: beats[..window].iter().mean(),
        centroid_y: beats[1..].iter().mean(),
    })
}

/// Builds CSI traces and Lorenz plot data for sessions.
#[derive(Debug, Clone, Copy)]
pub struct HrvAnalyzer {
    window: usize,
    policy: ZeroDispersionPolicy,
}

impl Default for HrvAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_CSI_WINDOW, ZeroDispersionPolicy::default())
    }
}

impl HrvAnalyzer {
    pub fn new(window: usize, policy: ZeroDispersionPolicy) -> Self {
        Self { window, policy }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// CSI over a session's heart-rate samples.
    ///
    /// Each value is stamped with the sample time at the end of its window.
    pub fn csi_trace(&self, heart: &HeartData) -> Result<CsiTrace, StatsError> {
        let series = csi(heart.heart_rate(), self.window, true, self.policy)?;
        let times = heart.times();

        Ok(CsiTrace {
            times: series
                .window_index
                .iter()
                .map(|&i| times[i + self.window])
                .collect(),
            values: series.values,
        })
    }

    /// Successive beat-interval pairs in milliseconds.
    pub fn lorenz_points(&self, heart: &HeartData) -> Vec<(f64, f64)> {
        let beats_ms: Vec<f64> = heart
            .heart_rate()
            .iter()
            .map(|hr| 60.0 * 1000.0 / hr)
            .collect();
        beats_ms.windows(2).map(|p| (p[0], p[1])).collect()
    }

    /// Whole-session Poincaré descriptors in milliseconds.
    pub fn poincare_summary(&self, heart: &HeartData) -> Result<PoincareSummary, StatsError> {
        let beats_ms: Vec<f64> = beat_intervals(heart.heart_rate())
            .into_iter()
            .map(|b| b * 1000.0)
            .collect();
        poincare_summary(&beats_ms)
    }
}
