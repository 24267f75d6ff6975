//! Movement event detection on accelerometer traces.
//!
//! A sample is flagged when the windowed variance of first differences for
//! the window ending at it exceeds a threshold.

use crate::core::windowing::windowed_sample_variance;
use crate::error::StatsError;
use crate::model::SessionRecord;
use serde::{Deserialize, Serialize};

/// Default detection window length in seconds.
pub const DEFAULT_WINDOW_SECONDS: f64 = 5.0;

/// Default variance threshold (G²).
pub const DEFAULT_THRESHOLD: f64 = 1.0;

/// Flag samples whose trailing window has variance strictly above
/// `threshold`.
///
/// `threshold` is compared against the population variance of the window's
/// first differences, as computed by [`windowed_sample_variance`].
///
/// The mask has one entry per input sample; the first `window - 1` are
/// always false since no full window ends there.
pub fn detect_high_variance(
    signal: &[f64],
    window: usize,
    threshold: f64,
) -> Result<Vec<bool>, StatsError> {
    let variance = windowed_sample_variance(signal, window)?;

    let mut mask = vec![false; window - 1];
    mask.extend(variance.iter().map(|&v| v > threshold));
    Ok(mask)
}

/// Detection result for one accelerometer axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisDetection {
    pub axis: String,
    pub mask: Vec<bool>,
    /// Session times of flagged samples (s)
    pub flagged_times: Vec<f64>,
}

impl AxisDetection {
    pub fn flagged_count(&self) -> usize {
        self.mask.iter().filter(|&&f| f).count()
    }
}

/// Detection results for all three axes of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccelDetection {
    /// Window length used, in samples
    pub window: usize,
    pub axes: Vec<AxisDetection>,
}

/// Flags high-variance movement in session accelerometer data.
#[derive(Debug, Clone, Copy)]
pub struct EventDetector {
    window_seconds: f64,
    threshold: f64,
}

impl Default for EventDetector {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SECONDS, DEFAULT_THRESHOLD)
    }
}

impl EventDetector {
    pub fn new(window_seconds: f64, threshold: f64) -> Self {
        Self {
            window_seconds,
            threshold,
        }
    }

    /// Window length in samples at `sampling_freq`.
    pub fn window_samples(&self, sampling_freq: f64) -> usize {
        (self.window_seconds * sampling_freq).round().max(0.0) as usize
    }

    /// Run detection on every axis of a session.
    ///
    /// Returns `Ok(None)` when the session has no accelerometer channel.
    pub fn detect_session(
        &self,
        session: &SessionRecord,
    ) -> Result<Option<AccelDetection>, StatsError> {
        let (accel, times) = match (session.accel_data.as_present(), session.accel_times()) {
            (Some(accel), Some(times)) => (accel, times),
            _ => return Ok(None),
        };
        let window = self.window_samples(session.accel_sampling_freq);

        let axes = accel
            .axes()
            .iter()
            .map(|(name, signal)| {
                let mask = detect_high_variance(signal, window, self.threshold)?;
                let flagged_times = mask
                    .iter()
                    .zip(&times)
                    .filter(|(&flagged, _)| flagged)
                    .map(|(_, &t)| t)
                    .collect();
                Ok(AxisDetection {
                    axis: name.to_string(),
                    mask,
                    flagged_times,
                })
            })
            .collect::<Result<Vec<_>, StatsError>>()?;

        tracing::debug!(
            window,
            flagged = axes.iter().map(AxisDetection::flagged_count).sum::<usize>(),
            "accelerometer detection complete"
        );

        Ok(Some(AccelDetection { window, axes }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AccelData, Channel};

    #[test]
    fn test_step_scenario() {
        let signal = [1.0, 1.0, 1.0, 1.0, 10.0, 10.0, 10.0, 10.0];
        let mask = detect_high_variance(&signal, 4, 1.0).unwrap();

        assert_eq!(mask.len(), signal.len());
        assert_eq!(
            mask,
            vec![false, false, false, false, true, true, true, false]
        );
    }

    #[test]
    fn test_leading_entries_never_flagged() {
        let signal: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 5.0 } else { -5.0 }).collect();
        let mask = detect_high_variance(&signal, 6, 0.5).unwrap();

        assert_eq!(mask.len(), signal.len());
        assert!(mask[..5].iter().all(|&f| !f));
    }

    #[test]
    fn test_threshold_is_strict() {
        // Differences [0, 0, 9]: variance exactly 18
        let signal = [0.0, 0.0, 0.0, 9.0];
        assert_eq!(
            detect_high_variance(&signal, 4, 18.0).unwrap(),
            vec![false; 4]
        );
        assert_eq!(
            detect_high_variance(&signal, 4, 17.9).unwrap(),
            vec![false, false, false, true]
        );
    }

    #[test]
    fn test_threshold_compares_population_variance() {
        // Sample variance of [0, 0, 9] would be 27 and cross 20
        let signal = [0.0, 0.0, 0.0, 9.0];
        assert_eq!(
            detect_high_variance(&signal, 4, 20.0).unwrap(),
            vec![false; 4]
        );
    }

    #[test]
    fn test_short_signal_fails() {
        assert!(matches!(
            detect_high_variance(&[1.0, 2.0], 4, 1.0),
            Err(StatsError::InsufficientSamples { len: 2, window: 4 })
        ));
    }

    #[test]
    fn test_detect_session() {
        let flat = vec![0.0; 10];
        let mut jolt = vec![0.0; 10];
        jolt[6] = 8.0;

        let session = SessionRecord {
            accel_sampling_freq: 2.0,
            duration_seconds: 5.0,
            accel_data: Channel::Present(
                AccelData::new(jolt, flat.clone(), flat).unwrap(),
            ),
            heart_data: Channel::Absent,
        };

        let detector = EventDetector::new(2.0, 1.0);
        let detection = detector.detect_session(&session).unwrap().unwrap();

        assert_eq!(detection.window, 4);
        assert_eq!(detection.axes.len(), 3);
        assert!(detection.axes[0].flagged_count() > 0);
        assert_eq!(detection.axes[1].flagged_count(), 0);
        assert_eq!(
            detection.axes[0].flagged_times.len(),
            detection.axes[0].flagged_count()
        );
    }

    #[test]
    fn test_detect_session_without_accelerometer() {
        let session = SessionRecord {
            accel_sampling_freq: 50.0,
            duration_seconds: 5.0,
            accel_data: Channel::Absent,
            heart_data: Channel::Absent,
        };
        assert!(EventDetector::default().detect_session(&session).unwrap().is_none());
    }
}
