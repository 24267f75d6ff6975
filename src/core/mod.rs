//! Core computation for SUDEPmonitor recordings.
//!
//! This module contains:
//! - Date keys naming sessions and events
//! - Sliding-window statistics (Poincaré dispersion, windowed variance)
//! - HRV analysis (CSI traces, Lorenz plots)
//! - Movement detection on accelerometer traces
//! - Distribution summaries and the variance table

pub mod date_key;
pub mod detection;
pub mod distribution;
pub mod hrv;
pub mod report;
pub mod windowing;

// Re-export commonly used types
pub use date_key::{sort_readable, sort_tokens, DateKey};
pub use detection::{
    detect_high_variance, AccelDetection, AxisDetection, EventDetector, DEFAULT_THRESHOLD,
    DEFAULT_WINDOW_SECONDS,
};
pub use distribution::{
    beat_interval_histogram, difference_histogram, BeatDistribution, DifferenceDistribution,
    Histogram,
};
pub use hrv::{
    beat_intervals, csi, poincare_summary, CsiTrace, HrvAnalyzer, PoincareSummary,
    DEFAULT_CSI_WINDOW,
};
pub use report::{VarianceTable, DEFAULT_VARIANCE_WINDOW};
pub use windowing::{
    moving_average, poincare_dispersion, sliding_windows, variance_statistics,
    windowed_sample_variance, CsiSeries, Dispersion, VarianceSummary, ZeroDispersionPolicy,
};
