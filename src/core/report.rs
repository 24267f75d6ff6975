//! LaTeX-ready table of accelerometer variance statistics.
//!
//! Each row averages one axis's [`VarianceSummary`] over the sessions added
//! to the table. Columns are max, min, mean and variance of the windowed
//! variance series.

use crate::core::windowing::{variance_statistics, VarianceSummary};
use crate::error::StatsError;
use crate::model::AccelData;
use std::fmt::Write as _;
use std::path::Path;

/// Default window for variance statistics (samples).
pub const DEFAULT_VARIANCE_WINDOW: usize = 40;

const COLUMN_SEPARATOR: &str = " & ";
const ROW_TERMINATOR: &str = " \\\\\n";

/// Per-session variance statistics for x, y and z.
#[derive(Debug, Clone)]
pub struct VarianceTable {
    window: usize,
    axes: [Vec<VarianceSummary>; 3],
}

impl VarianceTable {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            axes: Default::default(),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Number of sessions added.
    pub fn sessions(&self) -> usize {
        self.axes[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions() == 0
    }

    /// Add one session's accelerometer data.
    ///
    /// Nothing is added unless all three axes have enough samples.
    pub fn push_session(&mut self, accel: &AccelData) -> Result<(), StatsError> {
        let [(_, x), (_, y), (_, z)] = accel.axes();
        let row = [
            variance_statistics(x, self.window)?,
            variance_statistics(y, self.window)?,
            variance_statistics(z, self.window)?,
        ];
        for (axis, summary) in self.axes.iter_mut().zip(row) {
            axis.push(summary);
        }
        Ok(())
    }

    /// Column-wise means for x, y and z, in that order.
    pub fn mean_rows(&self) -> [[f64; 4]; 3] {
        let mut rows = [[0.0; 4]; 3];
        let n = self.sessions();
        if n == 0 {
            return rows;
        }
        for (row, summaries) in rows.iter_mut().zip(&self.axes) {
            for summary in summaries {
                for (acc, v) in row.iter_mut().zip(summary.as_array()) {
                    *acc += v;
                }
            }
            for acc in row.iter_mut() {
                *acc /= n as f64;
            }
        }
        rows
    }

    /// Render the table body, one ` \\`-terminated line per axis.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for row in self.mean_rows() {
            let cells: Vec<String> = row.iter().map(|&v| format_scientific(v)).collect();
            // Writing to a String cannot fail
            let _ = write!(out, "{}{}", cells.join(COLUMN_SEPARATOR), ROW_TERMINATOR);
        }
        out
    }

    /// Write the rendered table to `path`.
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.render())?;
        tracing::info!(path = ?path, sessions = self.sessions(), "wrote variance table");
        Ok(())
    }
}

/// Scientific notation with four decimals and a signed, two-digit exponent,
/// e.g. `1.2340e+00`.
pub fn format_scientific(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let formatted = format!("{value:.4e}");
    match formatted.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        None => formatted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_scientific() {
        assert_eq!(format_scientific(1.234), "1.2340e+00");
        assert_eq!(format_scientific(0.0), "0.0000e+00");
        assert_eq!(format_scientific(-0.00125), "-1.2500e-03");
        assert_eq!(format_scientific(18.0), "1.8000e+01");
        assert_eq!(format_scientific(1.0e120), "1.0000e+120");
    }

    #[test]
    fn test_empty_table_renders_zero_rows() {
        let table = VarianceTable::new(4);
        assert!(table.is_empty());
        assert_eq!(
            table.render(),
            "0.0000e+00 & 0.0000e+00 & 0.0000e+00 & 0.0000e+00 \\\\\n".repeat(3)
        );
    }

    #[test]
    fn test_render_single_session() {
        // x differences [0, 0, 9] give a single variance of 18
        let accel = AccelData::new(
            vec![0.0, 0.0, 0.0, 9.0],
            vec![1.0; 4],
            vec![1.0; 4],
        )
        .unwrap();
        let mut table = VarianceTable::new(4);
        table.push_session(&accel).unwrap();

        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "1.8000e+01 & 1.8000e+01 & 1.8000e+01 & 0.0000e+00 \\\\");
        assert_eq!(lines[1], "0.0000e+00 & 0.0000e+00 & 0.0000e+00 & 0.0000e+00 \\\\");
    }

    #[test]
    fn test_mean_rows_average_sessions() {
        let quiet = AccelData::new(vec![0.0; 4], vec![0.0; 4], vec![0.0; 4]).unwrap();
        let jolt = AccelData::new(vec![0.0, 0.0, 0.0, 9.0], vec![0.0; 4], vec![0.0; 4]).unwrap();

        let mut table = VarianceTable::new(4);
        table.push_session(&quiet).unwrap();
        table.push_session(&jolt).unwrap();

        assert_eq!(table.sessions(), 2);
        assert_eq!(table.mean_rows()[0], [9.0, 9.0, 9.0, 0.0]);
    }

    #[test]
    fn test_short_session_is_rejected() {
        let short = AccelData::new(vec![0.0; 3], vec![0.0; 3], vec![0.0; 3]).unwrap();
        let mut table = VarianceTable::new(4);
        assert!(table.push_session(&short).is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn test_write_to() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("tables").join("vars.tex");
        let table = VarianceTable::new(DEFAULT_VARIANCE_WINDOW);

        table.write_to(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), table.render());
    }
}
