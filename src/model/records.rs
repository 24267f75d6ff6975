//! In-memory data model for a monitored user.
//!
//! Records are immutable snapshots materialized from the remote store or
//! from a cache entry. Missing sensor channels are explicit
//! [`Channel::Absent`] values rather than sentinels.

use crate::core::date_key::DateKey;
use crate::error::AssemblyError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Remote key holding a user's metadata rather than a session.
pub const METADATA_KEY: &str = "MetaData";

/// A sensor channel that may be missing from a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Channel<T> {
    Present(T),
    Absent,
}

impl<T> Channel<T> {
    pub fn as_present(&self) -> Option<&T> {
        match self {
            Channel::Present(data) => Some(data),
            Channel::Absent => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Channel::Present(_))
    }
}

/// Profile data for a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub dob: String,
    pub gender: String,
    pub height_m: f64,
    pub weight_kg: f64,
}

impl ProfileRecord {
    /// Build from the remote profile mapping. Absent fields default.
    pub fn from_json(map: &Map<String, Value>) -> Result<Self, AssemblyError> {
        Ok(Self {
            dob: optional_string(map, "Date of Birth"),
            gender: optional_string(map, "Gender"),
            height_m: optional_f64(map, "Height (m)")?.unwrap_or_default(),
            weight_kg: optional_f64(map, "Weight (kg)")?.unwrap_or_default(),
        })
    }
}

impl fmt::Display for ProfileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\tDate of Birth: {}", self.dob)?;
        writeln!(f, "\tGender: {}", self.gender)?;
        writeln!(f, "\tHeight: {} m", self.height_m)?;
        writeln!(f, "\tWeight: {} kg", self.weight_kg)
    }
}

/// Three-axis accelerometer samples of equal length (in G).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccelData {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

impl AccelData {
    pub fn new(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Result<Self, AssemblyError> {
        if x.len() != y.len() || x.len() != z.len() {
            return Err(AssemblyError::ChannelLength {
                channel: "accelerometer",
                detail: format!("x={}, y={}, z={}", x.len(), y.len(), z.len()),
            });
        }
        Ok(Self { x, y, z })
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn z(&self) -> &[f64] {
        &self.z
    }

    /// Axes in x, y, z order, labelled.
    pub fn axes(&self) -> [(&'static str, &[f64]); 3] {
        [
            ("x", self.x.as_slice()),
            ("y", self.y.as_slice()),
            ("z", self.z.as_slice()),
        ]
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Heart-rate samples (bpm) with their offsets from session start (s).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartData {
    times: Vec<f64>,
    heart_rate: Vec<f64>,
}

impl HeartData {
    pub fn new(times: Vec<f64>, heart_rate: Vec<f64>) -> Result<Self, AssemblyError> {
        if times.len() != heart_rate.len() {
            return Err(AssemblyError::ChannelLength {
                channel: "heart rate",
                detail: format!("times={}, heart_rate={}", times.len(), heart_rate.len()),
            });
        }
        Ok(Self { times, heart_rate })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn heart_rate(&self) -> &[f64] {
        &self.heart_rate
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Mean heart rate, or `None` with no samples.
    pub fn mean_heart_rate(&self) -> Option<f64> {
        if self.heart_rate.is_empty() {
            None
        } else {
            Some(self.heart_rate.iter().mean())
        }
    }
}

/// One recording session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Accelerometer samples per second
    pub accel_sampling_freq: f64,
    /// Elapsed time of the session in seconds
    pub duration_seconds: f64,
    pub accel_data: Channel<AccelData>,
    pub heart_data: Channel<HeartData>,
}

impl SessionRecord {
    /// Build from the remote session mapping.
    pub fn from_json(map: &Map<String, Value>) -> Result<Self, AssemblyError> {
        let accel_data = match map.get("Accelerometer data") {
            Some(Value::Object(accel)) => Channel::Present(AccelData::new(
                required_array(accel, "x")?,
                required_array(accel, "y")?,
                required_array(accel, "z")?,
            )?),
            Some(other) => return Err(field_error("Accelerometer data", other)),
            None => Channel::Absent,
        };

        let heart_data = match map.get("Heartrate data") {
            Some(Value::Object(heart)) => Channel::Present(HeartData::new(
                required_array(heart, "Times")?,
                required_array(heart, "Heartrate")?,
            )?),
            Some(other) => return Err(field_error("Heartrate data", other)),
            None => Channel::Absent,
        };

        Ok(Self {
            accel_sampling_freq: required_f64(map, "Accelerometer sampling frequency")?,
            duration_seconds: required_f64(map, "Duration")?,
            accel_data,
            heart_data,
        })
    }

    /// Evenly spaced time axis for the accelerometer samples.
    ///
    /// Runs from 0 to `len / accel_sampling_freq` inclusive.
    pub fn accel_times(&self) -> Option<Vec<f64>> {
        let accel = self.accel_data.as_present()?;
        let n = accel.len();
        if n == 0 || self.accel_sampling_freq <= 0.0 {
            return Some(Vec::new());
        }
        let end = n as f64 / self.accel_sampling_freq;
        if n == 1 {
            return Some(vec![0.0]);
        }
        let step = end / (n - 1) as f64;
        Some((0..n).map(|i| i as f64 * step).collect())
    }

    /// Short multi-line summary.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "\tAccelerometer sampling frequency: {} samples/s\n\
             \tElapsed time of session: {:.2} s\n",
            self.accel_sampling_freq, self.duration_seconds
        );
        match self.heart_data.as_present().and_then(HeartData::mean_heart_rate) {
            Some(mean) => out.push_str(&format!("\tAverage heart rate: {mean:.2} bpm\n")),
            None => out.push_str("\tAverage heart rate: n/a\n"),
        }
        out
    }
}

/// Clinical events for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Events {
    /// Onset date mapped to event type
    Typed(BTreeMap<DateKey, String>),
    /// Onset dates only
    Dates(BTreeSet<DateKey>),
}

impl Default for Events {
    fn default() -> Self {
        Events::Typed(BTreeMap::new())
    }
}

impl Events {
    pub fn len(&self) -> usize {
        match self {
            Events::Typed(map) => map.len(),
            Events::Dates(set) => set.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Onset dates in chronological order.
    pub fn dates(&self) -> Vec<&DateKey> {
        match self {
            Events::Typed(map) => map.keys().collect(),
            Events::Dates(set) => set.iter().collect(),
        }
    }

    /// Event type for an onset, when types were fetched.
    pub fn event_type(&self, date: &DateKey) -> Option<&str> {
        match self {
            Events::Typed(map) => map.get(date).map(String::as_str),
            Events::Dates(_) => None,
        }
    }
}

/// Everything known about one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    pub profile: ProfileRecord,
    pub events: Events,
    pub sessions: BTreeMap<DateKey, SessionRecord>,
    /// Session dates, ascending
    pub dates: Vec<DateKey>,
}

impl UserRecord {
    /// Session recorded at `date`.
    pub fn session(&self, date: &DateKey) -> Option<&SessionRecord> {
        self.sessions.get(date)
    }

    /// Session at position `index` in chronological order.
    pub fn session_at(&self, index: usize) -> Option<(&DateKey, &SessionRecord)> {
        let date = self.dates.get(index)?;
        self.sessions.get(date).map(|s| (date, s))
    }
}

impl fmt::Display for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "User Name: {}", self.user_id)?;
        writeln!(f, "Profile:")?;
        write!(f, "{}", self.profile)?;
        writeln!(f)?;

        writeln!(f, "Events (onset (dd.MM.yy hh:mm:ss) || event type):")?;
        for date in self.events.dates() {
            let kind = self.events.event_type(date).unwrap_or("-");
            writeln!(f, "\t{} || {}", date.format_readable(), kind)?;
        }
        writeln!(f)?;

        writeln!(f, "Sessions (date (dd.MM.yy hh:mm:ss) || duration):")?;
        for (date, session) in &self.sessions {
            writeln!(
                f,
                "\t{} || {}",
                date.format_readable(),
                format_hhmmss(session.duration_seconds)
            )?;
        }
        Ok(())
    }
}

/// Format a number of seconds as `hh:mm:ss`, truncating fractions.
pub fn format_hhmmss(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

fn field_error(field: &str, value: &Value) -> AssemblyError {
    AssemblyError::Field {
        field: field.to_string(),
        detail: format!("unexpected value {value}"),
    }
}

fn value_f64(field: &str, value: &Value) -> Result<f64, AssemblyError> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| field_error(field, value)),
        Value::String(s) => s.trim().parse().map_err(|_| field_error(field, value)),
        _ => Err(field_error(field, value)),
    }
}

fn optional_f64(map: &Map<String, Value>, field: &str) -> Result<Option<f64>, AssemblyError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(value) => value_f64(field, value).map(Some),
    }
}

fn required_f64(map: &Map<String, Value>, field: &str) -> Result<f64, AssemblyError> {
    optional_f64(map, field)?.ok_or_else(|| AssemblyError::Field {
        field: field.to_string(),
        detail: "missing".to_string(),
    })
}

fn optional_string(map: &Map<String, Value>, field: &str) -> String {
    match map.get(field) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn required_array(map: &Map<String, Value>, field: &str) -> Result<Vec<f64>, AssemblyError> {
    match map.get(field) {
        Some(Value::Array(items)) => items.iter().map(|v| value_f64(field, v)).collect(),
        Some(other) => Err(field_error(field, other)),
        None => Err(AssemblyError::Field {
            field: field.to_string(),
            detail: "missing".to_string(),
        }),
    }
}
