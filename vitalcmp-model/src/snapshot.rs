//! Canonical snapshot types.
//!
//! Field names follow the wire contract of the candidate decoder
//! (snake_case), which keeps serde mappings trivial on that side; the
//! reference adapter performs one explicit mapping pass into the same
//! shape.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// File-level metadata, one per decoded file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Recording start, epoch seconds.
    #[serde(default)]
    pub dt_start: f64,
    /// Recording end, epoch seconds.
    #[serde(default)]
    pub dt_end: f64,
    /// `dt_end - dt_start` when both ends are non-zero, else 0.
    #[serde(default)]
    pub duration: f64,
    /// GMT offset in minutes.
    #[serde(default)]
    pub gmt_offset: i32,
    /// Total number of tracks in the file.
    #[serde(default)]
    pub tracks_count: u64,
    /// Total number of devices in the file.
    #[serde(default)]
    pub devices_count: u64,
}

impl FileInfo {
    /// Recompute `duration` from the recording ends.
    ///
    /// A zero on either end means the value was absent from the decode, in
    /// which case the duration stays 0 rather than going negative or
    /// nonsensical.
    pub fn normalize_duration(&mut self) {
        if self.duration == 0.0 && self.dt_start != 0.0 && self.dt_end != 0.0 {
            self.duration = self.dt_end - self.dt_start;
        }
    }
}

/// A named piece of equipment that produced one or more tracks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Device name, unique within a file.
    #[serde(default)]
    pub name: String,
    /// Free-text device model identifier.
    #[serde(default)]
    pub type_name: String,
    /// Connection port; empty when a decoder does not expose it.
    #[serde(default)]
    pub port: String,
}

/// Track kind, mapped from the format's wire type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", from = "u8")]
pub enum TrackType {
    /// Periodic waveform samples.
    Wave,
    /// Scalar vital-sign values.
    Numeric,
    /// Textual annotations.
    Str,
    /// Unrecognized wire code, preserved for faithful comparison.
    Other(u8),
}

impl TrackType {
    const WAVE_CODE: u8 = 1;
    const NUMERIC_CODE: u8 = 2;
    const STR_CODE: u8 = 5;

    /// The wire type code for this kind.
    pub fn code(self) -> u8 {
        match self {
            TrackType::Wave => Self::WAVE_CODE,
            TrackType::Numeric => Self::NUMERIC_CODE,
            TrackType::Str => Self::STR_CODE,
            TrackType::Other(code) => code,
        }
    }
}

impl Default for TrackType {
    fn default() -> Self {
        TrackType::Other(0)
    }
}

impl From<u8> for TrackType {
    fn from(code: u8) -> Self {
        match code {
            Self::WAVE_CODE => TrackType::Wave,
            Self::NUMERIC_CODE => TrackType::Numeric,
            Self::STR_CODE => TrackType::Str,
            other => TrackType::Other(other),
        }
    }
}

impl From<TrackType> for u8 {
    fn from(t: TrackType) -> Self {
        t.code()
    }
}

impl std::fmt::Display for TrackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackType::Wave => write!(f, "WAVE"),
            TrackType::Numeric => write!(f, "NUMERIC"),
            TrackType::Str => write!(f, "STRING"),
            TrackType::Other(code) => write!(f, "TYPE({})", code),
        }
    }
}

/// One sample value within a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    /// Scalar numeric sample (NUMERIC tracks, or single waveform points).
    Number(f64),
    /// Textual sample (STRING tracks).
    Text(String),
    /// Short sequence of numeric samples (WAVE tracks).
    Wave(Vec<f64>),
}

impl Default for SampleValue {
    fn default() -> Self {
        SampleValue::Number(0.0)
    }
}

/// A single timed entry within a track.
///
/// Records within a track are ordered by non-decreasing timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Timestamp, epoch seconds.
    #[serde(rename = "dt", default)]
    pub timestamp: f64,
    /// Sample payload.
    #[serde(rename = "val", default)]
    pub value: SampleValue,
}

/// A named, typed time series within a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Track kind.
    #[serde(rename = "type", default)]
    pub track_type: TrackType,
    /// Wire sample-format code.
    #[serde(default)]
    pub fmt: u8,
    /// Measurement unit; may be empty.
    #[serde(default)]
    pub unit: String,
    /// Sampling rate in Hz; 0 for non-periodic tracks.
    #[serde(default)]
    pub sample_rate: f64,
    /// Calibration gain.
    #[serde(default)]
    pub gain: f64,
    /// Calibration offset.
    #[serde(default)]
    pub offset: f64,
    /// Display range minimum.
    #[serde(default)]
    pub min_display: f64,
    /// Display range maximum.
    #[serde(default)]
    pub max_display: f64,
    /// Display color, packed RGB.
    #[serde(default)]
    pub color: u32,
    /// Monitor type code.
    #[serde(default)]
    pub monitor_type: u8,
    /// Name of the device that produced this track (lookup only).
    #[serde(default)]
    pub device_name: String,
    /// Record count of the full decode. Always trustworthy, unlike
    /// `records`, which either adapter may truncate for cost reasons.
    #[serde(default)]
    pub records_count: u64,
    /// Decoded records; possibly a truncated prefix of the full track.
    #[serde(default)]
    pub records: Vec<Record>,
    /// Set when this track's values could not be extracted. The track is
    /// kept with `records_count = 0` instead of failing the whole file.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub extraction_failed: bool,
}

/// The canonical snapshot of one decoded file.
///
/// Maps are ordered so diffs and reports come out deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// File-level metadata.
    pub file_info: FileInfo,
    /// Devices keyed by name.
    #[serde(default)]
    pub devices: BTreeMap<String, Device>,
    /// Tracks keyed by name.
    #[serde(default)]
    pub tracks: BTreeMap<String, Track>,
}

impl Snapshot {
    /// Sum of full-decode record counts across all tracks.
    pub fn total_records(&self) -> u64 {
        self.tracks.values().map(|t| t.records_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_derived_from_ends() {
        let mut info = FileInfo {
            dt_start: 1_700_000_000.0,
            dt_end: 1_700_003_600.0,
            ..Default::default()
        };
        info.normalize_duration();
        assert_eq!(info.duration, info.dt_end - info.dt_start);
    }

    #[test]
    fn duration_stays_zero_when_an_end_is_absent() {
        let mut info = FileInfo {
            dt_end: 1_700_003_600.0,
            ..Default::default()
        };
        info.normalize_duration();
        assert_eq!(info.duration, 0.0);
    }

    #[test]
    fn track_type_round_trips_through_codes() {
        for code in [1u8, 2, 5, 9] {
            assert_eq!(TrackType::from(code).code(), code);
        }
        assert_eq!(TrackType::from(1), TrackType::Wave);
        assert_eq!(TrackType::from(2), TrackType::Numeric);
        assert_eq!(TrackType::from(5), TrackType::Str);
        assert_eq!(TrackType::from(9), TrackType::Other(9));
    }

    #[test]
    fn sample_value_deserializes_untagged() {
        let n: SampleValue = serde_json::from_str("42.5").unwrap();
        assert_eq!(n, SampleValue::Number(42.5));

        let s: SampleValue = serde_json::from_str("\"ABP\"").unwrap();
        assert_eq!(s, SampleValue::Text("ABP".to_string()));

        let w: SampleValue = serde_json::from_str("[1.0, 2.0, 3.0]").unwrap();
        assert_eq!(w, SampleValue::Wave(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn total_records_sums_full_counts() {
        let mut snapshot = Snapshot::default();
        snapshot.tracks.insert(
            "ECG_II".to_string(),
            Track {
                records_count: 120,
                ..Default::default()
            },
        );
        snapshot.tracks.insert(
            "HR".to_string(),
            Track {
                records_count: 30,
                ..Default::default()
            },
        );
        assert_eq!(snapshot.total_records(), 150);
    }
}
