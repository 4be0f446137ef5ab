//! Candidate Wire Payload
//!
//! The candidate's stdout payload: one top-level object with `file_info`,
//! `devices`, and `tracks` keys in snake_case, either JSON or MessagePack
//! encoded (both decode to the identical mapping shape). Absent fields
//! take defaults; the comparator never sees "missing".

use std::collections::BTreeMap;

use serde::Deserialize;
use vitalcmp_model::{DecodeError, Device, FileInfo, Record, Snapshot, Track, TrackType};

use crate::candidate::Encoding;

/// Top-level payload object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WirePayload {
    /// File-level metadata.
    #[serde(default)]
    pub file_info: WireFileInfo,
    /// Devices keyed by name.
    #[serde(default)]
    pub devices: BTreeMap<String, WireDevice>,
    /// Tracks keyed by name.
    #[serde(default)]
    pub tracks: BTreeMap<String, WireTrack>,
}

/// Wire `file_info` object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireFileInfo {
    #[serde(default)]
    dt_start: f64,
    #[serde(default)]
    dt_end: f64,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    gmt_offset: i32,
    #[serde(default)]
    tracks_count: Option<u64>,
    #[serde(default)]
    devices_count: Option<u64>,
}

/// Wire device object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireDevice {
    #[serde(default)]
    name: String,
    #[serde(default)]
    type_name: String,
    #[serde(default)]
    port: String,
}

/// Wire track object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireTrack {
    #[serde(rename = "type", default)]
    track_type: u8,
    #[serde(default)]
    fmt: u8,
    #[serde(default)]
    unit: String,
    #[serde(default)]
    sample_rate: f64,
    #[serde(default)]
    gain: f64,
    #[serde(default)]
    offset: f64,
    #[serde(default)]
    min_display: f64,
    #[serde(default)]
    max_display: f64,
    #[serde(default)]
    color: u32,
    #[serde(default)]
    monitor_type: u8,
    #[serde(default)]
    device_name: String,
    /// Full-decode record count; `records` below may be truncated.
    #[serde(default)]
    records_count: Option<u64>,
    #[serde(default)]
    records: Vec<Record>,
}

/// Decode a payload from bytes in the declared encoding.
pub fn parse_payload(bytes: &[u8], encoding: Encoding) -> Result<WirePayload, DecodeError> {
    let result = match encoding {
        Encoding::Json | Encoding::JsonCompact => {
            serde_json::from_slice(bytes).map_err(|e| e.to_string())
        }
        Encoding::Msgpack => rmp_serde::from_slice(bytes).map_err(|e| e.to_string()),
    };
    result.map_err(|message| DecodeError::Payload {
        encoding: encoding.to_string(),
        message,
    })
}

impl WirePayload {
    /// Map the wire shape into the canonical snapshot, substituting
    /// defaults and falling back to map sizes for absent counts.
    pub fn into_snapshot(self) -> Snapshot {
        let mut file_info = FileInfo {
            dt_start: self.file_info.dt_start,
            dt_end: self.file_info.dt_end,
            duration: self.file_info.duration,
            gmt_offset: self.file_info.gmt_offset,
            tracks_count: self
                .file_info
                .tracks_count
                .unwrap_or(self.tracks.len() as u64),
            devices_count: self
                .file_info
                .devices_count
                .unwrap_or(self.devices.len() as u64),
        };
        file_info.normalize_duration();

        let devices = self
            .devices
            .into_iter()
            .map(|(key, dev)| {
                let name = if dev.name.is_empty() {
                    key.clone()
                } else {
                    dev.name
                };
                let device = Device {
                    name,
                    type_name: dev.type_name,
                    port: dev.port,
                };
                (key, device)
            })
            .collect();

        let tracks = self
            .tracks
            .into_iter()
            .map(|(name, trk)| {
                let records_count = trk.records_count.unwrap_or(trk.records.len() as u64);
                let track = Track {
                    track_type: TrackType::from(trk.track_type),
                    fmt: trk.fmt,
                    unit: trk.unit,
                    sample_rate: trk.sample_rate,
                    gain: trk.gain,
                    offset: trk.offset,
                    min_display: trk.min_display,
                    max_display: trk.max_display,
                    color: trk.color,
                    monitor_type: trk.monitor_type,
                    device_name: trk.device_name,
                    records_count,
                    records: trk.records,
                    extraction_failed: false,
                };
                (name, track)
            })
            .collect();

        Snapshot {
            file_info,
            devices,
            tracks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitalcmp_model::SampleValue;

    const PAYLOAD: &str = r#"{
        "file_info": {
            "dt_start": 1715000000.0,
            "dt_end": 1715003600.0,
            "duration": 3600.0,
            "gmt_offset": 540,
            "tracks_count": 2,
            "devices_count": 1
        },
        "devices": {
            "Intellivue": {"name": "Intellivue", "type_name": "MP70", "port": ""}
        },
        "tracks": {
            "ECG_II": {
                "type": 1, "fmt": 1, "unit": "mV", "sample_rate": 500.0,
                "device_name": "Intellivue", "records_count": 1800000,
                "records": [{"dt": 1715000000.0, "val": [0.1, 0.2, 0.3]}]
            },
            "HR": {
                "type": 2, "fmt": 1, "unit": "/min", "sample_rate": 0.0,
                "records_count": 3600
            }
        }
    }"#;

    #[test]
    fn json_payload_maps_to_snapshot() {
        let payload = parse_payload(PAYLOAD.as_bytes(), Encoding::Json).unwrap();
        let snapshot = payload.into_snapshot();

        assert_eq!(snapshot.file_info.tracks_count, 2);
        assert_eq!(snapshot.file_info.duration, 3600.0);

        let ecg = &snapshot.tracks["ECG_II"];
        assert_eq!(ecg.track_type, TrackType::Wave);
        assert_eq!(ecg.records_count, 1_800_000);
        assert_eq!(ecg.records.len(), 1);
        assert_eq!(
            ecg.records[0].value,
            SampleValue::Wave(vec![0.1, 0.2, 0.3])
        );

        let hr = &snapshot.tracks["HR"];
        assert_eq!(hr.track_type, TrackType::Numeric);
        assert!(hr.records.is_empty());
        assert_eq!(hr.records_count, 3600);
    }

    #[test]
    fn absent_fields_take_defaults() {
        let payload =
            parse_payload(br#"{"tracks": {"EVENT": {"type": 5}}}"#, Encoding::Json).unwrap();
        let snapshot = payload.into_snapshot();

        assert_eq!(snapshot.file_info.dt_start, 0.0);
        // Count falls back to the map size when file_info omits it.
        assert_eq!(snapshot.file_info.tracks_count, 1);
        assert_eq!(snapshot.file_info.devices_count, 0);

        let track = &snapshot.tracks["EVENT"];
        assert_eq!(track.track_type, TrackType::Str);
        assert_eq!(track.unit, "");
        assert_eq!(track.records_count, 0);
    }

    #[test]
    fn msgpack_payload_decodes_to_the_same_shape() {
        let json: serde_json::Value = serde_json::from_str(PAYLOAD).unwrap();
        let bytes = rmp_serde::to_vec_named(&json).unwrap();

        let payload = parse_payload(&bytes, Encoding::Msgpack).unwrap();
        let snapshot = payload.into_snapshot();
        assert_eq!(snapshot.tracks.len(), 2);
        assert_eq!(snapshot.tracks["ECG_II"].sample_rate, 500.0);
    }

    #[test]
    fn garbage_fails_as_payload_error() {
        let err = parse_payload(b"not json", Encoding::Json).unwrap_err();
        match err {
            DecodeError::Payload { encoding, .. } => assert_eq!(encoding, "json"),
            other => panic!("expected payload error, got {other:?}"),
        }
    }
}
