//! Reference Adapter
//!
//! Wraps the in-process reference library. The library's output is a
//! dynamically-shaped object where any attribute may be absent; that
//! contract is made explicit here as the `Raw*` schema, where every field
//! is an `Option` and the adapter performs one mapping pass with default
//! substitution. Missing attributes are never an error.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use vitalcmp_model::{
    DecodeError, DecodeOutcome, Decoder, Device, FileInfo, Record, SampleValue, Snapshot, Track,
    TrackType,
};
use vitalcmp_profile::MemoryScope;

/// Error type reference libraries may fail with.
pub type LibraryError = Box<dyn std::error::Error + Send + Sync>;

/// Sample widths per wire format code.
///
/// Stock reference libraries ship with zero-width entries for format codes
/// 7 and 8 (32-bit signed/unsigned integers); files using those codes fail
/// to decode without the override. `with_compat_overrides` is the explicit
/// one-time correction, applied at adapter construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFormatTable {
    widths: [u8; 9],
}

impl SampleFormatTable {
    const INT32_CODE: u8 = 7;
    const UINT32_CODE: u8 = 8;

    /// The library's stock table.
    pub fn new() -> Self {
        // code:   0  f32 f64 i8 u8 i16 u16 i32 u32
        let widths = [0, 4, 8, 1, 1, 2, 2, 0, 0];
        Self { widths }
    }

    /// Stock table with the 32-bit integer widths corrected.
    pub fn with_compat_overrides() -> Self {
        let mut table = Self::new();
        table.set_width(Self::INT32_CODE, 4);
        table.set_width(Self::UINT32_CODE, 4);
        table
    }

    /// Byte width of a sample in the given format, if the code is known.
    pub fn width(&self, code: u8) -> Option<u8> {
        match self.widths.get(code as usize) {
            Some(0) | None => None,
            Some(&w) => Some(w),
        }
    }

    /// Override one format code's sample width.
    pub fn set_width(&mut self, code: u8, width: u8) {
        if let Some(slot) = self.widths.get_mut(code as usize) {
            *slot = width;
        }
    }
}

impl Default for SampleFormatTable {
    fn default() -> Self {
        Self::with_compat_overrides()
    }
}

/// The in-process reference decoder contract.
///
/// Implemented by the harness binary over whatever reference library it
/// links; the adapter owns timing, memory capture, and canonicalization.
pub trait ReferenceLibrary: Send + Sync {
    /// Decode one file into the raw optional-field schema.
    fn open(&self, path: &Path, formats: &SampleFormatTable) -> Result<RawVitalFile, LibraryError>;
}

/// Raw reference output for one file. Every field optional.
#[derive(Debug, Clone, Default)]
pub struct RawVitalFile {
    /// Recording start, epoch seconds.
    pub dt_start: Option<f64>,
    /// Recording end, epoch seconds.
    pub dt_end: Option<f64>,
    /// GMT offset in minutes.
    pub dgmt: Option<i32>,
    /// Devices keyed by name.
    pub devs: BTreeMap<String, RawDevice>,
    /// Tracks keyed by name.
    pub trks: BTreeMap<String, RawTrack>,
}

/// Raw device attributes.
#[derive(Debug, Clone, Default)]
pub struct RawDevice {
    /// The library's `type`/`dtname` attribute.
    pub type_name: Option<String>,
    /// Connection port.
    pub port: Option<String>,
}

/// Raw track attributes.
#[derive(Debug, Clone, Default)]
pub struct RawTrack {
    /// Wire type code.
    pub track_type: Option<u8>,
    /// Wire sample-format code.
    pub fmt: Option<u8>,
    /// Measurement unit.
    pub unit: Option<String>,
    /// Sampling rate, Hz.
    pub srate: Option<f64>,
    /// Calibration gain.
    pub gain: Option<f64>,
    /// Calibration offset.
    pub offset: Option<f64>,
    /// Display minimum.
    pub mindisp: Option<f64>,
    /// Display maximum.
    pub maxdisp: Option<f64>,
    /// Display color.
    pub col: Option<u32>,
    /// Monitor type code.
    pub montype: Option<u8>,
    /// Producing device name.
    pub dname: Option<String>,
    /// The track's records, or why they could not be read.
    pub recs: RawRecords,
}

/// Record extraction result for one track.
///
/// Extraction failure is data here, not an error: the adapter records the
/// track with `records_count = 0` and moves on with the rest of the file.
#[derive(Debug, Clone, Default)]
pub enum RawRecords {
    /// Records were extracted.
    Present(Vec<RawRecord>),
    /// The library could not decode this track's values.
    Unreadable(String),
    /// The library exposed no records at all.
    #[default]
    Missing,
}

/// One raw record.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    /// Timestamp, epoch seconds.
    pub dt: Option<f64>,
    /// Sample payload.
    pub val: Option<SampleValue>,
}

/// `Decoder` implementation over a [`ReferenceLibrary`].
pub struct ReferenceAdapter<L> {
    library: L,
    formats: SampleFormatTable,
}

impl<L: ReferenceLibrary> ReferenceAdapter<L> {
    /// Wrap a library, applying the format-table compatibility overrides.
    pub fn new(library: L) -> Self {
        Self {
            library,
            formats: SampleFormatTable::with_compat_overrides(),
        }
    }

    /// Wrap a library with an explicit format table.
    pub fn with_formats(library: L, formats: SampleFormatTable) -> Self {
        Self { library, formats }
    }
}

impl<L: ReferenceLibrary> Decoder for ReferenceAdapter<L> {
    fn label(&self) -> &str {
        "reference"
    }

    fn decode(&self, path: &Path) -> Result<DecodeOutcome, DecodeError> {
        let scope = MemoryScope::enter();
        let start = Instant::now();
        let raw = self
            .library
            .open(path, &self.formats)
            .map_err(|e| DecodeError::Reference(e.to_string()))?;
        let elapsed = start.elapsed();
        let peak = scope.finish();

        Ok(DecodeOutcome {
            snapshot: canonicalize(raw),
            elapsed,
            peak_memory_bytes: Some(peak),
            payload_bytes: None,
        })
    }
}

/// One mapping pass from the raw optional-field schema into the canonical
/// snapshot, substituting defaults for everything absent.
pub(crate) fn canonicalize(raw: RawVitalFile) -> Snapshot {
    let mut file_info = FileInfo {
        dt_start: raw.dt_start.unwrap_or_default(),
        dt_end: raw.dt_end.unwrap_or_default(),
        duration: 0.0,
        gmt_offset: raw.dgmt.unwrap_or_default(),
        tracks_count: raw.trks.len() as u64,
        devices_count: raw.devs.len() as u64,
    };
    file_info.normalize_duration();

    let devices = raw
        .devs
        .into_iter()
        .map(|(name, dev)| {
            let device = Device {
                name: name.clone(),
                type_name: dev.type_name.unwrap_or_default(),
                port: dev.port.unwrap_or_default(),
            };
            (name, device)
        })
        .collect();

    let tracks = raw
        .trks
        .into_iter()
        .map(|(name, trk)| {
            let track = canonicalize_track(&name, trk);
            (name, track)
        })
        .collect();

    Snapshot {
        file_info,
        devices,
        tracks,
    }
}

fn canonicalize_track(name: &str, raw: RawTrack) -> Track {
    let (records, records_count, extraction_failed) = match raw.recs {
        RawRecords::Present(recs) => {
            let count = recs.len() as u64;
            let records = recs
                .into_iter()
                .map(|r| Record {
                    timestamp: r.dt.unwrap_or_default(),
                    value: r.val.unwrap_or_default(),
                })
                .collect();
            (records, count, false)
        }
        RawRecords::Unreadable(reason) => {
            tracing::warn!(track = name, %reason, "track values unreadable; recorded empty");
            (Vec::new(), 0, true)
        }
        RawRecords::Missing => (Vec::new(), 0, false),
    };

    Track {
        track_type: TrackType::from(raw.track_type.unwrap_or_default()),
        fmt: raw.fmt.unwrap_or_default(),
        unit: raw.unit.unwrap_or_default(),
        sample_rate: raw.srate.unwrap_or_default(),
        gain: raw.gain.unwrap_or_default(),
        offset: raw.offset.unwrap_or_default(),
        min_display: raw.mindisp.unwrap_or_default(),
        max_display: raw.maxdisp.unwrap_or_default(),
        color: raw.col.unwrap_or_default(),
        monitor_type: raw.montype.unwrap_or_default(),
        device_name: raw.dname.unwrap_or_default(),
        records_count,
        records,
        extraction_failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubLibrary(RawVitalFile);

    impl ReferenceLibrary for StubLibrary {
        fn open(&self, _: &Path, _: &SampleFormatTable) -> Result<RawVitalFile, LibraryError> {
            Ok(self.0.clone())
        }
    }

    struct FailingLibrary;

    impl ReferenceLibrary for FailingLibrary {
        fn open(&self, _: &Path, _: &SampleFormatTable) -> Result<RawVitalFile, LibraryError> {
            Err("corrupt header".into())
        }
    }

    fn raw_fixture() -> RawVitalFile {
        let mut raw = RawVitalFile {
            dt_start: Some(1000.0),
            dt_end: Some(1600.0),
            dgmt: Some(-540),
            ..Default::default()
        };
        raw.devs.insert(
            "Intellivue".to_string(),
            RawDevice {
                type_name: Some("MP70".to_string()),
                port: None,
            },
        );
        raw.trks.insert(
            "ECG_II".to_string(),
            RawTrack {
                track_type: Some(1),
                fmt: Some(1),
                unit: Some("mV".to_string()),
                srate: Some(500.0),
                dname: Some("Intellivue".to_string()),
                recs: RawRecords::Present(vec![RawRecord {
                    dt: Some(1000.0),
                    val: Some(SampleValue::Wave(vec![0.1, 0.2])),
                }]),
                ..Default::default()
            },
        );
        raw
    }

    #[test]
    fn compat_overrides_fix_int32_widths() {
        let stock = SampleFormatTable::new();
        assert_eq!(stock.width(7), None);
        assert_eq!(stock.width(8), None);

        let patched = SampleFormatTable::with_compat_overrides();
        assert_eq!(patched.width(7), Some(4));
        assert_eq!(patched.width(8), Some(4));
        // The rest of the table is untouched.
        assert_eq!(patched.width(1), Some(4));
        assert_eq!(patched.width(2), Some(8));
    }

    #[test]
    fn canonicalize_substitutes_defaults() {
        let mut raw = RawVitalFile::default();
        raw.trks.insert("HR".to_string(), RawTrack::default());

        let snapshot = canonicalize(raw);
        assert_eq!(snapshot.file_info.dt_start, 0.0);
        assert_eq!(snapshot.file_info.duration, 0.0);
        assert_eq!(snapshot.file_info.tracks_count, 1);

        let track = &snapshot.tracks["HR"];
        assert_eq!(track.unit, "");
        assert_eq!(track.sample_rate, 0.0);
        assert_eq!(track.records_count, 0);
        assert!(!track.extraction_failed);
    }

    #[test]
    fn canonicalize_derives_duration_and_counts() {
        let snapshot = canonicalize(raw_fixture());
        assert_eq!(snapshot.file_info.duration, 600.0);
        assert_eq!(snapshot.file_info.tracks_count, 1);
        assert_eq!(snapshot.file_info.devices_count, 1);
        assert_eq!(snapshot.tracks["ECG_II"].records_count, 1);
        assert_eq!(snapshot.devices["Intellivue"].port, "");
    }

    #[test]
    fn unreadable_records_flag_instead_of_failing() {
        let mut raw = RawVitalFile::default();
        raw.trks.insert(
            "ART".to_string(),
            RawTrack {
                recs: RawRecords::Unreadable("bad sample width".to_string()),
                ..Default::default()
            },
        );

        let snapshot = canonicalize(raw);
        let track = &snapshot.tracks["ART"];
        assert_eq!(track.records_count, 0);
        assert!(track.extraction_failed);
    }

    #[test]
    fn adapter_reports_timing_and_memory() {
        let adapter = ReferenceAdapter::new(StubLibrary(raw_fixture()));
        let outcome = adapter.decode(Path::new("fixture.vital")).unwrap();
        assert_eq!(outcome.snapshot.tracks.len(), 1);
        // Peak is Some even when the tracking allocator is not installed
        // (then it reads 0); only the candidate reports None.
        assert!(outcome.peak_memory_bytes.is_some());
        assert!(outcome.payload_bytes.is_none());
    }

    #[test]
    fn library_failure_maps_to_reference_error() {
        let adapter = ReferenceAdapter::new(FailingLibrary);
        let err = adapter.decode(Path::new("fixture.vital")).unwrap_err();
        assert!(matches!(err, DecodeError::Reference(_)));
        assert!(err.to_string().contains("corrupt header"));
    }
}
