#![warn(missing_docs)]
//! vitalcmp Model - Canonical Data Model
//!
//! This crate defines the shared in-memory representation both decoder
//! outputs are mapped into before comparison:
//! - `Snapshot` and its parts (`FileInfo`, `Device`, `Track`, `Record`)
//! - The `Decoder` capability trait both adapters implement
//! - The decode-failure taxonomy (`DecodeError`)
//!
//! The model is a pure data-mapping target: adapters substitute a
//! well-defined default (`0`, empty string, empty sequence) for anything
//! the underlying decoder did not provide, so downstream comparison never
//! distinguishes "missing" from "zero".

mod decoder;
mod snapshot;

pub use decoder::{DecodeError, DecodeOutcome, Decoder};
pub use snapshot::{Device, FileInfo, Record, SampleValue, Snapshot, Track, TrackType};
