#![warn(missing_docs)]
//! vitalcmp Decode - Decoder Adapters
//!
//! Two adapters map structurally different decoder outputs into the one
//! canonical snapshot shape:
//!
//! - [`ReferenceAdapter`] wraps the in-process reference library (the
//!   golden standard), timing the call and capturing the allocator peak.
//! - [`CandidateAdapter`] spawns the candidate binary as a subprocess,
//!   captures its stdout payload, and parses it as JSON or MessagePack.
//!
//! Both tolerate per-track extraction failures: such a track is recorded
//! with `records_count = 0` and a flag rather than aborting the file.

mod candidate;
mod reference;
mod wire;

pub use candidate::{CandidateAdapter, CandidateOptions, Encoding};
pub use reference::{
    LibraryError, RawDevice, RawRecord, RawRecords, RawTrack, RawVitalFile, ReferenceAdapter,
    ReferenceLibrary, SampleFormatTable,
};
pub use wire::{parse_payload, WirePayload};
