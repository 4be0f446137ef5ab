#![warn(missing_docs)]
//! vitalcmp Profile - Decode Cost Measurement
//!
//! This crate provides the measurement environment for decode runs:
//! - `sample` for warm-up + multi-iteration wall-clock timing
//! - `TrackingAllocator` + `MemoryScope` for allocator peak tracking
//!   scoped tightly around an in-process call

mod alloc;
mod timing;

pub use alloc::{
    current_allocation, measure_peak, peak_allocation, reset_peak, MemoryScope, TrackingAllocator,
};
pub use timing::{sample, TimedRun, TimingPolicy};
