//! Allocator Peak Tracking
//!
//! A global-allocator wrapper that maintains the current and peak heap
//! usage of the process. Peak measurements are taken through `MemoryScope`,
//! which re-baselines the peak counter, runs the call, and reads the delta
//! while holding an exclusive lock — two scopes can never overlap, which is
//! what keeps per-call peaks meaningful.
//!
//! The harness binary must install the allocator for any of this to
//! record non-zero numbers:
//!
//! ```ignore
//! #[global_allocator]
//! static ALLOC: vitalcmp_profile::TrackingAllocator = vitalcmp_profile::TrackingAllocator;
//! ```

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

static CURRENT: AtomicUsize = AtomicUsize::new(0);
static PEAK: AtomicUsize = AtomicUsize::new(0);

/// Global allocator that counts live bytes and tracks the high-water mark.
pub struct TrackingAllocator;

// SAFETY: delegates all allocation to System; the counters are plain
// atomics with no allocation of their own.
unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc(layout);
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
        CURRENT.fetch_sub(layout.size(), Ordering::Relaxed);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = System.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            CURRENT.fetch_sub(layout.size(), Ordering::Relaxed);
            record_alloc(new_size);
        }
        new_ptr
    }
}

#[inline]
fn record_alloc(size: usize) {
    let live = CURRENT.fetch_add(size, Ordering::Relaxed) + size;
    PEAK.fetch_max(live, Ordering::Relaxed);
}

/// Live heap bytes right now (0 unless `TrackingAllocator` is installed).
pub fn current_allocation() -> usize {
    CURRENT.load(Ordering::Relaxed)
}

/// High-water mark since the last `reset_peak`.
pub fn peak_allocation() -> usize {
    PEAK.load(Ordering::Relaxed)
}

/// Drop the high-water mark back to the current live size.
pub fn reset_peak() {
    PEAK.store(CURRENT.load(Ordering::Relaxed), Ordering::Relaxed);
}

static SCOPE_LOCK: Mutex<()> = Mutex::new(());

/// Exclusive peak-measurement scope.
///
/// Holding the scope locks out every other scope in the process, so
/// concurrent decodes cannot pollute each other's peaks. The lock is
/// released as soon as the scope is finished or dropped.
pub struct MemoryScope {
    _guard: MutexGuard<'static, ()>,
    baseline: usize,
}

impl MemoryScope {
    /// Acquire the measurement lock and re-baseline the peak counter.
    pub fn enter() -> Self {
        let guard = SCOPE_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let baseline = current_allocation();
        reset_peak();
        Self {
            _guard: guard,
            baseline,
        }
    }

    /// Read the peak delta and release the lock.
    pub fn finish(self) -> u64 {
        peak_allocation().saturating_sub(self.baseline) as u64
    }
}

/// Run a closure inside a fresh `MemoryScope` and return its peak delta.
pub fn measure_peak<R>(f: impl FnOnce() -> R) -> (R, u64) {
    let scope = MemoryScope::enter();
    let result = f();
    let peak = scope.finish();
    (result, peak)
}
