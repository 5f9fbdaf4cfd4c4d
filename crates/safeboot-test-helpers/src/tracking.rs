//! Allocation tracking for hot-path tests.
//!
//! Install [`TrackingAllocator`] as the global allocator of a test binary,
//! then wrap the code under test with [`track`]. Counting is per thread, so
//! allocations by unrelated threads (a supervisor tick, the test harness)
//! are not attributed to the tracked code.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

thread_local! {
    static ALLOCATION_COUNT: Cell<usize> = const { Cell::new(0) };
    static ALLOCATION_BYTES: Cell<usize> = const { Cell::new(0) };
    static TRACKING_ENABLED: Cell<bool> = const { Cell::new(false) };
}

fn record(bytes: usize) {
    if TRACKING_ENABLED.with(Cell::get) {
        ALLOCATION_COUNT.with(|count| count.set(count.get().saturating_add(1)));
        ALLOCATION_BYTES.with(|total| total.set(total.get().saturating_add(bytes)));
    }
}

/// System allocator wrapper that counts allocations on tracked threads.
#[derive(Debug)]
pub struct TrackingAllocator;

// SAFETY: every call forwards to `System` with the caller's arguments.
unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: forwarded contract.
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            record(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        // SAFETY: forwarded contract.
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            record(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: forwarded contract.
        unsafe { System.dealloc(ptr, layout) };
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // SAFETY: forwarded contract.
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() && new_size > layout.size() {
            record(new_size - layout.size());
        }
        new_ptr
    }
}

/// Counts allocations on the current thread while alive.
#[derive(Debug)]
pub struct AllocationGuard {
    start_count: usize,
    start_bytes: usize,
}

impl AllocationGuard {
    /// Start tracking on the current thread.
    #[must_use]
    pub fn new() -> Self {
        TRACKING_ENABLED.with(|e| e.set(true));
        Self {
            start_count: ALLOCATION_COUNT.with(Cell::get),
            start_bytes: ALLOCATION_BYTES.with(Cell::get),
        }
    }

    /// Allocations since the guard was created.
    #[must_use]
    pub fn allocations(&self) -> usize {
        ALLOCATION_COUNT
            .with(Cell::get)
            .saturating_sub(self.start_count)
    }

    /// Bytes allocated since the guard was created.
    #[must_use]
    pub fn bytes(&self) -> usize {
        ALLOCATION_BYTES
            .with(Cell::get)
            .saturating_sub(self.start_bytes)
    }
}

impl Default for AllocationGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AllocationGuard {
    fn drop(&mut self) {
        TRACKING_ENABLED.with(|e| e.set(false));
    }
}

/// Start tracking allocations on the current thread.
#[must_use]
pub fn track() -> AllocationGuard {
    AllocationGuard::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_allocations() {
        let guard = track();
        let v: Vec<u64> = Vec::with_capacity(16);
        assert!(guard.allocations() >= 1);
        assert!(guard.bytes() >= 128);
        drop(v);
    }

    #[test]
    fn test_no_allocations() {
        let guard = track();
        let x = std::hint::black_box(21_u32) * 2;
        assert_eq!(x, 42);
        assert_eq!(guard.allocations(), 0);
    }
}
