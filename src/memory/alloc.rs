//! Native heap allocation.
//!
//! Everything the bridge hands to the native library lives on the C heap
//! (`malloc`/`free`), so a native consumer could release it with its own
//! allocator and a freed pointer never needs its size.
//!
//! # Allocation counter
//!
//! With `debug_assertions` or the `alloc-tracking` feature, every allocation
//! increments and every free decrements a process-wide atomic counter, and a
//! thread-local mirror of it. The counter is a diagnostic for leak and
//! double-free tests only; nothing in the bridge branches on it.

use std::alloc::Layout;
use std::ffi::c_void;

use super::raw::{self, Blittable};

#[cfg(any(debug_assertions, feature = "alloc-tracking"))]
mod tracking {
    use std::cell::Cell;
    use std::sync::atomic::{AtomicIsize, Ordering};

    static LIVE_ALLOCATIONS: AtomicIsize = AtomicIsize::new(0);

    thread_local! {
        static THREAD_LIVE_ALLOCATIONS: Cell<isize> = const { Cell::new(0) };
    }

    #[inline]
    pub(super) fn record(delta: isize) {
        LIVE_ALLOCATIONS.fetch_add(delta, Ordering::Relaxed);
        THREAD_LIVE_ALLOCATIONS.with(|c| c.set(c.get() + delta));
    }

    /// Number of native blocks allocated but not yet freed, process-wide.
    #[must_use]
    pub fn live_allocations() -> isize {
        LIVE_ALLOCATIONS.load(Ordering::Relaxed)
    }

    /// Net allocations made by the calling thread.
    ///
    /// Tests that run concurrently in one process should compare this value,
    /// since the process-wide counter includes other threads' work.
    #[must_use]
    pub fn thread_live_allocations() -> isize {
        THREAD_LIVE_ALLOCATIONS.with(Cell::get)
    }
}

#[cfg(any(debug_assertions, feature = "alloc-tracking"))]
pub use tracking::{live_allocations, thread_live_allocations};

#[inline]
fn record(_delta: isize) {
    #[cfg(any(debug_assertions, feature = "alloc-tracking"))]
    tracking::record(_delta);
}

/// Allocates `size` bytes of uninitialized native memory.
///
/// Zero-byte requests still return a unique, freeable block. Allocation
/// failure aborts through [`std::alloc::handle_alloc_error`].
#[must_use]
pub fn allocate(size: usize) -> *mut c_void {
    // SAFETY: `malloc` has no preconditions; a zero request is bumped to one byte
    // so a non-null result is always a distinct block.
    let ptr = unsafe { libc::malloc(size.max(1)) };
    if ptr.is_null() {
        let layout = Layout::from_size_align(size.max(1), 1).unwrap_or_else(|_| Layout::new::<u8>());
        std::alloc::handle_alloc_error(layout);
    }
    record(1);
    ptr
}

/// Allocates uninitialized native storage for one `T`.
#[inline]
#[must_use]
pub fn allocate_value<T: Blittable>() -> *mut T {
    allocate(raw::size_of::<T>()).cast()
}

/// Allocates native storage for `value` and writes it there.
#[must_use]
pub fn allocate_copy<T: Blittable>(value: &T) -> *mut T {
    let ptr = allocate_value::<T>();
    // SAFETY: `ptr` was just allocated with room for one `T`.
    unsafe { raw::write(ptr.cast(), value) };
    ptr
}

/// Frees a block returned by [`allocate`]. Null is ignored.
///
/// # Safety
///
/// `ptr` must be null or a live block from [`allocate`] that has not been freed.
pub unsafe fn free_memory<T>(ptr: *mut T) {
    if ptr.is_null() {
        return;
    }
    // SAFETY: the caller guarantees `ptr` is a live `malloc` block.
    unsafe { libc::free(ptr.cast()) };
    record(-1);
}

/// Frees an array of `len` pointers: every non-null slot target first, then
/// the slot block itself.
///
/// Freeing only the slot block would leak every pointee.
///
/// # Safety
///
/// `slots` must be null or a live block of at least `len` pointers, each of
/// which is null or a live block from [`allocate`].
pub unsafe fn free_pointer_array(slots: *mut *mut c_void, len: usize) {
    if slots.is_null() {
        return;
    }
    for i in 0..len {
        // SAFETY: `i < len` stays within the slot block.
        let target: *mut c_void = unsafe { raw::read(raw::offset(slots, i * raw::size_of::<usize>())) };
        // SAFETY: each slot is null or a live block by the caller's contract.
        unsafe { free_memory(target) };
    }
    // SAFETY: the slot block itself is a live block.
    unsafe { free_memory(slots) };
}

#[cfg(all(test, any(debug_assertions, feature = "alloc-tracking")))]
mod tests {
    use super::*;

    #[test]
    fn allocate_and_free_balance_the_thread_counter() {
        let before = thread_live_allocations();
        let a = allocate(16);
        let b = allocate_copy(&7u64);
        assert_eq!(thread_live_allocations(), before + 2);
        unsafe {
            assert_eq!(raw::read::<u64>(b.cast()), 7);
            free_memory(a);
            free_memory(b);
        }
        assert_eq!(thread_live_allocations(), before);
    }

    #[test]
    fn zero_sized_allocation_is_freeable() {
        let before = thread_live_allocations();
        let p = allocate(0);
        assert!(!p.is_null());
        unsafe { free_memory(p) };
        assert_eq!(thread_live_allocations(), before);
    }

    #[test]
    fn free_null_is_noop() {
        let before = thread_live_allocations();
        unsafe { free_memory(std::ptr::null_mut::<u8>()) };
        assert_eq!(thread_live_allocations(), before);
    }

    #[test]
    fn pointer_array_frees_targets_and_slots() {
        let before = thread_live_allocations();
        let slots = allocate(3 * raw::size_of::<usize>()).cast::<*mut c_void>();
        unsafe {
            for i in 0..3 {
                let target = if i == 1 { std::ptr::null_mut() } else { allocate(8) };
                raw::write(raw::offset(slots, i * raw::size_of::<usize>()), &target);
            }
            assert_eq!(thread_live_allocations(), before + 3);
            free_pointer_array(slots, 3);
        }
        assert_eq!(thread_live_allocations(), before);
    }
}
