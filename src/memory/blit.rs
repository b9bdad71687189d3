//! Blittable struct marshaler.
//!
//! Pointer ⇄ fixed-layout struct conversion for types whose binary layout
//! matches the native struct exactly, in single, flat-array and
//! array-of-pointers forms.
//!
//! A null address and a zero length are the same thing at this boundary: the
//! native side uses null to mean "absent", so both produce an empty `Vec`
//! rather than an error.

use std::ffi::c_void;

use super::alloc;
use super::raw::{self, Blittable};
use crate::errors::{BridgeError, Result};

/// Layout of a native array handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArrayKind {
    /// `T*`: `len` values stored inline, stride `size_of::<T>()`.
    #[default]
    Flat,
    /// `T**`: `len` pointers, stride `size_of::<usize>()`, each pointing at one value.
    Pointers,
}

impl ArrayKind {
    /// Byte distance between consecutive elements of an array of `T`.
    #[inline]
    #[must_use]
    pub const fn stride<T: Blittable>(self) -> usize {
        match self {
            Self::Flat => raw::size_of::<T>(),
            Self::Pointers => raw::size_of::<usize>(),
        }
    }
}

/// Rejects `len` elements of `stride` bytes that could not fit the address space.
///
/// This is the perimeter check: it runs once per native array, at the point
/// where the native library's own count is still known.
#[inline]
pub(crate) fn check_len(len: usize, stride: usize) -> Result<usize> {
    len.checked_mul(stride)
        .filter(|&bytes| isize::try_from(bytes).is_ok())
        .ok_or(BridgeError::InvalidLength { count: len, stride })
}

/// Address of element `index` of a native array, dereferencing the slot for
/// arrays of pointers.
///
/// # Safety
///
/// `base` must be a live native array of the given kind with more than `index` elements.
#[inline]
pub(crate) unsafe fn element_address<T: Blittable>(
    base: *const c_void,
    index: usize,
    kind: ArrayKind,
) -> *mut c_void {
    let pos = raw::offset(base, index * kind.stride::<T>());
    match kind {
        ArrayKind::Flat => pos,
        // SAFETY: `pos` is slot `index` of a live pointer array.
        ArrayKind::Pointers => unsafe { raw::read::<*mut c_void>(pos) },
    }
}

/// Reads one `T` from `ptr`, or the all-zero value when `ptr` is null.
///
/// # Safety
///
/// `ptr` must be null or valid for reads of `size_of::<T>()` bytes.
#[must_use]
pub unsafe fn marshal_one<T: Blittable + bytemuck::Zeroable>(ptr: *const c_void) -> T {
    if ptr.is_null() {
        return T::zeroed();
    }
    // SAFETY: non-null and valid by the caller's contract.
    unsafe { raw::read(ptr) }
}

/// Reads `len` values of `T` from a native array of the given kind.
///
/// Returns an empty `Vec` when `ptr` is null or `len` is zero. A null slot in an
/// array of pointers is reported as [`BridgeError::NullElement`].
///
/// # Safety
///
/// A non-null `ptr` must be a live native array of `kind` holding at least
/// `len` elements.
pub unsafe fn marshal_array<T: Blittable>(
    ptr: *const c_void,
    len: usize,
    kind: ArrayKind,
) -> Result<Vec<T>> {
    if ptr.is_null() || len == 0 {
        return Ok(Vec::new());
    }
    check_len(len, kind.stride::<T>())?;

    if kind == ArrayKind::Flat {
        // SAFETY: contiguous run of `len` values by the caller's contract.
        return Ok(unsafe { from_native_array_blittable(ptr, len) });
    }

    let mut out = Vec::with_capacity(len);
    for index in 0..len {
        // SAFETY: `index < len`.
        let elem = unsafe { element_address::<T>(ptr, index, kind) };
        if elem.is_null() {
            return Err(BridgeError::NullElement { index });
        }
        // SAFETY: every non-null slot points at one `T`.
        out.push(unsafe { raw::read::<T>(elem) });
    }
    Ok(out)
}

/// Copies `data` into a freshly allocated flat native array.
///
/// Returns null for an empty slice. The caller owns the result and releases it
/// with [`alloc::free_memory`].
#[must_use]
pub fn to_native_array_blittable<T: Blittable>(data: &[T]) -> *mut T {
    if data.is_empty() {
        return std::ptr::null_mut();
    }
    let ptr = alloc::allocate(raw::size_of_slice(data));
    // SAFETY: `ptr` was allocated with exactly `size_of_slice(data)` bytes.
    unsafe { raw::write_array(ptr, data) };
    ptr.cast()
}

/// Copies `len` contiguous values starting at `ptr` into a `Vec`.
///
/// Returns an empty `Vec` when `ptr` is null or `len` is zero.
///
/// # Safety
///
/// A non-null `ptr` must be valid for reads of `len * size_of::<T>()` bytes.
#[must_use]
pub unsafe fn from_native_array_blittable<T: Blittable>(ptr: *const c_void, len: usize) -> Vec<T> {
    if ptr.is_null() || len == 0 {
        return Vec::new();
    }
    let mut out = Vec::<T>::with_capacity(len);
    // SAFETY: the spare capacity holds `len` elements; every byte is written by
    // the copy before `set_len` exposes it, and `T` accepts any bit pattern.
    unsafe {
        raw::copy_memory(out.as_mut_ptr().cast(), ptr, len * raw::size_of::<T>());
        out.set_len(len);
    }
    out
}
