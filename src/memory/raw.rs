//! Raw memory primitives.
//!
//! Typed reads and writes of single values or runs of values at raw addresses,
//! plus byte-level copy and fill. Every other layer of the bridge is built on
//! these functions.
//!
//! Native struct layouts are not guaranteed to be aligned to the host's
//! preferred boundary, so every access here is an *unaligned* load or store.
//! None of these functions check bounds: the caller guarantees the address
//! range is valid. This is the only place in the crate where a broken
//! invariant corrupts memory instead of producing an error.

use std::ffi::c_void;

use bytemuck::Pod;

/// A type whose in-memory layout is identical on both sides of the boundary.
///
/// Values of a `Blittable` type may be copied byte-for-byte to and from native
/// memory, with no per-field conversion.
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` (or `#[repr(transparent)]`) over fields
/// that are themselves `Blittable`, and every bit pattern the native side may
/// produce must be a valid value of the type.
pub unsafe trait Blittable: Copy + 'static {}

macro_rules! impl_blittable {
    ($($ty:ty),* $(,)?) => {
        $(
            // SAFETY: primitive numeric types accept every bit pattern.
            unsafe impl Blittable for $ty {}
        )*
    };
}

impl_blittable!(u8, i8, u16, i16, u32, i32, u64, i64, usize, isize, f32, f64);

// SAFETY: raw pointers are plain addresses; any bit pattern is a valid pointer value.
unsafe impl<T: 'static> Blittable for *mut T {}
// SAFETY: see above.
unsafe impl<T: 'static> Blittable for *const T {}
// SAFETY: arrays of blittable elements have no padding between elements.
unsafe impl<T: Blittable, const N: usize> Blittable for [T; N] {}

/// Size in bytes of `T`'s native layout.
///
/// A monomorphized constant: no reflection, no runtime marshaling.
#[inline]
#[must_use]
pub const fn size_of<T: Blittable>() -> usize {
    std::mem::size_of::<T>()
}

/// Size in bytes of `data` once laid out contiguously in native memory.
#[inline]
#[must_use]
pub const fn size_of_slice<T: Blittable>(data: &[T]) -> usize {
    data.len() * size_of::<T>()
}

/// Offsets `ptr` by `bytes`, ignoring the pointee type.
#[inline]
#[must_use]
pub fn offset<T>(ptr: *const T, bytes: usize) -> *mut c_void {
    ptr.cast::<u8>().wrapping_add(bytes).cast_mut().cast()
}

/// Reads one `T` from `src`.
///
/// # Safety
///
/// `src` must be valid for reads of `size_of::<T>()` bytes. No alignment is required.
#[inline]
#[must_use]
pub unsafe fn read<T: Blittable>(src: *const c_void) -> T {
    // SAFETY: the caller guarantees `src` covers `size_of::<T>()` readable bytes.
    unsafe { src.cast::<T>().read_unaligned() }
}

/// Writes `value` to `dst`.
///
/// # Safety
///
/// `dst` must be valid for writes of `size_of::<T>()` bytes. No alignment is required.
#[inline]
pub unsafe fn write<T: Blittable>(dst: *mut c_void, value: &T) {
    // SAFETY: the caller guarantees `dst` covers `size_of::<T>()` writable bytes.
    unsafe { dst.cast::<T>().write_unaligned(*value) }
}

/// Reads `data.len()` consecutive values starting at `src` into `data`.
///
/// Reading into a sub-slice (`&mut buf[start..start + count]`) covers the
/// "start index + count" form.
///
/// # Safety
///
/// `src` must be valid for reads of `size_of_slice(data)` bytes.
#[inline]
pub unsafe fn read_array<T: Blittable>(src: *const c_void, data: &mut [T]) {
    let len = size_of_slice(data);
    // SAFETY: `data` is a live exclusive slice of exactly `len` bytes and the
    // caller guarantees the source range; bytes have no alignment requirement.
    unsafe { copy_memory(data.as_mut_ptr().cast(), src, len) }
}

/// Writes every value of `data` consecutively starting at `dst`.
///
/// # Safety
///
/// `dst` must be valid for writes of `size_of_slice(data)` bytes and must not
/// overlap `data`.
#[inline]
pub unsafe fn write_array<T: Blittable>(dst: *mut c_void, data: &[T]) {
    let len = size_of_slice(data);
    // SAFETY: `data` is a live slice of exactly `len` bytes and the caller
    // guarantees the destination range.
    unsafe { copy_memory(dst, data.as_ptr().cast(), len) }
}

/// Copies `len` bytes from `src` to `dst`.
///
/// # Safety
///
/// Both ranges must be valid for `len` bytes and must not overlap.
#[inline]
pub unsafe fn copy_memory(dst: *mut c_void, src: *const c_void, len: usize) {
    if len == 0 {
        return;
    }
    // SAFETY: forwarded caller contract; `u8` has alignment 1.
    unsafe { std::ptr::copy_nonoverlapping(src.cast::<u8>(), dst.cast::<u8>(), len) }
}

/// Fills `len` bytes at `dst` with `value`.
///
/// # Safety
///
/// `dst` must be valid for writes of `len` bytes.
#[inline]
pub unsafe fn clear_memory(dst: *mut c_void, value: u8, len: usize) {
    if len == 0 {
        return;
    }
    // SAFETY: forwarded caller contract; `u8` has alignment 1.
    unsafe { std::ptr::write_bytes(dst.cast::<u8>(), value, len) }
}

/// Copies a slice of plain-old-data values into a fresh byte buffer.
#[must_use]
pub fn to_byte_array<T: Pod>(source: &[T]) -> Vec<u8> {
    bytemuck::cast_slice(source).to_vec()
}
