//! Marshalable-object protocol.
//!
//! Every managed type with a native counterpart implements [`Marshalable`]:
//! it knows how to fill its native struct (allocating whatever nested arrays
//! and strings that struct owns), how to rebuild itself from a native struct,
//! and how to free what a native struct owns.
//!
//! The generic array and pointer helpers in this module are built on those
//! three operations plus the blittable marshaler in [`crate::memory`], and
//! follow the same rules:
//!
//! - a null handle and a zero length both mean "empty"
//! - element `i` lives at `base + i * stride`, where the stride depends on
//!   [`ArrayKind`]
//! - the count used to free is always the count used to allocate
//!
//! # Ownership
//!
//! Every native struct produced by [`Marshalable::to_native`] owns its nested
//! handles. Releasing it with [`Marshalable::free_native`] (or
//! [`free_native_array`] for arrays) walks that ownership tree exactly once.
//! A build that fails halfway frees everything it had already allocated
//! before returning the error, so an aborted export never leaks.

use std::ffi::c_void;
use std::marker::PhantomData;
use std::ptr;

use bytemuck::Zeroable;

pub use crate::memory::ArrayKind;
use crate::errors::{BridgeError, Result};
use crate::memory::blit::{check_len, element_address};
use crate::memory::{self, Blittable, alloc, raw};

/// Two-way conversion between a managed value and its native struct.
///
/// The `Blittable` bound on [`Marshalable::Native`] is what makes every native
/// representation flat-copyable: a native struct that needed per-field
/// conversion could not implement it, so there is no runtime "is blittable"
/// flag to get wrong.
pub trait Marshalable: Sized {
    /// Fixed-layout native representation.
    type Native: Blittable + Zeroable;

    /// Fills `native` from managed fields.
    ///
    /// `this_ptr` is the address `native` will be stored at once complete, or
    /// null when the caller does not know it yet. Implementations must assign
    /// every field they own, and must store each nested handle (with its
    /// count) as soon as it is allocated, so that a failure later in the
    /// build can be cleaned up by [`Marshalable::free_native_contents`].
    fn write_native(&self, this_ptr: *mut Self::Native, native: &mut Self::Native) -> Result<()>;

    /// Replaces managed fields with the contents of `native`.
    ///
    /// Pre-existing collections are cleared first, so an instance can be
    /// reused.
    ///
    /// # Safety
    ///
    /// Every handle in `native` must be null or live, with the counts stored
    /// alongside it.
    unsafe fn read_native(&mut self, native: &Self::Native) -> Result<()>;

    /// Frees every handle `native` owns, but not `native` itself.
    ///
    /// # Safety
    ///
    /// `native` must have been filled by [`Marshalable::write_native`] (or be
    /// all-zero), and its handles must not have been freed already.
    unsafe fn free_native_contents(native: &Self::Native);

    /// Builds a fresh native struct.
    ///
    /// On error, everything allocated so far has already been freed.
    fn to_native(&self, this_ptr: *mut Self::Native) -> Result<Self::Native> {
        let mut native = Self::Native::zeroed();
        match self.write_native(this_ptr, &mut native) {
            Ok(()) => Ok(native),
            Err(err) => {
                // SAFETY: `native` started zeroed and only holds handles the
                // failed build stored into it.
                unsafe { Self::free_native_contents(&native) };
                Err(err)
            }
        }
    }

    /// Builds a managed value from a native struct.
    ///
    /// # Safety
    ///
    /// Same contract as [`Marshalable::read_native`].
    unsafe fn from_native(native: &Self::Native) -> Result<Self>
    where
        Self: Default,
    {
        let mut value = Self::default();
        // SAFETY: forwarded caller contract.
        unsafe { value.read_native(native)? };
        Ok(value)
    }

    /// Frees the native struct at `ptr` and everything it owns.
    ///
    /// `free_self` is false when `ptr` is part of a larger block that an
    /// ancestor frees, such as an element of a flat array. Null is ignored.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point at a live native struct built by this
    /// protocol; with `free_self`, it must be a block from [`alloc::allocate`].
    unsafe fn free_native(ptr: *mut Self::Native, free_self: bool) {
        if ptr.is_null() {
            return;
        }
        // SAFETY: live native struct by the caller's contract.
        let native: Self::Native = unsafe { raw::read(ptr.cast()) };
        // SAFETY: `native` was built by this protocol and is freed exactly once here.
        unsafe { Self::free_native_contents(&native) };
        if free_self {
            // SAFETY: forwarded caller contract.
            unsafe { alloc::free_memory(ptr) };
        }
    }
}

// ============================================================================
// Single objects
// ============================================================================

/// Allocates a native struct for `item` and returns its address.
pub fn to_native_pointer<M: Marshalable>(item: &M) -> Result<*mut M::Native> {
    let target = alloc::allocate_value::<M::Native>();
    match item.to_native(target) {
        Ok(native) => {
            // SAFETY: `target` was allocated for exactly one `M::Native`.
            unsafe { raw::write(target.cast(), &native) };
            Ok(target)
        }
        Err(err) => {
            // SAFETY: nothing else refers to `target`.
            unsafe { alloc::free_memory(target) };
            Err(err)
        }
    }
}

/// Builds a managed value from the native struct at `ptr`, or `None` for null.
///
/// # Safety
///
/// `ptr` must be null or point at a live native struct.
pub unsafe fn from_native_pointer<M: Marshalable + Default>(ptr: *const M::Native) -> Result<Option<M>> {
    if ptr.is_null() {
        return Ok(None);
    }
    // SAFETY: non-null and live by the caller's contract.
    let native: M::Native = unsafe { raw::read(ptr.cast()) };
    // SAFETY: forwarded caller contract.
    unsafe { M::from_native(&native) }.map(Some)
}

/// Owning handle to a native struct built from a managed value.
///
/// The struct and everything it owns are freed on drop, so a native
/// representation handed to a native call is released on every exit path.
pub struct NativeBox<M: Marshalable> {
    ptr: *mut M::Native,
    _marker: PhantomData<M>,
}

impl<M: Marshalable> NativeBox<M> {
    pub fn new(item: &M) -> Result<Self> {
        Ok(Self {
            ptr: to_native_pointer(item)?,
            _marker: PhantomData,
        })
    }

    #[inline]
    #[must_use]
    pub fn as_ptr(&self) -> *mut M::Native {
        self.ptr
    }

    /// Releases ownership without freeing.
    #[must_use]
    pub fn into_raw(self) -> *mut M::Native {
        let ptr = self.ptr;
        std::mem::forget(self);
        ptr
    }
}

impl<M: Marshalable> Drop for NativeBox<M> {
    fn drop(&mut self) {
        // SAFETY: `ptr` came from `to_native_pointer` and is owned by this box.
        unsafe { M::free_native(self.ptr, true) };
    }
}

// ============================================================================
// Arrays
// ============================================================================

/// Marshals `items` into a freshly allocated native array of `kind`.
///
/// Returns null for an empty slice. Release the result with
/// [`free_native_array`] using `items.len()` and the same `kind`.
pub fn to_native_array<M: Marshalable>(items: &[M], kind: ArrayKind) -> Result<*mut c_void> {
    if items.is_empty() {
        return Ok(ptr::null_mut());
    }
    let stride = kind.stride::<M::Native>();
    let base = alloc::allocate(check_len(items.len(), stride)?);

    for (index, item) in items.iter().enumerate() {
        let slot = raw::offset(base, index * stride);
        let written = match kind {
            ArrayKind::Flat => item.to_native(slot.cast()).map(|native| {
                // SAFETY: `slot` is element `index` of a block sized for `items.len()` elements.
                unsafe { raw::write(slot, &native) };
            }),
            ArrayKind::Pointers => to_native_pointer(item).map(|target| {
                // SAFETY: `slot` is pointer slot `index` of the block.
                unsafe { raw::write(slot, &target) };
            }),
        };
        if let Err(err) = written {
            // SAFETY: elements `0..index` are complete; the failed one freed itself.
            unsafe { free_native_array::<M>(base, index, kind) };
            return Err(err);
        }
    }
    Ok(base)
}

/// Builds managed values from a native array of `kind`.
///
/// Null or zero length yields an empty `Vec`. A null slot in an array of
/// pointers is reported as [`BridgeError::NullElement`].
///
/// # Safety
///
/// A non-null `ptr` must be a live native array of `kind` with at least `len`
/// elements, each a live native struct.
pub unsafe fn from_native_array<M: Marshalable + Default>(
    ptr: *const c_void,
    len: usize,
    kind: ArrayKind,
) -> Result<Vec<M>> {
    if ptr.is_null() || len == 0 {
        return Ok(Vec::new());
    }
    check_len(len, kind.stride::<M::Native>())?;

    let mut out = Vec::with_capacity(len);
    for index in 0..len {
        // SAFETY: `index < len`.
        let elem = unsafe { element_address::<M::Native>(ptr, index, kind) };
        if elem.is_null() {
            return Err(BridgeError::NullElement { index });
        }
        // SAFETY: every element is a live native struct.
        let native: M::Native = unsafe { raw::read(elem) };
        // SAFETY: forwarded caller contract.
        out.push(unsafe { M::from_native(&native)? });
    }
    Ok(out)
}

/// Frees a native array of `kind` built by [`to_native_array`], including
/// everything each element owns. Null is ignored.
///
/// # Safety
///
/// `ptr` must be null or an array returned by [`to_native_array`] for exactly
/// `len` items of the same `kind`, not yet freed.
pub unsafe fn free_native_array<M: Marshalable>(ptr: *mut c_void, len: usize, kind: ArrayKind) {
    if ptr.is_null() {
        return;
    }
    let stride = kind.stride::<M::Native>();
    for index in 0..len {
        let slot = raw::offset(ptr, index * stride);
        match kind {
            ArrayKind::Flat => {
                // SAFETY: the element lives inside the block, freed below.
                unsafe { M::free_native(slot.cast(), false) };
            }
            ArrayKind::Pointers => {
                // SAFETY: each slot holds a pointer from `to_native_pointer`.
                unsafe {
                    let target: *mut M::Native = raw::read(slot);
                    M::free_native(target, true);
                }
            }
        }
    }
    // SAFETY: the block came from `alloc::allocate`.
    unsafe { alloc::free_memory(ptr) };
}

// ============================================================================
// Converted blittable arrays
// ============================================================================

/// Copies `items` into a flat native array, converting each element.
///
/// Returns null for an empty slice.
#[must_use]
pub fn to_native_converted<T, N>(items: &[T]) -> *mut N
where
    T: Copy,
    N: Blittable + From<T>,
{
    if items.is_empty() {
        return ptr::null_mut();
    }
    let native: Vec<N> = items.iter().map(|&item| N::from(item)).collect();
    memory::to_native_array_blittable(&native)
}

/// Copies a flat native array into managed values, converting each element.
///
/// # Safety
///
/// A non-null `ptr` must be valid for reads of `len` elements.
pub unsafe fn from_native_converted<N, T>(ptr: *const N, len: usize) -> Result<Vec<T>>
where
    N: Blittable,
    T: From<N>,
{
    // SAFETY: forwarded caller contract.
    let native: Vec<N> = unsafe { memory::marshal_array(ptr.cast(), len, ArrayKind::Flat)? };
    Ok(native.into_iter().map(T::from).collect())
}

/// Converts a managed collection length to a native `u32` count.
pub(crate) fn native_count(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| BridgeError::InvalidArgument(format!("{len} elements exceed a native count")))
}
