//! Native memory layer.
//!
//! - [`raw`]: unaligned typed reads/writes, byte copy and fill
//! - [`alloc`]: C-heap allocation and the diagnostic allocation counter
//! - [`blit`]: pointer ⇄ blittable struct marshaling, flat or array-of-pointers

pub mod alloc;
pub mod blit;
pub mod raw;

pub use alloc::{allocate, allocate_copy, allocate_value, free_memory, free_pointer_array};
#[cfg(any(debug_assertions, feature = "alloc-tracking"))]
pub use alloc::{live_allocations, thread_live_allocations};
pub use blit::{
    ArrayKind, from_native_array_blittable, marshal_array, marshal_one, to_native_array_blittable,
};
pub use raw::{Blittable, clear_memory, copy_memory, read, read_array, size_of, write, write_array};
