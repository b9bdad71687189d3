//! Error Types
//!
//! This module defines the error type used throughout the bridge.
//!
//! # Overview
//!
//! [`BridgeError`] covers every recoverable failure mode:
//! - The native library reporting that an import or export failed
//! - Managed values that cannot be represented in the fixed native layout
//! - Native counts or pointers rejected by the perimeter sanity checks
//! - File and stream IO performed on behalf of the native library
//!
//! Allocation failure is not represented: it aborts the process through
//! [`std::alloc::handle_alloc_error`].
//!
//! # Usage
//!
//! All fallible APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, BridgeError>`.
//!
//! ```rust,ignore
//! use asset_bridge::errors::{BridgeError, Result};
//!
//! fn load() -> Result<()> {
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

use crate::image::ImageErrorCode;

/// The main error type for the bridge.
#[derive(Error, Debug)]
pub enum BridgeError {
    // ========================================================================
    // Native Library Errors
    // ========================================================================
    /// The native library failed to import a scene. Carries its error string.
    #[error("Error importing file: {message}")]
    ImportFailed {
        /// Error string reported by the native library
        message: String,
    },

    /// The native library failed to export a scene. Carries its error string.
    #[error("Error exporting scene: {message}")]
    ExportFailed {
        /// Error string reported by the native library
        message: String,
    },

    /// The native image library reported an error.
    #[error("Image library error: {error:?}")]
    Image {
        /// Error code reported by the image library
        error: ImageErrorCode,
    },

    // ========================================================================
    // Marshaling Errors
    // ========================================================================
    /// A managed string does not fit into a fixed-size native string.
    #[error("String of {len} bytes does not fit a native string of {max} bytes")]
    StringTooLong {
        /// UTF-8 byte length of the rejected string
        len: usize,
        /// Capacity of the native field
        max: usize,
    },

    /// A native count/stride pair describes an impossible memory range.
    #[error("Invalid native array length: {count} elements of {stride} bytes")]
    InvalidLength {
        /// Element count reported by the native side
        count: usize,
        /// Byte stride of a single element
        stride: usize,
    },

    /// A slot of a native array-of-pointers was null where data was expected.
    #[error("Null element at index {index} of a native pointer array")]
    NullElement {
        /// Index of the null slot
        index: usize,
    },

    /// A string handed to the native side contained an interior NUL byte.
    #[error("String contains an interior NUL byte: {0}")]
    InvalidCString(#[from] std::ffi::NulError),

    // ========================================================================
    // Argument & State Errors
    // ========================================================================
    /// A caller-supplied argument was rejected before reaching native code.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The input file does not exist and no custom IO system is installed.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias for `Result<T, BridgeError>`.
pub type Result<T> = std::result::Result<T, BridgeError>;
