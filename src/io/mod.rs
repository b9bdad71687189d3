//! File-system collaborators for the native importer.
//!
//! The native library can read (and write) files through a callback table
//! instead of the C runtime. This module defines the managed side of that
//! contract:
//!
//! - [`IoStream`]: one open file
//! - [`IoSystem`]: opens streams by path
//! - [`FileIoSystem`]: `std::fs` implementation with search directories
//! - [`NativeIoSystem`]: the callback table handed to the native library

mod file;
mod native;

use std::io::{self, Read, Seek, SeekFrom, Write};

pub use file::{FileIoStream, FileIoSystem};
pub use native::NativeIoSystem;

/// How a stream is opened, parsed from a C `fopen` mode string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
    Read,
    Write,
    ReadWrite,
    Append,
}

impl FileMode {
    /// Parses `r`, `w`, `a`, optionally followed by `b` and/or `+`.
    #[must_use]
    pub fn from_c_mode(mode: &str) -> Option<Self> {
        let plus = mode.contains('+');
        match mode.chars().next()? {
            'r' if plus => Some(Self::ReadWrite),
            'r' => Some(Self::Read),
            'w' if plus => Some(Self::ReadWrite),
            'w' => Some(Self::Write),
            'a' => Some(Self::Append),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn can_write(self) -> bool {
        !matches!(self, Self::Read)
    }
}

/// One open file.
pub trait IoStream: Read + Write + Seek + Send {
    /// Total length in bytes. The stream position is preserved.
    fn size(&mut self) -> io::Result<u64> {
        let current = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        if current != end {
            self.seek(SeekFrom::Start(current))?;
        }
        Ok(end)
    }
}

/// Opens streams on behalf of the native library.
pub trait IoSystem: Send {
    fn open(&mut self, path: &str, mode: FileMode) -> io::Result<Box<dyn IoStream>>;

    fn exists(&self, path: &str) -> bool;
}
