//! Native callback bridge for [`IoSystem`].
//!
//! [`NativeIoSystem`] owns an `AiFileIO` table on the C heap whose
//! `user_data` points at the managed state. Every file the native library
//! opens gets its own `AiFile` table, tracked in the state until the library
//! closes it or [`NativeIoSystem::close_all_files`] runs.
//!
//! Callbacks never unwind into native code: a panic inside a user stream is
//! caught and reported as a failed operation.

use std::ffi::{CStr, c_char};
use std::io::SeekFrom;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::ptr;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::{FileMode, IoStream, IoSystem};
use crate::memory::alloc;
use crate::native::enums::Origin;
use crate::native::types::{AiFile, AiFileIO};

struct IoState {
    system: Box<dyn IoSystem>,
    /// Open streams keyed by the address of their native `AiFile`.
    open_files: FxHashMap<usize, Box<dyn IoStream>>,
}

/// An [`IoSystem`] exposed to the native library as an `AiFileIO` table.
pub struct NativeIoSystem {
    native: *mut AiFileIO,
    state: *mut Mutex<IoState>,
}

// SAFETY: the state is only reached through its mutex and the wrapped
// `IoSystem` and streams are `Send`.
unsafe impl Send for NativeIoSystem {}

impl NativeIoSystem {
    pub fn new(system: impl IoSystem + 'static) -> Self {
        let state = Box::into_raw(Box::new(Mutex::new(IoState {
            system: Box::new(system),
            open_files: FxHashMap::default(),
        })));
        let native = alloc::allocate_copy(&AiFileIO {
            open_proc: Some(open_proc),
            close_proc: Some(close_proc),
            user_data: state.cast(),
        });
        Self { native, state }
    }

    /// The callback table to pass to native import and export calls.
    #[inline]
    #[must_use]
    pub fn as_ptr(&self) -> *mut AiFileIO {
        self.native
    }

    fn state(&self) -> &Mutex<IoState> {
        // SAFETY: `state` lives until drop.
        unsafe { &*self.state }
    }

    /// Whether the wrapped system can open `path`.
    #[must_use]
    pub fn exists(&self, path: &str) -> bool {
        self.state().lock().system.exists(path)
    }

    #[must_use]
    pub fn open_file_count(&self) -> usize {
        self.state().lock().open_files.len()
    }

    /// Closes every file the native library left open.
    pub fn close_all_files(&self) {
        let mut state = self.state().lock();
        if !state.open_files.is_empty() {
            log::debug!("Closing {} files left open by the importer", state.open_files.len());
        }
        for (addr, mut stream) in state.open_files.drain() {
            if let Err(err) = stream.flush() {
                log::warn!("Flush on close failed: {err}");
            }
            // SAFETY: every key is the address of a live `AiFile` allocated in `open_proc`.
            unsafe { alloc::free_memory(addr as *mut AiFile) };
        }
    }
}

impl Drop for NativeIoSystem {
    fn drop(&mut self) {
        self.close_all_files();
        // SAFETY: both pointers were created in `new` and are released once.
        unsafe {
            alloc::free_memory(self.native);
            drop(Box::from_raw(self.state));
        }
    }
}

// ============================================================================
// Callbacks
// ============================================================================

/// Runs `f` against the state behind an `AiFile`, or returns `fallback` when
/// the file is unknown or the stream panics.
unsafe fn with_stream<R>(file: *mut AiFile, fallback: R, f: impl FnOnce(&mut dyn IoStream) -> R) -> R {
    if file.is_null() {
        return fallback;
    }
    // SAFETY: `file` is a live table created by `open_proc`.
    let state = unsafe { (*file).user_data.cast::<Mutex<IoState>>() };
    if state.is_null() {
        return fallback;
    }
    // SAFETY: the state outlives every file it opened.
    let state = unsafe { &*state };
    let mut guard = state.lock();
    let Some(stream) = guard.open_files.get_mut(&(file as usize)) else {
        return fallback;
    };
    catch_unwind(AssertUnwindSafe(|| f(stream.as_mut()))).unwrap_or(fallback)
}

unsafe extern "C" fn open_proc(io: *mut AiFileIO, path: *const c_char, mode: *const c_char) -> *mut AiFile {
    if io.is_null() || path.is_null() || mode.is_null() {
        return ptr::null_mut();
    }
    // SAFETY: the native library passes the table it was given and C strings.
    let (state, path, mode) = unsafe {
        (
            &*(*io).user_data.cast::<Mutex<IoState>>(),
            CStr::from_ptr(path).to_string_lossy().into_owned(),
            CStr::from_ptr(mode).to_string_lossy().into_owned(),
        )
    };
    let Some(mode) = FileMode::from_c_mode(&mode) else {
        log::warn!("Unsupported file mode {mode:?} for {path}");
        return ptr::null_mut();
    };

    let opened = catch_unwind(AssertUnwindSafe(|| state.lock().system.open(&path, mode)));
    let stream = match opened {
        Ok(Ok(stream)) => stream,
        Ok(Err(err)) => {
            log::warn!("Failed to open {path}: {err}");
            return ptr::null_mut();
        }
        Err(_) => {
            log::warn!("IO system panicked opening {path}");
            return ptr::null_mut();
        }
    };

    let file = alloc::allocate_copy(&AiFile {
        read_proc: Some(read_proc),
        write_proc: Some(write_proc),
        tell_proc: Some(tell_proc),
        file_size_proc: Some(size_proc),
        seek_proc: Some(seek_proc),
        flush_proc: Some(flush_proc),
        user_data: ptr::from_ref(state).cast_mut().cast(),
    });
    state.lock().open_files.insert(file as usize, stream);
    file
}

unsafe extern "C" fn close_proc(io: *mut AiFileIO, file: *mut AiFile) {
    if io.is_null() || file.is_null() {
        return;
    }
    // SAFETY: the native library passes the table it was given.
    let state = unsafe { &*(*io).user_data.cast::<Mutex<IoState>>() };
    let removed = state.lock().open_files.remove(&(file as usize));
    if let Some(mut stream) = removed {
        if let Err(err) = stream.flush() {
            log::warn!("Flush on close failed: {err}");
        }
        // SAFETY: `file` was allocated in `open_proc` and is closed once.
        unsafe { alloc::free_memory(file) };
    }
}

unsafe extern "C" fn read_proc(file: *mut AiFile, buffer: *mut c_char, size: usize, count: usize) -> usize {
    let Some(total) = size.checked_mul(count).filter(|&t| t > 0) else {
        return 0;
    };
    if buffer.is_null() {
        return 0;
    }
    // SAFETY: the native library provides `size * count` writable bytes.
    let buf = unsafe { std::slice::from_raw_parts_mut(buffer.cast::<u8>(), total) };
    // SAFETY: forwarded native contract.
    let read = unsafe {
        with_stream(file, 0, |stream| {
            let mut filled = 0;
            while filled < total {
                match stream.read(&mut buf[filled..]) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => filled += n,
                }
            }
            filled
        })
    };
    read / size
}

unsafe extern "C" fn write_proc(file: *mut AiFile, buffer: *const c_char, size: usize, count: usize) -> usize {
    let Some(total) = size.checked_mul(count).filter(|&t| t > 0) else {
        return 0;
    };
    if buffer.is_null() {
        return 0;
    }
    // SAFETY: the native library provides `size * count` readable bytes.
    let buf = unsafe { std::slice::from_raw_parts(buffer.cast::<u8>(), total) };
    // SAFETY: forwarded native contract.
    let written = unsafe { with_stream(file, 0, |stream| if stream.write_all(buf).is_ok() { total } else { 0 }) };
    written / size
}

unsafe extern "C" fn tell_proc(file: *mut AiFile) -> usize {
    // SAFETY: forwarded native contract.
    unsafe { with_stream(file, 0, |stream| stream.stream_position().map_or(0, |p| p as usize)) }
}

unsafe extern "C" fn size_proc(file: *mut AiFile) -> usize {
    // SAFETY: forwarded native contract.
    unsafe { with_stream(file, 0, |stream| stream.size().map_or(0, |s| s as usize)) }
}

unsafe extern "C" fn seek_proc(file: *mut AiFile, offset: usize, origin: u32) -> i32 {
    let Some(origin) = Origin::from_raw(origin) else {
        return -1;
    };
    // Relative offsets arrive as two's complement in an unsigned size.
    let pos = match origin {
        Origin::Set => SeekFrom::Start(offset as u64),
        Origin::Current => SeekFrom::Current(offset as i64),
        Origin::End => SeekFrom::End(offset as i64),
    };
    // SAFETY: forwarded native contract.
    unsafe { with_stream(file, -1, |stream| if stream.seek(pos).is_ok() { 0 } else { -1 }) }
}

unsafe extern "C" fn flush_proc(file: *mut AiFile) {
    // SAFETY: forwarded native contract.
    unsafe {
        with_stream(file, (), |stream| {
            if let Err(err) = stream.flush() {
                log::warn!("Flush failed: {err}");
            }
        });
    }
}
