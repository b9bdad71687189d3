//! Native log forwarding.
//!
//! A [`LogStream`] is a callback table the native library writes its log
//! messages to. The table must stay at a fixed address for as long as it is
//! attached, so it lives on the C heap and is owned by the stream value; the
//! context that attaches it keeps the stream alive until it is detached.

use std::ffi::{CStr, c_char};
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::memory::alloc;
use crate::native::types::AiLogStream;

/// Log target used for forwarded native messages.
pub const NATIVE_LOG_TARGET: &str = "asset_bridge::native";

type LogCallback = Box<dyn Fn(&str) + Send + Sync>;

/// A persistent native log stream.
pub struct LogStream {
    native: *mut AiLogStream,
    callback: *mut LogCallback,
}

// SAFETY: both pointers are uniquely owned heap blocks and the boxed
// callback is `Send`, so moving the owner to another thread moves them too.
unsafe impl Send for LogStream {}
// SAFETY: shared access only calls the callback through `&`, which is sound
// because it is `Sync`, and the native table is never written after
// construction.
unsafe impl Sync for LogStream {}

impl LogStream {
    /// Forwards every message to `log::info!` under [`NATIVE_LOG_TARGET`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_callback(|msg| log::info!(target: NATIVE_LOG_TARGET, "{msg}"))
    }

    /// Forwards every message to `callback`, without its trailing newline.
    pub fn with_callback(callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        let callback: *mut LogCallback = Box::into_raw(Box::new(Box::new(callback)));
        let native = alloc::allocate_copy(&AiLogStream {
            callback: Some(forward),
            user_data: callback.cast(),
        });
        Self { native, callback }
    }

    /// The table to pass to the native attach and detach calls.
    #[inline]
    #[must_use]
    pub fn as_ptr(&self) -> *const AiLogStream {
        self.native
    }

    /// Invokes the callback the same way the native library would.
    pub fn log(&self, message: &str) {
        // SAFETY: `callback` lives until drop.
        unsafe { (*self.callback)(message.trim_end_matches(['\n', '\r'])) }
    }
}

impl Default for LogStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LogStream {
    fn drop(&mut self) {
        // SAFETY: both were created in `with_callback` and are released once.
        unsafe {
            alloc::free_memory(self.native);
            drop(Box::from_raw(self.callback));
        }
    }
}

impl std::fmt::Debug for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStream").field("native", &self.native).finish_non_exhaustive()
    }
}

unsafe extern "C" fn forward(message: *const c_char, user_data: *mut c_char) {
    if message.is_null() || user_data.is_null() {
        return;
    }
    // SAFETY: the library passes a NUL-terminated message and the `user_data`
    // it was registered with.
    let (message, callback) = unsafe {
        (
            CStr::from_ptr(message).to_string_lossy(),
            &*user_data.cast::<LogCallback>().cast_const(),
        )
    };
    let message = message.trim_end_matches(['\n', '\r']);
    if catch_unwind(AssertUnwindSafe(|| callback(message))).is_err() {
        log::warn!("Log callback panicked");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    #[test]
    fn native_callback_reaches_closure() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let stream = LogStream::with_callback(move |msg| sink.lock().push(msg.to_owned()));

        let table = unsafe { *stream.as_ptr() };
        unsafe { table.callback.unwrap()(c"Info,  T0: Load scene\n".as_ptr(), table.user_data) };
        stream.log("direct");

        assert_eq!(*seen.lock(), vec!["Info,  T0: Load scene".to_owned(), "direct".to_owned()]);
    }

    #[test]
    fn stream_is_shared_across_threads() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let stream = Arc::new(LogStream::with_callback(move |msg| sink.lock().push(msg.to_owned())));

        let workers: Vec<_> = (0..4)
            .map(|i| {
                let stream = Arc::clone(&stream);
                std::thread::spawn(move || stream.log(&format!("worker {i}")))
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let mut seen = seen.lock().clone();
        seen.sort();
        assert_eq!(seen, vec!["worker 0", "worker 1", "worker 2", "worker 3"]);
    }

    #[test]
    fn panicking_callback_is_contained() {
        let stream = LogStream::with_callback(|_| panic!("boom"));
        let table = unsafe { *stream.as_ptr() };
        unsafe { table.callback.unwrap()(c"message".as_ptr(), table.user_data) };
    }
}
