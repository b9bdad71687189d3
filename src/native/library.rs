//! Asset-import library interface.
//!
//! [`AssetLibrary`] is the C-ABI function table of the native importer,
//! expressed as a trait so the marshaling core can be driven by the real
//! library ([`SystemLibrary`](super::system::SystemLibrary), feature `system`)
//! or by any other implementation, such as an in-process mock in tests.
//!
//! The native library is not reentrant. [`SharedLibrary`] serializes every
//! call through one lock, so one import or export is in flight per library
//! instance. There is no timeout or cancellation: once a native call starts,
//! it runs to completion.

use std::ffi::CStr;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::enums::{PostProcessSteps, ReturnCode};
use super::types::{
    AiExportDataBlob, AiExportFormatDesc, AiFileIO, AiLogStream, AiMatrix4x4, AiPropertyStore, AiScene, AiString,
};

/// Function table of a native asset-import library.
///
/// Methods taking raw pointers are `unsafe`: the caller guarantees each
/// pointer is null (where the native API allows it) or was obtained from the
/// same library and not yet released.
pub trait AssetLibrary: Send {
    /// Imports a file. Returns null on failure; see [`AssetLibrary::error_string`].
    unsafe fn import_file(
        &self,
        path: &CStr,
        flags: PostProcessSteps,
        file_io: *mut AiFileIO,
        properties: *mut AiPropertyStore,
    ) -> *const AiScene;

    /// Imports from a memory buffer. `format_hint` is a file extension.
    unsafe fn import_from_memory(
        &self,
        data: &[u8],
        flags: PostProcessSteps,
        format_hint: &CStr,
        properties: *mut AiPropertyStore,
    ) -> *const AiScene;

    /// Runs post-processing on an imported scene. Returns null on failure, in
    /// which case the scene has already been released.
    unsafe fn apply_post_processing(&self, scene: *const AiScene, flags: PostProcessSteps) -> *const AiScene;

    unsafe fn release_import(&self, scene: *const AiScene);

    unsafe fn export_scene(
        &self,
        scene: *const AiScene,
        format_id: &CStr,
        path: &CStr,
        file_io: *mut AiFileIO,
        flags: PostProcessSteps,
    ) -> ReturnCode;

    /// Exports into a chain of memory blobs. Returns null on failure.
    unsafe fn export_scene_to_blob(
        &self,
        scene: *const AiScene,
        format_id: &CStr,
        flags: PostProcessSteps,
    ) -> *const AiExportDataBlob;

    unsafe fn release_export_blob(&self, blob: *const AiExportDataBlob);

    /// Description of the last failure.
    fn error_string(&self) -> String;

    fn create_property_store(&self) -> *mut AiPropertyStore;
    unsafe fn release_property_store(&self, store: *mut AiPropertyStore);
    unsafe fn set_property_integer(&self, store: *mut AiPropertyStore, name: &CStr, value: i32);
    unsafe fn set_property_float(&self, store: *mut AiPropertyStore, name: &CStr, value: f32);
    unsafe fn set_property_string(&self, store: *mut AiPropertyStore, name: &CStr, value: &AiString);
    unsafe fn set_property_matrix(&self, store: *mut AiPropertyStore, name: &CStr, value: &AiMatrix4x4);

    /// Registers a log stream. The stream must stay valid until detached.
    unsafe fn attach_log_stream(&self, stream: *const AiLogStream);
    unsafe fn detach_log_stream(&self, stream: *const AiLogStream) -> ReturnCode;
    fn enable_verbose_logging(&self, enable: bool);

    /// Supported import extensions, formatted `*.3ds;*.obj;...`.
    fn extension_list(&self) -> String;
    fn is_extension_supported(&self, extension: &CStr) -> bool;

    fn export_format_count(&self) -> usize;
    /// Description owned by the library, or null for an out-of-range index.
    fn export_format_description(&self, index: usize) -> *const AiExportFormatDesc;
}

/// Serializes access to one native library instance.
///
/// Clones share the same lock.
pub struct SharedLibrary<L: AssetLibrary> {
    inner: Arc<Mutex<L>>,
}

impl<L: AssetLibrary> SharedLibrary<L> {
    pub fn new(library: L) -> Self {
        Self {
            inner: Arc::new(Mutex::new(library)),
        }
    }

    /// Locks the library for a sequence of native calls.
    pub fn lock(&self) -> MutexGuard<'_, L> {
        self.inner.lock()
    }
}

impl<L: AssetLibrary> Clone for SharedLibrary<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
