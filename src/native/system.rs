//! Bindings to a system-installed asset-import library.
//!
//! Only compiled with the `system` feature, which links `libassimp`.

use std::ffi::{CStr, c_char, c_int, c_uint};

use super::enums::{PostProcessSteps, ReturnCode};
use super::library::AssetLibrary;
use super::types::{
    AiExportDataBlob, AiExportFormatDesc, AiFileIO, AiLogStream, AiMatrix4x4, AiPropertyStore, AiScene, AiString,
};
use crate::errors::{BridgeError, Result};

#[link(name = "assimp")]
unsafe extern "C" {
    fn aiImportFileExWithProperties(
        file: *const c_char,
        flags: c_uint,
        fs: *mut AiFileIO,
        props: *const AiPropertyStore,
    ) -> *const AiScene;
    fn aiImportFileFromMemoryWithProperties(
        buffer: *const c_char,
        length: c_uint,
        flags: c_uint,
        hint: *const c_char,
        props: *const AiPropertyStore,
    ) -> *const AiScene;
    fn aiApplyPostProcessing(scene: *const AiScene, flags: c_uint) -> *const AiScene;
    fn aiReleaseImport(scene: *const AiScene);
    fn aiExportSceneEx(
        scene: *const AiScene,
        format_id: *const c_char,
        file_name: *const c_char,
        io: *mut AiFileIO,
        preprocessing: c_uint,
    ) -> c_int;
    fn aiExportSceneToBlob(scene: *const AiScene, format_id: *const c_char, preprocessing: c_uint)
    -> *const AiExportDataBlob;
    fn aiReleaseExportBlob(data: *const AiExportDataBlob);
    fn aiGetErrorString() -> *const c_char;
    fn aiCreatePropertyStore() -> *mut AiPropertyStore;
    fn aiReleasePropertyStore(store: *mut AiPropertyStore);
    fn aiSetImportPropertyInteger(store: *mut AiPropertyStore, name: *const c_char, value: c_int);
    fn aiSetImportPropertyFloat(store: *mut AiPropertyStore, name: *const c_char, value: f32);
    fn aiSetImportPropertyString(store: *mut AiPropertyStore, name: *const c_char, value: *const AiString);
    fn aiSetImportPropertyMatrix(store: *mut AiPropertyStore, name: *const c_char, value: *const AiMatrix4x4);
    fn aiAttachLogStream(stream: *const AiLogStream);
    fn aiDetachLogStream(stream: *const AiLogStream) -> c_int;
    fn aiEnableVerboseLogging(enable: c_int);
    fn aiGetExtensionList(out: *mut AiString);
    fn aiIsExtensionSupported(extension: *const c_char) -> c_int;
    fn aiGetExportFormatCount() -> usize;
    fn aiGetExportFormatDescription(index: usize) -> *const AiExportFormatDesc;
}

/// The asset-import library linked into the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLibrary;

impl SystemLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Converts a buffer length to the 32-bit length the memory importer takes.
fn memory_length(data: &[u8]) -> Result<c_uint> {
    c_uint::try_from(data.len())
        .map_err(|_| BridgeError::InvalidArgument(format!("{} bytes exceed the native buffer limit", data.len())))
}

impl AssetLibrary for SystemLibrary {
    unsafe fn import_file(
        &self,
        path: &CStr,
        flags: PostProcessSteps,
        file_io: *mut AiFileIO,
        properties: *mut AiPropertyStore,
    ) -> *const AiScene {
        // SAFETY: `path` is NUL-terminated; the other pointers are forwarded.
        unsafe { aiImportFileExWithProperties(path.as_ptr(), flags.bits(), file_io, properties) }
    }

    unsafe fn import_from_memory(
        &self,
        data: &[u8],
        flags: PostProcessSteps,
        format_hint: &CStr,
        properties: *mut AiPropertyStore,
    ) -> *const AiScene {
        let Ok(length) = memory_length(data) else {
            return std::ptr::null();
        };
        // SAFETY: `data` is valid for `length` bytes for the whole call.
        unsafe {
            aiImportFileFromMemoryWithProperties(
                data.as_ptr().cast(),
                length,
                flags.bits(),
                format_hint.as_ptr(),
                properties,
            )
        }
    }

    unsafe fn apply_post_processing(&self, scene: *const AiScene, flags: PostProcessSteps) -> *const AiScene {
        // SAFETY: forwarded caller contract.
        unsafe { aiApplyPostProcessing(scene, flags.bits()) }
    }

    unsafe fn release_import(&self, scene: *const AiScene) {
        // SAFETY: forwarded caller contract.
        unsafe { aiReleaseImport(scene) }
    }

    unsafe fn export_scene(
        &self,
        scene: *const AiScene,
        format_id: &CStr,
        path: &CStr,
        file_io: *mut AiFileIO,
        flags: PostProcessSteps,
    ) -> ReturnCode {
        // SAFETY: forwarded caller contract.
        let code = unsafe { aiExportSceneEx(scene, format_id.as_ptr(), path.as_ptr(), file_io, flags.bits()) };
        ReturnCode::from_raw(code)
    }

    unsafe fn export_scene_to_blob(
        &self,
        scene: *const AiScene,
        format_id: &CStr,
        flags: PostProcessSteps,
    ) -> *const AiExportDataBlob {
        // SAFETY: forwarded caller contract.
        unsafe { aiExportSceneToBlob(scene, format_id.as_ptr(), flags.bits()) }
    }

    unsafe fn release_export_blob(&self, blob: *const AiExportDataBlob) {
        // SAFETY: forwarded caller contract.
        unsafe { aiReleaseExportBlob(blob) }
    }

    fn error_string(&self) -> String {
        // SAFETY: the library returns a static, NUL-terminated string.
        unsafe {
            let ptr = aiGetErrorString();
            if ptr.is_null() {
                return String::new();
            }
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    }

    fn create_property_store(&self) -> *mut AiPropertyStore {
        // SAFETY: no preconditions.
        unsafe { aiCreatePropertyStore() }
    }

    unsafe fn release_property_store(&self, store: *mut AiPropertyStore) {
        // SAFETY: forwarded caller contract.
        unsafe { aiReleasePropertyStore(store) }
    }

    unsafe fn set_property_integer(&self, store: *mut AiPropertyStore, name: &CStr, value: i32) {
        // SAFETY: forwarded caller contract.
        unsafe { aiSetImportPropertyInteger(store, name.as_ptr(), value) }
    }

    unsafe fn set_property_float(&self, store: *mut AiPropertyStore, name: &CStr, value: f32) {
        // SAFETY: forwarded caller contract.
        unsafe { aiSetImportPropertyFloat(store, name.as_ptr(), value) }
    }

    unsafe fn set_property_string(&self, store: *mut AiPropertyStore, name: &CStr, value: &AiString) {
        // SAFETY: forwarded caller contract; `value` is copied by the library.
        unsafe { aiSetImportPropertyString(store, name.as_ptr(), value) }
    }

    unsafe fn set_property_matrix(&self, store: *mut AiPropertyStore, name: &CStr, value: &AiMatrix4x4) {
        // SAFETY: forwarded caller contract; `value` is copied by the library.
        unsafe { aiSetImportPropertyMatrix(store, name.as_ptr(), value) }
    }

    unsafe fn attach_log_stream(&self, stream: *const AiLogStream) {
        // SAFETY: forwarded caller contract.
        unsafe { aiAttachLogStream(stream) }
    }

    unsafe fn detach_log_stream(&self, stream: *const AiLogStream) -> ReturnCode {
        // SAFETY: forwarded caller contract.
        ReturnCode::from_raw(unsafe { aiDetachLogStream(stream) })
    }

    fn enable_verbose_logging(&self, enable: bool) {
        // SAFETY: no preconditions.
        unsafe { aiEnableVerboseLogging(c_int::from(enable)) }
    }

    fn extension_list(&self) -> String {
        let mut out = AiString::default();
        // SAFETY: `out` is a writable native string.
        unsafe { aiGetExtensionList(&raw mut out) };
        out.to_string_lossy()
    }

    fn is_extension_supported(&self, extension: &CStr) -> bool {
        // SAFETY: `extension` is NUL-terminated.
        unsafe { aiIsExtensionSupported(extension.as_ptr()) != 0 }
    }

    fn export_format_count(&self) -> usize {
        // SAFETY: no preconditions.
        unsafe { aiGetExportFormatCount() }
    }

    fn export_format_description(&self, index: usize) -> *const AiExportFormatDesc {
        // SAFETY: out-of-range indices return null.
        unsafe { aiGetExportFormatDescription(index) }
    }
}
