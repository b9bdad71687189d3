//! Import and export entry points.
//!
//! [`AssetContext`] ties the pieces together: it owns the importer settings,
//! the optional custom file system and attached log streams, and drives the
//! native library through the marshaling core.
//!
//! # Import flow
//!
//! 1. Fill a fresh native property store from the settings
//! 2. Import without post-processing
//! 3. Patch the root transform in place, if one is configured
//! 4. Run post-processing, if any steps were requested
//! 5. Copy the native scene into a managed [`Scene`]
//!
//! The native scene, the property store and any files the importer left open
//! are released on every path out of this sequence, including errors.
//!
//! # Export flow
//!
//! The managed scene is marshaled into a [`NativeBox`], handed to the
//! library, and freed when the box drops. Conversions skip the managed
//! round trip and export the imported native scene directly.

use std::ffi::{CStr, CString, c_char};
use std::path::Path;
use std::ptr;

use crate::config::{ConfigSet, PropertyConfig, PropertyStore};
use crate::errors::{BridgeError, Result};
use crate::io::{IoSystem, NativeIoSystem};
use crate::logging::LogStream;
use crate::marshal::{NativeBox, from_native_pointer};
use crate::memory::{from_native_array_blittable, raw};
use crate::native::enums::PostProcessSteps;
use crate::native::library::{AssetLibrary, SharedLibrary};
use crate::native::types::{AiExportDataBlob, AiExportFormatDesc, AiFileIO, AiPropertyStore, AiScene};
use crate::scene::{RootTransform, Scene, patch_root_transform};

/// One export format the library can write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportFormatDescription {
    /// Identifier passed to the export calls, e.g. `"obj"`.
    pub format_id: String,
    pub description: String,
    /// Preferred file extension, without the dot.
    pub file_extension: String,
}

/// Managed copy of an in-memory export.
///
/// The first blob holds the main file. Formats that write auxiliary files
/// (such as a material library) chain them through `next`, each named after
/// its role.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportDataBlob {
    pub name: String,
    pub data: Vec<u8>,
    pub next: Option<Box<ExportDataBlob>>,
}

impl ExportDataBlob {
    #[inline]
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// This blob followed by every chained blob.
    pub fn iter(&self) -> impl Iterator<Item = &ExportDataBlob> {
        std::iter::successors(Some(self), |blob| blob.next.as_deref())
    }

    /// Copies a native blob chain.
    ///
    /// # Safety
    ///
    /// `ptr` must point at a live blob whose `data` holds `size` bytes and
    /// whose `next` chain is null-terminated.
    unsafe fn from_native_chain(ptr: *const AiExportDataBlob) -> Self {
        let mut parts = Vec::new();
        let mut current = ptr;
        while !current.is_null() {
            // SAFETY: live chain by the caller's contract.
            let native: AiExportDataBlob = unsafe { raw::read(current.cast()) };
            parts.push(Self {
                name: native.name.to_string_lossy(),
                // SAFETY: `data` holds `size` bytes.
                data: unsafe { from_native_array_blittable::<u8>(native.data, native.size) },
                next: None,
            });
            current = native.next;
        }
        parts
            .into_iter()
            .rev()
            .reduce(|next, mut blob| {
                blob.next = Some(Box::new(next));
                blob
            })
            .unwrap_or_default()
    }
}

/// Releases an imported native scene and closes leftover files on drop.
struct ImportGuard<'a, L: AssetLibrary> {
    library: &'a L,
    scene: *const AiScene,
    io: Option<&'a NativeIoSystem>,
}

impl<L: AssetLibrary> Drop for ImportGuard<'_, L> {
    fn drop(&mut self) {
        if !self.scene.is_null() {
            // SAFETY: `scene` came from the library and is released once.
            unsafe { self.library.release_import(self.scene) };
        }
        if let Some(io) = self.io {
            io.close_all_files();
        }
    }
}

/// Entry point for importing, exporting and converting scenes.
pub struct AssetContext<L: AssetLibrary> {
    library: SharedLibrary<L>,
    configs: ConfigSet,
    root_transform: RootTransform,
    io_system: Option<NativeIoSystem>,
    log_streams: Vec<LogStream>,
    verbose: bool,
}

impl<L: AssetLibrary> AssetContext<L> {
    pub fn new(library: L) -> Self {
        Self::with_shared(SharedLibrary::new(library))
    }

    /// Creates a context over a library shared with other contexts. Native
    /// calls from all of them are serialized.
    pub fn with_shared(library: SharedLibrary<L>) -> Self {
        Self {
            library,
            configs: ConfigSet::new(),
            root_transform: RootTransform::IDENTITY,
            io_system: None,
            log_streams: Vec::new(),
            verbose: false,
        }
    }

    #[must_use]
    pub fn library(&self) -> &SharedLibrary<L> {
        &self.library
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    #[must_use]
    pub fn root_transform(&self) -> RootTransform {
        self.root_transform
    }

    /// Transform applied to the root node of every imported scene, before
    /// post-processing.
    pub fn set_root_transform(&mut self, transform: RootTransform) {
        self.root_transform = transform;
    }

    pub fn set_config(&mut self, name: &str, value: PropertyConfig) {
        self.configs.set(name, value);
    }

    pub fn remove_config(&mut self, name: &str) -> Option<PropertyConfig> {
        self.configs.remove(name)
    }

    pub fn clear_configs(&mut self) {
        self.configs.clear();
    }

    #[must_use]
    pub fn configs(&self) -> &ConfigSet {
        &self.configs
    }

    /// Routes all native file access through `system`.
    pub fn set_io_system(&mut self, system: impl IoSystem + 'static) {
        self.io_system = Some(NativeIoSystem::new(system));
    }

    /// Goes back to the library's own file access.
    pub fn remove_io_system(&mut self) {
        self.io_system = None;
    }

    #[must_use]
    pub fn has_io_system(&self) -> bool {
        self.io_system.is_some()
    }

    // ========================================================================
    // Logging
    // ========================================================================

    /// Attaches `stream` to the library. It stays attached until
    /// [`AssetContext::detach_log_streams`] or until the context drops.
    pub fn attach_log_stream(&mut self, stream: LogStream) {
        // SAFETY: the stream is kept alive in `log_streams` until detached.
        unsafe { self.library.lock().attach_log_stream(stream.as_ptr()) };
        self.log_streams.push(stream);
    }

    pub fn detach_log_streams(&mut self) {
        if self.log_streams.is_empty() {
            return;
        }
        let library = self.library.lock();
        for stream in self.log_streams.drain(..) {
            // SAFETY: the stream was attached by this context and is still alive.
            let code = unsafe { library.detach_log_stream(stream.as_ptr()) };
            if !code.is_success() {
                log::warn!("Failed to detach log stream: {code:?}");
            }
        }
    }

    #[must_use]
    pub fn log_stream_count(&self) -> usize {
        self.log_streams.len()
    }

    pub fn set_verbose_logging(&mut self, verbose: bool) {
        self.library.lock().enable_verbose_logging(verbose);
        self.verbose = verbose;
    }

    #[must_use]
    pub fn is_verbose_logging(&self) -> bool {
        self.verbose
    }

    // ========================================================================
    // Format queries
    // ========================================================================

    /// Import extensions, each with a leading dot.
    #[must_use]
    pub fn supported_import_formats(&self) -> Vec<String> {
        self.library
            .lock()
            .extension_list()
            .split(';')
            .map(|ext| ext.trim().trim_start_matches('*'))
            .filter(|ext| !ext.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// Whether an extension (with or without the dot) can be imported.
    pub fn is_import_format_supported(&self, extension: &str) -> Result<bool> {
        let extension = if extension.starts_with('.') {
            CString::new(extension)?
        } else {
            CString::new(format!(".{extension}"))?
        };
        Ok(self.library.lock().is_extension_supported(&extension))
    }

    #[must_use]
    pub fn supported_export_formats(&self) -> Vec<ExportFormatDescription> {
        let library = self.library.lock();
        (0..library.export_format_count())
            .filter_map(|index| {
                let desc = library.export_format_description(index);
                if desc.is_null() {
                    return None;
                }
                // SAFETY: non-null descriptions and their strings are owned by
                // the library and live as long as it does.
                unsafe {
                    let desc: AiExportFormatDesc = raw::read(desc.cast());
                    Some(ExportFormatDescription {
                        format_id: c_string_lossy(desc.id),
                        description: c_string_lossy(desc.description),
                        file_extension: c_string_lossy(desc.file_extension),
                    })
                }
            })
            .collect()
    }

    #[must_use]
    pub fn is_export_format_supported(&self, format_id: &str) -> bool {
        self.supported_export_formats().iter().any(|f| f.format_id == format_id)
    }

    // ========================================================================
    // Import
    // ========================================================================

    /// Imports a scene from a file.
    pub fn import_file(&self, path: impl AsRef<Path>, flags: PostProcessSteps) -> Result<Scene> {
        self.with_imported_file(path.as_ref(), flags, |_, scene| copy_scene(scene))
    }

    /// Imports a scene from an in-memory file. `format_hint` is the
    /// extension the data would have on disk.
    pub fn import_from_memory(&self, data: &[u8], format_hint: &str, flags: PostProcessSteps) -> Result<Scene> {
        self.with_imported_memory(data, format_hint, flags, |_, scene| copy_scene(scene))
    }

    // ========================================================================
    // Export
    // ========================================================================

    pub fn export_file(
        &self,
        scene: &Scene,
        path: impl AsRef<Path>,
        format_id: &str,
        flags: PostProcessSteps,
    ) -> Result<()> {
        let native = NativeBox::new(scene)?;
        let library = self.library.lock();
        self.export_native_to_file(&library, native.as_ptr(), path.as_ref(), format_id, flags)
    }

    pub fn export_to_blob(&self, scene: &Scene, format_id: &str, flags: PostProcessSteps) -> Result<ExportDataBlob> {
        let native = NativeBox::new(scene)?;
        let library = self.library.lock();
        export_native_to_blob(&*library, native.as_ptr(), format_id, flags)
    }

    // ========================================================================
    // Conversion
    // ========================================================================

    pub fn convert_file_to_file(
        &self,
        input: impl AsRef<Path>,
        import_flags: PostProcessSteps,
        output: impl AsRef<Path>,
        format_id: &str,
        export_flags: PostProcessSteps,
    ) -> Result<()> {
        let output = output.as_ref();
        self.with_imported_file(input.as_ref(), import_flags, |library, scene| {
            self.export_native_to_file(library, scene, output, format_id, export_flags)
        })
    }

    pub fn convert_file_to_blob(
        &self,
        input: impl AsRef<Path>,
        import_flags: PostProcessSteps,
        format_id: &str,
        export_flags: PostProcessSteps,
    ) -> Result<ExportDataBlob> {
        self.with_imported_file(input.as_ref(), import_flags, |library, scene| {
            export_native_to_blob(library, scene, format_id, export_flags)
        })
    }

    pub fn convert_memory_to_file(
        &self,
        data: &[u8],
        format_hint: &str,
        import_flags: PostProcessSteps,
        output: impl AsRef<Path>,
        format_id: &str,
        export_flags: PostProcessSteps,
    ) -> Result<()> {
        let output = output.as_ref();
        self.with_imported_memory(data, format_hint, import_flags, |library, scene| {
            self.export_native_to_file(library, scene, output, format_id, export_flags)
        })
    }

    pub fn convert_memory_to_blob(
        &self,
        data: &[u8],
        format_hint: &str,
        import_flags: PostProcessSteps,
        format_id: &str,
        export_flags: PostProcessSteps,
    ) -> Result<ExportDataBlob> {
        self.with_imported_memory(data, format_hint, import_flags, |library, scene| {
            export_native_to_blob(library, scene, format_id, export_flags)
        })
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn file_io(&self) -> *mut AiFileIO {
        self.io_system.as_ref().map_or(ptr::null_mut(), NativeIoSystem::as_ptr)
    }

    fn with_imported_file<R>(
        &self,
        path: &Path,
        flags: PostProcessSteps,
        then: impl FnOnce(&L, *const AiScene) -> Result<R>,
    ) -> Result<R> {
        let exists = match &self.io_system {
            Some(io) => io.exists(&path.to_string_lossy()),
            None => path.is_file(),
        };
        if !exists {
            return Err(BridgeError::FileNotFound(path.to_path_buf()));
        }
        let c_path = CString::new(path.to_string_lossy().as_bytes())?;
        let file_io = self.file_io();
        log::debug!("Importing {}", path.display());
        self.run_import(
            // SAFETY: `file_io` is null or owned by this context; `store` is
            // live for the call.
            |library, store| unsafe { library.import_file(&c_path, PostProcessSteps::empty(), file_io, store) },
            flags,
            then,
        )
    }

    fn with_imported_memory<R>(
        &self,
        data: &[u8],
        format_hint: &str,
        flags: PostProcessSteps,
        then: impl FnOnce(&L, *const AiScene) -> Result<R>,
    ) -> Result<R> {
        if data.is_empty() {
            return Err(BridgeError::InvalidArgument("import buffer is empty".into()));
        }
        let hint = CString::new(format_hint.trim_start_matches('.'))?;
        log::debug!("Importing {} bytes from memory ({format_hint})", data.len());
        self.run_import(
            // SAFETY: `data` outlives the call; `store` is live for the call.
            |library, store| unsafe { library.import_from_memory(data, PostProcessSteps::empty(), &hint, store) },
            flags,
            then,
        )
    }

    fn run_import<R>(
        &self,
        import: impl FnOnce(&L, *mut AiPropertyStore) -> *const AiScene,
        flags: PostProcessSteps,
        then: impl FnOnce(&L, *const AiScene) -> Result<R>,
    ) -> Result<R> {
        let locked = self.library.lock();
        let library: &L = &locked;
        let store = PropertyStore::new(library, &self.configs)?;
        let mut guard = ImportGuard {
            library,
            scene: import(library, store.as_ptr()),
            io: self.io_system.as_ref(),
        };
        if guard.scene.is_null() {
            return Err(BridgeError::ImportFailed {
                message: library.error_string(),
            });
        }

        if !self.root_transform.is_identity() {
            // SAFETY: the library hands out a scene it owns but does not read
            // concurrently; the root node stays writable until released.
            unsafe { patch_root_transform(guard.scene.cast_mut(), &self.root_transform.matrix()) };
        }

        if !flags.is_empty() {
            // SAFETY: `guard.scene` is a live imported scene.
            let processed = unsafe { library.apply_post_processing(guard.scene, flags) };
            if processed.is_null() {
                // The library already released the scene.
                guard.scene = ptr::null();
                return Err(BridgeError::ImportFailed {
                    message: library.error_string(),
                });
            }
            guard.scene = processed;
        }

        then(library, guard.scene)
    }

    fn export_native_to_file(
        &self,
        library: &L,
        scene: *const AiScene,
        path: &Path,
        format_id: &str,
        flags: PostProcessSteps,
    ) -> Result<()> {
        let format = CString::new(format_id)?;
        let c_path = CString::new(path.to_string_lossy().as_bytes())?;
        log::debug!("Exporting {} as {format_id}", path.display());
        // SAFETY: `scene` is live for the call; `file_io` is null or owned by
        // this context.
        let code = unsafe { library.export_scene(scene, &format, &c_path, self.file_io(), flags) };
        if let Some(io) = &self.io_system {
            io.close_all_files();
        }
        if code.is_success() {
            Ok(())
        } else {
            Err(BridgeError::ExportFailed {
                message: library.error_string(),
            })
        }
    }
}

impl<L: AssetLibrary> Drop for AssetContext<L> {
    fn drop(&mut self) {
        self.detach_log_streams();
    }
}

fn copy_scene(scene: *const AiScene) -> Result<Scene> {
    // SAFETY: `scene` is the live imported scene held by the import guard.
    unsafe { from_native_pointer::<Scene>(scene) }?.ok_or_else(|| BridgeError::ImportFailed {
        message: "library returned no scene".into(),
    })
}

fn export_native_to_blob<L: AssetLibrary>(
    library: &L,
    scene: *const AiScene,
    format_id: &str,
    flags: PostProcessSteps,
) -> Result<ExportDataBlob> {
    let format = CString::new(format_id)?;
    // SAFETY: `scene` is live for the call.
    let blob = unsafe { library.export_scene_to_blob(scene, &format, flags) };
    if blob.is_null() {
        return Err(BridgeError::ExportFailed {
            message: library.error_string(),
        });
    }
    // SAFETY: a non-null blob chain from the library, released right after.
    let managed = unsafe { ExportDataBlob::from_native_chain(blob) };
    // SAFETY: released exactly once.
    unsafe { library.release_export_blob(blob) };
    log::debug!("Exported {} blob(s) as {format_id}", managed.iter().count());
    Ok(managed)
}

/// # Safety
///
/// `ptr` must be null or a NUL-terminated string.
unsafe fn c_string_lossy(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    // SAFETY: forwarded caller contract.
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}
