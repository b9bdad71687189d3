//! Shared test fixtures: in-process stand-ins for the native libraries.
//!
//! - [`MockLibrary`] imports by marshaling a managed fixture scene into native
//!   memory and exports by marshaling native memory back
//! - [`MockImageLibrary`] models the image library's global bound image
//! - [`TempDir`] for file-system tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::ffi::{CStr, c_char};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use glam::{Mat4, Quat, Vec3, Vec4};
use parking_lot::Mutex;

use asset_bridge::image::{
    DataFormat, DataType, ImageData, ImageErrorCode, ImageFrame, ImageId, ImageInfo, ImageLibrary, ImageType, Surface,
};
use asset_bridge::marshal::{Marshalable, to_native_pointer};
use asset_bridge::memory::{alloc, raw, to_native_array_blittable};
use asset_bridge::native::types::{
    AiExportDataBlob, AiExportFormatDesc, AiFileIO, AiLogStream, AiMatrix4x4, AiPropertyStore, AiScene, AiString,
};
use asset_bridge::native::{AssetLibrary, PostProcessSteps, PrimitiveType, ReturnCode};
use asset_bridge::scene::animation::{NodeAnimationChannel, QuaternionKey, VectorKey};
use asset_bridge::scene::transform::NODE_TRANSFORM_OFFSET;
use asset_bridge::scene::{Animation, Camera, EmbeddedTexture, Face, Light, Material, Mesh, Scene, Texel};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Fixture scene
// ============================================================================

/// A small but complete scene: a root with two children, one textured
/// triangle mesh, one material, one animation, a light, a camera and an
/// embedded texture.
pub fn fixture_scene() -> Scene {
    let mut scene = Scene::new();
    let root = scene.create_root("root");
    let body = scene.add_child(root, "body");
    let head = scene.add_child(body, "head");
    scene.add_child(root, "camera");
    scene.node_mut(body).unwrap().transform = Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0));
    scene.node_mut(body).unwrap().mesh_indices = vec![0];
    scene.node_mut(head).unwrap().transform = Mat4::from_rotation_y(0.5);

    let mut mesh = Mesh::new("triangle", PrimitiveType::TRIANGLE);
    mesh.vertices = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
    mesh.normals = vec![Vec3::Z; 3];
    mesh.texture_coords[0] = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
    mesh.uv_components[0] = 2;
    mesh.faces = vec![Face::new(&[0, 1, 2])];
    scene.meshes.push(mesh);

    let mut material = Material::new("skin");
    material.set_texture_path(asset_bridge::native::TextureType::Diffuse, 0, "skin.png");
    scene.materials.push(material);

    scene.animations.push(Animation {
        name: "nod".into(),
        duration: 10.0,
        ticks_per_second: 25.0,
        node_channels: vec![NodeAnimationChannel {
            node_name: "head".into(),
            position_keys: vec![VectorKey {
                time: 0.0,
                value: Vec3::ZERO,
            }],
            rotation_keys: vec![
                QuaternionKey {
                    time: 0.0,
                    value: Quat::IDENTITY,
                },
                QuaternionKey {
                    time: 10.0,
                    value: Quat::from_rotation_x(0.3),
                },
            ],
            ..Default::default()
        }],
        mesh_channels: Vec::new(),
    });

    scene.lights.push(Light {
        name: "sun".into(),
        color_diffuse: Vec3::ONE,
        ..Default::default()
    });
    scene.cameras.push(Camera {
        name: "camera".into(),
        position: Vec3::new(0.0, 1.0, 5.0),
        ..Default::default()
    });
    scene.textures.push(EmbeddedTexture::Uncompressed {
        width: 1,
        height: 1,
        texels: vec![Texel {
            b: 0,
            g: 128,
            r: 255,
            a: 255,
        }],
    });
    scene
}

// ============================================================================
// Mock asset library
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum MockValue {
    Integer(i32),
    Float(f32),
    String(String),
    Matrix(Mat4),
}

type MockStore = HashMap<String, MockValue>;

/// Everything the mock library observed, shared with the test body.
#[derive(Debug, Default)]
pub struct MockState {
    pub imports: usize,
    pub releases: usize,
    pub stores_created: usize,
    pub stores_released: usize,
    /// Settings seen by the last import.
    pub last_configs: MockStore,
    pub last_hint: String,
    pub post_processed: Vec<PostProcessSteps>,
    /// Root transform observed when post-processing started.
    pub root_at_post_process: Option<Mat4>,
    /// Bytes read through the custom file system during the last import.
    pub bytes_read: Vec<u8>,
    pub exports: Vec<(String, String, Scene)>,
    pub blobs_created: usize,
    pub blobs_released: usize,
    pub attached_streams: Vec<usize>,
    pub verbose: bool,
    pub error: String,
    pub fail_import: bool,
    pub fail_post_processing: bool,
}

struct FormatTable(Vec<AiExportFormatDesc>);

// SAFETY: the table only points at static C string literals.
unsafe impl Send for FormatTable {}

pub struct MockLibrary {
    pub fixture: Scene,
    pub state: Arc<Mutex<MockState>>,
    formats: FormatTable,
}

impl MockLibrary {
    pub fn new(fixture: Scene) -> Self {
        Self {
            fixture,
            state: Arc::default(),
            formats: FormatTable(vec![
                AiExportFormatDesc {
                    id: c"obj".as_ptr(),
                    description: c"Wavefront OBJ format".as_ptr(),
                    file_extension: c"obj".as_ptr(),
                },
                AiExportFormatDesc {
                    id: c"collada".as_ptr(),
                    description: c"COLLADA - Digital Asset Exchange Schema".as_ptr(),
                    file_extension: c"dae".as_ptr(),
                },
            ]),
        }
    }

    fn build_scene(&self) -> *const AiScene {
        let mut state = self.state.lock();
        if state.fail_import {
            state.error = "Unable to open file: unsupported format".into();
            return ptr::null();
        }
        state.imports += 1;
        match to_native_pointer(&self.fixture) {
            Ok(scene) => scene.cast_const(),
            Err(err) => {
                state.error = err.to_string();
                ptr::null()
            }
        }
    }

    /// Reads the whole file through a native callback table, like a real
    /// importer would.
    unsafe fn read_through(&self, io: *mut AiFileIO, path: &CStr) -> Option<Vec<u8>> {
        unsafe {
            let table = *io;
            let file = table.open_proc?(io, path.as_ptr(), c"rb".as_ptr());
            if file.is_null() {
                return None;
            }
            let callbacks = *file;
            let size = callbacks.file_size_proc?(file);
            let mut bytes = vec![0u8; size];
            let read = callbacks.read_proc?(file, bytes.as_mut_ptr().cast(), 1, size);
            bytes.truncate(read);
            table.close_proc?(io, file);
            Some(bytes)
        }
    }

    unsafe fn store<'a>(store: *mut AiPropertyStore) -> &'a mut MockStore {
        unsafe { &mut *store.cast::<MockStore>() }
    }
}

impl AssetLibrary for MockLibrary {
    unsafe fn import_file(
        &self,
        path: &CStr,
        _flags: PostProcessSteps,
        file_io: *mut AiFileIO,
        properties: *mut AiPropertyStore,
    ) -> *const AiScene {
        if !properties.is_null() {
            self.state.lock().last_configs = unsafe { Self::store(properties) }.clone();
        }
        if !file_io.is_null() {
            match unsafe { self.read_through(file_io, path) } {
                Some(bytes) => self.state.lock().bytes_read = bytes,
                None => {
                    self.state.lock().error = format!("Unable to open file \"{}\"", path.to_string_lossy());
                    return ptr::null();
                }
            }
        }
        self.build_scene()
    }

    unsafe fn import_from_memory(
        &self,
        data: &[u8],
        _flags: PostProcessSteps,
        format_hint: &CStr,
        properties: *mut AiPropertyStore,
    ) -> *const AiScene {
        {
            let mut state = self.state.lock();
            state.last_hint = format_hint.to_string_lossy().into_owned();
            state.bytes_read = data.to_vec();
            if !properties.is_null() {
                state.last_configs = unsafe { Self::store(properties) }.clone();
            }
        }
        self.build_scene()
    }

    unsafe fn apply_post_processing(&self, scene: *const AiScene, flags: PostProcessSteps) -> *const AiScene {
        let root = unsafe { raw::read::<AiScene>(scene.cast()) }.root_node;
        let transform: AiMatrix4x4 = unsafe { raw::read(raw::offset(root, NODE_TRANSFORM_OFFSET)) };
        let fail = {
            let mut state = self.state.lock();
            state.post_processed.push(flags);
            state.root_at_post_process = Some(transform.to_mat4());
            state.fail_post_processing
        };
        if fail {
            self.state.lock().error = "Post-processing failed".into();
            unsafe { self.release_import(scene) };
            return ptr::null();
        }
        scene
    }

    unsafe fn release_import(&self, scene: *const AiScene) {
        self.state.lock().releases += 1;
        unsafe { Scene::free_native(scene.cast_mut(), true) };
    }

    unsafe fn export_scene(
        &self,
        scene: *const AiScene,
        format_id: &CStr,
        path: &CStr,
        file_io: *mut AiFileIO,
        _flags: PostProcessSteps,
    ) -> ReturnCode {
        let format = format_id.to_string_lossy().into_owned();
        if !self.formats.0.iter().any(|f| unsafe { CStr::from_ptr(f.id) } == format_id) {
            self.state.lock().error = format!("Found no exporter to handle this file format: {format}");
            return ReturnCode::Failure;
        }
        let managed = match unsafe { Scene::from_native(&*scene) } {
            Ok(managed) => managed,
            Err(err) => {
                self.state.lock().error = err.to_string();
                return ReturnCode::Failure;
            }
        };
        if !file_io.is_null() {
            unsafe {
                let table = *file_io;
                let Some(open) = table.open_proc else {
                    return ReturnCode::Failure;
                };
                let file = open(file_io, path.as_ptr(), c"wb".as_ptr());
                if file.is_null() {
                    return ReturnCode::Failure;
                }
                let payload = format!("exported {format}");
                (*file).write_proc.unwrap()(file, payload.as_ptr().cast(), 1, payload.len());
            }
            // Closing is left to the caller on purpose.
        }
        self.state
            .lock()
            .exports
            .push((format, path.to_string_lossy().into_owned(), managed));
        ReturnCode::Success
    }

    unsafe fn export_scene_to_blob(
        &self,
        scene: *const AiScene,
        format_id: &CStr,
        flags: PostProcessSteps,
    ) -> *const AiExportDataBlob {
        let code = unsafe { self.export_scene(scene, format_id, c"$blob$", ptr::null_mut(), flags) };
        if !code.is_success() {
            return ptr::null();
        }
        let main_bytes = format!("# {}", format_id.to_string_lossy()).into_bytes();
        let aux_bytes = b"newmtl skin".to_vec();
        let aux = alloc::allocate_copy(&AiExportDataBlob {
            size: aux_bytes.len(),
            data: to_native_array_blittable(&aux_bytes).cast(),
            name: AiString::new("mtl").unwrap(),
            next: ptr::null_mut(),
        });
        self.state.lock().blobs_created += 1;
        alloc::allocate_copy(&AiExportDataBlob {
            size: main_bytes.len(),
            data: to_native_array_blittable(&main_bytes).cast(),
            name: AiString::default(),
            next: aux,
        })
    }

    unsafe fn release_export_blob(&self, blob: *const AiExportDataBlob) {
        let mut current = blob.cast_mut();
        while !current.is_null() {
            let native: AiExportDataBlob = unsafe { raw::read(current.cast()) };
            unsafe {
                alloc::free_memory(native.data);
                alloc::free_memory(current);
            }
            current = native.next;
        }
        self.state.lock().blobs_released += 1;
    }

    fn error_string(&self) -> String {
        self.state.lock().error.clone()
    }

    fn create_property_store(&self) -> *mut AiPropertyStore {
        self.state.lock().stores_created += 1;
        Box::into_raw(Box::new(MockStore::new())).cast()
    }

    unsafe fn release_property_store(&self, store: *mut AiPropertyStore) {
        self.state.lock().stores_released += 1;
        drop(unsafe { Box::from_raw(store.cast::<MockStore>()) });
    }

    unsafe fn set_property_integer(&self, store: *mut AiPropertyStore, name: &CStr, value: i32) {
        unsafe { Self::store(store) }.insert(name.to_string_lossy().into_owned(), MockValue::Integer(value));
    }

    unsafe fn set_property_float(&self, store: *mut AiPropertyStore, name: &CStr, value: f32) {
        unsafe { Self::store(store) }.insert(name.to_string_lossy().into_owned(), MockValue::Float(value));
    }

    unsafe fn set_property_string(&self, store: *mut AiPropertyStore, name: &CStr, value: &AiString) {
        let value = MockValue::String(value.to_string_lossy());
        unsafe { Self::store(store) }.insert(name.to_string_lossy().into_owned(), value);
    }

    unsafe fn set_property_matrix(&self, store: *mut AiPropertyStore, name: &CStr, value: &AiMatrix4x4) {
        unsafe { Self::store(store) }.insert(name.to_string_lossy().into_owned(), MockValue::Matrix(value.to_mat4()));
    }

    unsafe fn attach_log_stream(&self, stream: *const AiLogStream) {
        self.state.lock().attached_streams.push(stream as usize);
        let native = unsafe { *stream };
        if let Some(callback) = native.callback {
            unsafe { callback(c"Info,  T0: Logger attached\n".as_ptr(), native.user_data) };
        }
    }

    unsafe fn detach_log_stream(&self, stream: *const AiLogStream) -> ReturnCode {
        let mut state = self.state.lock();
        match state.attached_streams.iter().position(|&s| s == stream as usize) {
            Some(index) => {
                state.attached_streams.remove(index);
                ReturnCode::Success
            }
            None => ReturnCode::Failure,
        }
    }

    fn enable_verbose_logging(&self, enable: bool) {
        self.state.lock().verbose = enable;
    }

    fn extension_list(&self) -> String {
        "*.obj;*.fbx;*.dae".into()
    }

    fn is_extension_supported(&self, extension: &CStr) -> bool {
        matches!(extension.to_bytes(), b".obj" | b".fbx" | b".dae")
    }

    fn export_format_count(&self) -> usize {
        self.formats.0.len()
    }

    fn export_format_description(&self, index: usize) -> *const AiExportFormatDesc {
        self.formats.0.get(index).map_or(ptr::null(), ptr::from_ref)
    }
}

// ============================================================================
// Mock image library
// ============================================================================

/// Magic prefix the mock decoder accepts.
pub const MOCK_IMAGE_MAGIC: &[u8] = b"MOCKIMG";

/// A 4x4 RGBA image with two mip levels, matching what the mock decoder
/// produces.
pub fn mock_decoded_image() -> ImageData {
    let level = |size: u32, fill: u8| Surface {
        width: size,
        height: size,
        depth: 1,
        format: DataFormat::Rgba,
        data_type: DataType::UnsignedByte,
        data: vec![fill; (size * size * 4) as usize],
    };
    ImageData {
        frames: vec![ImageFrame {
            faces: vec![vec![level(4, 0xAA), level(2, 0x55)]],
        }],
    }
}

#[derive(Default)]
pub struct MockImageLibrary {
    images: HashMap<ImageId, ImageData>,
    next_id: ImageId,
    bound: ImageId,
    active: (u32, u32, u32),
    errors: Vec<ImageErrorCode>,
    pub deleted: Vec<ImageId>,
    pub saved: Vec<(PathBuf, ImageType)>,
}

impl MockImageLibrary {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    pub fn live_images(&self) -> usize {
        self.images.len()
    }

    pub fn insert(&mut self, image: ImageData) -> ImageId {
        let id = self.gen_image();
        self.images.insert(id, image);
        id
    }

    fn fail(&mut self, code: ImageErrorCode) -> bool {
        self.errors.push(code);
        false
    }

    fn active_surface(&self) -> Option<&Surface> {
        let (frame, face, level) = self.active;
        self.images
            .get(&self.bound)?
            .frames
            .get(frame as usize)?
            .faces
            .get(face as usize)?
            .get(level as usize)
    }

    fn decode(&mut self, data: &[u8]) -> bool {
        if !data.starts_with(MOCK_IMAGE_MAGIC) {
            return self.fail(ImageErrorCode::InvalidFileHeader);
        }
        self.images.insert(self.bound, mock_decoded_image());
        true
    }
}

impl ImageLibrary for MockImageLibrary {
    fn gen_image(&mut self) -> ImageId {
        let id = self.next_id;
        self.next_id += 1;
        self.images.insert(id, ImageData::default());
        id
    }

    fn bind_image(&mut self, id: ImageId) {
        self.bound = id;
        self.active = (0, 0, 0);
    }

    fn bound_image(&self) -> ImageId {
        self.bound
    }

    fn delete_image(&mut self, id: ImageId) {
        self.images.remove(&id);
        self.deleted.push(id);
        if self.bound == id {
            self.bound = 0;
        }
    }

    fn load_file(&mut self, _image_type: ImageType, path: &CStr) -> bool {
        match std::fs::read(path.to_string_lossy().as_ref()) {
            Ok(bytes) => self.decode(&bytes),
            Err(_) => self.fail(ImageErrorCode::CouldNotOpenFile),
        }
    }

    fn load_memory(&mut self, _image_type: ImageType, data: &[u8]) -> bool {
        self.decode(data)
    }

    fn save_file(&mut self, image_type: ImageType, path: &CStr) -> bool {
        let Some(surface) = self.active_surface().cloned() else {
            return self.fail(ImageErrorCode::IllegalOperation);
        };
        let path = PathBuf::from(path.to_string_lossy().as_ref());
        let mut bytes = MOCK_IMAGE_MAGIC.to_vec();
        bytes.extend_from_slice(&surface.data);
        if std::fs::write(&path, bytes).is_err() {
            return self.fail(ImageErrorCode::FileIoError);
        }
        self.saved.push((path, image_type));
        true
    }

    fn upload(
        &mut self,
        width: u32,
        height: u32,
        depth: u32,
        format: DataFormat,
        data_type: DataType,
        data: &[u8],
    ) -> bool {
        if width == 0 || height == 0 {
            return self.fail(ImageErrorCode::BadDimensions);
        }
        let surface = Surface {
            width,
            height,
            depth,
            format,
            data_type,
            data: data.to_vec(),
        };
        self.images.insert(self.bound, ImageData::from_surface(surface));
        true
    }

    fn info(&self) -> ImageInfo {
        let Some(image) = self.images.get(&self.bound) else {
            return ImageInfo::default();
        };
        let frame = image.frames.get(self.active.0 as usize);
        let faces = frame.map_or(0, |f| f.faces.len());
        let mips = frame
            .and_then(|f| f.faces.get(self.active.1 as usize))
            .map_or(0, Vec::len);
        let mut info = ImageInfo {
            num_images: image.frames.len().saturating_sub(1) as u32,
            num_faces: faces.saturating_sub(1) as u32,
            num_mipmaps: mips.saturating_sub(1) as u32,
            ..ImageInfo::default()
        };
        if let Some(surface) = self.active_surface() {
            info.width = surface.width;
            info.height = surface.height;
            info.depth = surface.depth;
            info.format = surface.format;
            info.data_type = surface.data_type;
            info.bytes_per_pixel = surface.format.channels() * surface.data_type.size();
            info.size_of_data = surface.data.len();
        }
        info
    }

    fn data(&self) -> *const u8 {
        self.active_surface().map_or(ptr::null(), |s| s.data.as_ptr())
    }

    fn active_image(&mut self, index: u32) -> bool {
        let count = self.images.get(&self.bound).map_or(0, |i| i.frames.len());
        if (index as usize) >= count {
            return self.fail(ImageErrorCode::IllegalOperation);
        }
        self.active.0 = index;
        true
    }

    fn active_face(&mut self, index: u32) -> bool {
        let count = self
            .images
            .get(&self.bound)
            .and_then(|i| i.frames.get(self.active.0 as usize))
            .map_or(0, |f| f.faces.len());
        if (index as usize) >= count {
            return self.fail(ImageErrorCode::IllegalOperation);
        }
        self.active.1 = index;
        true
    }

    fn active_mipmap(&mut self, index: u32) -> bool {
        self.active.2 = index;
        if self.active_surface().is_none() {
            self.active.2 = 0;
            return self.fail(ImageErrorCode::IllegalOperation);
        }
        true
    }

    fn active_layer(&mut self, index: u32) -> bool {
        index == 0 || self.fail(ImageErrorCode::IllegalOperation)
    }

    fn error(&mut self) -> ImageErrorCode {
        if self.errors.is_empty() {
            ImageErrorCode::NoError
        } else {
            self.errors.remove(0)
        }
    }
}

// ============================================================================
// Temporary directories
// ============================================================================

/// A fresh directory under the system temp dir, removed on drop.
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(label: &str) -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let path = std::env::temp_dir().join(format!(
            "asset-bridge-{label}-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&path).expect("create temp dir");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.path.join(name);
        std::fs::write(&path, contents).expect("write temp file");
        path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

/// Reads a C string the tests built themselves.
pub fn c_str(ptr: *const c_char) -> String {
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

pub fn approx_vec4(a: Vec4, b: Vec4) -> bool {
    (a - b).abs().max_element() < 1e-5
}
