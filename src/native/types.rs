//! Fixed-layout native representations.
//!
//! Every struct here mirrors a struct of the native asset-import library's C
//! API field for field. They are the `Native` half of each
//! [`Marshalable`](crate::marshal::Marshalable) pair and own nothing: pointer
//! fields are plain addresses whose ownership is decided by the marshaling
//! layer (see [`crate::scene`]).
//!
//! Layout facts other code relies on are asserted at compile time at the
//! bottom of this file.

use std::ffi::{c_char, c_void};
use std::fmt;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3, Vec4};

use crate::errors::{BridgeError, Result};
use crate::memory::Blittable;

/// Capacity in bytes of the inline buffer of an [`AiString`].
pub const MAX_STRING_LENGTH: usize = 1024;
/// Maximum number of vertex colour channels per mesh.
pub const MAX_COLOR_SETS: usize = 8;
/// Maximum number of texture coordinate channels per mesh.
pub const MAX_TEXTURE_COORDS: usize = 8;
/// Length of the format hint of a compressed embedded texture.
pub const TEXTURE_FORMAT_HINT_LENGTH: usize = 4;

macro_rules! native_layout {
    ($($ty:ty),* $(,)?) => {
        $(
            // SAFETY: `#[repr(C)]` over blittable fields only.
            unsafe impl Blittable for $ty {}
        )*
    };
}

// ============================================================================
// Math
// ============================================================================

/// Two-component float vector.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct AiVector2D {
    pub x: f32,
    pub y: f32,
}

/// Three-component float vector.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct AiVector3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// RGB colour.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct AiColor3D {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

/// RGBA colour.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct AiColor4D {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Rotation quaternion, stored `w` first.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct AiQuaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// 4x4 matrix stored row-major (`a1 a2 a3 a4 b1 ...`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct AiMatrix4x4 {
    pub rows: [f32; 16],
}

/// One texel of an uncompressed embedded texture, in memory order.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct AiTexel {
    pub b: u8,
    pub g: u8,
    pub r: u8,
    pub a: u8,
}

impl AiMatrix4x4 {
    pub const IDENTITY: Self = Self {
        rows: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    /// Converts to a column-major [`Mat4`].
    #[inline]
    #[must_use]
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_cols_array(&self.rows).transpose()
    }

    /// Converts from a column-major [`Mat4`].
    #[inline]
    #[must_use]
    pub fn from_mat4(mat: &Mat4) -> Self {
        Self {
            rows: mat.transpose().to_cols_array(),
        }
    }
}

impl Default for AiMatrix4x4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Default for AiQuaternion {
    fn default() -> Self {
        Self { w: 1.0, x: 0.0, y: 0.0, z: 0.0 }
    }
}

impl From<Vec3> for AiVector3D {
    fn from(v: Vec3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl From<AiVector3D> for Vec3 {
    fn from(v: AiVector3D) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

impl From<Vec3> for AiColor3D {
    fn from(v: Vec3) -> Self {
        Self { r: v.x, g: v.y, b: v.z }
    }
}

impl From<AiColor3D> for Vec3 {
    fn from(c: AiColor3D) -> Self {
        Vec3::new(c.r, c.g, c.b)
    }
}

impl From<Vec4> for AiColor4D {
    fn from(v: Vec4) -> Self {
        Self { r: v.x, g: v.y, b: v.z, a: v.w }
    }
}

impl From<AiColor4D> for Vec4 {
    fn from(c: AiColor4D) -> Self {
        Vec4::new(c.r, c.g, c.b, c.a)
    }
}

impl From<Quat> for AiQuaternion {
    fn from(q: Quat) -> Self {
        Self { w: q.w, x: q.x, y: q.y, z: q.z }
    }
}

impl From<AiQuaternion> for Quat {
    fn from(q: AiQuaternion) -> Self {
        Quat::from_xyzw(q.x, q.y, q.z, q.w)
    }
}

// ============================================================================
// Strings
// ============================================================================

/// Fixed-capacity UTF-8 string: a length header followed by an inline buffer.
#[repr(C)]
#[derive(Clone, Copy, Zeroable)]
pub struct AiString {
    pub length: usize,
    pub data: [u8; MAX_STRING_LENGTH],
}

impl AiString {
    /// Builds a native string, NUL-terminated inside the inline buffer.
    ///
    /// Fails when `value` needs more than `MAX_STRING_LENGTH - 1` bytes.
    pub fn new(value: &str) -> Result<Self> {
        let bytes = value.as_bytes();
        if bytes.len() >= MAX_STRING_LENGTH {
            return Err(BridgeError::StringTooLong {
                len: bytes.len(),
                max: MAX_STRING_LENGTH - 1,
            });
        }
        let mut out = Self::zeroed();
        out.data[..bytes.len()].copy_from_slice(bytes);
        out.length = bytes.len();
        Ok(out)
    }

    /// The valid bytes of the buffer. A corrupt length is clamped to the capacity.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.length.min(MAX_STRING_LENGTH)]
    }

    /// Copies the contents into an owned `String`, replacing invalid UTF-8.
    #[must_use]
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }
}

impl Default for AiString {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl fmt::Debug for AiString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AiString").field(&self.to_string_lossy()).finish()
    }
}

// ============================================================================
// Mesh
// ============================================================================

/// Influence of a bone on one vertex.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct AiVertexWeight {
    pub vertex_id: u32,
    pub weight: f32,
}

/// One polygon: a count and a pointer to its indices.
#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct AiFace {
    pub num_indices: u32,
    pub indices: *mut u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct AiBone {
    pub name: AiString,
    pub num_weights: u32,
    pub weights: *mut AiVertexWeight,
    pub offset_matrix: AiMatrix4x4,
}

/// Per-vertex replacement data used for morphing.
#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct AiAnimMesh {
    pub vertices: *mut AiVector3D,
    pub normals: *mut AiVector3D,
    pub tangents: *mut AiVector3D,
    pub bitangents: *mut AiVector3D,
    pub colors: [*mut AiColor4D; MAX_COLOR_SETS],
    pub texture_coords: [*mut AiVector3D; MAX_TEXTURE_COORDS],
    pub num_vertices: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct AiMesh {
    pub primitive_types: u32,
    pub num_vertices: u32,
    pub num_faces: u32,
    pub vertices: *mut AiVector3D,
    pub normals: *mut AiVector3D,
    pub tangents: *mut AiVector3D,
    pub bitangents: *mut AiVector3D,
    pub colors: [*mut AiColor4D; MAX_COLOR_SETS],
    pub texture_coords: [*mut AiVector3D; MAX_TEXTURE_COORDS],
    pub num_uv_components: [u32; MAX_TEXTURE_COORDS],
    pub faces: *mut AiFace,
    pub num_bones: u32,
    pub bones: *mut *mut AiBone,
    pub material_index: u32,
    pub name: AiString,
    pub num_anim_meshes: u32,
    pub anim_meshes: *mut *mut AiAnimMesh,
}

// ============================================================================
// Material
// ============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct AiMaterialProperty {
    pub key: AiString,
    pub semantic: u32,
    pub index: u32,
    pub data_length: u32,
    pub property_type: u32,
    pub data: *mut u8,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct AiMaterial {
    pub properties: *mut *mut AiMaterialProperty,
    pub num_properties: u32,
    pub num_allocated: u32,
}

// ============================================================================
// Animation
// ============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Zeroable)]
pub struct AiVectorKey {
    pub time: f64,
    pub value: AiVector3D,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Zeroable)]
pub struct AiQuatKey {
    pub time: f64,
    pub value: AiQuaternion,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Zeroable)]
pub struct AiMeshKey {
    pub time: f64,
    pub value: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct AiNodeAnim {
    pub node_name: AiString,
    pub num_position_keys: u32,
    pub position_keys: *mut AiVectorKey,
    pub num_rotation_keys: u32,
    pub rotation_keys: *mut AiQuatKey,
    pub num_scaling_keys: u32,
    pub scaling_keys: *mut AiVectorKey,
    pub pre_state: u32,
    pub post_state: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct AiMeshAnim {
    pub name: AiString,
    pub num_keys: u32,
    pub keys: *mut AiMeshKey,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct AiAnimation {
    pub name: AiString,
    pub duration: f64,
    pub ticks_per_second: f64,
    pub num_channels: u32,
    pub channels: *mut *mut AiNodeAnim,
    pub num_mesh_channels: u32,
    pub mesh_channels: *mut *mut AiMeshAnim,
}

// ============================================================================
// Lights, Cameras, Textures
// ============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct AiLight {
    pub name: AiString,
    pub light_type: u32,
    pub position: AiVector3D,
    pub direction: AiVector3D,
    pub attenuation_constant: f32,
    pub attenuation_linear: f32,
    pub attenuation_quadratic: f32,
    pub color_diffuse: AiColor3D,
    pub color_specular: AiColor3D,
    pub color_ambient: AiColor3D,
    pub angle_inner_cone: f32,
    pub angle_outer_cone: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct AiCamera {
    pub name: AiString,
    pub position: AiVector3D,
    pub up: AiVector3D,
    pub look_at: AiVector3D,
    pub horizontal_fov: f32,
    pub clip_plane_near: f32,
    pub clip_plane_far: f32,
    pub aspect: f32,
}

/// Embedded texture. `height == 0` marks a compressed blob of `width` bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct AiTexture {
    pub width: u32,
    pub height: u32,
    pub format_hint: [u8; TEXTURE_FORMAT_HINT_LENGTH],
    pub data: *mut AiTexel,
}

// ============================================================================
// Scene Graph
// ============================================================================

/// Scene graph node. `parent` is a non-owning back-reference.
#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct AiNode {
    pub name: AiString,
    pub transformation: AiMatrix4x4,
    pub parent: *mut AiNode,
    pub num_children: u32,
    pub children: *mut *mut AiNode,
    pub num_meshes: u32,
    pub meshes: *mut u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct AiScene {
    pub flags: u32,
    pub root_node: *mut AiNode,
    pub num_meshes: u32,
    pub meshes: *mut *mut AiMesh,
    pub num_materials: u32,
    pub materials: *mut *mut AiMaterial,
    pub num_animations: u32,
    pub animations: *mut *mut AiAnimation,
    pub num_textures: u32,
    pub textures: *mut *mut AiTexture,
    pub num_lights: u32,
    pub lights: *mut *mut AiLight,
    pub num_cameras: u32,
    pub cameras: *mut *mut AiCamera,
}

// ============================================================================
// Export, Logging, File IO
// ============================================================================

/// Description of one export format. Strings are owned by the native library.
#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct AiExportFormatDesc {
    pub id: *const c_char,
    pub description: *const c_char,
    pub file_extension: *const c_char,
}

/// One file of an in-memory export; `next` chains auxiliary files.
#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct AiExportDataBlob {
    pub size: usize,
    pub data: *mut c_void,
    pub name: AiString,
    pub next: *mut AiExportDataBlob,
}

/// Opaque import configuration store owned by the native library.
#[repr(C)]
#[derive(Debug)]
pub struct AiPropertyStore {
    _sentinel: c_char,
}

pub type AiLogStreamCallback = unsafe extern "C" fn(message: *const c_char, user_data: *mut c_char);

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AiLogStream {
    pub callback: Option<AiLogStreamCallback>,
    pub user_data: *mut c_char,
}

pub type AiFileOpenProc =
    unsafe extern "C" fn(io: *mut AiFileIO, path: *const c_char, mode: *const c_char) -> *mut AiFile;
pub type AiFileCloseProc = unsafe extern "C" fn(io: *mut AiFileIO, file: *mut AiFile);
pub type AiFileReadProc =
    unsafe extern "C" fn(file: *mut AiFile, buffer: *mut c_char, size: usize, count: usize) -> usize;
pub type AiFileWriteProc =
    unsafe extern "C" fn(file: *mut AiFile, buffer: *const c_char, size: usize, count: usize) -> usize;
pub type AiFileTellProc = unsafe extern "C" fn(file: *mut AiFile) -> usize;
pub type AiFileSeekProc = unsafe extern "C" fn(file: *mut AiFile, offset: usize, origin: u32) -> i32;
pub type AiFileFlushProc = unsafe extern "C" fn(file: *mut AiFile);

/// File system callback table handed to the native library.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AiFileIO {
    pub open_proc: Option<AiFileOpenProc>,
    pub close_proc: Option<AiFileCloseProc>,
    pub user_data: *mut c_char,
}

/// Per-file callback table handed to the native library.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AiFile {
    pub read_proc: Option<AiFileReadProc>,
    pub write_proc: Option<AiFileWriteProc>,
    pub tell_proc: Option<AiFileTellProc>,
    pub file_size_proc: Option<AiFileTellProc>,
    pub seek_proc: Option<AiFileSeekProc>,
    pub flush_proc: Option<AiFileFlushProc>,
    pub user_data: *mut c_char,
}

native_layout!(
    AiVector2D,
    AiVector3D,
    AiColor3D,
    AiColor4D,
    AiQuaternion,
    AiMatrix4x4,
    AiTexel,
    AiString,
    AiVertexWeight,
    AiFace,
    AiBone,
    AiAnimMesh,
    AiMesh,
    AiMaterialProperty,
    AiMaterial,
    AiVectorKey,
    AiQuatKey,
    AiMeshKey,
    AiNodeAnim,
    AiMeshAnim,
    AiAnimation,
    AiLight,
    AiCamera,
    AiTexture,
    AiNode,
    AiScene,
    AiExportFormatDesc,
    AiExportDataBlob,
    AiLogStream,
    AiFileIO,
    AiFile,
);

// ============================================================================
// Layout assertions
// ============================================================================

const _: () = {
    use std::mem::{offset_of, size_of};

    assert!(size_of::<AiString>() == size_of::<usize>() + MAX_STRING_LENGTH);
    assert!(size_of::<AiVector3D>() == 12);
    assert!(size_of::<AiColor4D>() == 16);
    assert!(size_of::<AiMatrix4x4>() == 64);
    assert!(size_of::<AiVertexWeight>() == 8);
    assert!(size_of::<AiVectorKey>() == 24);
    assert!(size_of::<AiQuatKey>() == 24);
    assert!(size_of::<AiMeshKey>() == 16);
    // The root-transform patch writes at this offset.
    assert!(offset_of!(AiNode, transformation) == size_of::<AiString>());
};
