//! Meshes and the data attached to them.
//!
//! A [`Mesh`] stores per-vertex channels as parallel `Vec`s: every non-empty
//! channel must have exactly one entry per vertex, because the native layout
//! stores a single vertex count for all of them.

use glam::{Mat4, Vec3, Vec4};
use smallvec::SmallVec;

use crate::errors::{BridgeError, Result};
use crate::marshal::{self, Marshalable, from_native_converted, native_count, to_native_converted};
use crate::memory::{self, ArrayKind, alloc};
use crate::native::enums::PrimitiveType;
use crate::native::types::{
    AiAnimMesh, AiBone, AiColor4D, AiFace, AiMatrix4x4, AiMesh, AiString, AiVector3D, AiVertexWeight, MAX_COLOR_SETS,
    MAX_TEXTURE_COORDS,
};

// ============================================================================
// Face
// ============================================================================

/// One polygon, as indices into the mesh's vertex channels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Face {
    pub indices: SmallVec<[u32; 4]>,
}

impl Face {
    #[must_use]
    pub fn new(indices: &[u32]) -> Self {
        Self {
            indices: SmallVec::from_slice(indices),
        }
    }

    #[inline]
    #[must_use]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

impl Marshalable for Face {
    type Native = AiFace;

    fn write_native(&self, _this_ptr: *mut AiFace, native: &mut AiFace) -> Result<()> {
        native.num_indices = native_count(self.indices.len())?;
        native.indices = memory::to_native_array_blittable(&self.indices);
        Ok(())
    }

    unsafe fn read_native(&mut self, native: &AiFace) -> Result<()> {
        self.indices.clear();
        // SAFETY: the index count travels with the index array.
        let indices: Vec<u32> =
            unsafe { memory::marshal_array(native.indices.cast(), native.num_indices as usize, ArrayKind::Flat)? };
        self.indices.extend_from_slice(&indices);
        Ok(())
    }

    unsafe fn free_native_contents(native: &AiFace) {
        // SAFETY: the face owns its index array.
        unsafe { alloc::free_memory(native.indices) };
    }
}

// ============================================================================
// Bone
// ============================================================================

/// Influence of a bone on one vertex.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VertexWeight {
    pub vertex_id: u32,
    pub weight: f32,
}

impl From<VertexWeight> for AiVertexWeight {
    fn from(w: VertexWeight) -> Self {
        Self {
            vertex_id: w.vertex_id,
            weight: w.weight,
        }
    }
}

impl From<AiVertexWeight> for VertexWeight {
    fn from(w: AiVertexWeight) -> Self {
        Self {
            vertex_id: w.vertex_id,
            weight: w.weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    /// Name of the node this bone animates
    pub name: String,
    /// Transforms from mesh space to bone space in the bind pose
    pub offset_matrix: Mat4,
    pub weights: Vec<VertexWeight>,
}

impl Default for Bone {
    fn default() -> Self {
        Self {
            name: String::new(),
            offset_matrix: Mat4::IDENTITY,
            weights: Vec::new(),
        }
    }
}

impl Marshalable for Bone {
    type Native = AiBone;

    fn write_native(&self, _this_ptr: *mut AiBone, native: &mut AiBone) -> Result<()> {
        native.name = AiString::new(&self.name)?;
        native.offset_matrix = AiMatrix4x4::from_mat4(&self.offset_matrix);
        native.num_weights = native_count(self.weights.len())?;
        native.weights = to_native_converted(&self.weights);
        Ok(())
    }

    unsafe fn read_native(&mut self, native: &AiBone) -> Result<()> {
        self.name = native.name.to_string_lossy();
        self.offset_matrix = native.offset_matrix.to_mat4();
        // SAFETY: the weight count travels with the weight array.
        self.weights = unsafe { from_native_converted(native.weights, native.num_weights as usize)? };
        Ok(())
    }

    unsafe fn free_native_contents(native: &AiBone) {
        // SAFETY: the bone owns its weight array.
        unsafe { alloc::free_memory(native.weights) };
    }
}

// ============================================================================
// Vertex channels
// ============================================================================

/// Rejects a non-empty channel whose length differs from the vertex count.
fn check_channel(name: &str, len: usize, vertex_count: usize) -> Result<()> {
    if len == 0 || len == vertex_count {
        return Ok(());
    }
    Err(BridgeError::InvalidArgument(format!(
        "{name} has {len} entries but the mesh has {vertex_count} vertices"
    )))
}

/// Channels shared by [`Mesh`] and [`MeshAnimationAttachment`].
struct VertexChannels<'a> {
    vertices: &'a [Vec3],
    normals: &'a [Vec3],
    tangents: &'a [Vec3],
    bitangents: &'a [Vec3],
    colors: &'a [Vec<Vec4>; MAX_COLOR_SETS],
    texture_coords: &'a [Vec<Vec3>; MAX_TEXTURE_COORDS],
}

impl VertexChannels<'_> {
    fn validate(&self) -> Result<u32> {
        let count = self.vertices.len();
        check_channel("normals", self.normals.len(), count)?;
        check_channel("tangents", self.tangents.len(), count)?;
        check_channel("bitangents", self.bitangents.len(), count)?;
        for channel in self.colors {
            check_channel("vertex colors", channel.len(), count)?;
        }
        for channel in self.texture_coords {
            check_channel("texture coordinates", channel.len(), count)?;
        }
        native_count(count)
    }
}

/// Reads the per-vertex channel at `ptr`, or an empty `Vec` when absent.
unsafe fn read_channel<N, T>(ptr: *const N, vertex_count: usize) -> Result<Vec<T>>
where
    N: memory::Blittable,
    T: From<N>,
{
    // SAFETY: every present channel holds one entry per vertex.
    unsafe { from_native_converted(ptr, vertex_count) }
}

unsafe fn free_channels(
    vertices: *mut AiVector3D,
    normals: *mut AiVector3D,
    tangents: *mut AiVector3D,
    bitangents: *mut AiVector3D,
    colors: &[*mut AiColor4D; MAX_COLOR_SETS],
    texture_coords: &[*mut AiVector3D; MAX_TEXTURE_COORDS],
) {
    // SAFETY: every channel is null or a block owned by the freed struct.
    unsafe {
        alloc::free_memory(vertices);
        alloc::free_memory(normals);
        alloc::free_memory(tangents);
        alloc::free_memory(bitangents);
        for &channel in colors {
            alloc::free_memory(channel);
        }
        for &channel in texture_coords {
            alloc::free_memory(channel);
        }
    }
}

// ============================================================================
// MeshAnimationAttachment
// ============================================================================

/// Replacement vertex data for one morph target of a mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshAnimationAttachment {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec3>,
    pub bitangents: Vec<Vec3>,
    pub colors: [Vec<Vec4>; MAX_COLOR_SETS],
    pub texture_coords: [Vec<Vec3>; MAX_TEXTURE_COORDS],
}

impl MeshAnimationAttachment {
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    fn channels(&self) -> VertexChannels<'_> {
        VertexChannels {
            vertices: &self.vertices,
            normals: &self.normals,
            tangents: &self.tangents,
            bitangents: &self.bitangents,
            colors: &self.colors,
            texture_coords: &self.texture_coords,
        }
    }
}

impl Marshalable for MeshAnimationAttachment {
    type Native = AiAnimMesh;

    fn write_native(&self, _this_ptr: *mut AiAnimMesh, native: &mut AiAnimMesh) -> Result<()> {
        native.num_vertices = self.channels().validate()?;
        native.vertices = to_native_converted(&self.vertices);
        native.normals = to_native_converted(&self.normals);
        native.tangents = to_native_converted(&self.tangents);
        native.bitangents = to_native_converted(&self.bitangents);
        for (slot, channel) in native.colors.iter_mut().zip(&self.colors) {
            *slot = to_native_converted(channel);
        }
        for (slot, channel) in native.texture_coords.iter_mut().zip(&self.texture_coords) {
            *slot = to_native_converted(channel);
        }
        Ok(())
    }

    unsafe fn read_native(&mut self, native: &AiAnimMesh) -> Result<()> {
        let count = native.num_vertices as usize;
        // SAFETY: every present channel holds `num_vertices` entries.
        unsafe {
            self.vertices = read_channel(native.vertices, count)?;
            self.normals = read_channel(native.normals, count)?;
            self.tangents = read_channel(native.tangents, count)?;
            self.bitangents = read_channel(native.bitangents, count)?;
            for (channel, &ptr) in self.colors.iter_mut().zip(&native.colors) {
                *channel = read_channel(ptr, count)?;
            }
            for (channel, &ptr) in self.texture_coords.iter_mut().zip(&native.texture_coords) {
                *channel = read_channel(ptr, count)?;
            }
        }
        Ok(())
    }

    unsafe fn free_native_contents(native: &AiAnimMesh) {
        // SAFETY: the attachment owns all of its channels.
        unsafe {
            free_channels(
                native.vertices,
                native.normals,
                native.tangents,
                native.bitangents,
                &native.colors,
                &native.texture_coords,
            );
        }
    }
}

// ============================================================================
// Mesh
// ============================================================================

/// A single-material mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub primitive_types: PrimitiveType,
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec3>,
    pub bitangents: Vec<Vec3>,
    pub colors: [Vec<Vec4>; MAX_COLOR_SETS],
    pub texture_coords: [Vec<Vec3>; MAX_TEXTURE_COORDS],
    /// Number of meaningful components (1 to 3) per texture coordinate channel
    pub uv_components: [u32; MAX_TEXTURE_COORDS],
    pub faces: Vec<Face>,
    pub bones: Vec<Bone>,
    pub anim_meshes: Vec<MeshAnimationAttachment>,
    /// Index into [`Scene::materials`](super::Scene::materials)
    pub material_index: u32,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new("", PrimitiveType::TRIANGLE)
    }
}

impl Mesh {
    #[must_use]
    pub fn new(name: &str, primitive_types: PrimitiveType) -> Self {
        Self {
            name: name.to_owned(),
            primitive_types,
            vertices: Vec::new(),
            normals: Vec::new(),
            tangents: Vec::new(),
            bitangents: Vec::new(),
            colors: Default::default(),
            texture_coords: Default::default(),
            uv_components: [0; MAX_TEXTURE_COORDS],
            faces: Vec::new(),
            bones: Vec::new(),
            anim_meshes: Vec::new(),
            material_index: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    #[must_use]
    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn has_tangent_basis(&self) -> bool {
        !self.tangents.is_empty() && !self.bitangents.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn has_bones(&self) -> bool {
        !self.bones.is_empty()
    }

    #[must_use]
    pub fn has_vertex_colors(&self, channel: usize) -> bool {
        self.colors.get(channel).is_some_and(|c| !c.is_empty())
    }

    #[must_use]
    pub fn has_texture_coords(&self, channel: usize) -> bool {
        self.texture_coords.get(channel).is_some_and(|c| !c.is_empty())
    }

    #[must_use]
    pub fn vertex_color_channel_count(&self) -> usize {
        self.colors.iter().filter(|c| !c.is_empty()).count()
    }

    #[must_use]
    pub fn texture_coord_channel_count(&self) -> usize {
        self.texture_coords.iter().filter(|c| !c.is_empty()).count()
    }

    /// Flattens every face into one index list.
    #[must_use]
    pub fn indices(&self) -> Vec<u32> {
        self.faces.iter().flat_map(|f| f.indices.iter().copied()).collect()
    }

    /// Replaces the faces with `indices` split into faces of
    /// `indices_per_face` indices each.
    pub fn set_indices(&mut self, indices: &[u32], indices_per_face: usize) -> Result<()> {
        if indices_per_face == 0 || indices.len() % indices_per_face != 0 {
            return Err(BridgeError::InvalidArgument(format!(
                "{} indices cannot be split into faces of {indices_per_face}",
                indices.len()
            )));
        }
        self.faces = indices.chunks_exact(indices_per_face).map(Face::new).collect();
        Ok(())
    }

    fn channels(&self) -> VertexChannels<'_> {
        VertexChannels {
            vertices: &self.vertices,
            normals: &self.normals,
            tangents: &self.tangents,
            bitangents: &self.bitangents,
            colors: &self.colors,
            texture_coords: &self.texture_coords,
        }
    }
}

impl Marshalable for Mesh {
    type Native = AiMesh;

    fn write_native(&self, _this_ptr: *mut AiMesh, native: &mut AiMesh) -> Result<()> {
        native.num_vertices = self.channels().validate()?;
        native.name = AiString::new(&self.name)?;
        native.primitive_types = self.primitive_types.bits();
        native.material_index = self.material_index;
        native.num_uv_components = self.uv_components;

        native.vertices = to_native_converted(&self.vertices);
        native.normals = to_native_converted(&self.normals);
        native.tangents = to_native_converted(&self.tangents);
        native.bitangents = to_native_converted(&self.bitangents);
        for (slot, channel) in native.colors.iter_mut().zip(&self.colors) {
            *slot = to_native_converted(channel);
        }
        for (slot, channel) in native.texture_coords.iter_mut().zip(&self.texture_coords) {
            *slot = to_native_converted(channel);
        }

        let num_faces = native_count(self.faces.len())?;
        native.faces = marshal::to_native_array(&self.faces, ArrayKind::Flat)?.cast();
        native.num_faces = num_faces;
        let num_bones = native_count(self.bones.len())?;
        native.bones = marshal::to_native_array(&self.bones, ArrayKind::Pointers)?.cast();
        native.num_bones = num_bones;
        let num_anim_meshes = native_count(self.anim_meshes.len())?;
        native.anim_meshes = marshal::to_native_array(&self.anim_meshes, ArrayKind::Pointers)?.cast();
        native.num_anim_meshes = num_anim_meshes;
        Ok(())
    }

    unsafe fn read_native(&mut self, native: &AiMesh) -> Result<()> {
        let count = native.num_vertices as usize;
        self.name = native.name.to_string_lossy();
        self.primitive_types = PrimitiveType::from_bits_truncate(native.primitive_types);
        self.material_index = native.material_index;
        self.uv_components = native.num_uv_components;

        // SAFETY: every present channel holds `num_vertices` entries and every
        // nested array travels with its count.
        unsafe {
            self.vertices = read_channel(native.vertices, count)?;
            self.normals = read_channel(native.normals, count)?;
            self.tangents = read_channel(native.tangents, count)?;
            self.bitangents = read_channel(native.bitangents, count)?;
            for (channel, &ptr) in self.colors.iter_mut().zip(&native.colors) {
                *channel = read_channel(ptr, count)?;
            }
            for (channel, &ptr) in self.texture_coords.iter_mut().zip(&native.texture_coords) {
                *channel = read_channel(ptr, count)?;
            }

            self.faces = marshal::from_native_array(native.faces.cast(), native.num_faces as usize, ArrayKind::Flat)?;
            self.bones =
                marshal::from_native_array(native.bones.cast(), native.num_bones as usize, ArrayKind::Pointers)?;
            self.anim_meshes = marshal::from_native_array(
                native.anim_meshes.cast(),
                native.num_anim_meshes as usize,
                ArrayKind::Pointers,
            )?;
        }
        Ok(())
    }

    unsafe fn free_native_contents(native: &AiMesh) {
        // SAFETY: the mesh owns every channel and nested array, each freed
        // with the count it was built with.
        unsafe {
            free_channels(
                native.vertices,
                native.normals,
                native.tangents,
                native.bitangents,
                &native.colors,
                &native.texture_coords,
            );
            marshal::free_native_array::<Face>(native.faces.cast(), native.num_faces as usize, ArrayKind::Flat);
            marshal::free_native_array::<Bone>(native.bones.cast(), native.num_bones as usize, ArrayKind::Pointers);
            marshal::free_native_array::<MeshAnimationAttachment>(
                native.anim_meshes.cast(),
                native.num_anim_meshes as usize,
                ArrayKind::Pointers,
            );
        }
    }
}
