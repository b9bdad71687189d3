//! Keyframe animation.
//!
//! An [`Animation`] drives nodes through [`NodeAnimationChannel`]s (position,
//! rotation and scaling keys, matched to nodes by name) and morphs meshes
//! through [`MeshAnimationChannel`]s. Times are in ticks; divide by
//! [`Animation::ticks_per_second`] for seconds.

use glam::{Quat, Vec3};

use crate::errors::Result;
use crate::marshal::{self, Marshalable, from_native_converted, native_count, to_native_converted};
use crate::memory::{ArrayKind, alloc};
use crate::native::enums::AnimationBehaviour;
use crate::native::types::{AiAnimation, AiMeshAnim, AiMeshKey, AiNodeAnim, AiQuatKey, AiString, AiVectorKey};

// ============================================================================
// Keys
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VectorKey {
    pub time: f64,
    pub value: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuaternionKey {
    pub time: f64,
    pub value: Quat,
}

/// Selects which morph target of a mesh is active from `time` on.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeshKey {
    pub time: f64,
    pub value: u32,
}

impl From<VectorKey> for AiVectorKey {
    fn from(k: VectorKey) -> Self {
        Self {
            time: k.time,
            value: k.value.into(),
        }
    }
}

impl From<AiVectorKey> for VectorKey {
    fn from(k: AiVectorKey) -> Self {
        Self {
            time: k.time,
            value: k.value.into(),
        }
    }
}

impl From<QuaternionKey> for AiQuatKey {
    fn from(k: QuaternionKey) -> Self {
        Self {
            time: k.time,
            value: k.value.into(),
        }
    }
}

impl From<AiQuatKey> for QuaternionKey {
    fn from(k: AiQuatKey) -> Self {
        Self {
            time: k.time,
            value: k.value.into(),
        }
    }
}

impl From<MeshKey> for AiMeshKey {
    fn from(k: MeshKey) -> Self {
        Self {
            time: k.time,
            value: k.value,
        }
    }
}

impl From<AiMeshKey> for MeshKey {
    fn from(k: AiMeshKey) -> Self {
        Self {
            time: k.time,
            value: k.value,
        }
    }
}

// ============================================================================
// Channels
// ============================================================================

/// Keyframes for one node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeAnimationChannel {
    pub node_name: String,
    pub position_keys: Vec<VectorKey>,
    pub rotation_keys: Vec<QuaternionKey>,
    pub scaling_keys: Vec<VectorKey>,
    /// Behaviour before the first key
    pub pre_state: AnimationBehaviour,
    /// Behaviour after the last key
    pub post_state: AnimationBehaviour,
}

impl Marshalable for NodeAnimationChannel {
    type Native = AiNodeAnim;

    fn write_native(&self, _this_ptr: *mut AiNodeAnim, native: &mut AiNodeAnim) -> Result<()> {
        native.node_name = AiString::new(&self.node_name)?;
        native.pre_state = self.pre_state as u32;
        native.post_state = self.post_state as u32;
        native.num_position_keys = native_count(self.position_keys.len())?;
        native.num_rotation_keys = native_count(self.rotation_keys.len())?;
        native.num_scaling_keys = native_count(self.scaling_keys.len())?;
        native.position_keys = to_native_converted(&self.position_keys);
        native.rotation_keys = to_native_converted(&self.rotation_keys);
        native.scaling_keys = to_native_converted(&self.scaling_keys);
        Ok(())
    }

    unsafe fn read_native(&mut self, native: &AiNodeAnim) -> Result<()> {
        self.node_name = native.node_name.to_string_lossy();
        self.pre_state = AnimationBehaviour::from_raw(native.pre_state);
        self.post_state = AnimationBehaviour::from_raw(native.post_state);
        // SAFETY: each key count travels with its key array.
        unsafe {
            self.position_keys = from_native_converted(native.position_keys, native.num_position_keys as usize)?;
            self.rotation_keys = from_native_converted(native.rotation_keys, native.num_rotation_keys as usize)?;
            self.scaling_keys = from_native_converted(native.scaling_keys, native.num_scaling_keys as usize)?;
        }
        Ok(())
    }

    unsafe fn free_native_contents(native: &AiNodeAnim) {
        // SAFETY: the channel owns its three key arrays.
        unsafe {
            alloc::free_memory(native.position_keys);
            alloc::free_memory(native.rotation_keys);
            alloc::free_memory(native.scaling_keys);
        }
    }
}

/// Morph target keys for one mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshAnimationChannel {
    pub mesh_name: String,
    pub keys: Vec<MeshKey>,
}

impl Marshalable for MeshAnimationChannel {
    type Native = AiMeshAnim;

    fn write_native(&self, _this_ptr: *mut AiMeshAnim, native: &mut AiMeshAnim) -> Result<()> {
        native.name = AiString::new(&self.mesh_name)?;
        native.num_keys = native_count(self.keys.len())?;
        native.keys = to_native_converted(&self.keys);
        Ok(())
    }

    unsafe fn read_native(&mut self, native: &AiMeshAnim) -> Result<()> {
        self.mesh_name = native.name.to_string_lossy();
        // SAFETY: the key count travels with the key array.
        self.keys = unsafe { from_native_converted(native.keys, native.num_keys as usize)? };
        Ok(())
    }

    unsafe fn free_native_contents(native: &AiMeshAnim) {
        // SAFETY: the channel owns its key array.
        unsafe { alloc::free_memory(native.keys) };
    }
}

// ============================================================================
// Animation
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Animation {
    pub name: String,
    /// Duration in ticks
    pub duration: f64,
    /// Zero when the source file does not specify a rate
    pub ticks_per_second: f64,
    pub node_channels: Vec<NodeAnimationChannel>,
    pub mesh_channels: Vec<MeshAnimationChannel>,
}

impl Animation {
    /// Duration in seconds, assuming `default_rate` ticks per second when the
    /// animation does not specify one.
    #[must_use]
    pub fn duration_seconds(&self, default_rate: f64) -> f64 {
        let rate = if self.ticks_per_second > 0.0 {
            self.ticks_per_second
        } else {
            default_rate
        };
        if rate > 0.0 { self.duration / rate } else { 0.0 }
    }

    #[must_use]
    pub fn channel_for_node(&self, node_name: &str) -> Option<&NodeAnimationChannel> {
        self.node_channels.iter().find(|c| c.node_name == node_name)
    }
}

impl Marshalable for Animation {
    type Native = AiAnimation;

    fn write_native(&self, _this_ptr: *mut AiAnimation, native: &mut AiAnimation) -> Result<()> {
        native.name = AiString::new(&self.name)?;
        native.duration = self.duration;
        native.ticks_per_second = self.ticks_per_second;

        let num_channels = native_count(self.node_channels.len())?;
        native.channels = marshal::to_native_array(&self.node_channels, ArrayKind::Pointers)?.cast();
        native.num_channels = num_channels;
        let num_mesh_channels = native_count(self.mesh_channels.len())?;
        native.mesh_channels = marshal::to_native_array(&self.mesh_channels, ArrayKind::Pointers)?.cast();
        native.num_mesh_channels = num_mesh_channels;
        Ok(())
    }

    unsafe fn read_native(&mut self, native: &AiAnimation) -> Result<()> {
        self.name = native.name.to_string_lossy();
        self.duration = native.duration;
        self.ticks_per_second = native.ticks_per_second;
        // SAFETY: each channel count travels with its pointer array.
        unsafe {
            self.node_channels =
                marshal::from_native_array(native.channels.cast(), native.num_channels as usize, ArrayKind::Pointers)?;
            self.mesh_channels = marshal::from_native_array(
                native.mesh_channels.cast(),
                native.num_mesh_channels as usize,
                ArrayKind::Pointers,
            )?;
        }
        Ok(())
    }

    unsafe fn free_native_contents(native: &AiAnimation) {
        // SAFETY: the animation owns both channel arrays.
        unsafe {
            marshal::free_native_array::<NodeAnimationChannel>(
                native.channels.cast(),
                native.num_channels as usize,
                ArrayKind::Pointers,
            );
            marshal::free_native_array::<MeshAnimationChannel>(
                native.mesh_channels.cast(),
                native.num_mesh_channels as usize,
                ArrayKind::Pointers,
            );
        }
    }
}
