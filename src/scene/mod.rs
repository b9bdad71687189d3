//! Managed scene graph.
//!
//! Owned, garbage-free counterparts of the native scene structures:
//! - [`Scene`]: container of the node hierarchy and every scene-level array
//! - [`Node`]: hierarchy node, stored in an arena and addressed by [`NodeKey`]
//! - [`Mesh`], [`Face`], [`Bone`], [`MeshAnimationAttachment`]: geometry
//! - [`Material`], [`MaterialProperty`]: key/value material description
//! - [`Animation`] with node and mesh channels
//! - [`Camera`], [`Light`], [`EmbeddedTexture`]
//! - [`RootTransform`]: scale/rotation injected into the root node after import
//!
//! Every type here implements [`Marshalable`](crate::marshal::Marshalable)
//! except [`Node`], whose native form depends on the arena it lives in and is
//! built by [`Scene`] directly.

pub mod animation;
pub mod camera;
pub mod light;
pub mod material;
pub mod mesh;
pub mod node;
#[allow(clippy::module_inception)]
pub mod scene;
pub mod texture;
pub mod transform;

pub use animation::{
    Animation, MeshAnimationChannel, MeshKey, NodeAnimationChannel, QuaternionKey, VectorKey,
};
pub use camera::Camera;
pub use light::Light;
pub use material::{Material, MaterialProperty};
pub use mesh::{Bone, Face, Mesh, MeshAnimationAttachment, VertexWeight};
pub use node::Node;
pub use scene::Scene;
pub use texture::{EmbeddedTexture, Texel};
pub use transform::{RootTransform, patch_root_transform};

use slotmap::new_key_type;

new_key_type! {
    /// Stable handle to a [`Node`] in a [`Scene`]'s arena.
    pub struct NodeKey;
}
