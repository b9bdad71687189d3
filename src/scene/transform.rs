//! Root-transform injection.
//!
//! A [`RootTransform`] scales and rotates a whole scene by post-multiplying
//! the root node's transform. It can be applied two ways:
//!
//! - [`Scene::apply_root_transform`] on the managed graph
//! - [`patch_root_transform`] directly on a live native scene, writing the
//!   root node's matrix in place at its fixed field offset
//!
//! The in-place patch skips a full marshal round trip between import and
//! post-processing. The offset it writes at is derived from the native struct
//! definition with `offset_of!` and checked at compile time, so a layout
//! change in [`AiNode`] cannot silently move the write.

use std::mem::offset_of;

use glam::{Mat4, Vec3};

use super::Scene;
use crate::memory::raw;
use crate::native::types::{AiMatrix4x4, AiNode, AiScene};

/// Byte offset of the transform inside a native node.
pub const NODE_TRANSFORM_OFFSET: usize = offset_of!(AiNode, transformation);

/// Uniform scale plus rotations about X, Y and Z, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootTransform {
    pub scale: f32,
    pub x_rotation: f32,
    pub y_rotation: f32,
    pub z_rotation: f32,
}

impl Default for RootTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RootTransform {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        x_rotation: 0.0,
        y_rotation: 0.0,
        z_rotation: 0.0,
    };

    #[must_use]
    pub fn from_scale(scale: f32) -> Self {
        Self { scale, ..Self::IDENTITY }
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// `scale * (rx * ry * rz)`.
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        let rotation = Mat4::from_rotation_x(self.x_rotation.to_radians())
            * Mat4::from_rotation_y(self.y_rotation.to_radians())
            * Mat4::from_rotation_z(self.z_rotation.to_radians());
        Mat4::from_scale(Vec3::splat(self.scale)) * rotation
    }
}

impl Scene {
    /// Post-multiplies the root node's transform by `transform`.
    ///
    /// No-op for an identity transform or a scene without a root.
    pub fn apply_root_transform(&mut self, transform: &RootTransform) {
        if transform.is_identity() {
            return;
        }
        let matrix = transform.matrix();
        if let Some(root) = self.root()
            && let Some(node) = self.node_mut(root)
        {
            node.transform *= matrix;
        }
    }
}

/// Post-multiplies the root node's transform of a live native scene by
/// `matrix`, in place.
///
/// Exactly the 64 bytes of the root node's transform are rewritten. Returns
/// `false` when `scene` or its root is null.
///
/// # Safety
///
/// `scene` must be null or point at a live native scene whose root node, if
/// any, is a live, writable [`AiNode`].
pub unsafe fn patch_root_transform(scene: *mut AiScene, matrix: &Mat4) -> bool {
    if scene.is_null() {
        return false;
    }
    // SAFETY: live scene by the caller's contract.
    let native: AiScene = unsafe { raw::read(scene.cast()) };
    if native.root_node.is_null() {
        return false;
    }
    let field = raw::offset(native.root_node, NODE_TRANSFORM_OFFSET);
    // SAFETY: `field` is the transform of a live node.
    unsafe {
        let current: AiMatrix4x4 = raw::read(field);
        let patched = AiMatrix4x4::from_mat4(&(current.to_mat4() * *matrix));
        raw::write(field, &patched);
    }
    log::debug!("Patched native root transform in place");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn rotation_uses_degrees() {
        let t = RootTransform {
            z_rotation: 90.0,
            ..RootTransform::IDENTITY
        };
        let p = t.matrix() * Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert!((p.x).abs() < 1e-6);
        assert!((p.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn scale_composes_outside_rotation() {
        let t = RootTransform {
            scale: 3.0,
            x_rotation: 90.0,
            ..RootTransform::IDENTITY
        };
        let p = t.matrix().transform_point3(Vec3::Y);
        assert!((p - Vec3::new(0.0, 0.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn identity_is_a_no_op() {
        let mut scene = Scene::new();
        let root = scene.create_root("root");
        scene.node_mut(root).unwrap().transform = Mat4::from_translation(Vec3::ONE);
        scene.apply_root_transform(&RootTransform::IDENTITY);
        assert_eq!(scene.node(root).unwrap().transform, Mat4::from_translation(Vec3::ONE));
        scene.apply_root_transform(&RootTransform::from_scale(2.0));
        assert_eq!(
            scene.node(root).unwrap().transform,
            Mat4::from_translation(Vec3::ONE) * Mat4::from_scale(Vec3::splat(2.0))
        );
    }

    #[test]
    fn null_scene_is_not_patched() {
        assert!(!unsafe { patch_root_transform(std::ptr::null_mut(), &Mat4::IDENTITY) });
    }
}
