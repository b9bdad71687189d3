//! Root Transform Tests
//!
//! Tests for:
//! - RootTransform composition order (scale * rx * ry * rz)
//! - In-place native patch touching only the 64 transform bytes
//! - Managed equivalent on the Scene graph

mod common;

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Vec3, Vec4};
use xxhash_rust::xxh3::xxh3_64;

use asset_bridge::marshal::NativeBox;
use asset_bridge::memory::raw;
use asset_bridge::native::types::{AiMatrix4x4, AiNode, AiScene};
use asset_bridge::scene::transform::NODE_TRANSFORM_OFFSET;
use asset_bridge::scene::{RootTransform, Scene, patch_root_transform};

use common::approx_vec4;

const TRANSFORM_BYTES: usize = 64;

fn node_bytes(node: *const AiNode) -> Vec<u8> {
    unsafe { std::slice::from_raw_parts(node.cast::<u8>(), raw::size_of::<AiNode>()) }.to_vec()
}

fn single_node_scene() -> Scene {
    let mut scene = Scene::new();
    let root = scene.create_root("root");
    scene.add_child(root, "child");
    scene.node_mut(root).unwrap().mesh_indices = vec![0, 1];
    scene
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn identity_is_a_no_op() {
    assert!(RootTransform::default().is_identity());
    assert_eq!(RootTransform::IDENTITY.matrix(), Mat4::IDENTITY);

    let mut scene = single_node_scene();
    scene.apply_root_transform(&RootTransform::IDENTITY);
    assert_eq!(scene.node(scene.root().unwrap()).unwrap().transform, Mat4::IDENTITY);
}

#[test]
fn rotations_apply_z_then_y_then_x() {
    let transform = RootTransform {
        scale: 1.0,
        x_rotation: 90.0,
        y_rotation: 0.0,
        z_rotation: 90.0,
    };
    // Z first sends +X to +Y, then X sends +Y to +Z.
    let p = transform.matrix().transform_vector3(Vec3::X);
    assert!((p - Vec3::Z).length() < 1e-5, "got {p}");

    let expected = Mat4::from_rotation_x(FRAC_PI_2) * Mat4::from_rotation_z(FRAC_PI_2);
    assert!(approx_vec4(transform.matrix().x_axis, expected.x_axis));
}

#[test]
fn scale_multiplies_after_rotation() {
    let transform = RootTransform {
        scale: 2.0,
        y_rotation: 90.0,
        ..RootTransform::IDENTITY
    };
    let p = transform.matrix().transform_point3(Vec3::X);
    assert!((p - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-5, "got {p}");
}

// ============================================================================
// Native patch
// ============================================================================

#[test]
fn patch_rewrites_only_the_transform_bytes() {
    let native = NativeBox::new(&single_node_scene()).unwrap();
    let root = unsafe { raw::read::<AiScene>(native.as_ptr().cast()) }.root_node;

    let before = node_bytes(root);
    let head_hash = xxh3_64(&before[..NODE_TRANSFORM_OFFSET]);
    let tail_hash = xxh3_64(&before[NODE_TRANSFORM_OFFSET + TRANSFORM_BYTES..]);
    let transform_hash = xxh3_64(&before[NODE_TRANSFORM_OFFSET..NODE_TRANSFORM_OFFSET + TRANSFORM_BYTES]);

    assert!(unsafe { patch_root_transform(native.as_ptr(), &RootTransform::from_scale(2.0).matrix()) });

    let after = node_bytes(root);
    assert_eq!(xxh3_64(&after[..NODE_TRANSFORM_OFFSET]), head_hash);
    assert_eq!(xxh3_64(&after[NODE_TRANSFORM_OFFSET + TRANSFORM_BYTES..]), tail_hash);
    assert_ne!(
        xxh3_64(&after[NODE_TRANSFORM_OFFSET..NODE_TRANSFORM_OFFSET + TRANSFORM_BYTES]),
        transform_hash
    );

    let patched: AiMatrix4x4 = unsafe { raw::read(raw::offset(root, NODE_TRANSFORM_OFFSET)) };
    assert_eq!(patched.to_mat4(), Mat4::from_diagonal(Vec4::new(2.0, 2.0, 2.0, 1.0)));
}

#[test]
fn patch_post_multiplies_existing_transform() {
    let mut scene = single_node_scene();
    let root = scene.root().unwrap();
    scene.node_mut(root).unwrap().transform = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
    let native = NativeBox::new(&scene).unwrap();

    let extra = RootTransform::from_scale(3.0).matrix();
    assert!(unsafe { patch_root_transform(native.as_ptr(), &extra) });

    let node = unsafe { raw::read::<AiNode>(raw::read::<AiScene>(native.as_ptr().cast()).root_node.cast()) };
    let expected = Mat4::from_translation(Vec3::X) * extra;
    assert_eq!(node.transformation.to_mat4(), expected);

    // The managed path agrees with the native one.
    scene.apply_root_transform(&RootTransform::from_scale(3.0));
    assert_eq!(scene.node(root).unwrap().transform, expected);
}

#[test]
fn patch_matches_row_major_layout() {
    let native = NativeBox::new(&single_node_scene()).unwrap();
    let translate = Mat4::from_translation(Vec3::new(4.0, 5.0, 6.0));
    assert!(unsafe { patch_root_transform(native.as_ptr(), &translate) });

    let root = unsafe { raw::read::<AiScene>(native.as_ptr().cast()) }.root_node;
    let matrix: AiMatrix4x4 = unsafe { raw::read(raw::offset(root, NODE_TRANSFORM_OFFSET)) };
    // Translation sits in the last column of each row.
    assert_eq!([matrix.rows[3], matrix.rows[7], matrix.rows[11]], [4.0, 5.0, 6.0]);
}

#[test]
fn patch_ignores_null_scene_and_missing_root() {
    assert!(!unsafe { patch_root_transform(std::ptr::null_mut(), &Mat4::IDENTITY) });

    let native = NativeBox::new(&Scene::new()).unwrap();
    assert!(!unsafe { patch_root_transform(native.as_ptr(), &Mat4::IDENTITY) });
}
