//! Scene container.
//!
//! [`Scene`] owns the node arena and every scene-level array. Its native form
//! is a single [`AiScene`] whose release frees the whole native graph.
//!
//! # Node hierarchy
//!
//! Nodes are stored in a [`SlotMap`] and linked by [`NodeKey`]. The hierarchy
//! keeps two invariants:
//! - a node's `parent`, if set, lists that node among its `children`
//! - no node is a child of two parents; [`Scene::attach`] detaches first

use glam::Mat4;
use slotmap::SlotMap;

use super::node::{self, Node};
use super::{Animation, Camera, EmbeddedTexture, Light, Material, Mesh, NodeKey};
use crate::errors::Result;
use crate::marshal::{self, Marshalable, native_count};
use crate::memory::ArrayKind;
use crate::native::enums::SceneFlags;
use crate::native::types::AiScene;

/// An imported or user-built scene.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub flags: SceneFlags,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub animations: Vec<Animation>,
    pub textures: Vec<EmbeddedTexture>,
    pub lights: Vec<Light>,
    pub cameras: Vec<Camera>,

    nodes: SlotMap<NodeKey, Node>,
    root: Option<NodeKey>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn root(&self) -> Option<NodeKey> {
        self.root
    }

    /// Creates a detached node.
    pub fn create_node(&mut self, name: &str) -> NodeKey {
        self.nodes.insert(Node::new(name))
    }

    /// Creates a node and makes it the root, replacing the previous root
    /// hierarchy.
    pub fn create_root(&mut self, name: &str) -> NodeKey {
        if let Some(old) = self.root.take() {
            self.remove_node(old);
        }
        let key = self.create_node(name);
        self.root = Some(key);
        key
    }

    /// Makes an existing detached node the root.
    ///
    /// The previous root hierarchy stays in the arena, detached.
    pub fn set_root(&mut self, key: NodeKey) {
        if self.nodes.get(key).is_none_or(|n| n.parent.is_some()) {
            log::warn!("Only an existing detached node can become the root");
            return;
        }
        self.root = Some(key);
    }

    /// Creates a node under `parent`.
    pub fn add_child(&mut self, parent: NodeKey, name: &str) -> NodeKey {
        let key = self.create_node(name);
        self.attach(key, parent);
        key
    }

    #[inline]
    #[must_use]
    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    #[inline]
    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeKey, &Node)> {
        self.nodes.iter()
    }

    /// Whether `ancestor` is `key` or one of its ancestors.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeKey, key: NodeKey) -> bool {
        let mut current = Some(key);
        while let Some(k) = current {
            if k == ancestor {
                return true;
            }
            current = self.nodes.get(k).and_then(|n| n.parent);
        }
        false
    }

    /// Moves `child` under `parent`, detaching it from its previous parent.
    ///
    /// Refused (with a warning) when it would create a cycle or reparent the
    /// root.
    pub fn attach(&mut self, child: NodeKey, parent: NodeKey) {
        if !self.nodes.contains_key(child) || !self.nodes.contains_key(parent) {
            log::warn!("Cannot attach: node not found");
            return;
        }
        if self.is_ancestor(child, parent) {
            log::warn!("Cannot attach a node to itself or to one of its descendants");
            return;
        }
        if self.root == Some(child) {
            log::warn!("Cannot attach the root node; set a new root first");
            return;
        }

        self.detach(child);
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
    }

    /// Unlinks `key` from its parent. The subtree stays in the arena.
    pub fn detach(&mut self, key: NodeKey) {
        let Some(parent) = self.nodes.get_mut(key).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(p) = self.nodes.get_mut(parent)
            && let Some(pos) = p.children.iter().position(|&c| c == key)
        {
            p.children.remove(pos);
        }
    }

    /// Removes `key` and its whole subtree.
    pub fn remove_node(&mut self, key: NodeKey) {
        self.detach(key);
        if self.root == Some(key) {
            self.root = None;
        }
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            if let Some(node) = self.nodes.remove(k) {
                stack.extend(node.children);
            }
        }
    }

    /// Depth-first search from the root for a node named `name`.
    #[must_use]
    pub fn find_node(&self, name: &str) -> Option<NodeKey> {
        self.descendants(self.root?).find(|&k| self.nodes[k].name == name)
    }

    /// `key` and every node below it, depth-first in child order.
    pub fn descendants(&self, key: NodeKey) -> impl Iterator<Item = NodeKey> + '_ {
        let mut stack = if self.nodes.contains_key(key) { vec![key] } else { Vec::new() };
        std::iter::from_fn(move || {
            let k = stack.pop()?;
            stack.extend(self.nodes[k].children.iter().rev().copied());
            Some(k)
        })
    }

    /// Transform from `key`'s space to the root's space.
    #[must_use]
    pub fn world_transform(&self, key: NodeKey) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(key);
        while let Some(k) = current {
            let Some(node) = self.nodes.get(k) else { break };
            matrix = node.transform * matrix;
            current = node.parent;
        }
        matrix
    }

    // ========================================================================
    // Contents
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn has_meshes(&self) -> bool {
        !self.meshes.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn has_animations(&self) -> bool {
        !self.animations.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        self.flags.contains(SceneFlags::INCOMPLETE)
    }

    /// Empties the scene, including the node arena.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl Marshalable for Scene {
    type Native = AiScene;

    fn write_native(&self, _this_ptr: *mut AiScene, native: &mut AiScene) -> Result<()> {
        native.flags = self.flags.bits();
        if let Some(root) = self.root {
            native.root_node = node::node_to_native(&self.nodes, root, std::ptr::null_mut())?;
        }

        let count = native_count(self.meshes.len())?;
        native.meshes = marshal::to_native_array(&self.meshes, ArrayKind::Pointers)?.cast();
        native.num_meshes = count;

        let count = native_count(self.materials.len())?;
        native.materials = marshal::to_native_array(&self.materials, ArrayKind::Pointers)?.cast();
        native.num_materials = count;

        let count = native_count(self.animations.len())?;
        native.animations = marshal::to_native_array(&self.animations, ArrayKind::Pointers)?.cast();
        native.num_animations = count;

        let count = native_count(self.textures.len())?;
        native.textures = marshal::to_native_array(&self.textures, ArrayKind::Pointers)?.cast();
        native.num_textures = count;

        let count = native_count(self.lights.len())?;
        native.lights = marshal::to_native_array(&self.lights, ArrayKind::Pointers)?.cast();
        native.num_lights = count;

        let count = native_count(self.cameras.len())?;
        native.cameras = marshal::to_native_array(&self.cameras, ArrayKind::Pointers)?.cast();
        native.num_cameras = count;
        Ok(())
    }

    unsafe fn read_native(&mut self, native: &AiScene) -> Result<()> {
        self.clear();
        self.flags = SceneFlags::from_bits_retain(native.flags);

        // SAFETY: every handle in a live scene is null or live, with its count.
        unsafe {
            if !native.root_node.is_null() {
                self.root = Some(node::node_from_native(&mut self.nodes, native.root_node)?);
            }
            self.meshes =
                marshal::from_native_array(native.meshes.cast(), native.num_meshes as usize, ArrayKind::Pointers)?;
            self.materials = marshal::from_native_array(
                native.materials.cast(),
                native.num_materials as usize,
                ArrayKind::Pointers,
            )?;
            self.animations = marshal::from_native_array(
                native.animations.cast(),
                native.num_animations as usize,
                ArrayKind::Pointers,
            )?;
            self.textures =
                marshal::from_native_array(native.textures.cast(), native.num_textures as usize, ArrayKind::Pointers)?;
            self.lights =
                marshal::from_native_array(native.lights.cast(), native.num_lights as usize, ArrayKind::Pointers)?;
            self.cameras =
                marshal::from_native_array(native.cameras.cast(), native.num_cameras as usize, ArrayKind::Pointers)?;
        }
        log::debug!(
            "Read native scene: {} nodes, {} meshes, {} materials, {} animations",
            self.nodes.len(),
            self.meshes.len(),
            self.materials.len(),
            self.animations.len()
        );
        Ok(())
    }

    unsafe fn free_native_contents(native: &AiScene) {
        // SAFETY: the scene is the single owner of every handle it holds.
        unsafe {
            node::free_native_node(native.root_node);
            marshal::free_native_array::<Mesh>(native.meshes.cast(), native.num_meshes as usize, ArrayKind::Pointers);
            marshal::free_native_array::<Material>(
                native.materials.cast(),
                native.num_materials as usize,
                ArrayKind::Pointers,
            );
            marshal::free_native_array::<Animation>(
                native.animations.cast(),
                native.num_animations as usize,
                ArrayKind::Pointers,
            );
            marshal::free_native_array::<EmbeddedTexture>(
                native.textures.cast(),
                native.num_textures as usize,
                ArrayKind::Pointers,
            );
            marshal::free_native_array::<Light>(native.lights.cast(), native.num_lights as usize, ArrayKind::Pointers);
            marshal::free_native_array::<Camera>(
                native.cameras.cast(),
                native.num_cameras as usize,
                ArrayKind::Pointers,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (Scene, NodeKey, NodeKey, NodeKey) {
        let mut scene = Scene::new();
        let root = scene.create_root("root");
        let a = scene.add_child(root, "a");
        let b = scene.add_child(a, "b");
        (scene, root, a, b)
    }

    #[test]
    fn attach_moves_between_parents() {
        let (mut scene, root, a, b) = chain();
        scene.attach(b, root);
        assert_eq!(scene.node(b).unwrap().parent(), Some(root));
        assert!(scene.node(a).unwrap().children().is_empty());
        assert_eq!(scene.node(root).unwrap().children(), &[a, b]);
    }

    #[test]
    fn attach_refuses_cycles_and_root() {
        let (mut scene, root, a, b) = chain();
        scene.attach(a, b);
        scene.attach(a, a);
        scene.attach(root, b);
        assert_eq!(scene.node(a).unwrap().parent(), Some(root));
        assert_eq!(scene.node(root).unwrap().parent(), None);
    }

    #[test]
    fn remove_node_drops_subtree() {
        let (mut scene, root, a, _) = chain();
        scene.remove_node(a);
        assert_eq!(scene.node_count(), 1);
        assert!(scene.node(root).unwrap().children().is_empty());
        assert!(scene.find_node("b").is_none());
    }

    #[test]
    fn find_and_world_transform() {
        let (mut scene, root, a, b) = chain();
        scene.node_mut(root).unwrap().transform = Mat4::from_scale(glam::Vec3::splat(2.0));
        scene.node_mut(a).unwrap().transform = Mat4::from_translation(glam::Vec3::X);
        assert_eq!(scene.find_node("b"), Some(b));
        let p = scene.world_transform(b).transform_point3(glam::Vec3::ZERO);
        assert_eq!(p, glam::Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(scene.descendants(root).collect::<Vec<_>>(), vec![root, a, b]);
    }
}
