//! Scene graph nodes and their native tree form.
//!
//! Managed nodes live in an arena owned by [`Scene`](super::Scene); a node
//! refers to its parent and children by [`NodeKey`], so no node owns another
//! and reparenting never moves data.
//!
//! The native form is a pointer tree: each `AiNode` owns its children through
//! an array of pointers and refers back to its parent with a non-owning
//! pointer. Building it requires a node's own address before its children can
//! be built, so [`node_to_native`] allocates each node first and queues its
//! children with that address as their parent. All three tree walks use an
//! explicit work stack.

use std::ffi::c_void;
use std::ptr;

use glam::Mat4;
use slotmap::SlotMap;

use super::NodeKey;
use crate::errors::{BridgeError, Result};
use crate::marshal::native_count;
use crate::memory::{self, ArrayKind, alloc, raw};
use crate::native::types::{AiMatrix4x4, AiNode, AiString};

/// A node in the scene hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node name, unique by convention so animation channels can refer to it
    pub name: String,
    /// Transform relative to the parent node
    pub transform: Mat4,
    /// Indices into [`Scene::meshes`](super::Scene::meshes)
    pub mesh_indices: Vec<u32>,

    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
}

impl Node {
    /// Creates a detached node with an identity transform.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            transform: Mat4::IDENTITY,
            mesh_indices: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn has_meshes(&self) -> bool {
        !self.mesh_indices.is_empty()
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new("")
    }
}

// ============================================================================
// Native tree
// ============================================================================

/// A node waiting to be built: its key, the native address of its parent and
/// the parent's child slot to fill, or null for the root.
struct PendingNode {
    key: NodeKey,
    parent: *mut AiNode,
    slot: *mut c_void,
}

/// Builds the native tree rooted at `key` and returns its address.
///
/// `parent` is written verbatim into the new node's back-reference. The walk
/// keeps its own work stack, so hierarchy depth is bounded by memory rather
/// than by the call stack. On error every block allocated for this subtree has
/// been freed.
pub(crate) fn node_to_native(
    nodes: &SlotMap<NodeKey, Node>,
    key: NodeKey,
    parent: *mut AiNode,
) -> Result<*mut AiNode> {
    let mut root: *mut AiNode = ptr::null_mut();
    let mut pending = vec![PendingNode {
        key,
        parent,
        slot: ptr::null_mut(),
    }];

    while let Some(next) = pending.pop() {
        match build_node(nodes, &next, &mut pending) {
            Ok(this_ptr) if next.slot.is_null() => root = this_ptr,
            // SAFETY: `slot` lies in a live child slot block of a node built earlier.
            Ok(this_ptr) => unsafe { raw::write(next.slot, &this_ptr) },
            Err(err) => {
                // SAFETY: every node built so far is linked below `root`, and
                // slots not reached yet are still null.
                unsafe { free_native_node(root) };
                return Err(err);
            }
        }
    }
    Ok(root)
}

/// Allocates and writes one native node, then queues its children with the
/// new address as their parent.
fn build_node(
    nodes: &SlotMap<NodeKey, Node>,
    pending: &PendingNode,
    queue: &mut Vec<PendingNode>,
) -> Result<*mut AiNode> {
    let node = &nodes[pending.key];
    let name = AiString::new(&node.name)?;
    let num_meshes = native_count(node.mesh_indices.len())?;
    let num_children = native_count(node.children.len())?;

    // Allocate self first: the children need this address.
    let this_ptr = alloc::allocate_value::<AiNode>();
    let children: *mut *mut AiNode = if node.children.is_empty() {
        ptr::null_mut()
    } else {
        let bytes = node.children.len() * raw::size_of::<usize>();
        let slots = alloc::allocate(bytes);
        // Unfilled slots must read as null if the build is abandoned.
        // SAFETY: `slots` was just allocated with `bytes` bytes.
        unsafe { raw::clear_memory(slots, 0, bytes) };
        slots.cast()
    };

    let native = AiNode {
        name,
        transformation: AiMatrix4x4::from_mat4(&node.transform),
        parent: pending.parent,
        num_children,
        children,
        num_meshes,
        meshes: memory::to_native_array_blittable(&node.mesh_indices),
    };
    // SAFETY: `this_ptr` was allocated for one `AiNode`.
    unsafe { raw::write(this_ptr.cast(), &native) };

    queue.extend(node.children.iter().enumerate().map(|(index, &child)| PendingNode {
        key: child,
        parent: this_ptr,
        slot: raw::offset(children, index * raw::size_of::<usize>()),
    }));
    Ok(this_ptr)
}

/// Frees the native tree rooted at `ptr`. Parent back-references are never
/// followed. Null roots and null child slots are ignored.
///
/// # Safety
///
/// `ptr` must be null or a tree built by [`node_to_native`], not yet freed.
pub(crate) unsafe fn free_native_node(ptr: *mut AiNode) {
    let mut pending = vec![ptr];
    while let Some(ptr) = pending.pop() {
        if ptr.is_null() {
            continue;
        }
        // SAFETY: live node by the caller's contract.
        let native: AiNode = unsafe { raw::read(ptr.cast()) };
        if !native.children.is_null() {
            for index in 0..native.num_children as usize {
                // SAFETY: `index < num_children` stays within the slot block.
                let child: *mut AiNode =
                    unsafe { raw::read(raw::offset(native.children, index * raw::size_of::<usize>())) };
                pending.push(child);
            }
        }
        // SAFETY: the node owns its mesh indices, its slot block and itself.
        unsafe {
            alloc::free_memory(native.meshes);
            alloc::free_memory(native.children);
            alloc::free_memory(ptr);
        }
    }
}

/// Copies the native tree rooted at `ptr` into `nodes` and returns the new
/// root key. Children keep their native order.
///
/// # Safety
///
/// `ptr` must point at a live native node tree.
pub(crate) unsafe fn node_from_native(nodes: &mut SlotMap<NodeKey, Node>, ptr: *const AiNode) -> Result<NodeKey> {
    // SAFETY: live root by the caller's contract.
    let (root, children) = unsafe { read_node(nodes, ptr, None)? };
    let mut pending: Vec<(NodeKey, *mut AiNode)> = children.into_iter().rev().map(|c| (root, c)).collect();

    while let Some((parent, child)) = pending.pop() {
        // SAFETY: non-null slots of a live node point at live nodes.
        let (key, grandchildren) = unsafe { read_node(nodes, child, Some(parent))? };
        nodes[parent].children.push(key);
        pending.extend(grandchildren.into_iter().rev().map(|c| (key, c)));
    }
    Ok(root)
}

/// Inserts one native node into `nodes` and returns its key with its native
/// child pointers, rejecting null child slots.
unsafe fn read_node(
    nodes: &mut SlotMap<NodeKey, Node>,
    ptr: *const AiNode,
    parent: Option<NodeKey>,
) -> Result<(NodeKey, Vec<*mut AiNode>)> {
    // SAFETY: live node by the caller's contract.
    let native: AiNode = unsafe { raw::read(ptr.cast()) };
    // SAFETY: counts travel with their arrays.
    let (mesh_indices, children) = unsafe {
        (
            memory::marshal_array::<u32>(native.meshes.cast(), native.num_meshes as usize, ArrayKind::Flat)?,
            memory::marshal_array::<*mut AiNode>(
                native.children.cast(),
                native.num_children as usize,
                ArrayKind::Flat,
            )?,
        )
    };
    if let Some(index) = children.iter().position(|c| c.is_null()) {
        return Err(BridgeError::NullElement { index });
    }

    let key = nodes.insert(Node {
        name: native.name.to_string_lossy(),
        transform: native.transformation.to_mat4(),
        mesh_indices,
        parent,
        children: Vec::with_capacity(children.len()),
    });
    Ok((key, children))
}
