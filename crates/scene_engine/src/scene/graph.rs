//! Node arena and tree operations
//!
//! The [`SceneGraph`] owns every [`Node`] in a slotmap arena. Keys stay
//! stable for the life of a node and become invalid on destruction, so
//! a vanished key is the durable signal that a node is gone. The graph
//! also owns the scene's direct node list (the roots), which is what
//! the physics world registers on [`prepare_world`].
//!
//! [`prepare_world`]: crate::physics::PhysicsWorld::prepare_world

use slotmap::{new_key_type, SlotMap};

use crate::foundation::math::Mat4;
use crate::scene::node::{Node, NodeDesc};
use crate::scene::SceneError;

new_key_type! {
    /// Stable key identifying a [`Node`] inside a [`SceneGraph`]
    pub struct NodeKey;
}

/// Arena of nodes plus the scene's direct node list
#[derive(Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeKey, Node>,
    roots: Vec<NodeKey>,
}

impl SceneGraph {
    /// Create an empty scene graph
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            roots: Vec::new(),
        }
    }

    /// Build a node (and its described children, recursively) in the arena
    ///
    /// Children become owned immediately and have their parent key set
    /// to the new node. The new node is not registered in the scene's
    /// direct node list; use [`SceneGraph::spawn_root`] for that.
    pub fn spawn(&mut self, desc: &NodeDesc) -> NodeKey {
        let key = self.nodes.insert(Node::from_desc(desc));
        for child_desc in &desc.children {
            let child = self.spawn(child_desc);
            self.nodes[child].parent = Some(key);
            self.nodes[key].children.push(child);
        }
        key
    }

    /// Build a node and register it in the scene's direct node list
    pub fn spawn_root(&mut self, desc: &NodeDesc) -> NodeKey {
        let key = self.spawn(desc);
        self.roots.push(key);
        key
    }

    /// Register an existing node in the scene's direct node list
    pub fn add_root(&mut self, key: NodeKey) {
        if self.nodes.contains_key(key) && !self.roots.contains(&key) {
            self.roots.push(key);
        }
    }

    /// Remove a node from the scene's direct node list (no-op if absent)
    pub fn remove_root(&mut self, key: NodeKey) {
        self.roots.retain(|&k| k != key);
    }

    /// The scene's direct node list
    pub fn roots(&self) -> &[NodeKey] {
        &self.roots
    }

    /// Shared access to a node
    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Exclusive access to a node
    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    /// Whether the key still refers to a live node
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Number of live nodes in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append `child` to `parent`'s child list and set its parent key
    pub fn add_child(&mut self, parent: NodeKey, child: NodeKey) {
        if !self.nodes.contains_key(parent) || !self.nodes.contains_key(child) {
            return;
        }
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
    }

    /// Remove `child` from `parent`'s child list and clear its parent key
    ///
    /// Removing a non-member is a no-op.
    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) {
        let Some(parent_node) = self.nodes.get_mut(parent) else {
            return;
        };
        let Some(index) = parent_node.children.iter().position(|&k| k == child) else {
            return;
        };
        parent_node.children.remove(index);
        if let Some(child_node) = self.nodes.get_mut(child) {
            child_node.parent = None;
        }
    }

    /// Detach a node from its parent, if it has one
    pub fn detach(&mut self, key: NodeKey) {
        let Some(parent) = self.nodes.get(key).and_then(Node::parent) else {
            return;
        };
        self.remove_child(parent, key);
    }

    /// World transform of a node: the ancestor chain's local matrices
    /// composed in parent-then-child order
    ///
    /// Recomputed on every call, O(depth); there is no caching. Callers
    /// needing per-frame global transforms for many nodes pay that cost
    /// per node.
    pub fn global_matrix(&self, key: NodeKey) -> Mat4 {
        let Some(node) = self.nodes.get(key) else {
            return Mat4::identity();
        };
        let mut matrix = node.matrix;
        let mut ancestor = node.parent;
        while let Some(k) = ancestor {
            let Some(parent) = self.nodes.get(k) else {
                break;
            };
            matrix = parent.matrix * matrix;
            ancestor = parent.parent;
        }
        matrix
    }

    /// Deep-copy a subtree
    ///
    /// The copy carries the semantic fields only (transform, name,
    /// camera, mesh, tag, shape class, mass class, gameplay forces).
    /// Its parent is unset and it holds no scene registration or
    /// physics link — those are runtime attachments re-acquired by
    /// whoever registers the clone.
    pub fn clone_subtree(&mut self, key: NodeKey) -> Option<NodeKey> {
        if !self.nodes.contains_key(key) {
            return None;
        }
        Some(self.clone_rec(key))
    }

    fn clone_rec(&mut self, key: NodeKey) -> NodeKey {
        let mut copy = self.nodes[key].clone();
        let children = std::mem::take(&mut copy.children);
        copy.parent = None;
        copy.colliding = false;
        copy.destroyed = false;

        let clone_key = self.nodes.insert(copy);
        for child in children {
            let child_clone = self.clone_rec(child);
            self.nodes[child_clone].parent = Some(clone_key);
            self.nodes[clone_key].children.push(child_clone);
        }
        clone_key
    }

    /// Recursively destroy a subtree, children first
    ///
    /// Every destroyed node is removed from the scene's direct node
    /// list, detached from its parent, and freed from the arena.
    /// Returns the keys that were removed so the physics world can
    /// drop its tracking for them (see
    /// [`PhysicsWorld::destroy_node`]). Destroying a missing key or an
    /// already-detached node is a no-op.
    ///
    /// [`PhysicsWorld::destroy_node`]: crate::physics::PhysicsWorld::destroy_node
    pub fn destroy(&mut self, key: NodeKey) -> Vec<NodeKey> {
        let mut removed = Vec::new();
        self.destroy_rec(key, &mut removed);
        self.roots.retain(|k| !removed.contains(k));
        removed
    }

    fn destroy_rec(&mut self, key: NodeKey, removed: &mut Vec<NodeKey>) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        let children = node.children.clone();
        for child in children {
            self.destroy_rec(child, removed);
        }
        if let Some(node) = self.nodes.get_mut(key) {
            node.destroyed = true;
        }
        self.detach(key);
        if self.nodes.remove(key).is_some() {
            removed.push(key);
        }
    }

    /// Look up a node by name (linear scan)
    pub fn find_by_name(&self, name: &str) -> Option<NodeKey> {
        self.nodes
            .iter()
            .find(|(_, node)| node.name.as_deref() == Some(name))
            .map(|(key, _)| key)
    }

    /// Look up a required node by name, failing with a startup error
    pub fn require(&self, name: &str) -> Result<NodeKey, SceneError> {
        self.find_by_name(name)
            .ok_or_else(|| SceneError::MissingNode(name.to_owned()))
    }

    /// Look up a required camera node by name
    ///
    /// Fails if the node is missing or carries no camera reference.
    pub fn require_camera(&self, name: &str) -> Result<NodeKey, SceneError> {
        let key = self.require(name)?;
        if self.nodes[key].camera.is_none() {
            return Err(SceneError::MissingCamera(name.to_owned()));
        }
        Ok(key)
    }
}
