//! Arena-backed transform hierarchy
//!
//! Each node stores its local TRS and a cached [`WorldTransform`]. Setting
//! any local component or changing the parent marks the node and its whole
//! subtree dirty; nothing is recomputed until a world value is read. A read
//! resolves the dirty chain from the topmost dirty ancestor downward and
//! leaves the cache clean, so a second read without mutation is free.
//!
//! Children are kept only as a list of ids on the parent, used to
//! propagate invalidation. Parent assignment does not check for cycles;
//! making a node its own ancestor is a caller error.

use cdvis_core::{Arena, Handle, HandleError};
use cdvis_math::{Mat4, Quat, Transform, Vec3, WorldTransform};

pub type NodeId = Handle<Node>;

/// A transform node
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    local: Transform,
    world: WorldTransform,
    dirty: bool,
    revision: u64,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(name: impl Into<String>, local: Transform) -> Self {
        Self {
            name: name.into(),
            local,
            world: WorldTransform::IDENTITY,
            dirty: true,
            revision: 0,
            parent: None,
            children: Vec::new(),
        }
    }

    #[inline]
    pub fn local(&self) -> &Transform {
        &self.local
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn add_child(&mut self, child: NodeId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    fn remove_child(&mut self, child: NodeId) {
        self.children.retain(|c| *c != child);
    }
}

/// The object graph
#[derive(Default)]
pub struct SceneGraph {
    nodes: Arena<Node>,
    recomputes: u64,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create a root node at the identity transform
    pub fn create(&mut self, name: impl Into<String>) -> NodeId {
        self.nodes.insert(Node::new(name, Transform::IDENTITY))
    }

    pub fn create_with(&mut self, name: impl Into<String>, local: Transform) -> NodeId {
        self.nodes.insert(Node::new(name, local))
    }

    pub fn create_child(&mut self, parent: NodeId, name: impl Into<String>) -> Result<NodeId, HandleError> {
        self.nodes.try_get(parent)?;
        let id = self.create(name);
        self.set_parent(id, Some(parent))?;
        Ok(id)
    }

    /// Destroy a node. Its children move to its former parent (or become
    /// roots) and keep their local values.
    pub fn destroy(&mut self, id: NodeId) -> Result<(), HandleError> {
        let (parent, children) = {
            let node = self.nodes.try_get(id)?;
            (node.parent, node.children.clone())
        };

        for &child in &children {
            if let Some(c) = self.nodes.get_mut(child) {
                c.parent = parent;
            }
            if let Some(p) = parent.and_then(|p| self.nodes.get_mut(p)) {
                p.add_child(child);
            }
            self.mark_dirty(child);
        }
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(p)) {
            p.remove_child(id);
        }

        if let Some(node) = self.nodes.remove(id) {
            log::debug!(
                "Destroyed node '{}', reparented {} children to {:?}",
                node.name,
                children.len(),
                parent
            );
        }
        Ok(())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, HandleError> {
        self.nodes.try_get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, HandleError> {
        Ok(self.nodes.try_get(id)?.parent)
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId], HandleError> {
        Ok(self.nodes.try_get(id)?.children())
    }

    /// Move a node under `parent` (or to the root with `None`).
    ///
    /// Local values are kept, so the world transform generally changes.
    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) -> Result<(), HandleError> {
        let old = self.nodes.try_get(id)?.parent;
        if old == parent {
            return Ok(());
        }
        if let Some(p) = parent {
            self.nodes.try_get(p)?;
        }

        if let Some(o) = old.and_then(|o| self.nodes.get_mut(o)) {
            o.remove_child(id);
        }
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(p)) {
            p.add_child(id);
        }
        self.nodes.try_get_mut(id)?.parent = parent;
        self.mark_dirty(id);
        Ok(())
    }

    // ========================================================================
    // Local transform
    // ========================================================================

    pub fn local(&self, id: NodeId) -> Result<Transform, HandleError> {
        Ok(self.nodes.try_get(id)?.local)
    }

    pub fn set_local(&mut self, id: NodeId, local: Transform) -> Result<(), HandleError> {
        self.nodes.try_get_mut(id)?.local = local;
        self.mark_dirty(id);
        Ok(())
    }

    pub fn set_local_position(&mut self, id: NodeId, position: Vec3) -> Result<(), HandleError> {
        self.nodes.try_get_mut(id)?.local.position = position;
        self.mark_dirty(id);
        Ok(())
    }

    pub fn set_local_rotation(&mut self, id: NodeId, rotation: Quat) -> Result<(), HandleError> {
        self.nodes.try_get_mut(id)?.local.rotation = rotation;
        self.mark_dirty(id);
        Ok(())
    }

    pub fn set_local_scale(&mut self, id: NodeId, scale: Vec3) -> Result<(), HandleError> {
        self.nodes.try_get_mut(id)?.local.scale = scale;
        self.mark_dirty(id);
        Ok(())
    }

    fn mark_dirty(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(n) {
                node.dirty = true;
                stack.extend_from_slice(&node.children);
            }
        }
    }

    // ========================================================================
    // World transform
    // ========================================================================

    /// Resolve and return the world state of a node
    pub fn world(&mut self, id: NodeId) -> Result<WorldTransform, HandleError> {
        self.resolve(id)?;
        Ok(self.nodes.try_get(id)?.world)
    }

    pub fn world_position(&mut self, id: NodeId) -> Result<Vec3, HandleError> {
        Ok(self.world(id)?.position)
    }

    pub fn world_rotation(&mut self, id: NodeId) -> Result<Quat, HandleError> {
        Ok(self.world(id)?.rotation)
    }

    pub fn world_scale(&mut self, id: NodeId) -> Result<Vec3, HandleError> {
        Ok(self.world(id)?.scale)
    }

    pub fn object_to_world(&mut self, id: NodeId) -> Result<Mat4, HandleError> {
        Ok(self.world(id)?.object_to_world)
    }

    pub fn world_to_object(&mut self, id: NodeId) -> Result<Mat4, HandleError> {
        Ok(self.world(id)?.world_to_object)
    }

    /// Number of times this node's world transform has been recomputed.
    /// Observers compare it against a stored value to detect movement.
    pub fn revision(&mut self, id: NodeId) -> Result<u64, HandleError> {
        self.resolve(id)?;
        Ok(self.nodes.try_get(id)?.revision)
    }

    /// Total world recomputes performed by this graph
    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }

    /// Recompute every dirty node on the path from the topmost dirty
    /// ancestor down to `id`. A clean node never has a dirty ancestor.
    fn resolve(&mut self, id: NodeId) -> Result<(), HandleError> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(c) = cursor {
            let node = self.nodes.try_get(c)?;
            if !node.dirty {
                break;
            }
            chain.push(c);
            cursor = node.parent;
        }

        for c in chain.into_iter().rev() {
            let parent_world = self
                .nodes
                .try_get(c)?
                .parent
                .and_then(|p| self.nodes.get(p))
                .map(|p| p.world);

            let node = self.nodes.try_get_mut(c)?;
            node.world = match parent_world {
                Some(parent) => WorldTransform::compose(&parent, &node.local),
                None => WorldTransform::from_local(&node.local),
            };
            node.dirty = false;
            node.revision += 1;
            self.recomputes += 1;
        }
        Ok(())
    }
}
