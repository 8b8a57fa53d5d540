use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use thiserror::Error;

slotmap::new_key_type! {
    /// Represents a node somewhere in the container forest.
    pub struct NodeId;
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TreeError {
    #[error("node {0:?} is not part of the tree")]
    Missing(NodeId),
    #[error("node {0:?} has no parent")]
    Detached(NodeId),
    #[error("node {0:?} is already attached under {1:?}")]
    AlreadyAttached(NodeId, NodeId),
    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    Cycle { child: NodeId, parent: NodeId },
    #[error("{child} is not allowed under {parent}")]
    InvalidChild { parent: String, child: String },
}

/// Structure of the container forest.
///
/// Each node owns its ordered list of children (layout order) and a separate
/// recency list of the same children (focus order). Parents are plain ids, so
/// there are no ownership cycles; a node is released by [`NodeMap::remove`]
/// once it has been detached.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct NodeMap {
    map: SlotMap<NodeId, Node>,
}

#[derive(Default, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    focus_order: Vec<NodeId>,
}

impl NodeMap {
    pub fn new() -> NodeMap { NodeMap::default() }

    pub fn len(&self) -> usize { self.map.len() }

    pub fn is_empty(&self) -> bool { self.map.is_empty() }

    pub fn contains(&self, id: NodeId) -> bool { self.map.contains_key(id) }

    /// Creates a node that is not attached anywhere. It acts as a root until
    /// it is attached.
    pub fn mk_node(&mut self) -> NodeId { self.map.insert(Node::default()) }

    /// Inserts `child` into `parent`'s children at `index` (clamped to the end).
    ///
    /// Focus order is left untouched.
    #[track_caller]
    pub fn attach(&mut self, child: NodeId, parent: NodeId, index: usize) -> Result<(), TreeError> {
        let node = self.map.get(child).ok_or(TreeError::Missing(child))?;
        if let Some(existing) = node.parent {
            return Err(TreeError::AlreadyAttached(child, existing));
        }
        if !self.contains(parent) {
            return Err(TreeError::Missing(parent));
        }
        if parent.self_and_ancestors(self).any(|n| n == child) {
            return Err(TreeError::Cycle { child, parent });
        }

        let children = &mut self.map[parent].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.map[child].parent = Some(parent);
        Ok(())
    }

    /// Removes `child` from its parent's children and focus order and clears
    /// its parent link. Returns the former parent.
    #[track_caller]
    pub fn detach(&mut self, child: NodeId) -> Result<NodeId, TreeError> {
        let parent = child.parent(self).ok_or_else(|| {
            if self.contains(child) {
                TreeError::Detached(child)
            } else {
                TreeError::Missing(child)
            }
        })?;
        let parent_node = &mut self.map[parent];
        parent_node.children.retain(|&c| c != child);
        parent_node.focus_order.retain(|&c| c != child);
        self.map[child].parent = None;
        Ok(parent)
    }

    /// Moves `child` to the front of its parent's focus order.
    pub fn record_focus(&mut self, child: NodeId) -> Result<(), TreeError> {
        let parent = child.parent(self).ok_or(TreeError::Detached(child))?;
        let order = &mut self.map[parent].focus_order;
        if order.first() == Some(&child) {
            return Ok(());
        }
        order.retain(|&c| c != child);
        order.insert(0, child);
        Ok(())
    }

    /// Releases an unattached node and everything below it. Returns the
    /// released ids in pre-order.
    #[track_caller]
    pub fn remove(&mut self, root: NodeId) -> Result<Vec<NodeId>, TreeError> {
        if let Some(parent) = root.parent(self) {
            return Err(TreeError::AlreadyAttached(root, parent));
        }
        if !self.contains(root) {
            return Err(TreeError::Missing(root));
        }
        let removed: Vec<_> = root.traverse_preorder(self).collect();
        for &id in &removed {
            self.map.remove(id);
        }
        Ok(removed)
    }

    fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.map.get(id).map(|n| n.children.as_slice()).unwrap_or_default()
    }

    fn focus_order_of(&self, id: NodeId) -> &[NodeId] {
        self.map.get(id).map(|n| n.focus_order.as_slice()).unwrap_or_default()
    }
}

impl NodeId {
    pub fn parent(self, map: &NodeMap) -> Option<NodeId> { map.map.get(self).and_then(|n| n.parent) }

    pub fn children(
        self,
        map: &NodeMap,
    ) -> impl DoubleEndedIterator<Item = NodeId> + ExactSizeIterator + '_ {
        map.children_of(self).iter().copied()
    }

    pub fn has_children(self, map: &NodeMap) -> bool { !map.children_of(self).is_empty() }

    /// Children ordered by how recently they were focused, most recent first.
    pub fn focus_order(
        self,
        map: &NodeMap,
    ) -> impl DoubleEndedIterator<Item = NodeId> + ExactSizeIterator + '_ {
        map.focus_order_of(self).iter().copied()
    }

    /// Position among the parent's children. `None` for roots.
    pub fn index(self, map: &NodeMap) -> Option<usize> {
        let parent = self.parent(map)?;
        map.children_of(parent).iter().position(|&c| c == self)
    }

    /// Position in the parent's focus order. `None` for roots and for
    /// children that were never focused.
    pub fn focus_index(self, map: &NodeMap) -> Option<usize> {
        let parent = self.parent(map)?;
        map.focus_order_of(parent).iter().position(|&c| c == self)
    }

    /// The parent's children, including this node. A root is its own only
    /// sibling.
    pub fn self_and_siblings(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        let parent = self.parent(map);
        let siblings = parent.map(|p| map.children_of(p)).unwrap_or_default();
        siblings.iter().copied().chain(parent.is_none().then_some(self))
    }

    pub fn siblings(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        self.self_and_siblings(map).filter(move |&n| n != self)
    }

    pub fn has_siblings(self, map: &NodeMap) -> bool { self.siblings(map).next().is_some() }

    pub fn next_sibling(self, map: &NodeMap) -> Option<NodeId> {
        let index = self.index(map)?;
        map.children_of(self.parent(map)?).get(index + 1).copied()
    }

    pub fn prev_sibling(self, map: &NodeMap) -> Option<NodeId> {
        let index = self.index(map)?.checked_sub(1)?;
        map.children_of(self.parent(map)?).get(index).copied()
    }

    /// Returns an iterator over all ancestors of the current node, including itself.
    pub fn self_and_ancestors(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        let mut next = map.contains(self).then_some(self);
        std::iter::from_fn(move || {
            let node = next?;
            next = node.parent(map);
            Some(node)
        })
    }

    pub fn ancestors(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        self.self_and_ancestors(map).skip(1)
    }

    /// Self first, then each child's subtree in layout order.
    pub fn traverse_preorder(self, map: &NodeMap) -> PreorderTraversal<'_> {
        PreorderTraversal::new(map, self)
    }

    pub fn last_focused_child(self, map: &NodeMap) -> Option<NodeId> {
        map.focus_order_of(self).first().copied()
    }

    /// Follows the last focused child downwards until a node with no focus
    /// history is reached.
    pub fn last_focused_descendant(self, map: &NodeMap) -> Option<NodeId> {
        let mut node = self.last_focused_child(map)?;
        while let Some(child) = node.last_focused_child(map) {
            node = child;
        }
        Some(node)
    }
}

/// Lazy pre-order walk driven by an explicit stack.
#[derive(Clone)]
pub struct PreorderTraversal<'a> {
    stack: Vec<NodeId>,
    map: &'a NodeMap,
}

impl<'a> PreorderTraversal<'a> {
    fn new(map: &'a NodeMap, root: NodeId) -> Self {
        let stack = if map.contains(root) { vec![root] } else { vec![] };
        Self { stack, map }
    }
}

impl<'a> Iterator for PreorderTraversal<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children(self.map).rev());
        Some(node)
    }
}
