use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;
use strum_macros::EnumDiscriminants;
use tracing::trace;

use crate::layout_engine::Orientation;
use crate::model::tree::{NodeId, NodeMap, PreorderTraversal, TreeError};
use crate::sys::geometry::Rect;
use crate::sys::window::WindowHandle;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, EnumDiscriminants)]
#[strum_discriminants(name(ContainerType), derive(Hash, Serialize, Deserialize))]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Monitor { name: String },
    Workspace { name: String, layout: Orientation },
    Split { layout: Orientation, size_percentage: f64 },
    Window { handle: WindowHandle, size_percentage: f64 },
}

impl ContainerKind {
    pub fn ty(&self) -> ContainerType { ContainerType::from(self) }

    /// Axis the container tiles its children along, if it tiles at all.
    pub fn layout(&self) -> Option<Orientation> {
        match self {
            ContainerKind::Workspace { layout, .. } | ContainerKind::Split { layout, .. } => {
                Some(*layout)
            }
            ContainerKind::Monitor { .. } | ContainerKind::Window { .. } => None,
        }
    }

    pub fn size_percentage(&self) -> Option<f64> {
        match self {
            ContainerKind::Split { size_percentage, .. }
            | ContainerKind::Window { size_percentage, .. } => Some(*size_percentage),
            ContainerKind::Monitor { .. } | ContainerKind::Workspace { .. } => None,
        }
    }

    fn size_percentage_mut(&mut self) -> Option<&mut f64> {
        match self {
            ContainerKind::Split { size_percentage, .. }
            | ContainerKind::Window { size_percentage, .. } => Some(size_percentage),
            ContainerKind::Monitor { .. } | ContainerKind::Workspace { .. } => None,
        }
    }

    pub fn window_handle(&self) -> Option<WindowHandle> {
        match self {
            ContainerKind::Window { handle, .. } => Some(*handle),
            _ => None,
        }
    }

    fn accepts(&self, child: ContainerType) -> bool {
        use ContainerType::*;
        matches!(
            (self.ty(), child),
            (Monitor, Workspace) | (Workspace | Split, Split | Window)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub kind: ContainerKind,
    /// Last frame computed by the geometry pass.
    #[serde(default)]
    pub rect: Rect,
}

/// The monitor → workspace → split → window forest.
///
/// Structure and focus history live in the [`NodeMap`]; per-container data
/// lives in a secondary map keyed by the same ids.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct ContainerTree {
    map: NodeMap,
    containers: SecondaryMap<NodeId, Container>,
    monitors: Vec<NodeId>,
}

impl ContainerTree {
    pub fn new() -> Self { Self::default() }

    pub fn map(&self) -> &NodeMap { &self.map }

    pub fn contains(&self, id: NodeId) -> bool { self.containers.contains_key(id) }

    pub fn get(&self, id: NodeId) -> Option<&Container> { self.containers.get(id) }

    pub fn container(&self, id: NodeId) -> Result<&Container, TreeError> {
        self.containers.get(id).ok_or(TreeError::Missing(id))
    }

    pub fn kind(&self, id: NodeId) -> Option<&ContainerKind> { self.get(id).map(|c| &c.kind) }

    pub fn ty(&self, id: NodeId) -> Option<ContainerType> { self.kind(id).map(ContainerKind::ty) }

    pub fn layout(&self, id: NodeId) -> Option<Orientation> { self.kind(id)?.layout() }

    pub fn size_percentage(&self, id: NodeId) -> Option<f64> { self.kind(id)?.size_percentage() }

    pub fn rect(&self, id: NodeId) -> Option<Rect> { self.get(id).map(|c| c.rect) }

    pub fn monitors(&self) -> &[NodeId] { &self.monitors }

    pub fn insert_monitor(&mut self, name: impl Into<String>, rect: Rect) -> NodeId {
        let id = self.map.mk_node();
        let kind = ContainerKind::Monitor { name: name.into() };
        self.containers.insert(id, Container { kind, rect });
        self.monitors.push(id);
        id
    }

    pub fn insert_workspace(
        &mut self,
        monitor: NodeId,
        name: impl Into<String>,
        layout: Orientation,
    ) -> Result<NodeId, TreeError> {
        let kind = ContainerKind::Workspace { name: name.into(), layout };
        let id = self.insert(monitor, usize::MAX, kind)?;
        let rect = self.container(monitor)?.rect;
        self.set_rect(id, rect)?;
        Ok(id)
    }

    pub fn insert_split(
        &mut self,
        parent: NodeId,
        index: usize,
        layout: Orientation,
        size_percentage: f64,
    ) -> Result<NodeId, TreeError> {
        self.insert(parent, index, ContainerKind::Split { layout, size_percentage })
    }

    pub fn insert_window(
        &mut self,
        parent: NodeId,
        index: usize,
        handle: WindowHandle,
        size_percentage: f64,
    ) -> Result<NodeId, TreeError> {
        self.insert(parent, index, ContainerKind::Window { handle, size_percentage })
    }

    /// Creates a container under `parent` at `index` (clamped to the end).
    ///
    /// Sibling size percentages are not touched; callers that need the
    /// sum-to-one invariant go through the layout engine.
    pub fn insert(
        &mut self,
        parent: NodeId,
        index: usize,
        kind: ContainerKind,
    ) -> Result<NodeId, TreeError> {
        let parent_kind = self.kind(parent).ok_or(TreeError::Missing(parent))?;
        if !parent_kind.accepts(kind.ty()) {
            return Err(TreeError::InvalidChild {
                parent: format!("{:?}", parent_kind.ty()),
                child: format!("{:?}", kind.ty()),
            });
        }
        let id = self.map.mk_node();
        self.map.attach(id, parent, index)?;
        trace!(?id, ?parent, ?kind, "inserted container");
        self.containers.insert(id, Container { kind, rect: Rect::default() });
        Ok(id)
    }

    pub fn detach(&mut self, id: NodeId) -> Result<NodeId, TreeError> { self.map.detach(id) }

    /// Re-attaches a detached container, enforcing the same parent/child
    /// rules as [`ContainerTree::insert`].
    pub fn attach(&mut self, id: NodeId, parent: NodeId, index: usize) -> Result<(), TreeError> {
        let child = self.ty(id).ok_or(TreeError::Missing(id))?;
        let parent_kind = self.kind(parent).ok_or(TreeError::Missing(parent))?;
        if !parent_kind.accepts(child) {
            return Err(TreeError::InvalidChild {
                parent: format!("{:?}", parent_kind.ty()),
                child: format!("{child:?}"),
            });
        }
        self.map.attach(id, parent, index)
    }

    /// Detaches `id` if needed and releases it together with its subtree.
    pub fn remove(&mut self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        if id.parent(&self.map).is_some() {
            self.map.detach(id)?;
        }
        let removed = self.map.remove(id)?;
        for &node in &removed {
            self.containers.remove(node);
        }
        self.monitors.retain(|&m| m != id);
        Ok(removed)
    }

    pub fn record_focus(&mut self, id: NodeId) -> Result<(), TreeError> { self.map.record_focus(id) }

    pub fn set_size_percentage(&mut self, id: NodeId, value: f64) -> Result<(), TreeError> {
        let container = self.containers.get_mut(id).ok_or(TreeError::Missing(id))?;
        let ty = container.kind.ty();
        match container.kind.size_percentage_mut() {
            Some(size) => {
                *size = value;
                Ok(())
            }
            None => Err(TreeError::InvalidChild {
                parent: "size percentage".into(),
                child: format!("{ty:?}"),
            }),
        }
    }

    pub fn set_rect(&mut self, id: NodeId, rect: Rect) -> Result<(), TreeError> {
        self.containers.get_mut(id).ok_or(TreeError::Missing(id))?.rect = rect;
        Ok(())
    }

    pub fn flatten(&self, id: NodeId) -> PreorderTraversal<'_> { id.traverse_preorder(&self.map) }

    pub fn windows(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.monitors
            .iter()
            .flat_map(|&m| self.flatten(m))
            .filter(|&n| self.ty(n) == Some(ContainerType::Window))
    }

    pub fn find_window(&self, handle: WindowHandle) -> Option<NodeId> {
        self.windows().find(|&n| self.kind(n).and_then(ContainerKind::window_handle) == Some(handle))
    }

    /// Sum of the direct children's size percentages, for containers whose
    /// children carry one.
    pub fn children_size_total(&self, id: NodeId) -> Option<f64> {
        let mut sizes = id.children(&self.map).map(|c| self.size_percentage(c)).peekable();
        sizes.peek()?;
        sizes.sum()
    }

    fn is_type(&self, id: NodeId, ty: ContainerType) -> bool { self.ty(id) == Some(ty) }

    pub fn self_and_siblings_of_type(
        &self,
        id: NodeId,
        ty: ContainerType,
    ) -> impl Iterator<Item = NodeId> + '_ {
        id.self_and_siblings(&self.map).filter(move |&n| self.is_type(n, ty))
    }

    /// First sibling of type `ty` after `id` in layout order.
    pub fn next_sibling_of_type(&self, id: NodeId, ty: ContainerType) -> Option<NodeId> {
        let index = id.index(&self.map)?;
        id.self_and_siblings(&self.map).skip(index + 1).find(|&n| self.is_type(n, ty))
    }

    /// Closest sibling of type `ty` before `id` in layout order.
    pub fn previous_sibling_of_type(&self, id: NodeId, ty: ContainerType) -> Option<NodeId> {
        let parent = id.parent(&self.map)?;
        let index = id.index(&self.map)?;
        parent.children(&self.map).take(index).rev().find(|&n| self.is_type(n, ty))
    }

    /// Depth-first search in focus order for the most recently focused leaf of
    /// type `ty`. Unlike [`NodeId::last_focused_descendant`] this walks past
    /// non-matching branches instead of stopping at them.
    pub fn last_focused_descendant_of_type(&self, id: NodeId, ty: ContainerType) -> Option<NodeId> {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if self.is_type(current, ty) && !current.has_children(&self.map) {
                return Some(current);
            }
            stack.extend(current.focus_order(&self.map).rev());
        }
        None
    }

    pub fn draw_tree(&self, id: NodeId) -> String {
        let tree = self.get_ascii_tree(id);
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = ascii_tree::write_tree(&mut out, &tree);
        out
    }

    fn get_ascii_tree(&self, node: NodeId) -> ascii_tree::Tree {
        let status = match node.parent(&self.map) {
            None => "",
            Some(parent) if parent.last_focused_child(&self.map) == Some(node) => "☒ ",
            _ => "☐ ",
        };
        let desc = match self.get(node) {
            Some(Container { kind, rect }) => {
                let r = format!("{}x{}+{}+{}", rect.width, rect.height, rect.x, rect.y);
                match kind {
                    ContainerKind::Monitor { name } => format!("{status}monitor {name} {r}"),
                    ContainerKind::Workspace { name, layout } => {
                        format!("{status}workspace {name} {layout} {r}")
                    }
                    ContainerKind::Split { layout, size_percentage } => {
                        format!("{status}split {layout} {size_percentage:.3} {r}")
                    }
                    ContainerKind::Window { handle, size_percentage } => {
                        format!("{status}window {} {size_percentage:.3} {r}", handle.0)
                    }
                }
            }
            None => format!("{status}{node:?} <missing>"),
        };
        let children: Vec<_> = node.children(&self.map).map(|c| self.get_ascii_tree(c)).collect();
        if children.is_empty() {
            ascii_tree::Tree::Leaf(vec![desc])
        } else {
            ascii_tree::Tree::Node(desc, children)
        }
    }
}
