use tracing::{debug, trace};

use super::RedrawSet;
use crate::model::container::{ContainerTree, ContainerType};
use crate::model::tree::{NodeId, TreeError};
use crate::sys::geometry::SIZE_EPSILON;
use crate::sys::window::WindowHandle;

/// Inserts a window under `parent` at `index`.
///
/// The new window takes `1/(n+1)` of the parent and the `n` existing children
/// are scaled by `n/(n+1)`, so relative sizes among them are preserved.
pub fn attach_window(
    tree: &mut ContainerTree,
    parent: NodeId,
    index: usize,
    handle: WindowHandle,
) -> Result<(NodeId, RedrawSet), TreeError> {
    let existing: Vec<_> = parent.children(tree.map()).collect();
    let count = existing.len() as f64;
    let share = 1.0 / (count + 1.0);
    let window = tree.insert_window(parent, index, handle, share)?;
    for child in existing {
        let size = tree.size_percentage(child).ok_or(TreeError::Missing(child))?;
        tree.set_size_percentage(child, size * count * share)?;
    }
    trace!(?window, ?parent, share, "attached window");
    Ok((window, RedrawSet::single(parent)))
}

#[derive(Debug, PartialEq)]
pub struct Removal {
    /// Every container released, in pre-order per removed subtree.
    pub removed: Vec<NodeId>,
    /// Closest ancestor of the removed container that is still in the tree.
    pub survivor: NodeId,
    pub redraw: RedrawSet,
}

/// Removes a window or split together with its subtree and restores the
/// sum-to-one invariant in the parent.
///
/// A split that is left empty is removed as well, walking up until a
/// non-empty container or a workspace is reached.
pub fn detach_container(tree: &mut ContainerTree, id: NodeId) -> Result<Removal, TreeError> {
    let ty = tree.ty(id).ok_or(TreeError::Missing(id))?;
    if !matches!(ty, ContainerType::Window | ContainerType::Split) {
        return Err(TreeError::InvalidChild { parent: "detach".into(), child: format!("{ty:?}") });
    }

    let mut survivor = tree.detach(id)?;
    let mut removed = tree.remove(id)?;
    loop {
        let empty = !survivor.has_children(tree.map());
        if !(empty && tree.ty(survivor) == Some(ContainerType::Split)) {
            break;
        }
        debug!(split = ?survivor, "removing empty split");
        let parent = tree.detach(survivor)?;
        removed.extend(tree.remove(survivor)?);
        survivor = parent;
    }
    normalize(tree, survivor)?;

    Ok(Removal {
        removed,
        survivor,
        redraw: RedrawSet::single(survivor),
    })
}

/// Scales the children of `parent` so their sizes sum to one. Children whose
/// sizes sum to zero are given equal shares.
pub fn normalize(tree: &mut ContainerTree, parent: NodeId) -> Result<(), TreeError> {
    let children: Vec<_> = parent.children(tree.map()).collect();
    if children.is_empty() {
        return Ok(());
    }
    let total = tree.children_size_total(parent).ok_or(TreeError::Missing(parent))?;
    let equal = 1.0 / children.len() as f64;
    for child in children {
        let size = tree.size_percentage(child).ok_or(TreeError::Missing(child))?;
        let scaled = if total > SIZE_EPSILON { size / total } else { equal };
        tree.set_size_percentage(child, scaled)?;
    }
    Ok(())
}
