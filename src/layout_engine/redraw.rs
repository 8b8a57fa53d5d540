use serde::{Deserialize, Serialize};
use tracing::trace;

use super::Orientation;
use crate::model::container::{ContainerKind, ContainerTree, ContainerType};
use crate::model::tree::{NodeId, TreeError};
use crate::sys::geometry::Rect;
use crate::sys::window::WindowHandle;

/// Containers whose subtree geometry has to be recomputed after a mutation.
///
/// Insertion order is kept so redraws are applied deterministically.
#[derive(Default, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RedrawSet(Vec<NodeId>);

impl RedrawSet {
    pub fn single(id: NodeId) -> Self { RedrawSet(vec![id]) }

    pub fn insert(&mut self, id: NodeId) -> bool {
        if self.0.contains(&id) {
            return false;
        }
        self.0.push(id);
        true
    }

    pub fn contains(&self, id: NodeId) -> bool { self.0.contains(&id) }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ { self.0.iter().copied() }

    /// Drops entries that no longer exist and entries covered by an ancestor
    /// that is also in the set.
    pub fn roots(&self, tree: &ContainerTree) -> Vec<NodeId> {
        self.iter()
            .filter(|&id| tree.contains(id))
            .filter(|&id| !id.ancestors(tree.map()).any(|a| self.contains(a)))
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowFrame {
    pub container: NodeId,
    pub handle: WindowHandle,
    pub frame: Rect,
}

/// Recomputes frames below `root` from its current rect and returns the
/// resulting frames of every window in the subtree, in layout order.
///
/// Workspaces fill their monitor. Workspaces and splits divide their rect
/// along their layout axis by size percentage; the orthogonal extent is
/// inherited whole.
pub fn apply_layout(tree: &mut ContainerTree, root: NodeId) -> Result<Vec<WindowFrame>, TreeError> {
    if tree.ty(root) == Some(ContainerType::Workspace) {
        let monitor = root.parent(tree.map()).ok_or(TreeError::Detached(root))?;
        let rect = tree.container(monitor)?.rect;
        tree.set_rect(root, rect)?;
    }

    let mut frames = vec![];
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let container = tree.container(node)?;
        let rect = container.rect;
        if let ContainerKind::Window { handle, .. } = container.kind {
            frames.push(WindowFrame { container: node, handle, frame: rect });
            continue;
        }

        let children: Vec<_> = node.children(tree.map()).collect();
        let child_rects = match container.kind.layout() {
            Some(layout) => {
                let shares = children
                    .iter()
                    .map(|&c| tree.size_percentage(c).ok_or(TreeError::Missing(c)))
                    .collect::<Result<Vec<_>, _>>()?;
                split_rect(rect, layout, &shares)
            }
            None => vec![rect; children.len()],
        };
        for (&child, child_rect) in children.iter().zip(child_rects) {
            trace!(?child, ?child_rect, "layout");
            tree.set_rect(child, child_rect)?;
        }
        stack.extend(children.into_iter().rev());
    }
    Ok(frames)
}

/// Divides `rect` along `orientation` by `shares`.
///
/// Edges are rounded from the cumulative share so the pieces tile `rect`
/// exactly and the last piece absorbs rounding.
pub fn split_rect(rect: Rect, orientation: Orientation, shares: &[f64]) -> Vec<Rect> {
    let extent = match orientation {
        Orientation::Horizontal => rect.width,
        Orientation::Vertical => rect.height,
    };
    let mut out = Vec::with_capacity(shares.len());
    let mut cumulative = 0.0;
    let mut start = 0;
    for (i, share) in shares.iter().enumerate() {
        cumulative += share;
        let end = if i + 1 == shares.len() {
            extent
        } else {
            ((f64::from(extent) * cumulative).round() as i32).clamp(start, extent)
        };
        let piece = match orientation {
            Orientation::Horizontal => Rect::new(rect.x + start, rect.y, end - start, rect.height),
            Orientation::Vertical => Rect::new(rect.x, rect.y + start, rect.width, end - start),
        };
        out.push(piece);
        start = end;
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn split_rect_tiles_exactly() {
        let rect = Rect::new(10, 20, 1001, 500);
        let pieces = split_rect(rect, Orientation::Horizontal, &[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]);
        assert_eq!(
            vec![
                Rect::new(10, 20, 334, 500),
                Rect::new(344, 20, 333, 500),
                Rect::new(677, 20, 334, 500),
            ],
            pieces
        );
        assert_eq!(rect.width, pieces.iter().map(|r| r.width).sum::<i32>());
    }

    #[test]
    fn split_rect_vertical() {
        let pieces = split_rect(Rect::new(0, 0, 1920, 1080), Orientation::Vertical, &[0.55, 0.45]);
        assert_eq!(vec![Rect::new(0, 0, 1920, 594), Rect::new(0, 594, 1920, 486)], pieces);
    }

    #[test]
    fn split_rect_empty() {
        assert!(split_rect(Rect::new(0, 0, 10, 10), Orientation::Vertical, &[]).is_empty());
    }

    #[test]
    fn redraw_set_dedupes_and_collapses_to_roots() {
        let mut tree = ContainerTree::new();
        let monitor = tree.insert_monitor("m", Rect::new(0, 0, 100, 100));
        let ws = tree.insert_workspace(monitor, "1", Orientation::Horizontal).unwrap();
        let split = tree.insert_split(ws, 0, Orientation::Vertical, 1.0).unwrap();
        let gone = tree.insert_window(split, 0, WindowHandle(1), 1.0).unwrap();
        tree.remove(gone).unwrap();

        let mut set = RedrawSet::single(split);
        assert!(!set.insert(split));
        set.insert(gone);
        set.insert(ws);
        assert_eq!(3, set.len());
        assert_eq!(vec![ws], set.roots(&tree));
    }

    #[test]
    fn workspace_root_takes_its_monitor_rect() {
        let mut tree = ContainerTree::new();
        let monitor = tree.insert_monitor("m", Rect::new(0, 0, 100, 100));
        let ws = tree.insert_workspace(monitor, "1", Orientation::Horizontal).unwrap();
        assert_eq!(Some(Rect::new(0, 0, 100, 100)), tree.rect(ws));
        let w = tree.insert_window(ws, 0, WindowHandle(1), 1.0).unwrap();

        tree.set_rect(monitor, Rect::new(100, 0, 640, 480)).unwrap();
        let frames = apply_layout(&mut tree, ws).unwrap();
        assert_eq!(
            vec![WindowFrame { container: w, handle: WindowHandle(1), frame: Rect::new(100, 0, 640, 480) }],
            frames
        );
    }
}
