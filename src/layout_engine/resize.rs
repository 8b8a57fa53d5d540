use tracing::{debug, trace};

use super::{RedrawSet, ResizeDirection};
use crate::common::config::LayoutSettings;
use crate::model::container::{ContainerTree, ContainerType};
use crate::model::tree::{NodeId, TreeError};
use crate::sys::geometry::SIZE_EPSILON;

/// Grows or shrinks `focused` by the configured resize step.
///
/// When the requested axis matches the parent's layout the window trades size
/// with its siblings; otherwise the parent trades size with its own siblings.
/// Anything that cannot be resized (not a window, no siblings, an orthogonal
/// resize directly under a workspace) is a no-op and yields an empty set.
pub fn resize_focused(
    tree: &mut ContainerTree,
    focused: NodeId,
    direction: ResizeDirection,
    settings: &LayoutSettings,
) -> Result<RedrawSet, TreeError> {
    let mut redraw = RedrawSet::default();
    let ty = tree.ty(focused).ok_or(TreeError::Missing(focused))?;
    if ty != ContainerType::Window {
        debug!(?focused, ?ty, "focused container is not a window");
        return Ok(redraw);
    }

    let map = tree.map();
    let siblings: Vec<_> = focused.siblings(map).collect();
    if siblings.is_empty() {
        debug!(?focused, "focused window has no siblings");
        return Ok(redraw);
    }
    let parent = focused.parent(map).ok_or(TreeError::Detached(focused))?;
    let layout = tree.layout(parent).ok_or(TreeError::Missing(parent))?;

    let (target, others, changed) = if layout == direction.orientation() {
        (focused, siblings, parent)
    } else {
        if tree.size_percentage(parent).is_none() {
            debug!(?parent, ?direction, "no ancestor split can absorb the resize");
            return Ok(redraw);
        }
        let parent_siblings: Vec<_> = parent.siblings(map).collect();
        if parent_siblings.is_empty() {
            debug!(?parent, ?direction, "parent has no siblings");
            return Ok(redraw);
        }
        let grandparent = parent.parent(map).ok_or(TreeError::Detached(parent))?;
        (parent, parent_siblings, grandparent)
    };

    let requested = direction.delta(settings.resize_percentage);
    let min = effective_min(settings.min_size_percentage, others.len() + 1);
    let payments = plan_payments(tree, target, &others, requested, min)?;
    let delta: f64 = payments.iter().sum();
    if delta.abs() <= SIZE_EPSILON {
        debug!(?target, requested, min, "resize would push a container below the minimum size");
        return Ok(redraw);
    }

    trace!(?target, delta, others = others.len(), "resizing");
    let target_size = size_of(tree, target)?;
    tree.set_size_percentage(target, target_size + delta)?;
    for (other, paid) in others.into_iter().zip(payments) {
        let size = size_of(tree, other)?;
        tree.set_size_percentage(other, size - paid)?;
    }
    redraw.insert(changed);
    Ok(redraw)
}

fn size_of(tree: &ContainerTree, id: NodeId) -> Result<f64, TreeError> {
    tree.size_percentage(id).ok_or(TreeError::Missing(id))
}

/// The floor for a resize among `participants` containers. When the
/// configured minimum cannot hold for all of them it drops to half an even
/// share, so crowded parents can still be resized.
fn effective_min(configured: f64, participants: usize) -> f64 {
    configured.min(0.5 / participants as f64)
}

/// Works out how much each of `others` gives up so that `target` changes by
/// up to `requested`. Negative amounts are gains. Neither the target nor any
/// payer ends below `min`; a payer already at the floor pays nothing and the
/// rest cover its part.
fn plan_payments(
    tree: &ContainerTree,
    target: NodeId,
    others: &[NodeId],
    requested: f64,
    min: f64,
) -> Result<Vec<f64>, TreeError> {
    if requested > 0.0 {
        let headroom = others
            .iter()
            .map(|&other| Ok((size_of(tree, other)? - min).max(0.0)))
            .collect::<Result<Vec<_>, TreeError>>()?;
        Ok(fill(requested, &headroom))
    } else {
        let given = requested.abs().min((size_of(tree, target)? - min).max(0.0));
        let share = given / others.len() as f64;
        Ok(vec![-share; others.len()])
    }
}

/// Splits `amount` as evenly as `capacity` allows, smallest capacity first.
fn fill(amount: f64, capacity: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..capacity.len()).collect();
    order.sort_by(|&a, &b| capacity[a].total_cmp(&capacity[b]));
    let mut out = vec![0.0; capacity.len()];
    let mut remaining = amount;
    for (taken, &i) in order.iter().enumerate() {
        let even = remaining / (order.len() - taken) as f64;
        out[i] = capacity[i].min(even);
        remaining -= out[i];
    }
    out
}
