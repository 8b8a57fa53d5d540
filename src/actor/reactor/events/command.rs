use tracing::{debug, info, warn};

use crate::actor::bus::{Bus, BusError, Command, CommandResponse};
use crate::actor::reactor::events::window::{ContainersRedrawn, FocusChanged};
use crate::actor::reactor::{ReactorError, WmState};
use crate::layout_engine::{
    RedrawSet, ResizeDirection, apply_layout, attach_window, detach_container, resize_focused,
};
use crate::model::container::ContainerType;
use crate::model::tree::NodeId;
use crate::sys::window::WindowHandle;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResizeFocusedWindow {
    pub direction: ResizeDirection,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FocusContainer {
    pub container: NodeId,
}

/// Starts managing `handle` as a new tiled window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttachWindow {
    pub handle: WindowHandle,
    /// Workspace or split to insert into.
    pub parent: NodeId,
    /// Position among the parent's children; clamped to the end.
    pub index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetachContainer {
    pub container: NodeId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RedrawContainers {
    pub containers: RedrawSet,
}

impl Command for ResizeFocusedWindow {}
impl Command for FocusContainer {}
impl Command for AttachWindow {}
impl Command for DetachContainer {}
impl Command for RedrawContainers {}

pub fn register(bus: &mut Bus<WmState>) {
    bus.handle(CommandEventHandler::handle_resize_focused_window);
    bus.handle(CommandEventHandler::handle_focus_container);
    bus.handle(CommandEventHandler::handle_attach_window);
    bus.handle(CommandEventHandler::handle_detach_container);
    bus.handle(CommandEventHandler::handle_redraw_containers);
}

pub struct CommandEventHandler;

impl CommandEventHandler {
    pub fn handle_resize_focused_window(
        bus: &Bus<WmState>,
        state: &mut WmState,
        cmd: &ResizeFocusedWindow,
    ) -> Result<CommandResponse, ReactorError> {
        let Some(focused) = state.focused else {
            debug!("nothing focused");
            return Ok(CommandResponse::ok());
        };
        let containers = resize_focused(&mut state.tree, focused, cmd.direction, &state.settings)?;
        Self::redraw(bus, state, containers)?;
        Ok(CommandResponse::with_subject(focused))
    }

    pub fn handle_focus_container(
        bus: &Bus<WmState>,
        state: &mut WmState,
        cmd: &FocusContainer,
    ) -> Result<CommandResponse, ReactorError> {
        let container = cmd.container;
        if !state.tree.contains(container) {
            return Err(ReactorError::ContainerNotFound(container));
        }
        if state.focused == Some(container) {
            return Ok(CommandResponse::with_subject(container));
        }

        let chain: Vec<_> = container.self_and_ancestors(state.tree.map()).collect();
        for node in chain {
            if node.parent(state.tree.map()).is_some() {
                state.tree.record_focus(node)?;
            }
        }
        state.focused = Some(container);
        info!(?container, "focus changed");
        bus.publish(state, FocusChanged { container })?;
        Ok(CommandResponse::with_subject(container))
    }

    pub fn handle_attach_window(
        bus: &Bus<WmState>,
        state: &mut WmState,
        cmd: &AttachWindow,
    ) -> Result<CommandResponse, ReactorError> {
        if !state.tree.contains(cmd.parent) {
            return Err(ReactorError::ContainerNotFound(cmd.parent));
        }
        if let Some(existing) = state.tree.find_window(cmd.handle) {
            debug!(handle = ?cmd.handle, ?existing, "window is already managed");
            return Ok(CommandResponse::failed(format!("window {:?} is already managed", cmd.handle)));
        }

        let (window, containers) = attach_window(&mut state.tree, cmd.parent, cmd.index, cmd.handle)?;
        info!(handle = ?cmd.handle, ?window, "attached window");
        if state.focused.is_none() {
            bus.dispatch(state, FocusContainer { container: window })?;
        }
        Self::redraw(bus, state, containers)?;
        Ok(CommandResponse::with_subject(window))
    }

    pub fn handle_detach_container(
        bus: &Bus<WmState>,
        state: &mut WmState,
        cmd: &DetachContainer,
    ) -> Result<CommandResponse, ReactorError> {
        let container = cmd.container;
        if !state.tree.contains(container) {
            return Err(ReactorError::ContainerNotFound(container));
        }
        let map = state.tree.map();
        let lost_focus = state
            .focused
            .is_some_and(|f| f.self_and_ancestors(map).any(|n| n == container));

        let removal = detach_container(&mut state.tree, container)?;
        info!(?container, survivor = ?removal.survivor, "detached container");

        if lost_focus {
            state.focused = None;
            let next = state
                .tree
                .last_focused_descendant_of_type(removal.survivor, ContainerType::Window)
                .unwrap_or(removal.survivor);
            bus.dispatch(state, FocusContainer { container: next })?;
        }
        Self::redraw(bus, state, removal.redraw)?;
        Ok(CommandResponse::with_subject(removal.survivor))
    }

    pub fn handle_redraw_containers(
        bus: &Bus<WmState>,
        state: &mut WmState,
        cmd: &RedrawContainers,
    ) -> Result<CommandResponse, ReactorError> {
        if cmd.containers.is_empty() {
            return Ok(CommandResponse::ok());
        }
        let containers = cmd.containers.roots(&state.tree);
        let mut frames = vec![];
        for &container in &containers {
            frames.extend(apply_layout(&mut state.tree, container)?);
        }
        debug!(?containers, windows = frames.len(), "redrawn");

        match bus.publish(state, ContainersRedrawn { containers, frames }) {
            Ok(()) => Ok(CommandResponse::ok()),
            Err(BusError::Subscribers { failures, .. }) => {
                for failure in &failures {
                    warn!(%failure, "applying frames failed");
                }
                let messages: Vec<_> = failures.iter().map(ToString::to_string).collect();
                Ok(CommandResponse::failed(messages.join("; ")))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn redraw(
        bus: &Bus<WmState>,
        state: &mut WmState,
        containers: RedrawSet,
    ) -> Result<(), ReactorError> {
        if containers.is_empty() {
            return Ok(());
        }
        let response = bus.dispatch(state, RedrawContainers { containers })?;
        if !response.success {
            debug!(error = ?response.error, "redraw was not fully applied");
        }
        Ok(())
    }
}
