use tracing::{debug, trace};

use super::command::{DetachContainer, FocusContainer};
use crate::actor::bus::{Bus, Event};
use crate::actor::reactor::{ReactorError, WmState};
use crate::layout_engine::WindowFrame;
use crate::model::tree::NodeId;
use crate::sys::window::WindowHandle;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FocusChanged {
    pub container: NodeId,
}

/// Geometry was recomputed below `containers`; `frames` holds the new frame
/// of every window in those subtrees.
#[derive(Clone, Debug, PartialEq)]
pub struct ContainersRedrawn {
    pub containers: Vec<NodeId>,
    pub frames: Vec<WindowFrame>,
}

/// The host reports that a window went away.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowClosed {
    pub handle: WindowHandle,
}

/// The host reports that a window received focus outside of our control.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowFocused {
    pub handle: WindowHandle,
}

impl Event for FocusChanged {}
impl Event for ContainersRedrawn {}
impl Event for WindowClosed {}
impl Event for WindowFocused {}

pub fn register(bus: &mut Bus<WmState>) {
    bus.subscribe(WindowEventHandler::handle_containers_redrawn);
    bus.subscribe(WindowEventHandler::handle_window_closed);
    bus.subscribe(WindowEventHandler::handle_window_focused);
}

pub struct WindowEventHandler;

impl WindowEventHandler {
    /// Pushes every frame to the window service. A failing window does not
    /// keep the remaining ones from being moved; the first failure is
    /// reported.
    pub fn handle_containers_redrawn(
        _: &Bus<WmState>,
        state: &mut WmState,
        event: &ContainersRedrawn,
    ) -> Result<(), ReactorError> {
        let mut first_error = None;
        for frame in &event.frames {
            trace!(handle = ?frame.handle, rect = ?frame.frame, "set_frame");
            if let Err(e) = state.window_service.set_frame(frame.handle, frame.frame) {
                debug!(handle = ?frame.handle, %e, "could not apply frame");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    pub fn handle_window_closed(
        bus: &Bus<WmState>,
        state: &mut WmState,
        event: &WindowClosed,
    ) -> Result<(), ReactorError> {
        let Some(container) = state.tree.find_window(event.handle) else {
            debug!(handle = ?event.handle, "closed window was not managed");
            return Ok(());
        };
        bus.dispatch(state, DetachContainer { container })?;
        Ok(())
    }

    pub fn handle_window_focused(
        bus: &Bus<WmState>,
        state: &mut WmState,
        event: &WindowFocused,
    ) -> Result<(), ReactorError> {
        let Some(container) = state.tree.find_window(event.handle) else {
            debug!(handle = ?event.handle, "focused window is not managed");
            return Ok(());
        };
        bus.dispatch(state, FocusContainer { container })?;
        Ok(())
    }
}
