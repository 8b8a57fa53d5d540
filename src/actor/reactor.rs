//! Owner of the layout state and the bus that mutates it.

mod error;
pub mod events;

#[cfg(test)]
mod tests;

use std::path::Path;

use anyhow::Context;
pub use error::ReactorError;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::actor::bus::{Bus, BusError, Command, CommandResponse, Event};
use crate::common::config::LayoutSettings;
use crate::layout_engine::RedrawSet;
use crate::model::container::{ContainerTree, ContainerType};
use crate::model::tree::NodeId;
use crate::sys::geometry::Rect;
use crate::sys::window::{WindowHandle, WindowService};

pub use events::command::{
    AttachWindow, DetachContainer, FocusContainer, RedrawContainers, ResizeFocusedWindow,
};
pub use events::window::{ContainersRedrawn, FocusChanged, WindowClosed, WindowFocused};

/// Everything handlers are allowed to touch.
pub struct WmState {
    pub tree: ContainerTree,
    pub focused: Option<NodeId>,
    pub settings: LayoutSettings,
    pub window_service: Box<dyn WindowService>,
}

impl WmState {
    pub fn new(settings: LayoutSettings, window_service: Box<dyn WindowService>) -> Self {
        WmState {
            tree: ContainerTree::new(),
            focused: None,
            settings,
            window_service,
        }
    }

    /// Adds a monitor with one workspace per name, each tiling along the
    /// configured default layout.
    pub fn add_monitor(
        &mut self,
        name: &str,
        rect: Rect,
        workspaces: &[String],
    ) -> Result<NodeId, ReactorError> {
        let monitor = self.tree.insert_monitor(name, rect);
        for workspace in workspaces {
            self.add_workspace(monitor, workspace)?;
        }
        Ok(monitor)
    }

    pub fn add_workspace(&mut self, monitor: NodeId, name: &str) -> Result<NodeId, ReactorError> {
        let layout = self.settings.default_layout;
        Ok(self.tree.insert_workspace(monitor, name, layout)?)
    }

    pub fn focused_window(&self) -> Option<WindowHandle> {
        self.tree.kind(self.focused?)?.window_handle()
    }

    /// Workspace holding the focused container, or else the most recently
    /// focused workspace of the first monitor, or else its first workspace.
    pub fn active_workspace(&self) -> Option<NodeId> {
        let map = self.tree.map();
        if let Some(focused) = self.focused {
            let workspace = focused
                .self_and_ancestors(map)
                .find(|&n| self.tree.ty(n) == Some(ContainerType::Workspace));
            if workspace.is_some() {
                return workspace;
            }
        }
        let monitor = *self.tree.monitors().first()?;
        monitor.last_focused_child(map).or_else(|| monitor.children(map).next())
    }
}

/// Serializable part of [`WmState`], stored between runs.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    pub tree: ContainerTree,
    pub focused: Option<NodeId>,
}

impl LayoutSnapshot {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading layout {}", path.display()))?;
        Ok(ron::from_str(&buf)?)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let buf = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        std::fs::write(path, buf)?;
        Ok(())
    }
}

pub struct Reactor {
    bus: Bus<WmState>,
    state: WmState,
}

impl Reactor {
    pub fn new(state: WmState) -> Self {
        let mut bus = Bus::new();
        events::register(&mut bus);
        Reactor { bus, state }
    }

    pub fn restore(
        snapshot: LayoutSnapshot,
        settings: LayoutSettings,
        window_service: Box<dyn WindowService>,
    ) -> Self {
        let mut state = WmState::new(settings, window_service);
        state.tree = snapshot.tree;
        state.focused = snapshot.focused.filter(|&f| state.tree.contains(f));
        Self::new(state)
    }

    pub fn state(&self) -> &WmState { &self.state }

    pub fn state_mut(&mut self) -> &mut WmState { &mut self.state }

    /// Lets hosts subscribe to events on top of the built-in wiring.
    pub fn bus_mut(&mut self) -> &mut Bus<WmState> { &mut self.bus }

    pub fn dispatch<C: Command>(&mut self, command: C) -> Result<CommandResponse, BusError> {
        let result = self.bus.dispatch(&mut self.state, command);
        if let Err(e) = &result {
            error!("{e}");
        }
        result
    }

    pub fn publish<E: Event>(&mut self, event: E) -> Result<(), BusError> {
        let result = self.bus.publish(&mut self.state, event);
        if let Err(e) = &result {
            error!("{e}");
        }
        result
    }

    /// Recomputes and applies geometry for every monitor.
    pub fn redraw_all(&mut self) -> Result<CommandResponse, BusError> {
        let mut containers = RedrawSet::default();
        for &monitor in self.state.tree.monitors() {
            containers.insert(monitor);
        }
        info!(monitors = containers.len(), "redrawing everything");
        self.dispatch(RedrawContainers { containers })
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            tree: self.state.tree.clone(),
            focused: self.state.focused,
        }
    }
}
