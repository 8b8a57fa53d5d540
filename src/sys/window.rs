//! Boundary to the host's window system.
//!
//! The layout core never touches real windows. It hands computed frames to a
//! [`WindowService`], which the host implements on top of its native APIs.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use super::geometry::Rect;
use crate::common::collections::HashMap;

/// Opaque handle to a window owned by the host platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WindowHandle(pub u64);

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WindowServiceError {
    #[error("window {0:?} no longer exists")]
    Gone(WindowHandle),
    #[error("platform refused to move window {0:?}: {1}")]
    Platform(WindowHandle, String),
}

pub trait WindowService {
    /// Moves and resizes the real window. Must be idempotent.
    fn set_frame(&mut self, handle: WindowHandle, frame: Rect) -> Result<(), WindowServiceError>;

    fn frame(&self, handle: WindowHandle) -> Option<Rect>;
}

/// Window service that only remembers the frames it was asked to apply.
///
/// Clones share the same record, so a caller can keep one clone and inspect
/// what the core applied through the other.
#[derive(Clone, Default)]
pub struct RecordingWindowService {
    frames: Rc<RefCell<HashMap<WindowHandle, Rect>>>,
    closed: Rc<RefCell<Vec<WindowHandle>>>,
}

impl RecordingWindowService {
    pub fn new() -> Self { Self::default() }

    /// Makes later `set_frame` calls for `handle` fail as if the window had
    /// been destroyed behind our back.
    pub fn close(&self, handle: WindowHandle) {
        self.frames.borrow_mut().remove(&handle);
        self.closed.borrow_mut().push(handle);
    }

    pub fn frames(&self) -> Vec<(WindowHandle, Rect)> {
        let mut frames: Vec<_> = self.frames.borrow().iter().map(|(h, r)| (*h, *r)).collect();
        frames.sort_by_key(|(handle, _)| *handle);
        frames
    }
}

impl WindowService for RecordingWindowService {
    fn set_frame(&mut self, handle: WindowHandle, frame: Rect) -> Result<(), WindowServiceError> {
        if self.closed.borrow().contains(&handle) {
            debug!(?handle, "refusing to move closed window");
            return Err(WindowServiceError::Gone(handle));
        }
        trace!(?handle, ?frame, "set_frame");
        self.frames.borrow_mut().insert(handle, frame);
        Ok(())
    }

    fn frame(&self, handle: WindowHandle) -> Option<Rect> { self.frames.borrow().get(&handle).copied() }
}
