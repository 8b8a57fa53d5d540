use thiserror::Error;

use crate::actor::bus::BusError;
use crate::model::tree::{NodeId, TreeError};
use crate::sys::window::{WindowHandle, WindowServiceError};

#[derive(Debug, Error)]
pub enum ReactorError {
    #[error("Container not found: {0:?}")]
    ContainerNotFound(NodeId),
    #[error("Window not found: {0:?}")]
    WindowNotFound(WindowHandle),
    #[error("Layout tree error: {0}")]
    Tree(#[from] TreeError),
    #[error("Nested dispatch failed: {0}")]
    Dispatch(#[from] BusError),
    #[error("Window service error: {0}")]
    WindowService(#[from] WindowServiceError),
    #[error("invalid request: {0}")]
    Invalid(String),
}
