pub(crate) mod graph;
pub mod rebalance;
pub mod redraw;
pub mod resize;

pub use graph::{Orientation, ResizeDirection};
pub use rebalance::{Removal, attach_window, detach_container};
pub use redraw::{RedrawSet, WindowFrame, apply_layout};
pub use resize::resize_focused;
