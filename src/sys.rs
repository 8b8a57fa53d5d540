pub mod geometry;
pub mod window;
