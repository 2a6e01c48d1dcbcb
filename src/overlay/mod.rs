//! Playback pose overlay: drawing surface abstraction and renderer

pub mod renderer;
pub mod skeleton;
pub mod surface;

pub use renderer::{DisplayArea, OverlayOptions, OverlayRenderer};
pub use surface::{Color, DrawOp, DrawSurface, RecordingSurface};
