//! Renderer-facing outputs
//!
//! - Result types (pitch classes, key overlay, per-frame output)
//! - Display smoothing owned per visualizer instance

pub mod display;
pub mod result;
