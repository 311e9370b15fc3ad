//! Chroma accumulation
//!
//! Folds the per-frame magnitude spectrum into a slowly evolving 12-element
//! pitch-class energy profile:
//! - Bin mapping and per-frame accumulation
//! - Exponential decay smoothing
//! - Max normalization for template matching

pub mod accumulator;
pub mod normalization;
pub mod smoothing;

pub use accumulator::ChromaAccumulator;

/// Energy per pitch class, index 0 = C
pub type ChromaVector = [f32; 12];
