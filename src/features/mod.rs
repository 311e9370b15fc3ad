//! Feature extraction modules
//!
//! Per-frame features computed from the spectral source:
//! - Frame sampling (frequency and time-domain arrays)
//! - Loudness metering (peak and cumulative integrated level)
//! - Chroma accumulation
//! - Key detection and drift tracking

pub mod chroma;
pub mod key;
pub mod loudness;
pub mod sampler;
