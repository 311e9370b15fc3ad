//! Key detection modules
//!
//! Detect the musical key from the running chroma vector:
//! - Krumhansl-Schmuckler templates
//! - Pearson correlation over all 24 keys
//! - Camelot wheel labels
//! - Drift against the first confidently detected key

pub mod camelot;
pub mod correlation;
pub mod detector;
pub mod drift;
pub mod templates;

pub use camelot::{camelot_label, parse_camelot, CAMELOT_PLACEHOLDER};
pub use correlation::pearson;
pub use detector::{KeyDetector, KeyEstimate};
pub use drift::{drift_direction, key_distance, DriftDirection, DriftMessage, DriftState, DriftTracker};
pub use templates::KeyTemplates;
