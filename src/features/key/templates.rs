//! Krumhansl-Schmuckler key templates
//!
//! Tonal profiles rooted at C. Other tonics are matched by rotating the
//! chroma vector rather than the template.

use crate::analysis::result::Mode;

/// Major-key profile, index 0 = tonic
pub const MAJOR_PROFILE: [f32; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Minor-key profile, index 0 = tonic
pub const MINOR_PROFILE: [f32; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Major and minor reference profiles
#[derive(Debug, Clone, PartialEq)]
pub struct KeyTemplates {
    /// Major profile rooted at C
    pub major: [f32; 12],

    /// Minor profile rooted at C
    pub minor: [f32; 12],
}

impl KeyTemplates {
    /// Krumhansl-Schmuckler profiles
    pub fn new() -> Self {
        Self::with_profiles(MAJOR_PROFILE, MINOR_PROFILE)
    }

    /// Custom profiles rooted at C
    pub fn with_profiles(major: [f32; 12], minor: [f32; 12]) -> Self {
        Self { major, minor }
    }

    /// Profile for `mode`
    pub fn profile(&self, mode: Mode) -> &[f32; 12] {
        match mode {
            Mode::Major => &self.major,
            Mode::Minor => &self.minor,
        }
    }
}

impl Default for KeyTemplates {
    fn default() -> Self {
        Self::new()
    }
}
