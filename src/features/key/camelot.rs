//! Camelot wheel notation
//!
//! Harmonic-mixing labels: the number (1-12) walks the circle of fifths, the
//! letter is `B` for major and `A` for minor. Relative major/minor keys share
//! a number.

use crate::analysis::result::{Mode, PitchClass};

/// Label used when a key has no wheel position
pub const CAMELOT_PLACEHOLDER: &str = "--";

/// Major keys indexed by pitch class (0 = C)
const CAMELOT_MAJOR: [&str; 12] = [
    "8B", "3B", "10B", "5B", "12B", "7B", "2B", "9B", "4B", "11B", "6B", "1B",
];

/// Minor keys indexed by pitch class (0 = C)
const CAMELOT_MINOR: [&str; 12] = [
    "5A", "12A", "7A", "2A", "9A", "4A", "11A", "6A", "1A", "8A", "3A", "10A",
];

/// Wheel label for a key
///
/// # Example
///
/// ```
/// use stratum_live::features::key::camelot::camelot_label;
/// use stratum_live::{Mode, PitchClass};
///
/// assert_eq!(camelot_label(PitchClass::C, Mode::Major), "8B");
/// assert_eq!(camelot_label(PitchClass::A, Mode::Minor), "8A");
/// ```
pub fn camelot_label(key: PitchClass, mode: Mode) -> &'static str {
    camelot_label_for_index(key.index(), mode)
}

/// Wheel label for a raw pitch-class index; out-of-range indices get the placeholder
pub fn camelot_label_for_index(index: usize, mode: Mode) -> &'static str {
    let table = match mode {
        Mode::Major => &CAMELOT_MAJOR,
        Mode::Minor => &CAMELOT_MINOR,
    };
    table.get(index).copied().unwrap_or(CAMELOT_PLACEHOLDER)
}

/// Key for a wheel label such as "8B" or "11a"
pub fn parse_camelot(label: &str) -> Option<(PitchClass, Mode)> {
    let label = label.trim().to_ascii_uppercase();
    let (mode, table) = if label.ends_with('B') {
        (Mode::Major, &CAMELOT_MAJOR)
    } else if label.ends_with('A') {
        (Mode::Minor, &CAMELOT_MINOR)
    } else {
        return None;
    };
    table
        .iter()
        .position(|&entry| entry == label)
        .map(|index| (PitchClass::from_index(index), mode))
}
