//! Key drift tracking
//!
//! The first confident detection of a session becomes the established key.
//! Every later detection is compared against it on the circle of semitones:
//!
//! | Distance | Classification |
//! |----------|----------------|
//! | 0        | in key, no message |
//! | 1-2      | slight drift |
//! | 3-4      | off-key, with a direction and a "tune to" hint |
//! | 5+       | key change |
//!
//! Parallel keys (same tonic, other mode) count as distance 1. Relative keys
//! (tonics three semitones apart, other mode) count as distance 0.

use super::detector::KeyEstimate;
use crate::analysis::result::{Mode, PitchClass};
use crate::config::EngineConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of the shorter path around the pitch-class circle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriftDirection {
    Up,
    Down,
}

impl fmt::Display for DriftDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriftDirection::Up => f.write_str("up"),
            DriftDirection::Down => f.write_str("down"),
        }
    }
}

/// Classified drift of a detection relative to the established key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriftMessage {
    /// Distance 1-2
    SlightDrift,
    /// Distance 3-4
    OffKey {
        direction: DriftDirection,
        tune_to: PitchClass,
        tune_to_mode: Mode,
    },
    /// Distance 5 or more
    KeyChange { key: PitchClass, mode: Mode },
}

impl fmt::Display for DriftMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriftMessage::SlightDrift => f.write_str("Slight drift"),
            DriftMessage::OffKey {
                direction,
                tune_to,
                tune_to_mode,
            } => write!(f, "Off-key ({}), tune to {} {}", direction, tune_to, tune_to_mode),
            DriftMessage::KeyChange { key, mode } => write!(f, "Key change: {} {}", key, mode),
        }
    }
}

/// Drift of the latest detection
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DriftState {
    /// Adjusted circular distance to the established key (0-6)
    pub magnitude: u8,
    /// Classification, absent when in key
    pub message: Option<DriftMessage>,
}

/// Circular semitone distance between two keys, with mode adjustments
///
/// # Example
///
/// ```
/// use stratum_live::features::key::drift::key_distance;
/// use stratum_live::{Mode, PitchClass};
///
/// // Relative keys are treated as the same key
/// assert_eq!(key_distance((PitchClass::C, Mode::Major), (PitchClass::A, Mode::Minor)), 0);
/// // Parallel keys are close but not identical
/// assert_eq!(key_distance((PitchClass::C, Mode::Major), (PitchClass::C, Mode::Minor)), 1);
/// ```
pub fn key_distance(a: (PitchClass, Mode), b: (PitchClass, Mode)) -> u8 {
    let diff = (a.0.index() as i32 - b.0.index() as i32).unsigned_abs() as u8;
    let d = if diff > 6 { 12 - diff } else { diff };
    if a.1 != b.1 {
        match d {
            0 => return 1,
            3 => return 0,
            _ => {}
        }
    }
    d
}

/// Which way the shorter path from `from` to `to` runs
///
/// A tritone (6 semitones either way) counts as `Up`.
pub fn drift_direction(from: PitchClass, to: PitchClass) -> DriftDirection {
    let steps = (to.index() as i32 - from.index() as i32).rem_euclid(12);
    if steps <= 6 {
        DriftDirection::Up
    } else {
        DriftDirection::Down
    }
}

/// Established key and drift for one session
#[derive(Debug, Clone)]
pub struct DriftTracker {
    establish_confidence: u8,
    established: Option<(PitchClass, Mode)>,
    state: DriftState,
}

impl DriftTracker {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            establish_confidence: config.establish_confidence,
            established: None,
            state: DriftState::default(),
        }
    }

    /// Compare a new detection with the established key
    pub fn observe(&mut self, estimate: &KeyEstimate) -> &DriftState {
        let detected = (estimate.key, estimate.mode);

        let established = match self.established {
            Some(established) => established,
            None if estimate.confidence > self.establish_confidence => {
                log::debug!(
                    "Established key {} {} (confidence {})",
                    estimate.key,
                    estimate.mode,
                    estimate.confidence
                );
                self.established = Some(detected);
                detected
            }
            None => {
                self.state = DriftState::default();
                return &self.state;
            }
        };

        let magnitude = key_distance(detected, established);
        let message = match magnitude {
            0 => None,
            1..=2 => Some(DriftMessage::SlightDrift),
            3..=4 => Some(DriftMessage::OffKey {
                direction: drift_direction(established.0, detected.0),
                tune_to: established.0,
                tune_to_mode: established.1,
            }),
            _ => Some(DriftMessage::KeyChange {
                key: detected.0,
                mode: detected.1,
            }),
        };

        if let Some(msg) = &message {
            log::debug!("Drift {} from {} {}: {}", magnitude, established.0, established.1, msg);
        }

        self.state = DriftState { magnitude, message };
        &self.state
    }

    /// The established key, once a detection was confident enough
    pub fn established(&self) -> Option<(PitchClass, Mode)> {
        self.established
    }

    pub fn state(&self) -> &DriftState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.established = None;
        self.state = DriftState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimate(key: PitchClass, mode: Mode, confidence: u8) -> KeyEstimate {
        KeyEstimate {
            key,
            mode,
            confidence,
            correlation: confidence as f32 / 50.0 - 1.0,
            second_key: key.transpose(7),
            second_mode: mode,
            second_confidence: confidence.saturating_sub(5),
        }
    }

    fn tracker() -> DriftTracker {
        DriftTracker::new(&EngineConfig::default())
    }

    #[test]
    fn test_key_distance_is_circular() {
        use Mode::Major;
        assert_eq!(key_distance((PitchClass::C, Major), (PitchClass::B, Major)), 1);
        assert_eq!(key_distance((PitchClass::C, Major), (PitchClass::FSharp, Major)), 6);
        assert_eq!(key_distance((PitchClass::D, Major), (PitchClass::ASharp, Major)), 4);
    }

    #[test]
    fn test_key_distance_mode_overrides() {
        // Different modes 3 apart: relative keys in either direction
        assert_eq!(
            key_distance((PitchClass::A, Mode::Minor), (PitchClass::C, Mode::Major)),
            0
        );
        // Different modes, other distances are unchanged
        assert_eq!(
            key_distance((PitchClass::D, Mode::Minor), (PitchClass::C, Mode::Major)),
            2
        );
    }

    #[test]
    fn test_drift_direction() {
        assert_eq!(drift_direction(PitchClass::C, PitchClass::DSharp), DriftDirection::Up);
        assert_eq!(drift_direction(PitchClass::C, PitchClass::A), DriftDirection::Down);
        assert_eq!(drift_direction(PitchClass::A, PitchClass::C), DriftDirection::Up);
        assert_eq!(drift_direction(PitchClass::C, PitchClass::FSharp), DriftDirection::Up);
    }

    #[test]
    fn test_low_confidence_does_not_establish() {
        let mut t = tracker();
        let state = t.observe(&estimate(PitchClass::C, Mode::Major, 60)).clone();
        assert!(t.established().is_none());
        assert_eq!(state, DriftState::default());
    }

    #[test]
    fn test_establishes_once() {
        let mut t = tracker();
        t.observe(&estimate(PitchClass::C, Mode::Major, 61));
        assert_eq!(t.established(), Some((PitchClass::C, Mode::Major)));
        assert_eq!(t.state().magnitude, 0);
        assert!(t.state().message.is_none());

        // A later, more confident estimate does not replace it
        t.observe(&estimate(PitchClass::G, Mode::Major, 99));
        assert_eq!(t.established(), Some((PitchClass::C, Mode::Major)));
        assert_eq!(t.state().magnitude, 5);
    }

    #[test]
    fn test_classification_bands() {
        let mut t = tracker();
        t.observe(&estimate(PitchClass::C, Mode::Major, 90));

        let slight = t.observe(&estimate(PitchClass::D, Mode::Major, 70)).clone();
        assert_eq!(slight.magnitude, 2);
        assert_eq!(slight.message, Some(DriftMessage::SlightDrift));

        let off = t.observe(&estimate(PitchClass::DSharp, Mode::Major, 70)).clone();
        assert_eq!(off.magnitude, 3);
        assert_eq!(
            off.message,
            Some(DriftMessage::OffKey {
                direction: DriftDirection::Up,
                tune_to: PitchClass::C,
                tune_to_mode: Mode::Major,
            })
        );

        let down = t.observe(&estimate(PitchClass::GSharp, Mode::Major, 70)).clone();
        assert_eq!(down.magnitude, 4);
        assert!(matches!(
            down.message,
            Some(DriftMessage::OffKey {
                direction: DriftDirection::Down,
                ..
            })
        ));

        let change = t.observe(&estimate(PitchClass::F, Mode::Minor, 70)).clone();
        assert_eq!(change.magnitude, 5);
        assert_eq!(
            change.message,
            Some(DriftMessage::KeyChange {
                key: PitchClass::F,
                mode: Mode::Minor
            })
        );

        let back = t.observe(&estimate(PitchClass::A, Mode::Minor, 70)).clone();
        assert_eq!(back.magnitude, 0);
        assert!(back.message.is_none());
    }

    #[test]
    fn test_message_text() {
        let msg = DriftMessage::OffKey {
            direction: DriftDirection::Down,
            tune_to: PitchClass::G,
            tune_to_mode: Mode::Minor,
        };
        assert_eq!(msg.to_string(), "Off-key (down), tune to G Minor");
        assert_eq!(
            DriftMessage::KeyChange {
                key: PitchClass::E,
                mode: Mode::Major
            }
            .to_string(),
            "Key change: E Major"
        );
    }

    #[test]
    fn test_reset() {
        let mut t = tracker();
        t.observe(&estimate(PitchClass::C, Mode::Major, 90));
        t.reset();
        assert!(t.established().is_none());
    }
}
