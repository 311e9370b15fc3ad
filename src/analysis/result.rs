//! Per-frame output types consumed by the renderer

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pitch class (0 = C, 1 = C#, ..., 11 = B)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PitchClass {
    /// C
    C,
    /// C sharp / D flat
    CSharp,
    /// D
    D,
    /// D sharp / E flat
    DSharp,
    /// E
    E,
    /// F
    F,
    /// F sharp / G flat
    FSharp,
    /// G
    G,
    /// G sharp / A flat
    GSharp,
    /// A
    A,
    /// A sharp / B flat
    ASharp,
    /// B
    B,
}

impl PitchClass {
    /// All twelve pitch classes in ascending order from C
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Pitch class for an index; wraps modulo 12
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 12]
    }

    /// Index in 0..12
    pub fn index(self) -> usize {
        self as usize
    }

    /// Pitch class `semitones` above (or below, if negative) this one
    pub fn transpose(self, semitones: i32) -> Self {
        let idx = (self.index() as i32 + semitones).rem_euclid(12);
        Self::from_index(idx as usize)
    }

    /// Note name using sharps (e.g., "C", "F#")
    ///
    /// # Example
    ///
    /// ```
    /// use stratum_live::PitchClass;
    ///
    /// assert_eq!(PitchClass::C.name(), "C");
    /// assert_eq!(PitchClass::FSharp.name(), "F#");
    /// ```
    pub fn name(self) -> &'static str {
        const NAMES: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];
        NAMES[self.index()]
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tonal mode of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Major (Ionian)
    Major,
    /// Natural minor (Aeolian)
    Minor,
}

impl Mode {
    /// "Major" or "Minor"
    pub fn name(self) -> &'static str {
        match self {
            Mode::Major => "Major",
            Mode::Minor => "Minor",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Loudness values exposed to the renderer, both clamped to [-60, 0] dB
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoudnessOutput {
    /// Smoothed peak level in dB
    pub peak_db: f32,
    /// Session-cumulative integrated loudness in dB
    pub integrated_db: f32,
}

/// Key overlay information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyInfo {
    /// Detected tonic
    pub key: PitchClass,
    /// Detected mode
    pub mode: Mode,
    /// Detection confidence (0-100)
    pub confidence: u8,
    /// Harmonic-mixing wheel label (e.g., "8B")
    pub camelot_label: String,
    /// Mode-adjusted circular distance to the established key (0-6)
    pub drift_magnitude: u8,
    /// Human-readable drift message, absent when in key
    pub drift_message: Option<String>,
    /// Overlay opacity (0.0-1.0)
    pub display_opacity: f32,
}

/// Everything the renderer needs for one display frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameOutput {
    /// Frequency magnitudes scaled to 0.0-1.0, absent when not ready or not playing
    pub frequency_magnitudes: Option<Vec<f32>>,

    /// Time-domain samples in -1.0..1.0, absent when not ready or not playing
    pub time_domain_samples: Option<Vec<f32>>,

    /// True when at least one frequency bin is non-zero
    pub has_audio: bool,

    /// Peak and integrated loudness
    pub loudness: LoudnessOutput,

    /// Key overlay, absent before the first detection or after fade-out
    pub key_info: Option<KeyInfo>,
}

impl FrameOutput {
    /// Output for a frame with no analysable audio
    pub fn idle(floor_db: f32) -> Self {
        Self {
            frequency_magnitudes: None,
            time_domain_samples: None,
            has_audio: false,
            loudness: LoudnessOutput {
                peak_db: floor_db,
                integrated_db: floor_db,
            },
            key_info: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_class_names() {
        assert_eq!(PitchClass::C.name(), "C");
        assert_eq!(PitchClass::CSharp.name(), "C#");
        assert_eq!(PitchClass::A.name(), "A");
        assert_eq!(PitchClass::B.name(), "B");
    }

    #[test]
    fn test_pitch_class_index_roundtrip() {
        for (i, pc) in PitchClass::ALL.iter().enumerate() {
            assert_eq!(pc.index(), i);
            assert_eq!(PitchClass::from_index(i), *pc);
        }
        assert_eq!(PitchClass::from_index(14), PitchClass::D);
    }

    #[test]
    fn test_transpose_wraps() {
        assert_eq!(PitchClass::B.transpose(1), PitchClass::C);
        assert_eq!(PitchClass::C.transpose(-1), PitchClass::B);
        assert_eq!(PitchClass::A.transpose(3), PitchClass::C);
        assert_eq!(PitchClass::E.transpose(-16), PitchClass::C);
    }

    #[test]
    fn test_idle_output() {
        let out = FrameOutput::idle(-60.0);
        assert!(!out.has_audio);
        assert!(out.frequency_magnitudes.is_none());
        assert!(out.key_info.is_none());
        assert_eq!(out.loudness.peak_db, -60.0);
    }

    #[test]
    fn test_key_info_serializes() {
        let info = KeyInfo {
            key: PitchClass::FSharp,
            mode: Mode::Minor,
            confidence: 77,
            camelot_label: "11A".to_string(),
            drift_magnitude: 0,
            drift_message: None,
            display_opacity: 0.5,
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"FSharp\""));
        assert!(json.contains("\"11A\""));
    }
}
