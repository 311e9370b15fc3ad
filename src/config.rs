//! Configuration parameters for live analysis

use crate::error::AnalysisError;

/// Engine configuration parameters
///
/// Every tunable constant of the pipeline lives here so that a visualizer can
/// adjust ballistics or detection cadence without touching the algorithms.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // Spectral analysis unit
    /// Transform size in samples (default: 2048, must be a power of two)
    pub fft_size: usize,

    /// Temporal smoothing between successive spectra (default: 0.3)
    /// 0.0 = no smoothing, values close to 1.0 = very sluggish
    pub smoothing_time_constant: f32,

    /// Magnitude mapped to byte 0 (default: -100.0 dB)
    pub min_decibels: f32,

    /// Magnitude mapped to byte 255 (default: -30.0 dB)
    pub max_decibels: f32,

    // Chroma
    /// Reference tuning frequency for A4 (default: 440.0 Hz)
    pub reference_frequency: f32,

    /// Lowest octave folded into the chroma profile (default: 1)
    pub chroma_min_octave: u32,

    /// Highest octave folded into the chroma profile (default: 7)
    pub chroma_max_octave: u32,

    /// Exponential decay applied to the previous chroma value (default: 0.92)
    /// The new frame energy is weighted by `1.0 - chroma_decay`.
    pub chroma_decay: f32,

    // Key detection
    /// Seconds of playback between key detections (default: 0.4)
    pub detection_interval_secs: f64,

    /// Chroma updates required since the last detection (default: 10)
    pub detection_warmup_updates: u32,

    /// Chroma maximum below which no detection is attempted (default: 0.01)
    pub chroma_noise_floor: f32,

    /// Epsilon added to the correlation denominator (default: 1e-10)
    pub correlation_epsilon: f32,

    // Drift tracking
    /// Confidence a detection must exceed to become the reference key (default: 60)
    pub establish_confidence: u8,

    // Loudness
    /// Blend factor when the peak level rises (default: 0.5)
    pub peak_attack: f32,

    /// Blend factor when the peak level falls (default: 0.08)
    pub peak_release: f32,

    /// Floor for every displayed dB value (default: -60.0)
    pub loudness_floor_db: f32,

    /// Offset applied to the integrated RMS level (default: -0.691 dB)
    pub loudness_offset_db: f32,

    // Display
    /// Key overlay opacity gained per second while a key is shown (default: 2.0)
    pub overlay_fade_in_per_sec: f32,

    /// Key overlay opacity lost per second after audio stops (default: 0.5)
    pub overlay_fade_out_per_sec: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            smoothing_time_constant: 0.3,
            min_decibels: -100.0,
            max_decibels: -30.0,
            reference_frequency: 440.0,
            chroma_min_octave: 1,
            chroma_max_octave: 7,
            chroma_decay: 0.92,
            detection_interval_secs: 0.4,
            detection_warmup_updates: 10,
            chroma_noise_floor: 0.01,
            correlation_epsilon: 1e-10,
            establish_confidence: 60,
            peak_attack: 0.5,
            peak_release: 0.08,
            loudness_floor_db: -60.0,
            loudness_offset_db: -0.691,
            overlay_fade_in_per_sec: 2.0,
            overlay_fade_out_per_sec: 0.5,
        }
    }
}

impl EngineConfig {
    /// Number of frequency bins produced by the analysis unit
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Check that the configuration describes a usable pipeline
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` naming the first offending field.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.fft_size < 32 || !self.fft_size.is_power_of_two() {
            return Err(AnalysisError::InvalidInput(format!(
                "fft_size must be a power of two >= 32, got {}",
                self.fft_size
            )));
        }

        if !(0.0..1.0).contains(&self.smoothing_time_constant) {
            return Err(AnalysisError::InvalidInput(format!(
                "smoothing_time_constant must be in [0, 1), got {}",
                self.smoothing_time_constant
            )));
        }

        if self.min_decibels >= self.max_decibels {
            return Err(AnalysisError::InvalidInput(format!(
                "Invalid decibel range: [{:.1}, {:.1}]",
                self.min_decibels, self.max_decibels
            )));
        }

        if self.chroma_min_octave > self.chroma_max_octave {
            return Err(AnalysisError::InvalidInput(format!(
                "Invalid octave range: [{}, {}]",
                self.chroma_min_octave, self.chroma_max_octave
            )));
        }

        if !(0.0..=1.0).contains(&self.chroma_decay) {
            return Err(AnalysisError::InvalidInput(format!(
                "chroma_decay must be in [0, 1], got {}",
                self.chroma_decay
            )));
        }

        if self.detection_interval_secs <= 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "detection_interval_secs must be positive, got {}",
                self.detection_interval_secs
            )));
        }

        if self.loudness_floor_db >= 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "loudness_floor_db must be negative, got {}",
                self.loudness_floor_db
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frequency_bin_count(), 1024);
    }

    #[test]
    fn test_rejects_non_power_of_two_fft() {
        let config = EngineConfig {
            fft_size: 1000,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_ranges() {
        let config = EngineConfig {
            min_decibels: -20.0,
            max_decibels: -30.0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            chroma_min_octave: 5,
            chroma_max_octave: 2,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_full_smoothing() {
        let config = EngineConfig {
            smoothing_time_constant: 1.0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
