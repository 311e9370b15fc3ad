//! Loudness metering
//!
//! Two readings per frame:
//!
//! - **Peak**: the largest absolute sample of the frame in dB, shown with
//!   VU-style ballistics (fast attack, slow release).
//! - **Integrated**: RMS over every sample seen while audio was present for
//!   the whole session, minus a fixed 0.691 dB offset.
//!
//! The integrated value is a quick perceptual approximation. There is no
//! K-weighting filter and no gating, so it is not a broadcast LUFS meter.

use crate::analysis::result::LoudnessOutput;
use crate::config::EngineConfig;
use serde::{Deserialize, Serialize};

/// Running meter state for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoudnessState {
    /// Largest absolute sample of the most recent frame
    pub instantaneous_peak: f32,
    /// Peak level after attack/release smoothing (dB)
    pub smoothed_peak_db: f32,
    /// Sum of squares over every sample seen with audio present
    pub integrated_sum_of_squares: f64,
    /// Number of samples in `integrated_sum_of_squares`
    pub integrated_sample_count: u64,
    /// Integrated loudness from the running totals (dB)
    pub integrated_loudness_db: f32,
}

impl LoudnessState {
    fn silent(floor_db: f32) -> Self {
        Self {
            instantaneous_peak: 0.0,
            smoothed_peak_db: floor_db,
            integrated_sum_of_squares: 0.0,
            integrated_sample_count: 0,
            integrated_loudness_db: floor_db,
        }
    }
}

/// Peak and integrated loudness meter
#[derive(Debug, Clone)]
pub struct LoudnessMeter {
    state: LoudnessState,
    attack: f32,
    release: f32,
    floor_db: f32,
    offset_db: f32,
}

impl LoudnessMeter {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            state: LoudnessState::silent(config.loudness_floor_db),
            attack: config.peak_attack,
            release: config.peak_release,
            floor_db: config.loudness_floor_db,
            offset_db: config.loudness_offset_db,
        }
    }

    /// Meter one frame of time-domain samples with audio present
    ///
    /// Non-finite samples are ignored.
    pub fn process_frame(&mut self, time_domain: &[f32]) -> LoudnessOutput {
        let mut peak = 0.0f32;
        let mut sum_sq = 0.0f64;
        let mut count = 0u64;
        for &s in time_domain.iter().filter(|s| s.is_finite()) {
            peak = peak.max(s.abs());
            sum_sq += (s as f64) * (s as f64);
            count += 1;
        }

        self.state.instantaneous_peak = peak;
        self.blend_peak(self.peak_to_db(peak));

        self.state.integrated_sum_of_squares += sum_sq;
        self.state.integrated_sample_count += count;
        if self.state.integrated_sample_count > 0 {
            let mean_sq =
                self.state.integrated_sum_of_squares / self.state.integrated_sample_count as f64;
            self.state.integrated_loudness_db =
                (10.0 * mean_sq.log10()) as f32 + self.offset_db;
        }

        self.reading()
    }

    /// Advance the meter through a frame without audio
    ///
    /// The peak falls back toward the floor; the integrated totals are left
    /// untouched.
    pub fn process_silence(&mut self) -> LoudnessOutput {
        self.state.instantaneous_peak = 0.0;
        self.blend_peak(self.floor_db);
        self.reading()
    }

    /// Displayed values, each clamped to [floor, 0] dB
    pub fn reading(&self) -> LoudnessOutput {
        LoudnessOutput {
            peak_db: self.clamp_db(self.state.smoothed_peak_db),
            integrated_db: self.clamp_db(self.state.integrated_loudness_db),
        }
    }

    pub fn state(&self) -> &LoudnessState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = LoudnessState::silent(self.floor_db);
    }

    fn peak_to_db(&self, peak: f32) -> f32 {
        if peak > 0.0 {
            (20.0 * peak.log10()).max(self.floor_db)
        } else {
            self.floor_db
        }
    }

    fn blend_peak(&mut self, raw_db: f32) {
        let current = self.state.smoothed_peak_db;
        let factor = if raw_db > current {
            self.attack
        } else {
            self.release
        };
        self.state.smoothed_peak_db = current + (raw_db - current) * factor;
    }

    fn clamp_db(&self, db: f32) -> f32 {
        if db.is_nan() {
            self.floor_db
        } else {
            db.clamp(self.floor_db, 0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meter() -> LoudnessMeter {
        LoudnessMeter::new(&EngineConfig::default())
    }

    #[test]
    fn test_initial_reading_is_floor() {
        let reading = meter().reading();
        assert_eq!(reading.peak_db, -60.0);
        assert_eq!(reading.integrated_db, -60.0);
    }

    #[test]
    fn test_all_zero_frame_stays_at_floor() {
        let mut m = meter();
        let reading = m.process_frame(&[0.0; 2048]);
        assert_eq!(reading.peak_db, -60.0);
        assert_eq!(reading.integrated_db, -60.0);
        assert_eq!(m.state().integrated_sample_count, 2048);
    }

    #[test]
    fn test_full_scale_square_clamps_to_zero() {
        let mut m = meter();
        let square: Vec<f32> = (0..2048).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        for _ in 0..50 {
            m.process_frame(&square);
        }
        let reading = m.reading();
        assert!(reading.peak_db <= 0.0 && reading.peak_db > -0.01);
        // RMS 1.0 minus the offset
        assert!((reading.integrated_db + 0.691).abs() < 1e-3);
    }

    #[test]
    fn test_fast_attack_slow_release() {
        let mut m = meter();
        // 0.1 peak is -20 dB: one attack step covers half the distance from -60
        m.process_frame(&[0.1, -0.1]);
        assert!((m.state().smoothed_peak_db + 40.0).abs() < 1e-3);

        let before = m.state().smoothed_peak_db;
        m.process_silence();
        let after = m.state().smoothed_peak_db;
        assert!((after - (before + (-60.0 - before) * 0.08)).abs() < 1e-3);
    }

    #[test]
    fn test_integrated_is_cumulative() {
        let mut m = meter();
        m.process_frame(&[0.5; 100]);
        m.process_silence();
        m.process_frame(&[0.0; 100]);
        let state = m.state();
        assert_eq!(state.integrated_sample_count, 200);
        assert!((state.integrated_sum_of_squares - 25.0).abs() < 1e-9);

        // mean square 0.125
        let expected = 10.0 * 0.125f64.log10() - 0.691;
        assert!((state.integrated_loudness_db as f64 - expected).abs() < 1e-3);
    }

    #[test]
    fn test_readings_always_in_range() {
        let mut m = meter();
        let frames: Vec<Vec<f32>> = vec![
            vec![0.0; 64],
            vec![1.0; 64],
            vec![-1.0; 64],
            vec![4.0, -4.0, 0.0],
            vec![f32::NAN, f32::INFINITY, 0.2],
            vec![1e-12; 64],
            Vec::new(),
        ];
        for frame in frames.iter().cycle().take(70) {
            let r = m.process_frame(frame);
            assert!((-60.0..=0.0).contains(&r.peak_db), "peak {}", r.peak_db);
            assert!(
                (-60.0..=0.0).contains(&r.integrated_db),
                "integrated {}",
                r.integrated_db
            );
            let r = m.process_silence();
            assert!((-60.0..=0.0).contains(&r.peak_db));
        }
    }

    #[test]
    fn test_reset() {
        let mut m = meter();
        m.process_frame(&[0.9; 16]);
        m.reset();
        assert_eq!(m.state().integrated_sample_count, 0);
        assert_eq!(m.reading().peak_db, -60.0);
    }
}
