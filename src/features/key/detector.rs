//! Key detection
//!
//! Matches the running chroma vector against the major and minor profiles on
//! all twelve tonics and keeps the two best of the 24 candidates.
//!
//! Detection is throttled: it runs once per `detection_interval_secs` of
//! playback with audio, and only after `detection_warmup_updates` chroma
//! updates since the previous detection.
//!
//! # Reference
//!
//! Krumhansl, C. L. (1990). *Cognitive Foundations of Musical Pitch*. Oxford
//! University Press.

use super::camelot::camelot_label;
use super::correlation::{pearson_with_epsilon, rotate};
use super::templates::KeyTemplates;
use crate::analysis::result::{Mode, PitchClass};
use crate::config::EngineConfig;
use crate::features::chroma::normalization::{chroma_max, normalize_by_max};
use crate::features::chroma::ChromaVector;
use serde::{Deserialize, Serialize};

/// Best and runner-up key for one detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEstimate {
    /// Detected tonic
    pub key: PitchClass,
    /// Detected mode
    pub mode: Mode,
    /// Confidence (0-100) derived from the correlation
    pub confidence: u8,
    /// Pearson correlation of the winning candidate (-1.0 to 1.0)
    pub correlation: f32,
    /// Runner-up tonic
    pub second_key: PitchClass,
    /// Runner-up mode
    pub second_mode: Mode,
    /// Runner-up confidence (0-100)
    pub second_confidence: u8,
}

impl KeyEstimate {
    /// Camelot wheel label of the winning key
    pub fn camelot_label(&self) -> &'static str {
        camelot_label(self.key, self.mode)
    }
}

/// Map a correlation to a 0-100 confidence
///
/// `round(clamp((corr + 1) * 50, 0, 100))`
pub fn correlation_to_confidence(correlation: f32) -> u8 {
    if !correlation.is_finite() {
        return 0;
    }
    ((correlation + 1.0) * 50.0).clamp(0.0, 100.0).round() as u8
}

/// Cadenced key detector for one session
#[derive(Debug, Clone)]
pub struct KeyDetector {
    templates: KeyTemplates,
    interval_secs: f64,
    warmup_updates: u32,
    noise_floor: f32,
    epsilon: f32,
    elapsed_secs: f64,
    updates_since_detection: u32,
    latest: Option<KeyEstimate>,
}

impl KeyDetector {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_templates(config, KeyTemplates::new())
    }

    pub fn with_templates(config: &EngineConfig, templates: KeyTemplates) -> Self {
        Self {
            templates,
            interval_secs: config.detection_interval_secs,
            warmup_updates: config.detection_warmup_updates,
            noise_floor: config.chroma_noise_floor,
            epsilon: config.correlation_epsilon,
            elapsed_secs: 0.0,
            updates_since_detection: 0,
            latest: None,
        }
    }

    /// Record one chroma update covering `dt_secs` of playback
    pub fn observe_update(&mut self, dt_secs: f64) {
        if dt_secs.is_finite() && dt_secs > 0.0 {
            self.elapsed_secs += dt_secs;
        }
        self.updates_since_detection = self.updates_since_detection.saturating_add(1);
    }

    /// Run a detection if the cadence allows it
    ///
    /// Returns the new estimate, or `None` if the interval has not elapsed,
    /// the warm-up is incomplete, or the chroma is below the noise floor.
    pub fn poll(&mut self, chroma: &ChromaVector) -> Option<KeyEstimate> {
        if self.elapsed_secs < self.interval_secs {
            return None;
        }
        if self.updates_since_detection < self.warmup_updates {
            return None;
        }

        self.elapsed_secs = 0.0;
        self.updates_since_detection = 0;

        let max = chroma_max(chroma);
        if max <= self.noise_floor {
            log::trace!("Chroma max {:.4} below noise floor, skipping detection", max);
            return None;
        }

        let estimate = self.detect(chroma);
        log::debug!(
            "Detected {} {} ({}), confidence {}, runner-up {} {} ({})",
            estimate.key,
            estimate.mode,
            estimate.camelot_label(),
            estimate.confidence,
            estimate.second_key,
            estimate.second_mode,
            estimate.second_confidence
        );
        self.latest = Some(estimate.clone());
        Some(estimate)
    }

    /// Score all 24 candidates against `chroma` without touching the cadence
    pub fn detect(&self, chroma: &ChromaVector) -> KeyEstimate {
        let normalized = normalize_by_max(chroma);

        let mut best = (f32::NEG_INFINITY, PitchClass::C, Mode::Major);
        let mut second = best;

        for tonic in 0..12 {
            let rotated = rotate(&normalized, tonic);
            for mode in [Mode::Major, Mode::Minor] {
                let corr = pearson_with_epsilon(&rotated, self.templates.profile(mode), self.epsilon);
                let candidate = (corr, PitchClass::from_index(tonic), mode);
                if corr > best.0 {
                    second = best;
                    best = candidate;
                } else if corr > second.0 {
                    second = candidate;
                }
            }
        }

        KeyEstimate {
            key: best.1,
            mode: best.2,
            confidence: correlation_to_confidence(best.0),
            correlation: best.0,
            second_key: second.1,
            second_mode: second.2,
            second_confidence: correlation_to_confidence(second.0),
        }
    }

    /// Most recent estimate, if any
    pub fn latest(&self) -> Option<&KeyEstimate> {
        self.latest.as_ref()
    }

    pub fn reset(&mut self) {
        self.elapsed_secs = 0.0;
        self.updates_since_detection = 0;
        self.latest = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::key::templates::{MAJOR_PROFILE, MINOR_PROFILE};

    fn detector() -> KeyDetector {
        KeyDetector::new(&EngineConfig::default())
    }

    fn profile_at(profile: &[f32; 12], tonic: usize) -> ChromaVector {
        let mut chroma = [0.0; 12];
        for (i, &w) in profile.iter().enumerate() {
            chroma[(i + tonic) % 12] = w / 10.0;
        }
        chroma
    }

    #[test]
    fn test_confidence_mapping() {
        assert_eq!(correlation_to_confidence(1.0), 100);
        assert_eq!(correlation_to_confidence(-1.0), 0);
        assert_eq!(correlation_to_confidence(0.0), 50);
        assert_eq!(correlation_to_confidence(0.759), 88);
        assert_eq!(correlation_to_confidence(2.0), 100);
        assert_eq!(correlation_to_confidence(f32::NAN), 0);
    }

    #[test]
    fn test_detects_every_major_key() {
        let d = detector();
        for tonic in 0..12 {
            let est = d.detect(&profile_at(&MAJOR_PROFILE, tonic));
            assert_eq!(est.key, PitchClass::from_index(tonic));
            assert_eq!(est.mode, Mode::Major);
            assert_eq!(est.confidence, 100);
        }
    }

    #[test]
    fn test_detects_every_minor_key() {
        let d = detector();
        for tonic in 0..12 {
            let est = d.detect(&profile_at(&MINOR_PROFILE, tonic));
            assert_eq!(est.key, PitchClass::from_index(tonic));
            assert_eq!(est.mode, Mode::Minor);
        }
    }

    #[test]
    fn test_runner_up_differs_from_winner() {
        let est = detector().detect(&profile_at(&MAJOR_PROFILE, 0));
        assert!((est.second_key, est.second_mode) != (est.key, est.mode));
        assert!(est.second_confidence <= est.confidence);
    }

    #[test]
    fn test_flat_chroma_gives_midpoint() {
        let est = detector().detect(&[0.3; 12]);
        assert_eq!(est.confidence, 50);
        assert!(est.correlation.is_finite());
    }

    #[test]
    fn test_cadence_waits_for_interval_and_warmup() {
        let mut d = detector();
        let chroma = profile_at(&MAJOR_PROFILE, 7);

        // 0.4 s in 5 updates: interval met, warm-up not
        for _ in 0..5 {
            d.observe_update(0.08);
            assert!(d.poll(&chroma).is_none());
        }
        for _ in 0..4 {
            d.observe_update(0.08);
            assert!(d.poll(&chroma).is_none());
        }
        d.observe_update(0.08);
        let est = d.poll(&chroma).unwrap();
        assert_eq!(est.key, PitchClass::G);
        assert_eq!(d.latest(), Some(&est));

        // Counters restart after a detection
        d.observe_update(0.5);
        assert!(d.poll(&chroma).is_none());
    }

    #[test]
    fn test_noise_floor_suppresses_detection() {
        let mut d = detector();
        let quiet = [0.005; 12];
        for _ in 0..30 {
            d.observe_update(0.05);
            assert!(d.poll(&quiet).is_none());
        }
        assert!(d.latest().is_none());
    }

    #[test]
    fn test_reset_clears_latest() {
        let mut d = detector();
        for _ in 0..10 {
            d.observe_update(0.05);
        }
        assert!(d.poll(&profile_at(&MAJOR_PROFILE, 0)).is_some());
        d.reset();
        assert!(d.latest().is_none());
    }
}
