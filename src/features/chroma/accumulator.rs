//! Chroma accumulation from the frame spectrum
//!
//! Every pitch class is sampled at its equal-tempered frequency in each octave
//! of the configured range:
//!
//! `f = reference * 2^((pitch_class + 12 * octave - 69) / 12)`
//!
//! Frequencies at or above Nyquist are skipped. The remaining ones are mapped
//! to the nearest bin (`round(f / nyquist * bin_count)`) and their magnitudes
//! summed per pitch class. The per-frame energy is then folded into the
//! running vector with exponential decay.

use super::smoothing::decay_update;
use super::ChromaVector;
use crate::config::EngineConfig;

/// (pitch class, frequency bin) pairs for one sample rate and bin count
#[derive(Debug, Clone, Default)]
struct BinMap {
    sample_rate: u32,
    bin_count: usize,
    entries: Vec<(usize, usize)>,
}

/// Running pitch-class energy profile for one session
#[derive(Debug, Clone)]
pub struct ChromaAccumulator {
    chroma: ChromaVector,
    decay: f32,
    reference_frequency: f32,
    min_octave: u32,
    max_octave: u32,
    bin_map: BinMap,
    updates: u64,
}

impl ChromaAccumulator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            chroma: [0.0; 12],
            decay: config.chroma_decay,
            reference_frequency: config.reference_frequency,
            min_octave: config.chroma_min_octave,
            max_octave: config.chroma_max_octave,
            bin_map: BinMap::default(),
            updates: 0,
        }
    }

    /// Fold one frame into the chroma vector
    ///
    /// # Arguments
    ///
    /// * `magnitudes` - Frequency magnitudes normalized to 0.0-1.0, one per bin
    /// * `sample_rate` - Sample rate of the analysed audio in Hz
    ///
    /// # Returns
    ///
    /// The updated chroma vector
    pub fn accumulate(&mut self, magnitudes: &[f32], sample_rate: u32) -> &ChromaVector {
        if self.bin_map.sample_rate != sample_rate || self.bin_map.bin_count != magnitudes.len() {
            self.bin_map = self.build_bin_map(sample_rate, magnitudes.len());
        }

        let mut energy = [0.0f32; 12];
        for &(pitch_class, bin) in &self.bin_map.entries {
            let m = magnitudes[bin];
            if m.is_finite() {
                energy[pitch_class] += m;
            }
        }

        decay_update(&mut self.chroma, &energy, self.decay);
        self.updates += 1;
        &self.chroma
    }

    pub fn chroma(&self) -> &ChromaVector {
        &self.chroma
    }

    /// Frames accumulated since creation or the last reset
    pub fn update_count(&self) -> u64 {
        self.updates
    }

    pub fn reset(&mut self) {
        self.chroma = [0.0; 12];
        self.updates = 0;
    }

    fn build_bin_map(&self, sample_rate: u32, bin_count: usize) -> BinMap {
        let nyquist = sample_rate as f32 / 2.0;
        let mut entries = Vec::with_capacity(12 * (self.max_octave - self.min_octave + 1) as usize);

        if nyquist > 0.0 && bin_count > 0 {
            for octave in self.min_octave..=self.max_octave {
                for pitch_class in 0..12 {
                    let f = pitch_class_frequency(self.reference_frequency, pitch_class, octave);
                    if f >= nyquist {
                        continue;
                    }
                    let bin = (f / nyquist * bin_count as f32).round() as usize;
                    if bin < bin_count {
                        entries.push((pitch_class, bin));
                    }
                }
            }
        }

        log::debug!(
            "Chroma bin map: {} entries for {} Hz / {} bins",
            entries.len(),
            sample_rate,
            bin_count
        );

        BinMap {
            sample_rate,
            bin_count,
            entries,
        }
    }
}

/// Equal-tempered frequency of `pitch_class` in `octave`
pub fn pitch_class_frequency(reference: f32, pitch_class: usize, octave: u32) -> f32 {
    let midi = pitch_class as f32 + 12.0 * octave as f32;
    reference * 2f32.powf((midi - 69.0) / 12.0)
}
