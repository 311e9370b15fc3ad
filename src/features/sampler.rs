//! Per-frame sampling of the spectral source

use crate::config::EngineConfig;
use crate::source::SpectralSource;

/// One frame of analysis data, borrowed from the sampler's buffers
#[derive(Debug, Clone, Copy)]
pub struct AudioFrame<'a> {
    bytes: &'a [u8],
    magnitudes: &'a [f32],
    time_domain: &'a [f32],
    sample_rate: u32,
    has_audio: bool,
}

impl<'a> AudioFrame<'a> {
    /// Quantised magnitudes (0-255), one per bin
    pub fn frequency_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Magnitudes scaled to 0.0-1.0
    pub fn frequency_magnitudes(&self) -> &'a [f32] {
        self.magnitudes
    }

    /// Time-domain samples in -1.0..1.0
    pub fn time_domain(&self) -> &'a [f32] {
        self.time_domain
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }

    pub fn bin_count(&self) -> usize {
        self.bytes.len()
    }

    /// True if at least one frequency bin is non-zero
    pub fn has_audio(&self) -> bool {
        self.has_audio
    }
}

/// Pulls frequency and time-domain arrays from the source once per frame
///
/// Buffers are allocated once and reused on every call.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    bytes: Vec<u8>,
    magnitudes: Vec<f32>,
    time_domain: Vec<f32>,
}

impl FrameSampler {
    pub fn new(config: &EngineConfig) -> Self {
        let bins = config.frequency_bin_count();
        Self {
            bytes: vec![0; bins],
            magnitudes: vec![0.0; bins],
            time_domain: vec![0.0; config.fft_size],
        }
    }

    /// Sample the current frame
    ///
    /// Returns `None` ("no audio") when the source has no decoded data or is
    /// not playing.
    pub fn sample<'a>(&'a mut self, source: &mut SpectralSource) -> Option<AudioFrame<'a>> {
        let sample_rate = source.sample_rate()?;
        let analyser = source.sample_window()?;

        self.bytes.resize(analyser.frequency_bin_count(), 0);
        self.magnitudes.resize(analyser.frequency_bin_count(), 0.0);
        self.time_domain.resize(analyser.fft_size(), 0.0);

        analyser.byte_frequency_data(&mut self.bytes);
        analyser.float_time_domain_data(&mut self.time_domain);

        for (m, &b) in self.magnitudes.iter_mut().zip(self.bytes.iter()) {
            *m = b as f32 / 255.0;
        }
        let has_audio = self.bytes.iter().any(|&b| b > 0);

        Some(AudioFrame {
            bytes: &self.bytes,
            magnitudes: &self.magnitudes,
            time_domain: &self.time_domain,
            sample_rate,
            has_audio,
        })
    }
}
