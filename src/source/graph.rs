//! Spectral analysis graph
//!
//! Mirrors the node chain a browser visualizer builds: decoded buffer ->
//! analyser -> zero-gain node -> output. The analyser sees the signal, the
//! output never hears it.

use crate::config::EngineConfig;
use crate::error::AnalysisError;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Fixed-size FFT analyser with temporal smoothing and byte quantisation
///
/// Output conventions follow the browser `AnalyserNode`:
///
/// - Blackman window over the most recent `fft_size` samples
/// - Magnitude `|X[k]| / N`, smoothed as `s = τ·s_prev + (1 - τ)·|X[k]|`
/// - Byte value `255 / (max_db - min_db) · (dB - min_db)`, clamped to 0..=255
pub struct SpectralAnalyser {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    time_domain: Vec<f32>,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
}

impl SpectralAnalyser {
    /// Create an analyser from the engine configuration
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for an invalid FFT size or
    /// decibel range.
    pub fn new(config: &EngineConfig) -> Result<Self, AnalysisError> {
        let fft_size = config.fft_size;
        if fft_size < 2 || !fft_size.is_power_of_two() {
            return Err(AnalysisError::InvalidInput(format!(
                "FFT size must be a power of two, got {}",
                fft_size
            )));
        }
        if config.min_decibels >= config.max_decibels {
            return Err(AnalysisError::InvalidInput(format!(
                "Invalid decibel range: [{}, {}]",
                config.min_decibels, config.max_decibels
            )));
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Ok(Self {
            fft,
            window: blackman_window(fft_size),
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch,
            smoothed: vec![0.0; fft_size / 2],
            time_domain: vec![0.0; fft_size],
            smoothing: config.smoothing_time_constant,
            min_db: config.min_decibels,
            max_db: config.max_decibels,
        })
    }

    /// Transform size in samples
    pub fn fft_size(&self) -> usize {
        self.window.len()
    }

    /// Number of frequency bins (`fft_size / 2`)
    pub fn frequency_bin_count(&self) -> usize {
        self.smoothed.len()
    }

    /// Analyse one window of input
    ///
    /// `input` shorter than the FFT size is zero-padded at the front, longer
    /// input keeps only its most recent samples.
    pub fn analyse(&mut self, input: &[f32]) {
        let n = self.fft_size();
        let take = input.len().min(n);
        let pad = n - take;

        self.time_domain[..pad].fill(0.0);
        self.time_domain[pad..].copy_from_slice(&input[input.len() - take..]);

        for ((slot, &x), &w) in self
            .buffer
            .iter_mut()
            .zip(self.time_domain.iter())
            .zip(self.window.iter())
        {
            *slot = Complex::new(x * w, 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let scale = 1.0 / n as f32;
        let tau = self.smoothing;
        for (s, x) in self.smoothed.iter_mut().zip(self.buffer.iter()) {
            let magnitude = x.norm() * scale;
            let next = tau * *s + (1.0 - tau) * magnitude;
            // Keep denormals and NaN out of the feedback path
            *s = if next.is_finite() && next > EPSILON * EPSILON {
                next
            } else {
                0.0
            };
        }
    }

    /// Quantised magnitudes, one byte per bin
    pub fn byte_frequency_data(&self, out: &mut [u8]) {
        let range = self.max_db - self.min_db;
        for (byte, &magnitude) in out.iter_mut().zip(self.smoothed.iter()) {
            *byte = if magnitude <= 0.0 {
                0
            } else {
                let db = 20.0 * magnitude.log10();
                let scaled = (255.0 / range * (db - self.min_db)).floor();
                scaled.clamp(0.0, 255.0) as u8
            };
        }
    }

    /// Most recent analysis window as floats
    pub fn float_time_domain_data(&self, out: &mut [f32]) {
        let len = out.len().min(self.time_domain.len());
        out[..len].copy_from_slice(&self.time_domain[..len]);
    }

    /// Smoothed linear magnitudes
    pub fn smoothed_magnitudes(&self) -> &[f32] {
        &self.smoothed
    }

    /// Forget the smoothing history
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
        self.time_domain.fill(0.0);
    }
}

impl std::fmt::Debug for SpectralAnalyser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralAnalyser")
            .field("fft_size", &self.fft_size())
            .field("smoothing", &self.smoothing)
            .field("min_db", &self.min_db)
            .field("max_db", &self.max_db)
            .finish()
    }
}

/// Blackman window of length `n` (periodic form)
fn blackman_window(n: usize) -> Vec<f32> {
    const ALPHA: f32 = 0.16;
    let a0 = 0.5 * (1.0 - ALPHA);
    let a1 = 0.5;
    let a2 = 0.5 * ALPHA;
    (0..n)
        .map(|i| {
            let t = 2.0 * PI * i as f32 / n as f32;
            a0 - a1 * t.cos() + a2 * (2.0 * t).cos()
        })
        .collect()
}

/// Zero-gain stage between the analyser and the output
#[derive(Debug, Clone, Copy, Default)]
pub struct MuteGain {
    gain: f32,
}

impl MuteGain {
    pub fn new() -> Self {
        Self { gain: 0.0 }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Render `input` through the gain stage into `out`
    pub fn render(&self, input: &[f32], out: &mut Vec<f32>) {
        out.clear();
        out.extend(input.iter().map(|&x| x * self.gain));
    }
}

/// The analyser plus its muted output path
#[derive(Debug)]
pub struct AnalysisGraph {
    analyser: SpectralAnalyser,
    mute: MuteGain,
    connected: bool,
    output: Vec<f32>,
}

impl AnalysisGraph {
    /// Build an unconnected graph
    ///
    /// # Errors
    ///
    /// Propagates analyser construction errors.
    pub fn new(config: &EngineConfig) -> Result<Self, AnalysisError> {
        Ok(Self {
            analyser: SpectralAnalyser::new(config)?,
            mute: MuteGain::new(),
            connected: false,
            output: Vec::new(),
        })
    }

    pub fn connect(&mut self) {
        self.connected = true;
    }

    /// Detach the source and clear the analyser history
    pub fn disconnect(&mut self) {
        self.connected = false;
        self.analyser.reset();
        self.output.clear();
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Push one window through the graph; ignored while disconnected
    pub fn process(&mut self, window: &[f32]) -> bool {
        if !self.connected {
            return false;
        }
        self.analyser.analyse(window);
        self.mute.render(window, &mut self.output);
        true
    }

    pub fn analyser(&self) -> &SpectralAnalyser {
        &self.analyser
    }

    /// What would reach the speakers for the last window
    pub fn rendered_output(&self) -> &[f32] {
        &self.output
    }
}
