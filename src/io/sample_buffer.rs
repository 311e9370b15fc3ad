//! Decoded sample storage and analysis windowing

/// Fully decoded mono audio owned by one session
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl DecodedAudio {
    /// Wrap decoded mono samples
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Half the sample rate
    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if no samples were decoded
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Raw samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Fill `out` with the `size` samples that end at `position_secs`
    ///
    /// Positions before the start are zero-padded on the left; positions past
    /// the end clamp to the last sample.
    pub fn window_ending_at(&self, position_secs: f64, size: usize, out: &mut Vec<f32>) {
        out.clear();
        out.resize(size, 0.0);

        let end = ((position_secs.max(0.0) * self.sample_rate as f64) as usize).min(self.samples.len());
        let start = end.saturating_sub(size);
        let available = end - start;
        out[size - available..].copy_from_slice(&self.samples[start..end]);
    }
}
