//! Display-side smoothing owned by one visualizer instance
//!
//! Nothing here is shared between instances: each visualizer keeps its own
//! overlay fade and bar buffers.

/// Opacity ramp for the key overlay
///
/// Rises while a key is detected and audio is present, decays otherwise, so
/// short silences don't make the overlay blink.
#[derive(Debug, Clone)]
pub struct KeyOverlayFade {
    opacity: f32,
    fade_in_per_sec: f32,
    fade_out_per_sec: f32,
}

impl KeyOverlayFade {
    /// Create a fade starting fully transparent
    pub fn new(fade_in_per_sec: f32, fade_out_per_sec: f32) -> Self {
        Self {
            opacity: 0.0,
            fade_in_per_sec: fade_in_per_sec.max(0.0),
            fade_out_per_sec: fade_out_per_sec.max(0.0),
        }
    }

    /// Advance by `dt_secs` and return the new opacity
    pub fn update(&mut self, key_present: bool, has_audio: bool, dt_secs: f32) -> f32 {
        let dt = dt_secs.max(0.0);
        if key_present && has_audio {
            self.opacity = (self.opacity + self.fade_in_per_sec * dt).min(1.0);
        } else {
            self.opacity = (self.opacity - self.fade_out_per_sec * dt).max(0.0);
        }
        self.opacity
    }

    /// Current opacity (0.0-1.0)
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Back to fully transparent
    pub fn reset(&mut self) {
        self.opacity = 0.0;
    }
}

/// Attack/release smoothing for spectrum bars
#[derive(Debug, Clone)]
pub struct BarSmoother {
    values: Vec<f32>,
    attack: f32,
    release: f32,
}

impl BarSmoother {
    /// Create a smoother for `bars` bars
    ///
    /// `attack` and `release` are blend factors in [0, 1] applied when a bar
    /// rises or falls respectively.
    pub fn new(bars: usize, attack: f32, release: f32) -> Self {
        Self {
            values: vec![0.0; bars],
            attack: attack.clamp(0.0, 1.0),
            release: release.clamp(0.0, 1.0),
        }
    }

    /// Blend a new set of bar heights into the buffer
    ///
    /// Extra input values are ignored; missing ones count as zero.
    pub fn update(&mut self, input: &[f32]) -> &[f32] {
        for (i, v) in self.values.iter_mut().enumerate() {
            let target = input.get(i).copied().unwrap_or(0.0);
            let blend = if target > *v { self.attack } else { self.release };
            *v += (target - *v) * blend;
        }
        &self.values
    }

    /// Current bar heights
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Zero every bar
    pub fn reset(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }
}
