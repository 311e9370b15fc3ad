//! Pearson correlation against key templates

use crate::features::chroma::ChromaVector;

/// Default epsilon added under the square root of the denominator
pub const CORRELATION_EPSILON: f32 = 1e-10;

/// Pearson correlation of two 12-element vectors
///
/// `Σ(x-x̄)(y-ȳ) / sqrt(Σ(x-x̄)² · Σ(y-ȳ)² + ε)`
///
/// A flat input has zero variance and yields 0.0 instead of NaN.
pub fn pearson(x: &[f32; 12], y: &[f32; 12]) -> f32 {
    pearson_with_epsilon(x, y, CORRELATION_EPSILON)
}

/// [`pearson`] with an explicit epsilon
pub fn pearson_with_epsilon(x: &[f32; 12], y: &[f32; 12], epsilon: f32) -> f32 {
    let mean_x = x.iter().map(|&v| v as f64).sum::<f64>() / 12.0;
    let mean_y = y.iter().map(|&v| v as f64).sum::<f64>() / 12.0;

    let mut num = 0.0f64;
    let mut den_x = 0.0f64;
    let mut den_y = 0.0f64;
    for (&a, &b) in x.iter().zip(y.iter()) {
        let dx = a as f64 - mean_x;
        let dy = b as f64 - mean_y;
        num += dx * dy;
        den_x += dx * dx;
        den_y += dy * dy;
    }

    let corr = num / (den_x * den_y + epsilon as f64).sqrt();
    if corr.is_finite() {
        corr.clamp(-1.0, 1.0) as f32
    } else {
        0.0
    }
}

/// Rotate `chroma` so that pitch class `tonic` lands on index 0
pub fn rotate(chroma: &ChromaVector, tonic: usize) -> ChromaVector {
    let mut out = [0.0; 12];
    for (i, v) in out.iter_mut().enumerate() {
        *v = chroma[(i + tonic) % 12];
    }
    out
}
