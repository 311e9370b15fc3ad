//! Chroma normalization

use super::ChromaVector;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Largest element of a chroma vector
pub fn chroma_max(chroma: &ChromaVector) -> f32 {
    chroma.iter().copied().fold(0.0f32, f32::max)
}

/// Scale a chroma vector so its largest element is 1.0
///
/// A vector with no energy is returned unchanged (all zeros stay zeros).
pub fn normalize_by_max(chroma: &ChromaVector) -> ChromaVector {
    let max = chroma_max(chroma);
    if max <= EPSILON {
        return *chroma;
    }
    let mut out = *chroma;
    for v in out.iter_mut() {
        *v /= max;
    }
    out
}
