//! Temporal chroma smoothing

use super::ChromaVector;

/// Blend one frame of pitch-class energy into the running chroma vector
///
/// `chroma[i] = chroma[i] * decay + energy[i] * (1 - decay)`
///
/// # Arguments
///
/// * `chroma` - Running chroma vector, updated in place
/// * `energy` - Energy gathered from the current frame
/// * `decay` - Weight kept from the previous value (e.g., 0.92)
pub fn decay_update(chroma: &mut ChromaVector, energy: &ChromaVector, decay: f32) {
    let gain = 1.0 - decay;
    for (c, &e) in chroma.iter_mut().zip(energy.iter()) {
        *c = *c * decay + e * gain;
    }
}
