//! Asynchronous session setup
//!
//! Fetch and decode run on a short-lived loader thread per bind. The result is
//! sent back to the frame loop tagged with the generation it belongs to; the
//! loop decides whether it is still wanted.

use super::generation::SessionGeneration;
use crate::error::AnalysisError;
use crate::io::{decode_audio_bytes, extension_hint, DecodedAudio, ResourceFetcher};
use crossbeam_channel::Sender;
use std::sync::Arc;
use std::thread;

/// Result of one asynchronous setup
#[derive(Debug)]
pub struct SetupCompletion {
    /// Generation the setup was started for
    pub generation: SessionGeneration,
    /// Source URL that was loaded
    pub url: String,
    /// Decoded audio, or the reason there is none
    pub outcome: Result<DecodedAudio, AnalysisError>,
}

/// What the source did with a completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Decoded audio installed; the source is ready
    Applied,
    /// Current generation, but fetch or decode failed; the source stays data-less
    Failed,
    /// Belonged to an older generation and was discarded
    Stale,
}

/// Fetch and fully decode one resource
///
/// # Errors
///
/// Propagates the fetcher's `FetchError` or the decoder's `DecodingError`.
pub fn load_resource(fetcher: &dyn ResourceFetcher, url: &str) -> Result<DecodedAudio, AnalysisError> {
    let bytes = fetcher.fetch(url)?;
    if bytes.is_empty() {
        return Err(AnalysisError::FetchError(format!("{}: empty response", url)));
    }
    decode_audio_bytes(bytes, extension_hint(url).as_deref())
}

/// Start loading `url` on a loader thread
///
/// The completion is always sent, even on failure, so the receiver can keep
/// an exact count of in-flight setups.
pub(crate) fn spawn_setup(
    fetcher: Arc<dyn ResourceFetcher>,
    generation: SessionGeneration,
    url: String,
    completions: Sender<SetupCompletion>,
) -> Result<(), AnalysisError> {
    thread::Builder::new()
        .name(format!("stratum-setup-{}", generation.value()))
        .spawn(move || {
            let outcome = load_resource(fetcher.as_ref(), &url);
            // The receiver is gone only if the source was dropped.
            let _ = completions.send(SetupCompletion {
                generation,
                url,
                outcome,
            });
        })
        .map(|_| ())
        .map_err(|e| AnalysisError::ProcessingError(format!("Failed to spawn loader thread: {}", e)))
}
