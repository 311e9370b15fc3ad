//! Audio I/O modules
//!
//! Fetching the bound resource, decoding it with Symphonia, and windowing the
//! decoded samples for analysis.

pub mod decoder;
pub mod fetch;
pub mod sample_buffer;

pub use decoder::decode_audio_bytes;
pub use fetch::{extension_hint, FileFetcher, ResourceFetcher};
pub use sample_buffer::DecodedAudio;
