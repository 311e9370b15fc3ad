//! # Stratum Live
//!
//! A real-time audio analysis engine for music visualizers. It mirrors an
//! externally controlled audio element, analyses the same audio frame by
//! frame, and reports spectrum data, loudness and the musical key.
//!
//! ## Features
//!
//! - **Spectral source**: background fetch and decode, FFT analyser with a
//!   muted output path, stale-setup protection via session generations
//! - **Loudness**: VU-style peak ballistics and a session-cumulative
//!   integrated level
//! - **Key detection**: decaying chroma profile matched against
//!   Krumhansl-Schmuckler templates, reported with Camelot labels
//! - **Drift tracking**: distance from the first confidently detected key,
//!   classified as slight drift, off-key or key change
//!
//! ## Quick Start
//!
//! ```no_run
//! use stratum_live::{AudioSession, ElementEvent, EngineConfig, FileFetcher, MediaElement};
//! use std::sync::Arc;
//!
//! struct Player {
//!     position: f64,
//! }
//!
//! impl MediaElement for Player {
//!     fn source_url(&self) -> Option<&str> {
//!         Some("song.mp3")
//!     }
//!     fn current_time(&self) -> f64 {
//!         self.position
//!     }
//!     fn is_paused(&self) -> bool {
//!         false
//!     }
//! }
//!
//! let mut session = AudioSession::new(EngineConfig::default(), Arc::new(FileFetcher::new()))?;
//! let mut player = Player { position: 0.0 };
//! session.handle_event(ElementEvent::Play, &player);
//!
//! // Once per display frame
//! let frame = session.tick(&player, 1.0 / 60.0);
//! player.position += 1.0 / 60.0;
//! println!("peak {:.1} dB", frame.loudness.peak_db);
//! # Ok::<(), stratum_live::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! MediaElement events ──> SpectralSource (decode, transport mirror, analyser)
//!                               │
//! display frame ──> FrameSampler ──> LoudnessMeter
//!                               └──> ChromaAccumulator ──> KeyDetector ──> DriftTracker
//!                                                                 │
//!                                                          FrameOutput
//! ```

#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod session;
pub mod source;

// Re-export main types
pub use analysis::display::{BarSmoother, KeyOverlayFade};
pub use analysis::result::{FrameOutput, KeyInfo, LoudnessOutput, Mode, PitchClass};
pub use config::EngineConfig;
pub use error::AnalysisError;
pub use features::key::{DriftMessage, KeyEstimate};
pub use io::{FileFetcher, ResourceFetcher};
pub use session::{AudioSession, ElementEvent, MediaElement};
pub use source::{MirrorState, SessionGeneration};
