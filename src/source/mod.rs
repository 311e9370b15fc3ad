//! Spectral source
//!
//! Owns everything bound to one audio resource: the decoded buffer, the
//! analysis graph, and the mirrored playback transport. Setup runs off the
//! frame loop and is applied only if its generation is still current.

pub mod generation;
pub mod graph;
pub mod setup;
pub mod transport;

pub use generation::SessionGeneration;
pub use graph::{AnalysisGraph, MuteGain, SpectralAnalyser};
pub use setup::{CompletionOutcome, SetupCompletion};
pub use transport::{MirrorState, TransitionResult, TransportEvent, TransportMirror};

use crate::config::EngineConfig;
use crate::error::AnalysisError;
use crate::io::{DecodedAudio, ResourceFetcher};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Decoded audio, analysis graph and transport for the bound resource
pub struct SpectralSource {
    fft_size: usize,
    fetcher: Arc<dyn ResourceFetcher>,
    generation: SessionGeneration,
    url: Option<String>,
    audio: Option<DecodedAudio>,
    graph: AnalysisGraph,
    transport: TransportMirror,
    completions_tx: Sender<SetupCompletion>,
    completions_rx: Receiver<SetupCompletion>,
    in_flight: usize,
    ready_edge: bool,
    window: Vec<f32>,
}

impl SpectralSource {
    /// Create an unbound source
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if the analyser cannot be built
    /// from `config`.
    pub fn new(config: &EngineConfig, fetcher: Arc<dyn ResourceFetcher>) -> Result<Self, AnalysisError> {
        let (completions_tx, completions_rx) = crossbeam_channel::unbounded();
        Ok(Self {
            fft_size: config.fft_size,
            fetcher,
            generation: SessionGeneration::INITIAL,
            url: None,
            audio: None,
            graph: AnalysisGraph::new(config)?,
            transport: TransportMirror::new(),
            completions_tx,
            completions_rx,
            in_flight: 0,
            ready_edge: false,
            window: Vec::with_capacity(config.fft_size),
        })
    }

    /// Bind a new resource, discarding whatever was bound before
    ///
    /// Returns the generation assigned to this bind. Setup failures never
    /// surface here; the source simply stays without data.
    pub fn bind(&mut self, url: &str) -> SessionGeneration {
        self.teardown();
        self.generation = self.generation.next();
        self.url = Some(url.to_string());

        log::info!("Binding {} ({})", url, self.generation);

        self.in_flight += 1;
        if let Err(e) = setup::spawn_setup(
            Arc::clone(&self.fetcher),
            self.generation,
            url.to_string(),
            self.completions_tx.clone(),
        ) {
            self.in_flight -= 1;
            log::warn!("Setup for {} could not start: {}", url, e);
        }

        self.generation
    }

    /// Apply every setup completion that has arrived so far
    pub fn poll_setup(&mut self) -> Vec<CompletionOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(completion) = self.completions_rx.try_recv() {
            outcomes.push(self.apply_completion(completion));
        }
        outcomes
    }

    /// Apply one completion under the generation guard
    pub fn apply_completion(&mut self, completion: SetupCompletion) -> CompletionOutcome {
        self.in_flight = self.in_flight.saturating_sub(1);

        if !completion.generation.is_current(self.generation) {
            log::debug!(
                "Discarding stale setup for {} ({}, current {})",
                completion.url,
                completion.generation,
                self.generation
            );
            return CompletionOutcome::Stale;
        }

        match completion.outcome {
            Ok(audio) => {
                log::info!(
                    "Source ready: {} ({:.2}s at {} Hz)",
                    completion.url,
                    audio.duration_secs(),
                    audio.sample_rate()
                );
                self.transport.transition(TransportEvent::Ready {
                    duration_secs: audio.duration_secs(),
                });
                self.graph.connect();
                self.audio = Some(audio);
                self.ready_edge = true;
                CompletionOutcome::Applied
            }
            Err(e) => {
                log::warn!("Audio unavailable for {}: {}", completion.url, e);
                CompletionOutcome::Failed
            }
        }
    }

    /// Block until every in-flight setup has reported back
    ///
    /// Returns false if `timeout` elapsed first.
    pub fn wait_for_setup(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.completions_rx.recv_timeout(remaining) {
                Ok(completion) => {
                    self.apply_completion(completion);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return false;
                }
            }
        }
        true
    }

    /// True once after each successful setup
    pub fn take_ready_edge(&mut self) -> bool {
        std::mem::take(&mut self.ready_edge)
    }

    pub fn handle_transport(&mut self, event: TransportEvent) -> TransitionResult {
        self.transport.transition(event)
    }

    /// Move the mirrored playback cursor forward by `dt_secs`
    pub fn advance(&mut self, dt_secs: f64) -> Option<f64> {
        self.transport.advance(dt_secs)
    }

    /// Run the analysis window at the playback cursor through the graph
    ///
    /// Returns `None` unless decoded audio is present and playing.
    pub fn sample_window(&mut self) -> Option<&SpectralAnalyser> {
        let position = self.transport.position_secs()?;
        let audio = self.audio.as_ref()?;
        audio.window_ending_at(position, self.fft_size, &mut self.window);
        if !self.graph.process(&self.window) {
            return None;
        }
        Some(self.graph.analyser())
    }

    /// Release the buffer, stop mirroring and invalidate pending setup
    ///
    /// Safe to call any number of times.
    pub fn teardown(&mut self) {
        if let Some(url) = self.url.take() {
            self.generation = self.generation.next();
            log::info!("Tearing down {} (now {})", url, self.generation);
        }
        self.audio = None;
        self.ready_edge = false;
        self.transport.transition(TransportEvent::Reset);
        self.graph.disconnect();
    }

    pub fn generation(&self) -> SessionGeneration {
        self.generation
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Setups started but not yet reported back (stale ones included)
    pub fn pending_setups(&self) -> usize {
        self.in_flight
    }

    pub fn is_ready(&self) -> bool {
        self.audio.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.phase() == MirrorState::Playing
    }

    pub fn mirror_state(&self) -> MirrorState {
        self.transport.phase()
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.audio.as_ref().map(DecodedAudio::sample_rate)
    }

    pub fn graph(&self) -> &AnalysisGraph {
        &self.graph
    }
}

impl Drop for SpectralSource {
    fn drop(&mut self) {
        self.teardown();
    }
}
