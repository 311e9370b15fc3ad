//! Audio session facade
//!
//! Ties the spectral source to the per-frame feature pipeline. The host
//! drives it with two calls:
//!
//! - [`AudioSession::handle_event`] for every play/pause/ended/seek event of
//!   the external media element
//! - [`AudioSession::tick`] once per display frame
//!
//! Nothing on the frame path returns an error. A resource that cannot be
//! fetched or decoded leaves the session without data, and every tick then
//! reports an idle frame.

use crate::analysis::display::KeyOverlayFade;
use crate::analysis::result::{FrameOutput, KeyInfo, LoudnessOutput, Mode, PitchClass};
use crate::config::EngineConfig;
use crate::error::AnalysisError;
use crate::features::chroma::{ChromaAccumulator, ChromaVector};
use crate::features::key::{DriftTracker, KeyDetector, KeyEstimate};
use crate::features::loudness::{LoudnessMeter, LoudnessState};
use crate::features::sampler::FrameSampler;
use crate::io::ResourceFetcher;
use crate::source::{MirrorState, SessionGeneration, SpectralSource, TransportEvent};
use std::sync::Arc;
use std::time::Duration;

/// The externally controlled audio element being mirrored
pub trait MediaElement {
    /// URL of the current source, if any
    fn source_url(&self) -> Option<&str>;

    /// Playback position in seconds
    fn current_time(&self) -> f64;

    /// True while the element is paused
    fn is_paused(&self) -> bool;
}

/// Transport events raised by the media element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementEvent {
    /// Playback started or resumed
    Play,
    /// Playback paused
    Pause,
    /// Playback reached the end
    Ended,
    /// Playback position jumped
    Seeked,
}

/// Accumulators scoped to one bind
#[derive(Debug)]
struct AnalysisState {
    sampler: FrameSampler,
    loudness: LoudnessMeter,
    chroma: ChromaAccumulator,
    detector: KeyDetector,
    drift: DriftTracker,
    fade: KeyOverlayFade,
}

impl AnalysisState {
    fn new(config: &EngineConfig) -> Self {
        Self {
            sampler: FrameSampler::new(config),
            loudness: LoudnessMeter::new(config),
            chroma: ChromaAccumulator::new(config),
            detector: KeyDetector::new(config),
            drift: DriftTracker::new(config),
            fade: KeyOverlayFade::new(config.overlay_fade_in_per_sec, config.overlay_fade_out_per_sec),
        }
    }
}

/// Live analysis of one audio element
///
/// Exactly one resource is bound at a time. Rebinding or tearing down
/// discards the decoded buffer, the transport mirror and every accumulator.
///
/// # Example
///
/// ```no_run
/// use stratum_live::{AudioSession, EngineConfig, FileFetcher, MediaElement};
/// use std::sync::Arc;
///
/// struct Player {
///     url: String,
///     position: f64,
/// }
///
/// impl MediaElement for Player {
///     fn source_url(&self) -> Option<&str> {
///         Some(&self.url)
///     }
///     fn current_time(&self) -> f64 {
///         self.position
///     }
///     fn is_paused(&self) -> bool {
///         false
///     }
/// }
///
/// let mut session = AudioSession::new(EngineConfig::default(), Arc::new(FileFetcher::new()))?;
/// let mut player = Player { url: "track.mp3".to_string(), position: 0.0 };
///
/// for _ in 0..600 {
///     let frame = session.tick(&player, 1.0 / 60.0);
///     player.position += 1.0 / 60.0;
///     if let Some(key) = frame.key_info {
///         println!("{} {} ({})", key.key, key.mode, key.camelot_label);
///     }
/// }
/// # Ok::<(), stratum_live::AnalysisError>(())
/// ```
pub struct AudioSession {
    config: EngineConfig,
    source: SpectralSource,
    state: AnalysisState,
}

impl AudioSession {
    /// Create a session with nothing bound
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if `config` fails validation.
    pub fn new(config: EngineConfig, fetcher: Arc<dyn ResourceFetcher>) -> Result<Self, AnalysisError> {
        config.validate()?;
        let source = SpectralSource::new(&config, fetcher)?;
        let state = AnalysisState::new(&config);
        Ok(Self {
            config,
            source,
            state,
        })
    }

    /// Bind a new resource, replacing the current one
    ///
    /// Fetch and decode run in the background; the returned generation
    /// identifies this bind.
    pub fn bind(&mut self, url: &str) -> SessionGeneration {
        self.state = AnalysisState::new(&self.config);
        self.source.bind(url)
    }

    /// Mirror a transport event of the media element
    pub fn handle_event(&mut self, event: ElementEvent, element: &dyn MediaElement) {
        let transport = match event {
            ElementEvent::Play => TransportEvent::Play {
                position_secs: element.current_time(),
            },
            ElementEvent::Pause => TransportEvent::Pause,
            ElementEvent::Ended => TransportEvent::Ended,
            ElementEvent::Seeked => TransportEvent::Seek {
                position_secs: element.current_time(),
            },
        };
        self.source.handle_transport(transport);
    }

    /// Process one display frame
    pub fn tick(&mut self, element: &dyn MediaElement, dt_secs: f64) -> FrameOutput {
        let mut out = FrameOutput::idle(self.config.loudness_floor_db);
        self.tick_into(element, dt_secs, &mut out);
        out
    }

    /// Process one display frame into `out`, reusing its sample buffers
    ///
    /// Renderers that keep one [`FrameOutput`] across frames avoid two
    /// allocations per frame while audio is flowing.
    pub fn tick_into(&mut self, element: &dyn MediaElement, dt_secs: f64, out: &mut FrameOutput) {
        self.follow_source(element);
        self.source.poll_setup();

        if self.source.take_ready_edge() && !element.is_paused() {
            self.source.handle_transport(TransportEvent::Play {
                position_secs: element.current_time(),
            });
        }

        let dt = if dt_secs.is_finite() && dt_secs > 0.0 {
            dt_secs
        } else {
            0.0
        };
        self.source.advance(dt);

        let AnalysisState {
            sampler,
            loudness,
            chroma,
            detector,
            drift,
            fade,
        } = &mut self.state;

        let mut has_audio = false;
        let loudness_output: LoudnessOutput;

        match sampler.sample(&mut self.source) {
            Some(frame) => {
                has_audio = frame.has_audio();
                refill(&mut out.frequency_magnitudes, frame.frequency_magnitudes());
                refill(&mut out.time_domain_samples, frame.time_domain());

                if has_audio {
                    loudness_output = loudness.process_frame(frame.time_domain());
                    let current = *chroma.accumulate(frame.frequency_magnitudes(), frame.sample_rate());
                    detector.observe_update(dt);
                    if let Some(estimate) = detector.poll(&current) {
                        drift.observe(&estimate);
                    }
                } else {
                    loudness_output = loudness.process_silence();
                }
            }
            None => {
                out.frequency_magnitudes = None;
                out.time_domain_samples = None;
                loudness_output = loudness.process_silence();
            }
        }

        let opacity = fade.update(detector.latest().is_some(), has_audio, dt as f32);

        let key_info = detector
            .latest()
            .filter(|_| has_audio || opacity > 0.0)
            .map(|estimate| {
                let drift_state = drift.state();
                KeyInfo {
                    key: estimate.key,
                    mode: estimate.mode,
                    confidence: estimate.confidence,
                    camelot_label: estimate.camelot_label().to_string(),
                    drift_magnitude: drift_state.magnitude,
                    drift_message: drift_state.message.as_ref().map(ToString::to_string),
                    display_opacity: opacity,
                }
            });

        out.has_audio = has_audio;
        out.loudness = loudness_output;
        out.key_info = key_info;
    }

    /// Release everything bound to the current resource
    ///
    /// Idempotent; safe on both the source-switch and shutdown paths.
    pub fn teardown(&mut self) {
        self.source.teardown();
        self.state = AnalysisState::new(&self.config);
    }

    /// Block until pending setups have reported back, or `timeout` elapses
    pub fn wait_for_setup(&mut self, timeout: Duration) -> bool {
        self.source.wait_for_setup(timeout)
    }

    pub fn generation(&self) -> SessionGeneration {
        self.source.generation()
    }

    pub fn source(&self) -> &SpectralSource {
        &self.source
    }

    pub fn mirror_state(&self) -> MirrorState {
        self.source.mirror_state()
    }

    pub fn latest_estimate(&self) -> Option<&KeyEstimate> {
        self.state.detector.latest()
    }

    pub fn established_key(&self) -> Option<(PitchClass, Mode)> {
        self.state.drift.established()
    }

    pub fn loudness_state(&self) -> &LoudnessState {
        self.state.loudness.state()
    }

    pub fn chroma(&self) -> &ChromaVector {
        self.state.chroma.chroma()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Rebind or tear down when the element's source differs from ours
    fn follow_source(&mut self, element: &dyn MediaElement) {
        match (element.source_url(), self.source.url()) {
            (Some(wanted), Some(bound)) if wanted == bound => {}
            (Some(wanted), _) => {
                let wanted = wanted.to_string();
                self.bind(&wanted);
            }
            (None, Some(_)) => self.teardown(),
            (None, None) => {}
        }
    }
}

/// Overwrite `slot` with `data`, keeping any existing allocation
fn refill(slot: &mut Option<Vec<f32>>, data: &[f32]) {
    let buf = slot.get_or_insert_with(|| Vec::with_capacity(data.len()));
    buf.clear();
    buf.extend_from_slice(data);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    struct FakeElement {
        url: Option<String>,
        position: f64,
        paused: bool,
    }

    impl MediaElement for FakeElement {
        fn source_url(&self) -> Option<&str> {
            self.url.as_deref()
        }
        fn current_time(&self) -> f64 {
            self.position
        }
        fn is_paused(&self) -> bool {
            self.paused
        }
    }

    fn tone_wav(freq: f32, sample_rate: u32, secs: f32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            let n = (sample_rate as f32 * secs) as usize;
            for i in 0..n {
                let s = 0.4 * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin();
                writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    fn session_with_tone() -> AudioSession {
        let bytes = tone_wav(440.0, 8000, 3.0);
        let fetcher: Arc<dyn ResourceFetcher> =
            Arc::new(move |_: &str| -> Result<Vec<u8>, AnalysisError> { Ok(bytes.clone()) });
        AudioSession::new(EngineConfig::default(), fetcher).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = EngineConfig {
            fft_size: 1000,
            ..EngineConfig::default()
        };
        let fetcher: Arc<dyn ResourceFetcher> =
            Arc::new(|_: &str| -> Result<Vec<u8>, AnalysisError> { Ok(Vec::new()) });
        assert!(AudioSession::new(config, fetcher).is_err());
    }

    #[test]
    fn test_idle_without_source() {
        let mut session = session_with_tone();
        let element = FakeElement {
            url: None,
            position: 0.0,
            paused: true,
        };
        let out = session.tick(&element, 1.0 / 60.0);
        assert!(!out.has_audio);
        assert!(out.frequency_magnitudes.is_none());
        assert!(out.time_domain_samples.is_none());
        assert!(out.key_info.is_none());
        assert_eq!(out.loudness.peak_db, -60.0);
    }

    #[test]
    fn test_tick_follows_element_source() {
        let mut session = session_with_tone();
        let mut element = FakeElement {
            url: Some("a.wav".to_string()),
            position: 0.5,
            paused: false,
        };

        session.tick(&element, 0.0);
        assert_eq!(session.source().url(), Some("a.wav"));
        let first = session.generation();

        // Same URL: no rebind
        session.tick(&element, 0.0);
        assert_eq!(session.generation(), first);

        element.url = Some("b.wav".to_string());
        session.tick(&element, 0.0);
        assert!(session.generation() > first);
        assert_eq!(session.source().url(), Some("b.wav"));

        element.url = None;
        session.tick(&element, 0.0);
        assert!(session.source().url().is_none());
    }

    #[test]
    fn test_starts_playing_once_ready() {
        let mut session = session_with_tone();
        let mut element = FakeElement {
            url: Some("tone.wav".to_string()),
            position: 0.5,
            paused: false,
        };
        session.tick(&element, 0.0);
        assert!(session.wait_for_setup(Duration::from_secs(10)));

        let out = session.tick(&element, 1.0 / 60.0);
        assert_eq!(session.mirror_state(), MirrorState::Playing);
        assert!(out.has_audio);
        assert_eq!(out.frequency_magnitudes.as_ref().map(Vec::len), Some(1024));
        assert_eq!(out.time_domain_samples.as_ref().map(Vec::len), Some(2048));
        assert!(out.loudness.peak_db > -60.0);

        session.handle_event(ElementEvent::Pause, &element);
        let out = session.tick(&element, 1.0 / 60.0);
        assert!(!out.has_audio);
        assert!(out.frequency_magnitudes.is_none());

        element.position = 1.0;
        session.handle_event(ElementEvent::Play, &element);
        assert_eq!(session.mirror_state(), MirrorState::Playing);
    }

    #[test]
    fn test_tick_into_reuses_buffers() {
        let mut session = session_with_tone();
        let mut element = FakeElement {
            url: Some("tone.wav".to_string()),
            position: 0.5,
            paused: false,
        };
        let mut out = FrameOutput::idle(-60.0);
        session.tick_into(&element, 0.0, &mut out);
        assert!(session.wait_for_setup(Duration::from_secs(10)));

        session.tick_into(&element, 1.0 / 60.0, &mut out);
        assert!(out.has_audio);
        let freq_ptr = out.frequency_magnitudes.as_ref().map(|v| v.as_ptr());
        let time_ptr = out.time_domain_samples.as_ref().map(|v| v.as_ptr());
        let first = out.time_domain_samples.clone();

        element.position += 1.0 / 60.0;
        session.tick_into(&element, 1.0 / 60.0, &mut out);
        assert_eq!(out.frequency_magnitudes.as_ref().map(|v| v.as_ptr()), freq_ptr);
        assert_eq!(out.time_domain_samples.as_ref().map(|v| v.as_ptr()), time_ptr);
        assert_eq!(out.time_domain_samples.as_ref().map(Vec::len), Some(2048));
        assert_ne!(out.time_domain_samples, first);

        session.handle_event(ElementEvent::Pause, &element);
        session.tick_into(&element, 1.0 / 60.0, &mut out);
        assert!(!out.has_audio);
        assert!(out.frequency_magnitudes.is_none());
        assert!(out.time_domain_samples.is_none());
    }

    #[test]
    fn test_paused_element_stays_armed() {
        let mut session = session_with_tone();
        let element = FakeElement {
            url: Some("tone.wav".to_string()),
            position: 0.0,
            paused: true,
        };
        session.tick(&element, 0.0);
        assert!(session.wait_for_setup(Duration::from_secs(10)));
        session.tick(&element, 1.0 / 60.0);
        assert_eq!(session.mirror_state(), MirrorState::Armed);
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let mut session = session_with_tone();
        session.bind("tone.wav");
        assert!(session.wait_for_setup(Duration::from_secs(10)));
        session.teardown();
        let generation = session.generation();
        session.teardown();
        session.teardown();
        assert_eq!(session.generation(), generation);
        assert!(session.latest_estimate().is_none());
        assert_eq!(session.loudness_state().integrated_sample_count, 0);
    }

    #[test]
    fn test_non_finite_dt_is_ignored() {
        let mut session = session_with_tone();
        let element = FakeElement {
            url: Some("tone.wav".to_string()),
            position: 0.5,
            paused: false,
        };
        session.tick(&element, 0.0);
        assert!(session.wait_for_setup(Duration::from_secs(10)));
        let out = session.tick(&element, f64::NAN);
        assert!((-60.0..=0.0).contains(&out.loudness.peak_db));
        let out = session.tick(&element, -1.0);
        assert!((-60.0..=0.0).contains(&out.loudness.integrated_db));
    }
}
