//! Example: Play one audio file through a simulated element
//!
//! Usage:
//!   cargo run --release --example analyze_file -- <file>
//!
//! Ticks the session at 60 Hz (faster than real time) and prints a coarse
//! spectrum, loudness, and the key overlay once per simulated second.

use std::env;
use std::sync::Arc;
use std::time::Duration;
use stratum_live::{AudioSession, BarSmoother, EngineConfig, FileFetcher, MediaElement, MirrorState};

const FRAME_DT: f64 = 1.0 / 60.0;
const BARS: usize = 24;

struct SimulatedElement {
    url: String,
    position: f64,
}

impl MediaElement for SimulatedElement {
    fn source_url(&self) -> Option<&str> {
        Some(&self.url)
    }
    fn current_time(&self) -> f64 {
        self.position
    }
    fn is_paused(&self) -> bool {
        false
    }
}

/// Average magnitude bins into `bars` log-spaced bands
fn to_bars(magnitudes: &[f32], bars: usize) -> Vec<f32> {
    let n = magnitudes.len().max(1) as f32;
    (0..bars)
        .map(|b| {
            let lo = (n.powf(b as f32 / bars as f32) as usize).min(magnitudes.len());
            let hi = (n.powf((b + 1) as f32 / bars as f32) as usize)
                .max(lo + 1)
                .min(magnitudes.len());
            let band = &magnitudes[lo..hi];
            if band.is_empty() {
                0.0
            } else {
                band.iter().sum::<f32>() / band.len() as f32
            }
        })
        .collect()
}

fn render_bars(values: &[f32]) -> String {
    const LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
    values
        .iter()
        .map(|&v| LEVELS[((v.clamp(0.0, 1.0) * 7.0).round() as usize).min(7)])
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let path = env::args().nth(1).ok_or("Usage: analyze_file <file>")?;

    let mut session = AudioSession::new(EngineConfig::default(), Arc::new(FileFetcher::new()))?;
    let mut element = SimulatedElement {
        url: path.clone(),
        position: 0.0,
    };
    let mut bars = BarSmoother::new(BARS, 0.6, 0.15);

    session.tick(&element, 0.0);
    if !session.wait_for_setup(Duration::from_secs(120)) {
        return Err("Timed out loading audio".into());
    }

    let mut frame_index = 0u64;
    loop {
        let out = session.tick(&element, FRAME_DT);
        element.position += FRAME_DT;
        frame_index += 1;

        let heights = out
            .frequency_magnitudes
            .as_deref()
            .map(|m| to_bars(m, BARS))
            .unwrap_or_default();
        bars.update(&heights);

        if frame_index % 60 == 0 {
            let key = out
                .key_info
                .as_ref()
                .map(|k| {
                    format!(
                        "{} {} [{}] conf={} drift={}{}",
                        k.key,
                        k.mode,
                        k.camelot_label,
                        k.confidence,
                        k.drift_magnitude,
                        k.drift_message
                            .as_deref()
                            .map(|m| format!(" ({})", m))
                            .unwrap_or_default()
                    )
                })
                .unwrap_or_else(|| "--".to_string());
            println!(
                "{:>6.1}s {} peak={:>6.1} dB int={:>6.1} dB key={}",
                element.position,
                render_bars(bars.values()),
                out.loudness.peak_db,
                out.loudness.integrated_db,
                key
            );
        }

        if session.mirror_state() != MirrorState::Playing {
            break;
        }
    }

    match session.established_key() {
        Some((key, mode)) => println!("Established key: {} {}", key, mode),
        None => println!("No key established"),
    }
    if !session.source().is_ready() {
        eprintln!("No audio data for {}", path);
    }

    Ok(())
}
