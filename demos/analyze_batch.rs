//! Example: Run many files through simulated live sessions in parallel
//!
//! Usage:
//!   cargo run --release --example analyze_batch -- [--jobs N] [--json] <file1> <file2> ...
//!
//! Notes:
//! - Parallelism is across files. Each session still processes its frames in order.
//! - Default workers: (available CPU threads - 1), keeping one core free for the system.

use rayon::prelude::*;
use serde::Serialize;
use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};
use stratum_live::{
    AudioSession, EngineConfig, FileFetcher, KeyInfo, MediaElement, MirrorState,
};

const FRAME_DT: f64 = 1.0 / 60.0;

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

#[derive(Debug, Serialize)]
struct ItemOut {
    file: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<KeyInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    established: Option<String>,
    integrated_db: f32,
    frames: u64,
    processing_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn default_jobs() -> usize {
    let n = std::thread::available_parallelism().map(|v| v.get()).unwrap_or(1);
    std::cmp::max(1, n.saturating_sub(1))
}

fn analyze_one(path: &str, config: &EngineConfig) -> ItemOut {
    let t0 = Instant::now();
    let failed = |error: String| ItemOut {
        file: path.to_string(),
        ok: false,
        key: None,
        established: None,
        integrated_db: config.loudness_floor_db,
        frames: 0,
        processing_ms: t0.elapsed().as_secs_f64() * 1000.0,
        error: Some(error),
    };

    let mut session = match AudioSession::new(config.clone(), Arc::new(FileFetcher::new())) {
        Ok(session) => session,
        Err(e) => return failed(format!("session failed: {e}")),
    };
    let mut element = SimulatedElement {
        url: path.to_string(),
        position: 0.0,
    };

    session.tick(&element, 0.0);
    if !session.wait_for_setup(Duration::from_secs(120)) {
        return failed("timed out loading".to_string());
    }
    if !session.source().is_ready() {
        return failed("fetch or decode failed".to_string());
    }

    let mut frames = 0u64;
    let mut last_key = None;
    let mut integrated_db = config.loudness_floor_db;
    loop {
        let out = session.tick(&element, FRAME_DT);
        element.position += FRAME_DT;
        frames += 1;
        integrated_db = out.loudness.integrated_db;
        if out.key_info.is_some() {
            last_key = out.key_info;
        }
        if session.mirror_state() != MirrorState::Playing {
            break;
        }
    }

    ItemOut {
        file: path.to_string(),
        ok: true,
        key: last_key,
        established: session
            .established_key()
            .map(|(key, mode)| format!("{} {}", key, mode)),
        integrated_db,
        frames,
        processing_ms: t0.elapsed().as_secs_f64() * 1000.0,
        error: None,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let mut json = false;
    let mut jobs: Option<usize> = None;
    let mut paths: Vec<String> = Vec::new();

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--jobs" => {
                let v = args
                    .first()
                    .ok_or("--jobs requires a value")?
                    .parse::<usize>()?;
                args.remove(0);
                jobs = Some(std::cmp::max(1, v));
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: analyze_batch [--jobs N] [--json] <file1> <file2> ...\n\
                     \n\
                     --jobs N   Parallel workers (default: CPU-1)\n\
                     --json     Emit one JSON object per line (JSONL)\n"
                );
                return Ok(());
            }
            _ => paths.push(a),
        }
    }

    if paths.is_empty() {
        eprintln!("ERROR: Provide at least one audio file path. Use --help for usage.");
        std::process::exit(2);
    }

    let jobs = jobs.unwrap_or_else(default_jobs);
    eprintln!("Batch: {} files, jobs={}", paths.len(), jobs);

    let config = EngineConfig::default();
    let t0 = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;

    let outs: Vec<ItemOut> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| analyze_one(path, &config))
            .collect()
    });

    for (idx, o) in outs.iter().enumerate() {
        if json {
            println!("{}", serde_json::to_string(o)?);
        } else if let Some(err) = &o.error {
            println!("[{}/{}] {}: ERROR {}", idx + 1, outs.len(), o.file, err);
        } else {
            let key = o
                .key
                .as_ref()
                .map(|k| format!("{} {} [{}] conf={}", k.key, k.mode, k.camelot_label, k.confidence))
                .unwrap_or_else(|| "--".to_string());
            println!(
                "[{}/{}] {}: Key={} Integrated={:.1} dB frames={} time={:.2}ms",
                idx + 1,
                outs.len(),
                o.file,
                key,
                o.integrated_db,
                o.frames,
                o.processing_ms
            );
        }
    }

    let ok = outs.iter().filter(|o| o.ok).count();
    eprintln!(
        "Done: {}/{} ok in {:.2}s",
        ok,
        outs.len(),
        t0.elapsed().as_secs_f64()
    );

    Ok(())
}
