//! Audio decoding using Symphonia
//!
//! The session decodes the whole resource up front so the mirrored playback
//! can seek anywhere without touching the network again.

use super::sample_buffer::DecodedAudio;
use crate::error::AnalysisError;
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer as PcmBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};

/// Decode an encoded audio resource held in memory to mono PCM
///
/// All channels are averaged into one. Packets that fail to decode are
/// skipped (corrupted frames are common in the wild).
///
/// # Arguments
///
/// * `bytes` - Complete encoded resource
/// * `extension_hint` - File extension used to speed up format probing (e.g., "mp3")
///
/// # Returns
///
/// Mono samples normalized to [-1.0, 1.0] with their sample rate
///
/// # Errors
///
/// Returns `AnalysisError::DecodingError` if the container is not recognised,
/// contains no audio track, or yields no samples.
pub fn decode_audio_bytes(
    bytes: Vec<u8>,
    extension_hint: Option<&str>,
) -> Result<DecodedAudio, AnalysisError> {
    log::debug!(
        "Decoding {} bytes (hint: {})",
        bytes.len(),
        extension_hint.unwrap_or("none")
    );

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension_hint {
        hint.with_extension(ext);
    }

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AnalysisError::DecodingError("No supported audio tracks found".to_string()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let mut decoder = get_codecs().make(&codec_params, &DecoderOptions::default())?;

    let mut sample_rate = codec_params.sample_rate;
    let mut mono: Vec<f32> = Vec::new();
    let mut pcm: Option<PcmBuffer<f32>> = None;
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let channels = spec.channels.count().max(1);
                sample_rate.get_or_insert(spec.rate);

                let frames = decoded.capacity();
                let too_small = pcm
                    .as_ref()
                    .map_or(true, |buf| buf.capacity() < frames * channels);
                if too_small {
                    pcm = Some(PcmBuffer::new(frames as u64, spec));
                }

                if let Some(buf) = pcm.as_mut() {
                    buf.copy_interleaved_ref(decoded);
                    downmix_interleaved(buf.samples(), channels, &mut mono);
                }
            }
            Err(SymphoniaError::DecodeError(msg)) => {
                skipped_packets += 1;
                log::debug!("Skipping undecodable packet: {}", msg);
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }

    if skipped_packets > 0 {
        log::warn!("Skipped {} corrupted packets while decoding", skipped_packets);
    }

    let sample_rate = sample_rate
        .filter(|&rate| rate > 0)
        .ok_or_else(|| AnalysisError::DecodingError("Unknown sample rate".to_string()))?;

    if mono.is_empty() {
        return Err(AnalysisError::DecodingError(
            "No audio samples decoded".to_string(),
        ));
    }

    log::debug!(
        "Decoded {} samples at {} Hz ({:.2}s)",
        mono.len(),
        sample_rate,
        mono.len() as f32 / sample_rate as f32
    );

    Ok(DecodedAudio::new(mono, sample_rate))
}

/// Average interleaved frames into mono and append them to `out`
pub fn downmix_interleaved(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    let scale = 1.0 / channels as f32;
    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(samples: &[i16], channels: u16, sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_downmix_stereo() {
        let mut out = Vec::new();
        downmix_interleaved(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2, &mut out);
        assert_eq!(out, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_downmix_mono_passthrough() {
        let mut out = vec![0.25];
        downmix_interleaved(&[1.0, -1.0], 1, &mut out);
        assert_eq!(out, vec![0.25, 1.0, -1.0]);
    }

    #[test]
    fn test_decode_mono_wav() {
        let samples: Vec<i16> = (0..8000).map(|i| if i % 2 == 0 { 16384 } else { -16384 }).collect();
        let bytes = wav_bytes(&samples, 1, 8000);

        let audio = decode_audio_bytes(bytes, Some("wav")).unwrap();
        assert_eq!(audio.sample_rate(), 8000);
        assert_eq!(audio.len(), 8000);
        assert!((audio.samples()[0] - 0.5).abs() < 1e-3);
        assert!((audio.samples()[1] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_decode_stereo_wav_is_averaged() {
        // Left full positive, right silent
        let samples: Vec<i16> = (0..2000).flat_map(|_| [16384i16, 0]).collect();
        let bytes = wav_bytes(&samples, 2, 22050);

        let audio = decode_audio_bytes(bytes, None).unwrap();
        assert_eq!(audio.sample_rate(), 22050);
        assert_eq!(audio.len(), 2000);
        assert!(audio.samples().iter().all(|&s| (s - 0.25).abs() < 1e-3));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = decode_audio_bytes(vec![0x42; 512], Some("wav"));
        assert!(result.is_err());
    }
}
