//! WAV loading for master call assets.
//!
//! Master calls ship as WAV files of varying rates and channel counts; this
//! module normalizes them to mono f32 at the session sample rate.

use crate::error::{CallMatchError, Result};
use std::io::Read;
use std::path::Path;

/// Reads a WAV file and returns mono samples in [-1, 1] at `target_rate`.
pub fn read_master_wav(path: &Path, target_rate: u32) -> Result<Vec<f32>> {
    let file = std::fs::File::open(path)?;
    read_master_from(Box::new(std::io::BufReader::new(file)), target_rate)
}

/// Reads WAV data from any reader (for testing/flexibility).
pub fn read_master_from(reader: Box<dyn Read>, target_rate: u32) -> Result<Vec<f32>> {
    let mut wav_reader = hound::WavReader::new(reader).map_err(|e| CallMatchError::InvalidAudio {
        message: format!("Failed to parse WAV file: {}", e),
    })?;

    let spec = wav_reader.spec();
    let source_rate = spec.sample_rate;
    let channels = spec.channels.max(1) as usize;

    let raw: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => wav_reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| CallMatchError::InvalidAudio {
                message: format!("Failed to read WAV samples: {}", e),
            })?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            wav_reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| CallMatchError::InvalidAudio {
                    message: format!("Failed to read WAV samples: {}", e),
                })?
        }
    };

    // Downmix to mono by averaging channels.
    let mono: Vec<f32> = if channels == 1 {
        raw
    } else {
        raw.chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    if mono.is_empty() {
        return Err(CallMatchError::InvalidAudio {
            message: "WAV file contains no samples".to_string(),
        });
    }

    Ok(resample(&mono, source_rate, target_rate))
}

/// Simple linear interpolation resampling.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let src_pos = i as f64 * ratio;
            let idx = src_pos as usize;
            let frac = (src_pos - idx as f64) as f32;

            if idx + 1 < samples.len() {
                samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
            } else {
                samples[samples.len() - 1]
            }
        })
        .collect()
}
