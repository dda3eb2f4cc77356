//! MFCC feature extraction.
//!
//! Converts runs of active samples into compact cepstral descriptors: Hann
//! window, power spectrum, mel filterbank, log, DCT-II, optional liftering
//! and log-energy. Extraction is purely functional over (samples, config);
//! the same extractor serves batch master-call profiling and incremental
//! live extraction via [`StreamingExtractor`].

use crate::config::FeatureConfig;
use crate::defaults::{LOG_EPSILON, MEL_FLOOR_RATIO};
use crate::features::mel::{mel_filterbank, PowerSpectrum};

/// One frame's worth of cepstral coefficients.
pub type FeatureFrame = Vec<f32>;

/// Stateless MFCC extractor for a fixed configuration and sample rate.
pub struct MfccExtractor {
    frame_len: usize,
    hop_len: usize,
    num_coefficients: usize,
    include_energy: bool,
    spectrum: PowerSpectrum,
    filterbank: Vec<Vec<f64>>,
    /// DCT-II basis, `[num_coefficients][num_filters]`, orthonormal scaling.
    dct: Vec<Vec<f64>>,
    /// Sinusoidal lifter weights per coefficient; empty when disabled.
    lifter: Vec<f64>,
}

impl MfccExtractor {
    pub fn new(config: &FeatureConfig, sample_rate: u32) -> Self {
        let frame_len = config.frame_len(sample_rate).max(1);
        let hop_len = config.hop_len(sample_rate).max(1);
        let spectrum = PowerSpectrum::new(frame_len);

        let high_freq = if config.high_freq > 0.0 {
            config.high_freq as f64
        } else {
            sample_rate as f64 / 2.0
        };
        let filterbank = mel_filterbank(
            config.num_filters,
            spectrum.fft_size(),
            sample_rate,
            config.low_freq as f64,
            high_freq,
        );

        let m = config.num_filters;
        let dct = (0..config.num_coefficients)
            .map(|k| {
                let scale = if k == 0 {
                    (1.0 / m as f64).sqrt()
                } else {
                    (2.0 / m as f64).sqrt()
                };
                (0..m)
                    .map(|n| {
                        scale
                            * (std::f64::consts::PI * k as f64 * (n as f64 + 0.5) / m as f64).cos()
                    })
                    .collect()
            })
            .collect();

        let lifter = if config.lifter_coeff > 0 {
            let l = config.lifter_coeff as f64;
            (0..config.num_coefficients)
                .map(|k| 1.0 + (l / 2.0) * (std::f64::consts::PI * k as f64 / l).sin())
                .collect()
        } else {
            Vec::new()
        };

        Self {
            frame_len,
            hop_len,
            num_coefficients: config.num_coefficients,
            include_energy: config.include_energy,
            spectrum,
            filterbank,
            dct,
            lifter,
        }
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    pub fn hop_len(&self) -> usize {
        self.hop_len
    }

    pub fn num_coefficients(&self) -> usize {
        self.num_coefficients
    }

    /// Extracts features for every complete frame in `samples`.
    ///
    /// A trailing region shorter than one frame is ignored; streaming
    /// callers carry it via [`StreamingExtractor`] instead.
    pub fn extract(&self, samples: &[f32]) -> Vec<FeatureFrame> {
        if samples.len() < self.frame_len {
            return Vec::new();
        }

        let num_frames = (samples.len() - self.frame_len) / self.hop_len + 1;
        let mut frames = Vec::with_capacity(num_frames);
        for f in 0..num_frames {
            let offset = f * self.hop_len;
            frames.push(self.frame_features(&samples[offset..offset + self.frame_len]));
        }
        frames
    }

    /// Computes the coefficients of a single frame.
    ///
    /// `frame` must have exactly `frame_len()` samples. The epsilon floor
    /// before each logarithm keeps silent frames finite.
    pub fn frame_features(&self, frame: &[f32]) -> FeatureFrame {
        let power = self.spectrum.compute(frame);

        let energies: Vec<f64> = self
            .filterbank
            .iter()
            .map(|filter| filter.iter().zip(power.iter()).map(|(w, p)| w * p).sum())
            .collect();

        // Floor each band relative to the frame's strongest band, so bands
        // with no real signal land on the same log energy whether the source
        // was float-clean or quantized.
        let max_energy = energies.iter().cloned().fold(0.0f64, f64::max);
        let floor = (max_energy * MEL_FLOOR_RATIO).max(LOG_EPSILON as f64);
        let log_mel: Vec<f64> = energies.iter().map(|&e| e.max(floor).ln()).collect();

        let mut coeffs: Vec<f32> = self
            .dct
            .iter()
            .map(|basis| {
                let c: f64 = basis.iter().zip(log_mel.iter()).map(|(b, x)| b * x).sum();
                c as f32
            })
            .collect();

        if !self.lifter.is_empty() {
            for (c, l) in coeffs.iter_mut().zip(self.lifter.iter()) {
                *c *= *l as f32;
            }
        }

        if self.include_energy {
            let mean_square: f64 = frame
                .iter()
                .map(|&s| s as f64 * s as f64)
                .sum::<f64>()
                / frame.len() as f64;
            coeffs[0] = mean_square.max(LOG_EPSILON as f64).ln() as f32;
        }

        coeffs
    }
}

/// Incremental wrapper that carries the unconsumed sample tail between
/// calls, so chunk boundaries never drop frames.
pub struct StreamingExtractor {
    extractor: MfccExtractor,
    tail: Vec<f32>,
}

impl StreamingExtractor {
    pub fn new(extractor: MfccExtractor) -> Self {
        Self {
            extractor,
            tail: Vec::new(),
        }
    }

    /// Feeds new samples and returns the frames that became complete.
    ///
    /// Feeding a buffer in arbitrary slices yields exactly the frames of a
    /// single batch `extract` over the concatenation.
    pub fn push(&mut self, samples: &[f32]) -> Vec<FeatureFrame> {
        self.tail.extend_from_slice(samples);
        if self.tail.len() < self.extractor.frame_len() {
            return Vec::new();
        }

        let frames = self.extractor.extract(&self.tail);
        let consumed = frames.len() * self.extractor.hop_len();
        self.tail.drain(..consumed);
        frames
    }

    /// Number of buffered samples not yet emitted as a frame.
    pub fn pending(&self) -> usize {
        self.tail.len()
    }

    pub fn extractor(&self) -> &MfccExtractor {
        &self.extractor
    }

    pub fn reset(&mut self) {
        self.tail.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_feature_config() -> FeatureConfig {
        FeatureConfig {
            frame_ms: 25,
            hop_ms: 10,
            num_filters: 26,
            num_coefficients: 13,
            include_energy: true,
            lifter_coeff: 22,
            low_freq: 0.0,
            high_freq: 0.0,
        }
    }

    const RATE: u32 = 16_000;

    fn tone(samples: usize, freq: f32) -> Vec<f32> {
        (0..samples)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / RATE as f32).sin())
            .collect()
    }

    #[test]
    fn test_frame_count_and_width() {
        let extractor = MfccExtractor::new(&test_feature_config(), RATE);
        // 1 second: (16000 - 400) / 160 + 1 = 98 frames.
        let frames = extractor.extract(&tone(16_000, 440.0));
        assert_eq!(frames.len(), 98);
        assert!(frames.iter().all(|f| f.len() == 13));
    }

    #[test]
    fn test_too_few_samples_yield_nothing() {
        let extractor = MfccExtractor::new(&test_feature_config(), RATE);
        assert!(extractor.extract(&tone(399, 440.0)).is_empty());
    }

    #[test]
    fn test_silence_produces_finite_features() {
        let extractor = MfccExtractor::new(&test_feature_config(), RATE);
        let frames = extractor.extract(&vec![0.0f32; 16_000]);
        assert!(!frames.is_empty());
        for frame in &frames {
            assert!(
                frame.iter().all(|c| c.is_finite()),
                "silent frames must not produce NaN/Inf"
            );
        }
    }

    #[test]
    fn test_different_tones_differ() {
        let extractor = MfccExtractor::new(&test_feature_config(), RATE);
        let a = extractor.frame_features(&tone(400, 440.0));
        let b = extractor.frame_features(&tone(400, 3_000.0));
        let dist: f32 = a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt();
        assert!(dist > 1.0, "distinct tones should be far apart, got {dist}");
    }

    #[test]
    fn test_quantized_audio_barely_moves_features() {
        // A 16-bit round trip adds noise around 1e-9 mean-square to bands
        // that carry no tone energy; the relative band floor must keep those
        // bands on the same log energy as the clean signal.
        let extractor = MfccExtractor::new(&test_feature_config(), RATE);
        let clean = tone(400, 440.0);
        let quantized: Vec<f32> = clean
            .iter()
            .map(|&s| (s * 32767.0).round() / 32768.0)
            .collect();

        let a = extractor.frame_features(&clean);
        let b = extractor.frame_features(&quantized);
        let dist: f32 = a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt();
        assert!(dist < 0.5, "quantization shifted the frame by {dist}");
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = MfccExtractor::new(&test_feature_config(), RATE);
        let frame = tone(400, 440.0);
        assert_eq!(extractor.frame_features(&frame), extractor.frame_features(&frame));
    }

    #[test]
    fn test_energy_coefficient_tracks_amplitude() {
        let extractor = MfccExtractor::new(&test_feature_config(), RATE);
        let loud = extractor.frame_features(&tone(400, 440.0));
        let quiet: Vec<f32> = tone(400, 440.0).iter().map(|s| s * 0.1).collect();
        let quiet = extractor.frame_features(&quiet);
        assert!(
            loud[0] > quiet[0],
            "c0 log energy should drop with amplitude: {} vs {}",
            loud[0],
            quiet[0]
        );
    }

    #[test]
    fn test_streaming_matches_batch() {
        let config = test_feature_config();
        let audio = tone(16_000, 440.0);

        let batch = MfccExtractor::new(&config, RATE).extract(&audio);

        let mut streaming = StreamingExtractor::new(MfccExtractor::new(&config, RATE));
        let mut collected = Vec::new();
        for chunk in audio.chunks(333) {
            collected.extend(streaming.push(chunk));
        }

        assert_eq!(batch.len(), collected.len());
        for (b, c) in batch.iter().zip(collected.iter()) {
            for (x, y) in b.iter().zip(c.iter()) {
                assert!((x - y).abs() < 1e-6, "streaming diverged from batch");
            }
        }
    }

    #[test]
    fn test_streaming_tail_is_bounded() {
        let config = test_feature_config();
        let mut streaming = StreamingExtractor::new(MfccExtractor::new(&config, RATE));
        for chunk in tone(160_000, 440.0).chunks(1_234) {
            streaming.push(chunk);
        }
        // The tail never holds more than one frame plus one hop of samples.
        assert!(streaming.pending() < 400 + 160);
    }

    #[test]
    fn test_streaming_reset() {
        let config = test_feature_config();
        let mut streaming = StreamingExtractor::new(MfccExtractor::new(&config, RATE));
        streaming.push(&tone(200, 440.0));
        assert!(streaming.pending() > 0);
        streaming.reset();
        assert_eq!(streaming.pending(), 0);
    }
}
