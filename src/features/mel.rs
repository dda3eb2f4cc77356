//! Spectral building blocks: analysis window, power spectrum, mel filterbank.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Create periodic Hann window.
pub fn hann_window(size: usize) -> Vec<f64> {
    let factor = 2.0 * std::f64::consts::PI / size as f64;
    (0..size)
        .map(|i| 0.5 - 0.5 * (i as f64 * factor).cos())
        .collect()
}

/// Next power of two at or above `n`.
pub fn next_pow2(n: usize) -> usize {
    let mut p = 1;
    while p < n {
        p <<= 1;
    }
    p
}

fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10.0_f64.powf(mel / 2595.0) - 1.0)
}

/// Computes triangular mel filterbank weights.
/// Returns `[num_filters][fft_size / 2 + 1]` weights.
pub fn mel_filterbank(
    num_filters: usize,
    fft_size: usize,
    sample_rate: u32,
    low_freq: f64,
    high_freq: f64,
) -> Vec<Vec<f64>> {
    let half_fft = fft_size / 2 + 1;
    let mel_low = hz_to_mel(low_freq);
    let mel_high = hz_to_mel(high_freq);

    // Equally spaced mel points.
    let mel_points: Vec<f64> = (0..num_filters + 2)
        .map(|i| mel_low + i as f64 * (mel_high - mel_low) / (num_filters + 1) as f64)
        .collect();

    // Convert back to Hz and then to FFT bin indices.
    let bin_indices: Vec<usize> = mel_points
        .iter()
        .map(|&m| {
            let hz = mel_to_hz(m);
            let bin = (hz * fft_size as f64 / sample_rate as f64).floor() as isize;
            bin.clamp(0, half_fft as isize - 1) as usize
        })
        .collect();

    // Build triangular filters.
    let mut fb = Vec::with_capacity(num_filters);
    for m in 0..num_filters {
        let mut filter = vec![0.0f64; half_fft];
        let left = bin_indices[m];
        let center = bin_indices[m + 1];
        let right = bin_indices[m + 2];

        if center > left {
            for k in left..=center {
                filter[k] = (k - left) as f64 / (center - left) as f64;
            }
        }
        if right > center {
            for k in center..=right {
                filter[k] = (right - k) as f64 / (right - center) as f64;
            }
        }
        fb.push(filter);
    }
    fb
}

/// Reusable power-spectrum transform for a fixed frame length.
///
/// Frames shorter than the FFT size are zero-padded; the plan is computed
/// once and shared, so per-frame work is just windowing plus the transform.
pub struct PowerSpectrum {
    fft: Arc<dyn Fft<f64>>,
    window: Vec<f64>,
    frame_len: usize,
    fft_size: usize,
}

impl PowerSpectrum {
    pub fn new(frame_len: usize) -> Self {
        let fft_size = next_pow2(frame_len);
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(fft_size);
        Self {
            fft,
            window: hann_window(frame_len),
            frame_len,
            fft_size,
        }
    }

    /// Number of frequency bins produced per frame.
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Computes |X[k]|^2 for one windowed frame.
    ///
    /// `frame` must have exactly the configured frame length.
    pub fn compute(&self, frame: &[f32]) -> Vec<f64> {
        debug_assert_eq!(frame.len(), self.frame_len);

        let mut buf: Vec<Complex<f64>> = (0..self.fft_size)
            .map(|i| {
                if i < self.frame_len {
                    Complex::new(frame[i] as f64 * self.window[i], 0.0)
                } else {
                    Complex::new(0.0, 0.0)
                }
            })
            .collect();

        self.fft.process(&mut buf);

        buf[..self.num_bins()].iter().map(|c| c.norm_sqr()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window_shape() {
        let window = hann_window(400);
        assert_eq!(window.len(), 400);
        assert!(window[0].abs() < 0.001);
        assert!((window[200] - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_next_pow2() {
        assert_eq!(next_pow2(1), 1);
        assert_eq!(next_pow2(400), 512);
        assert_eq!(next_pow2(512), 512);
        assert_eq!(next_pow2(1102), 2048);
    }

    #[test]
    fn test_mel_hz_roundtrip() {
        for &hz in &[0.0, 100.0, 440.0, 1000.0, 8000.0] {
            let back = mel_to_hz(hz_to_mel(hz));
            assert!((hz - back).abs() < 1e-6, "roundtrip failed for {hz}: got {back}");
        }
    }

    #[test]
    fn test_filterbank_shape_and_coverage() {
        let fb = mel_filterbank(26, 512, 16_000, 0.0, 8_000.0);
        assert_eq!(fb.len(), 26);
        assert_eq!(fb[0].len(), 257);

        // Every filter must have some weight.
        for (m, filter) in fb.iter().enumerate() {
            let sum: f64 = filter.iter().sum();
            assert!(sum > 0.0, "filter {m} is empty");
        }
    }

    #[test]
    fn test_tone_energy_lands_in_matching_filter() {
        let rate = 16_000u32;
        let spec = PowerSpectrum::new(400);
        let frame: Vec<f32> = (0..400)
            .map(|i| (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / rate as f32).sin())
            .collect();
        let power = spec.compute(&frame);

        let fb = mel_filterbank(26, spec.fft_size(), rate, 0.0, 8_000.0);
        let energies: Vec<f64> = fb
            .iter()
            .map(|f| f.iter().zip(power.iter()).map(|(w, p)| w * p).sum())
            .collect();

        let peak_filter = energies
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();

        // 1kHz sits in the lower-middle of a 26-filter bank over 0-8kHz mel.
        assert!(
            (5..16).contains(&peak_filter),
            "1kHz tone peaked in unexpected filter {peak_filter}"
        );
    }

    #[test]
    fn test_silent_frame_power_is_zero() {
        let spec = PowerSpectrum::new(400);
        let power = spec.compute(&vec![0.0f32; 400]);
        assert!(power.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_parseval_energy_conserved() {
        let spec = PowerSpectrum::new(512);
        let frame: Vec<f32> = (0..512)
            .map(|i| (2.0 * std::f32::consts::PI * 8.0 * i as f32 / 512.0).sin())
            .collect();

        let windowed_energy: f64 = frame
            .iter()
            .zip(hann_window(512).iter())
            .map(|(&s, &w)| {
                let v = s as f64 * w;
                v * v
            })
            .sum();

        let power = spec.compute(&frame);
        // Full-spectrum energy = bin 0 + 2 * interior bins + Nyquist bin.
        let mut freq_energy = power[0] + power[power.len() - 1];
        for &p in &power[1..power.len() - 1] {
            freq_energy += 2.0 * p;
        }

        assert!(
            (windowed_energy * 512.0 - freq_energy).abs() / freq_energy < 1e-9,
            "Parseval violated: {} vs {}",
            windowed_energy * 512.0,
            freq_energy
        );
    }
}
