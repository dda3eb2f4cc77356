//! Audio level metering.
//!
//! RMS and peak measurement over sample buffers, plus a smoothed meter for
//! host-side level displays.

/// Calculates the Root Mean Square (RMS) of audio samples.
///
/// Samples are expected in [-1.0, 1.0]. Returns a value in [0.0, 1.0]:
/// 0.0 for silence, ~0.707 for a full-scale sine wave.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples.iter().map(|&s| s as f64 * s as f64).sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}

/// Mean-square energy of a buffer, the quantity the VAD thresholds on.
pub fn energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples.iter().map(|&s| s as f64 * s as f64).sum();
    (sum_squares / samples.len() as f64) as f32
}

/// Peak absolute sample value in a buffer.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()))
}

/// Smoothed level meter with fast attack and slow release, so a host UI
/// meter jumps on onsets and decays readably.
#[derive(Debug, Clone, Copy)]
pub struct LevelMeter {
    attack: f32,
    release: f32,
    current: f32,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self {
            attack: 0.6,
            release: 0.1,
            current: 0.0,
        }
    }

    /// Feeds one chunk and returns the smoothed RMS level.
    pub fn update(&mut self, samples: &[f32]) -> f32 {
        let level = rms(samples);
        let coeff = if level > self.current {
            self.attack
        } else {
            self.release
        };
        self.current += coeff * (level - self.current);
        self.current
    }

    /// Most recent smoothed level without feeding new audio.
    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = 0.0;
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new()
    }
}
