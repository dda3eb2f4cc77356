//! VAD gating of incoming audio.
//!
//! Splits arbitrary-length chunks into fixed VAD windows and forwards only
//! the samples that belong to an active region:
//! - leading silence never passes;
//! - onset windows are buffered and released once activity is confirmed, so
//!   the start of a call is not clipped;
//! - hangover windows are buffered and released only if the call resumes, so
//!   short internal pauses are retained but trailing silence is dropped.
//!
//! Samples shorter than one window are carried to the next chunk, so window
//! boundaries are independent of how the host slices its chunks.

use crate::audio::vad::{Vad, VadStatus, WindowDecision};
use crate::config::VadConfig;

/// Gate that turns raw chunks into active-region sample runs.
pub struct ChunkGate {
    vad: Vad,
    window_len: usize,
    /// Samples not yet forming a complete VAD window.
    pending: Vec<f32>,
    /// Windows seen during onset, released when activity is confirmed.
    onset_buffer: Vec<f32>,
    /// Windows seen during hangover, released if the call resumes.
    hangover_buffer: Vec<f32>,
}

impl ChunkGate {
    pub fn new(config: VadConfig, sample_rate: u32) -> Self {
        let window_len = config.window_len(sample_rate).max(1);
        Self {
            vad: Vad::new(config),
            window_len,
            pending: Vec::new(),
            onset_buffer: Vec::new(),
            hangover_buffer: Vec::new(),
        }
    }

    /// Feeds one chunk and returns the samples that belong to active regions.
    pub fn process(&mut self, chunk: &[f32]) -> Vec<f32> {
        self.pending.extend_from_slice(chunk);

        let mut out = Vec::new();
        let mut consumed = 0;
        while self.pending.len() - consumed >= self.window_len {
            let window = &self.pending[consumed..consumed + self.window_len];
            match self.vad.process_window(window) {
                WindowDecision::Silence => {
                    self.onset_buffer.clear();
                    self.hangover_buffer.clear();
                }
                WindowDecision::Onset => {
                    self.onset_buffer.extend_from_slice(window);
                }
                WindowDecision::Active => {
                    out.append(&mut self.onset_buffer);
                    out.append(&mut self.hangover_buffer);
                    out.extend_from_slice(window);
                }
                WindowDecision::Hangover => {
                    self.hangover_buffer.extend_from_slice(window);
                }
            }
            consumed += self.window_len;
        }
        self.pending.drain(..consumed);

        out
    }

    /// Current detector status, side-effect free.
    pub fn status(&self) -> VadStatus {
        self.vad.status()
    }

    /// Resets the gate and its detector.
    pub fn reset(&mut self) {
        self.vad.reset();
        self.pending.clear();
        self.onset_buffer.clear();
        self.hangover_buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> VadConfig {
        VadConfig {
            energy_threshold: 0.0001,
            threshold_ratio: 3.0,
            window_ms: 20,
            min_sound_ms: 60, // 3 windows of 320 samples at 16kHz
            hangover_ms: 40,  // 2 windows
        }
    }

    const RATE: u32 = 16_000;
    const WIN: usize = 320;

    fn tone(samples: usize) -> Vec<f32> {
        (0..samples)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / RATE as f32).sin())
            .collect()
    }

    fn silence(samples: usize) -> Vec<f32> {
        vec![0.0f32; samples]
    }

    #[test]
    fn test_leading_silence_excluded() {
        let mut gate = ChunkGate::new(test_config(), RATE);
        let out = gate.process(&silence(WIN * 10));
        assert!(out.is_empty());
    }

    #[test]
    fn test_onset_samples_released_on_confirmation() {
        let mut gate = ChunkGate::new(test_config(), RATE);
        // 3 voiced windows: nothing emitted until the third confirms.
        assert!(gate.process(&tone(WIN)).is_empty());
        assert!(gate.process(&tone(WIN)).is_empty());
        let out = gate.process(&tone(WIN));
        assert_eq!(out.len(), WIN * 3, "onset buffer must flush with the confirming window");
    }

    #[test]
    fn test_transient_never_emitted() {
        let mut gate = ChunkGate::new(test_config(), RATE);
        assert!(gate.process(&tone(WIN)).is_empty());
        assert!(gate.process(&silence(WIN)).is_empty());
        // Later silence should not release the discarded transient.
        assert!(gate.process(&silence(WIN * 5)).is_empty());
    }

    #[test]
    fn test_trailing_silence_excluded() {
        let mut gate = ChunkGate::new(test_config(), RATE);
        gate.process(&tone(WIN * 3));
        let out = gate.process(&silence(WIN * 10));
        assert!(out.is_empty(), "hangover samples must not pass once the call ends");
    }

    #[test]
    fn test_internal_pause_retained() {
        let mut gate = ChunkGate::new(test_config(), RATE);
        gate.process(&tone(WIN * 3));
        // One silent window (within hangover), then voice resumes.
        assert!(gate.process(&silence(WIN)).is_empty());
        let out = gate.process(&tone(WIN));
        assert_eq!(
            out.len(),
            WIN * 2,
            "the internal pause and the resuming window both pass"
        );
    }

    #[test]
    fn test_partial_windows_carried_across_chunks() {
        let mut gate = ChunkGate::new(test_config(), RATE);
        let voiced = tone(WIN * 3);
        // Deliver the same audio in odd-sized slices.
        let mut emitted = 0;
        for chunk in voiced.chunks(77) {
            emitted += gate.process(chunk).len();
        }
        // Only complete windows can have been classified.
        assert_eq!(emitted, WIN * 3 / WIN * WIN);
    }

    #[test]
    fn test_chunk_slicing_invariance() {
        let config = test_config();
        let audio: Vec<f32> = silence(WIN * 4)
            .into_iter()
            .chain(tone(WIN * 12))
            .chain(silence(WIN * 8))
            .collect();

        let mut whole = ChunkGate::new(config.clone(), RATE);
        let expected = whole.process(&audio);

        let mut sliced = ChunkGate::new(config, RATE);
        let mut got = Vec::new();
        for chunk in audio.chunks(501) {
            got.extend(sliced.process(chunk));
        }
        assert_eq!(expected, got);
    }

    #[test]
    fn test_reset() {
        let mut gate = ChunkGate::new(test_config(), RATE);
        gate.process(&tone(WIN * 3));
        gate.reset();
        assert!(!gate.status().active);
        assert!(gate.process(&silence(WIN)).is_empty());
    }
}
