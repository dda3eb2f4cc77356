//! Voice Activity Detection (VAD) module.
//!
//! Classifies fixed-length analysis windows as active or silence using
//! mean-square energy against an adaptive noise floor, with state machine
//! logic so call onsets and internal pauses are handled without chopping.
//!
//! Timing is counted in windows rather than wall-clock time: the engine is
//! driven by chunk delivery, so the same audio always produces the same
//! decisions regardless of how the host schedules it.

use std::collections::VecDeque;

use crate::audio::level::energy;
use crate::config::VadConfig;

/// Number of recent window energies tracked for the noise floor estimate.
const ENERGY_HISTORY: usize = 50;

/// Minimum history before the adaptive floor replaces the base threshold.
const MIN_HISTORY_FOR_FLOOR: usize = 5;

/// Current phase of the activity state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadPhase {
    /// No activity.
    Silence,
    /// Voice energy seen, but not yet long enough to confirm.
    Onset,
    /// Confirmed activity.
    Active,
    /// Silence seen during activity, within the hangover period.
    Hangover,
}

/// Classification of a single analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowDecision {
    /// Window is silence outside any active region.
    Silence,
    /// Window is voiced but activity is not yet confirmed.
    Onset,
    /// Window belongs to a confirmed active region.
    Active,
    /// Window is silence inside the hangover period of an active region.
    Hangover,
}

/// Snapshot of detector state, queryable without side effects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VadStatus {
    /// True while the detector is in an active region (including hangover).
    pub active: bool,
    /// Mean-square energy of the most recent window.
    pub energy: f32,
    /// Threshold currently in effect (adaptive floor times ratio, or base).
    pub threshold: f32,
}

/// Energy-based voice activity detector.
pub struct Vad {
    config: VadConfig,
    phase: VadPhase,
    voiced_windows: usize,
    hangover_left: usize,
    energy_history: VecDeque<f32>,
    threshold: f32,
    last_energy: f32,
}

impl Vad {
    pub fn new(config: VadConfig) -> Self {
        let threshold = config.energy_threshold;
        Self {
            config,
            phase: VadPhase::Silence,
            voiced_windows: 0,
            hangover_left: 0,
            energy_history: VecDeque::with_capacity(ENERGY_HISTORY),
            threshold,
            last_energy: 0.0,
        }
    }

    /// Classifies one analysis window and advances the state machine.
    pub fn process_window(&mut self, window: &[f32]) -> WindowDecision {
        let e = energy(window);
        self.last_energy = e;

        let is_voice = e > self.threshold;
        // Only non-voice windows feed the noise floor, so a sustained call
        // cannot drag the floor up and silence itself.
        if !is_voice {
            self.update_noise_floor(e);
        }

        match self.phase {
            VadPhase::Silence => {
                if is_voice {
                    self.voiced_windows = 1;
                    if self.voiced_windows >= self.config.min_sound_windows() {
                        self.phase = VadPhase::Active;
                        WindowDecision::Active
                    } else {
                        self.phase = VadPhase::Onset;
                        WindowDecision::Onset
                    }
                } else {
                    WindowDecision::Silence
                }
            }
            VadPhase::Onset => {
                if is_voice {
                    self.voiced_windows += 1;
                    if self.voiced_windows >= self.config.min_sound_windows() {
                        self.phase = VadPhase::Active;
                        WindowDecision::Active
                    } else {
                        WindowDecision::Onset
                    }
                } else {
                    // Transient too short to be a call.
                    self.phase = VadPhase::Silence;
                    self.voiced_windows = 0;
                    WindowDecision::Silence
                }
            }
            VadPhase::Active => {
                if is_voice {
                    WindowDecision::Active
                } else {
                    let hangover = self.config.hangover_windows();
                    if hangover == 0 {
                        self.phase = VadPhase::Silence;
                        self.voiced_windows = 0;
                        WindowDecision::Silence
                    } else {
                        self.phase = VadPhase::Hangover;
                        self.hangover_left = hangover;
                        WindowDecision::Hangover
                    }
                }
            }
            VadPhase::Hangover => {
                if is_voice {
                    self.phase = VadPhase::Active;
                    WindowDecision::Active
                } else if self.hangover_left > 1 {
                    self.hangover_left -= 1;
                    WindowDecision::Hangover
                } else {
                    self.phase = VadPhase::Silence;
                    self.voiced_windows = 0;
                    self.hangover_left = 0;
                    WindowDecision::Silence
                }
            }
        }
    }

    /// Returns the current status without processing audio.
    pub fn status(&self) -> VadStatus {
        VadStatus {
            active: matches!(self.phase, VadPhase::Active | VadPhase::Hangover),
            energy: self.last_energy,
            threshold: self.threshold,
        }
    }

    /// Returns the current state machine phase.
    pub fn phase(&self) -> VadPhase {
        self.phase
    }

    /// Resets the detector to silence with a fresh noise floor.
    pub fn reset(&mut self) {
        self.phase = VadPhase::Silence;
        self.voiced_windows = 0;
        self.hangover_left = 0;
        self.energy_history.clear();
        self.threshold = self.config.energy_threshold;
        self.last_energy = 0.0;
    }

    /// Updates the adaptive threshold from the 25th percentile of recent
    /// non-voice window energies.
    fn update_noise_floor(&mut self, e: f32) {
        self.energy_history.push_back(e);
        if self.energy_history.len() > ENERGY_HISTORY {
            self.energy_history.pop_front();
        }

        if self.energy_history.len() >= MIN_HISTORY_FOR_FLOOR {
            let mut sorted: Vec<f32> = self.energy_history.iter().copied().collect();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let noise_floor = sorted[sorted.len() / 4];
            self.threshold = self
                .config
                .energy_threshold
                .max(noise_floor * self.config.threshold_ratio);
        }
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
            min_sound_ms: 60, // 3 windows
            hangover_ms: 40,  // 2 windows
        }
    }

    fn silence_window() -> Vec<f32> {
        vec![0.0f32; 320]
    }

    fn voice_window() -> Vec<f32> {
        (0..320)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16_000.0).sin())
            .collect()
    }

    #[test]
    fn test_starts_silent() {
        let vad = Vad::new(test_config());
        assert_eq!(vad.phase(), VadPhase::Silence);
        assert!(!vad.status().active);
    }

    #[test]
    fn test_constant_zero_reports_silence_indefinitely() {
        let mut vad = Vad::new(test_config());
        for _ in 0..100 {
            assert_eq!(vad.process_window(&silence_window()), WindowDecision::Silence);
        }
        assert!(!vad.status().active);
    }

    #[test]
    fn test_onset_confirmed_after_min_sound() {
        let mut vad = Vad::new(test_config());
        let voice = voice_window();

        assert_eq!(vad.process_window(&voice), WindowDecision::Onset);
        assert_eq!(vad.process_window(&voice), WindowDecision::Onset);
        assert_eq!(vad.process_window(&voice), WindowDecision::Active);
        assert!(vad.status().active);
    }

    #[test]
    fn test_short_transient_discarded() {
        let mut vad = Vad::new(test_config());
        let voice = voice_window();

        assert_eq!(vad.process_window(&voice), WindowDecision::Onset);
        assert_eq!(vad.process_window(&silence_window()), WindowDecision::Silence);
        assert_eq!(vad.phase(), VadPhase::Silence);
    }

    #[test]
    fn test_hangover_then_silence() {
        let mut vad = Vad::new(test_config());
        let voice = voice_window();
        for _ in 0..3 {
            vad.process_window(&voice);
        }
        assert_eq!(vad.phase(), VadPhase::Active);

        // hangover_ms tolerates exactly two silent windows before release.
        assert_eq!(vad.process_window(&silence_window()), WindowDecision::Hangover);
        assert!(vad.status().active, "hold period still counts as active");
        assert_eq!(vad.process_window(&silence_window()), WindowDecision::Hangover);
        assert!(vad.status().active);
        assert_eq!(vad.process_window(&silence_window()), WindowDecision::Silence);
        assert!(!vad.status().active);
    }

    #[test]
    fn test_voice_resuming_during_hangover() {
        let mut vad = Vad::new(test_config());
        let voice = voice_window();
        for _ in 0..3 {
            vad.process_window(&voice);
        }

        assert_eq!(vad.process_window(&silence_window()), WindowDecision::Hangover);
        assert_eq!(vad.process_window(&voice), WindowDecision::Active);
        assert_eq!(vad.phase(), VadPhase::Active);
    }

    #[test]
    fn test_status_is_idempotent() {
        let mut vad = Vad::new(test_config());
        vad.process_window(&voice_window());
        let first = vad.status();
        let second = vad.status();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sustained_call_does_not_raise_floor() {
        let mut vad = Vad::new(test_config());
        let voice = voice_window();

        // Establish a quiet floor, then hold a long call.
        for _ in 0..10 {
            vad.process_window(&silence_window());
        }
        for _ in 0..200 {
            vad.process_window(&voice);
        }
        assert_eq!(vad.phase(), VadPhase::Active, "long call must stay active");
    }

    #[test]
    fn test_adaptive_floor_rises_with_ambient_noise() {
        let mut vad = Vad::new(test_config());
        // Quiet enough to stay under the base threshold, so it feeds the
        // noise floor estimate instead of triggering onset.
        let ambient: Vec<f32> = (0..320)
            .map(|i| 0.01 * (2.0 * std::f32::consts::PI * 100.0 * i as f32 / 16_000.0).sin())
            .collect();
        for _ in 0..20 {
            vad.process_window(&ambient);
        }
        assert!(
            vad.status().threshold > test_config().energy_threshold,
            "threshold should adapt above the base in steady ambient noise"
        );
    }

    #[test]
    fn test_reset_clears_state() {
        let mut vad = Vad::new(test_config());
        let voice = voice_window();
        for _ in 0..3 {
            vad.process_window(&voice);
        }
        vad.reset();
        assert_eq!(vad.phase(), VadPhase::Silence);
        assert_eq!(vad.status().threshold, test_config().energy_threshold);
    }
}
