//! Default tuning constants for callmatch.
//!
//! This module provides shared constants used across the configuration types
//! to ensure consistency and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 44.1kHz matches the master call recordings shipped with field apps and
/// preserves the upper harmonics of bird and elk calls that 16kHz speech
/// rates would discard.
pub const SAMPLE_RATE: u32 = 44_100;

/// Default Voice Activity Detection base energy threshold.
///
/// Mean-square energy (samples normalized to [-1, 1]) below which a window
/// is never considered active, regardless of the adaptive noise floor.
pub const VAD_ENERGY_THRESHOLD: f32 = 0.0001;

/// Default ratio of the adaptive noise floor that a window's energy must
/// exceed to count as voice.
///
/// The noise floor tracks the 25th percentile of recent window energies, so
/// a 3x ratio triggers on calls while riding out slow ambient changes (wind,
/// distant traffic).
pub const VAD_THRESHOLD_RATIO: f32 = 3.0;

/// Default VAD analysis window duration in milliseconds.
pub const VAD_WINDOW_MS: u32 = 20;

/// Default minimum sound duration in milliseconds before activity is
/// confirmed.
///
/// Shorter bursts (twig snaps, mic bumps) are discarded as transients.
pub const VAD_MIN_SOUND_MS: u32 = 100;

/// Default hangover duration in milliseconds.
///
/// Silence shorter than this between two active regions is treated as part
/// of the call, so breathy trailing energy and short internal pauses are not
/// chopped.
pub const VAD_HANGOVER_MS: u32 = 300;

/// Default analysis frame length in milliseconds for feature extraction.
pub const FRAME_MS: u32 = 25;

/// Default hop between analysis frames in milliseconds.
pub const HOP_MS: u32 = 10;

/// Default number of mel filterbank channels.
pub const NUM_FILTERS: usize = 26;

/// Default number of MFCC coefficients retained per frame.
pub const NUM_COEFFICIENTS: usize = 13;

/// Default liftering coefficient applied to MFCCs.
pub const LIFTER_COEFF: usize = 22;

/// Default Sakoe-Chiba band half-width in frames.
///
/// 50 frames at a 10ms hop allows the alignment to drift up to half a second
/// off the diagonal, which covers the timing slop of a human mimic without
/// letting the path degenerate.
pub const BAND_WIDTH: usize = 50;

/// Default scale applied to the normalized DTW distance when mapping it to a
/// similarity percentage.
///
/// Empirical, not exact: tuned so identical clips land near 100, practiced
/// same-call mimicry lands in the 70-90 band, and unrelated content falls
/// below 40. Deployments recalibrate via `ScoreConfig`.
pub const SCORE_DISTANCE_SCALE: f32 = 0.08;

/// Floor of the similarity range.
pub const SCORE_FLOOR: f32 = 0.0;

/// Ceiling of the similarity range.
pub const SCORE_CEILING: f32 = 100.0;

/// Epsilon floor applied before logarithms in the feature pipeline, so
/// silent frames produce finite log energies instead of -inf.
pub const LOG_EPSILON: f32 = 1e-10;

/// Fraction of a frame's strongest mel band energy at which every band is
/// floored before the log.
///
/// Bands with no real signal then land on the same log energy whether the
/// source was bit-exact float audio or carries the quantization noise of a
/// 16-bit master asset; without the relative floor those bands dominate the
/// frame distance for perceptually identical audio.
pub const MEL_FLOOR_RATIO: f64 = 1e-5;
