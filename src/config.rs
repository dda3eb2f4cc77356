//! Engine configuration.
//!
//! All tunable parameters for a session live here, grouped by pipeline
//! stage. Configurations are plain serde structs so hosts can ship them as
//! TOML profiles per species or per master-call pack; every field has a
//! default, so a partial file is fine.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::defaults;
use crate::error::{CallMatchError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub audio: AudioConfig,
    pub vad: VadConfig,
    pub features: FeatureConfig,
    pub alignment: AlignmentConfig,
}

/// Audio input configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate of incoming chunks and master calls, in Hz.
    pub sample_rate: u32,
}

/// Voice activity detection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VadConfig {
    /// Base mean-square energy threshold below which a window is never voice.
    pub energy_threshold: f32,
    /// Multiple of the adaptive noise floor a window must exceed to be voice.
    pub threshold_ratio: f32,
    /// Analysis window duration in milliseconds.
    pub window_ms: u32,
    /// Minimum voiced duration in milliseconds before activity is confirmed.
    pub min_sound_ms: u32,
    /// Trailing silence in milliseconds kept attached to an active region.
    pub hangover_ms: u32,
}

/// Spectral feature extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeatureConfig {
    /// Analysis frame length in milliseconds.
    pub frame_ms: u32,
    /// Hop between successive frames in milliseconds.
    pub hop_ms: u32,
    /// Number of triangular mel filters.
    pub num_filters: usize,
    /// Number of cepstral coefficients retained per frame.
    pub num_coefficients: usize,
    /// Replace coefficient 0 with the frame's log energy.
    pub include_energy: bool,
    /// Sinusoidal liftering coefficient; 0 disables liftering.
    pub lifter_coeff: usize,
    /// Lowest mel filterbank frequency in Hz.
    pub low_freq: f32,
    /// Highest mel filterbank frequency in Hz; 0 means Nyquist.
    pub high_freq: f32,
}

/// Sequence alignment configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Sakoe-Chiba band half-width in frames.
    pub band_width: usize,
    /// Weight applied to the diagonal (match) step.
    pub diagonal_weight: f32,
    /// Weight applied to the horizontal (candidate insertion) step.
    pub horizontal_weight: f32,
    /// Weight applied to the vertical (reference insertion) step.
    pub vertical_weight: f32,
    pub score: ScoreConfig,
}

/// Calibration of the distance-to-similarity mapping.
///
/// The mapping is empirical and deployment-specific; it is configuration,
/// not a constant of the algorithm.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoreConfig {
    /// Scale applied to the normalized DTW distance before mapping.
    pub distance_scale: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
        }
    }
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            energy_threshold: defaults::VAD_ENERGY_THRESHOLD,
            threshold_ratio: defaults::VAD_THRESHOLD_RATIO,
            window_ms: defaults::VAD_WINDOW_MS,
            min_sound_ms: defaults::VAD_MIN_SOUND_MS,
            hangover_ms: defaults::VAD_HANGOVER_MS,
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            frame_ms: defaults::FRAME_MS,
            hop_ms: defaults::HOP_MS,
            num_filters: defaults::NUM_FILTERS,
            num_coefficients: defaults::NUM_COEFFICIENTS,
            include_energy: true,
            lifter_coeff: defaults::LIFTER_COEFF,
            low_freq: 0.0,
            high_freq: 0.0,
        }
    }
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            band_width: defaults::BAND_WIDTH,
            diagonal_weight: 1.0,
            horizontal_weight: 1.0,
            vertical_weight: 1.0,
            score: ScoreConfig::default(),
        }
    }
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            distance_scale: defaults::SCORE_DISTANCE_SCALE,
        }
    }
}

impl FeatureConfig {
    /// Frame length in samples at the given rate.
    pub fn frame_len(&self, sample_rate: u32) -> usize {
        (sample_rate as u64 * self.frame_ms as u64 / 1000) as usize
    }

    /// Hop length in samples at the given rate.
    pub fn hop_len(&self, sample_rate: u32) -> usize {
        (sample_rate as u64 * self.hop_ms as u64 / 1000) as usize
    }
}

impl VadConfig {
    /// Analysis window length in samples at the given rate.
    pub fn window_len(&self, sample_rate: u32) -> usize {
        (sample_rate as u64 * self.window_ms as u64 / 1000) as usize
    }

    /// Minimum voiced duration in windows.
    pub fn min_sound_windows(&self) -> usize {
        (self.min_sound_ms / self.window_ms.max(1)).max(1) as usize
    }

    /// Hangover duration in windows.
    pub fn hangover_windows(&self) -> usize {
        (self.hangover_ms / self.window_ms.max(1)) as usize
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Self::default()
                } else {
                    tracing::warn!("invalid config file, falling back to defaults: {e}");
                    Self::default()
                }
            }
        }
    }

    /// Validate parameter bounds before a session is created.
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(CallMatchError::config("audio.sample_rate", "must be positive"));
        }
        if self.vad.window_ms == 0 {
            return Err(CallMatchError::config("vad.window_ms", "must be positive"));
        }
        if self.vad.threshold_ratio <= 0.0 || !self.vad.threshold_ratio.is_finite() {
            return Err(CallMatchError::config(
                "vad.threshold_ratio",
                "must be positive and finite",
            ));
        }
        if self.vad.energy_threshold < 0.0 || !self.vad.energy_threshold.is_finite() {
            return Err(CallMatchError::config(
                "vad.energy_threshold",
                "must be non-negative and finite",
            ));
        }
        if self.features.frame_ms == 0 || self.features.hop_ms == 0 {
            return Err(CallMatchError::config(
                "features.frame_ms",
                "frame and hop must be positive",
            ));
        }
        if self.features.hop_ms > self.features.frame_ms {
            return Err(CallMatchError::config(
                "features.hop_ms",
                "hop must not exceed frame length",
            ));
        }
        if self.features.num_filters == 0 {
            return Err(CallMatchError::config("features.num_filters", "must be positive"));
        }
        if self.features.num_coefficients == 0
            || self.features.num_coefficients > self.features.num_filters
        {
            return Err(CallMatchError::config(
                "features.num_coefficients",
                "must be positive and no larger than num_filters",
            ));
        }
        if self.features.frame_len(self.audio.sample_rate) == 0 {
            return Err(CallMatchError::config(
                "features.frame_ms",
                "frame is shorter than one sample at this rate",
            ));
        }
        self.alignment.validate()?;
        Ok(())
    }
}

impl AlignmentConfig {
    /// Validate alignment parameters; also used by `configure_alignment`.
    pub fn validate(&self) -> Result<()> {
        if self.band_width == 0 {
            return Err(CallMatchError::config("alignment.band_width", "must be at least 1"));
        }
        for (field, w) in [
            ("alignment.diagonal_weight", self.diagonal_weight),
            ("alignment.horizontal_weight", self.horizontal_weight),
            ("alignment.vertical_weight", self.vertical_weight),
        ] {
            if w <= 0.0 || !w.is_finite() {
                return Err(CallMatchError::config(field, "must be positive and finite"));
            }
        }
        if self.score.distance_scale <= 0.0 || !self.score.distance_scale.is_finite() {
            return Err(CallMatchError::config(
                "alignment.score.distance_scale",
                "must be positive and finite",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        let mut config = EngineConfig::default();
        config.audio.sample_rate = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("audio.sample_rate"));
    }

    #[test]
    fn test_hop_larger_than_frame_rejected() {
        let mut config = EngineConfig::default();
        config.features.frame_ms = 10;
        config.features.hop_ms = 25;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_band_width_rejected() {
        let mut config = EngineConfig::default();
        config.alignment.band_width = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("band_width"));
    }

    #[test]
    fn test_coefficients_capped_by_filters() {
        let mut config = EngineConfig::default();
        config.features.num_coefficients = 40;
        config.features.num_filters = 26;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = EngineConfig::default();
        config.alignment.vertical_weight = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_frame_and_hop_lengths() {
        let features = FeatureConfig::default();
        assert_eq!(features.frame_len(44_100), 1102); // 25ms
        assert_eq!(features.hop_len(44_100), 441); // 10ms
        assert_eq!(features.frame_len(16_000), 400);
        assert_eq!(features.hop_len(16_000), 160);
    }

    #[test]
    fn test_vad_window_math() {
        let vad = VadConfig::default();
        assert_eq!(vad.window_len(44_100), 882); // 20ms
        assert_eq!(vad.min_sound_windows(), 5); // 100ms / 20ms
        assert_eq!(vad.hangover_windows(), 15); // 300ms / 20ms
    }

    #[test]
    fn test_load_partial_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[audio]\nsample_rate = 22050\n\n[alignment]\nband_width = 25\n"
        )
        .unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.audio.sample_rate, 22050);
        assert_eq!(config.alignment.band_width, 25);
        // Unspecified sections fall back to defaults.
        assert_eq!(config.features.num_coefficients, 13);
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "audio = nonsense").unwrap();
        assert!(EngineConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = EngineConfig::load_or_default(Path::new("/nonexistent/callmatch.toml"));
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_roundtrip_serialization() {
        let config = EngineConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: EngineConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }
}
