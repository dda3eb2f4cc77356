//! Maps alignment distances onto a bounded similarity score.
//!
//! Raw DTW distances are unbounded and depend on feature magnitudes, so they
//! are awkward to threshold or display. The curve here compresses them into
//! `[floor, ceiling]` (0 to 100 by default): zero distance maps to the
//! ceiling and the score decays hyperbolically as distance grows.

use serde::Serialize;

use crate::config::ScoreConfig;
use crate::defaults;

/// Whether a similarity reading carries a usable score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityStatus {
    /// Enough material on both sides to produce a meaningful score.
    Ok,
    /// No master loaded, or no voiced frames captured yet. The score is
    /// pinned to the floor and should not be interpreted.
    InsufficientData,
}

/// One similarity measurement for a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityReading {
    /// Bounded score, higher is more similar.
    pub score: f32,
    /// Normalized alignment distance the score was derived from, absent when
    /// status is [`SimilarityStatus::InsufficientData`].
    pub raw_distance: Option<f32>,
    /// Voiced feature frames the aligner has consumed so far.
    pub frames_compared: usize,
    pub status: SimilarityStatus,
}

impl SimilarityReading {
    /// Floor-pinned reading for sessions that cannot be scored yet.
    pub fn insufficient(frames_compared: usize) -> Self {
        Self {
            score: defaults::SCORE_FLOOR,
            raw_distance: None,
            frames_compared,
            status: SimilarityStatus::InsufficientData,
        }
    }
}

/// Hyperbolic distance-to-score mapping.
#[derive(Debug, Clone, Copy)]
pub struct ScoreCurve {
    distance_scale: f32,
}

impl ScoreCurve {
    pub fn new(config: &ScoreConfig) -> Self {
        Self {
            distance_scale: config.distance_scale,
        }
    }

    /// Maps a normalized distance to a score in `[floor, ceiling]`.
    ///
    /// Non-finite distances (an unreachable alignment) map to the floor.
    pub fn score(&self, distance: f32) -> f32 {
        if !distance.is_finite() || distance < 0.0 {
            return defaults::SCORE_FLOOR;
        }
        let score = defaults::SCORE_CEILING / (1.0 + distance * self.distance_scale);
        score.clamp(defaults::SCORE_FLOOR, defaults::SCORE_CEILING)
    }

    /// Builds an [`SimilarityStatus::Ok`] reading from an alignment result.
    pub fn reading(&self, distance: f32, frames_compared: usize) -> SimilarityReading {
        SimilarityReading {
            score: self.score(distance),
            raw_distance: Some(distance),
            frames_compared,
            status: SimilarityStatus::Ok,
        }
    }
}
