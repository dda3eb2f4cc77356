//! Per-session engine state.
//!
//! A session owns one live audio stream: its voice gate, streaming feature
//! extractor, the voiced frames captured so far, and the aligner state for
//! the master call it is being scored against. Sessions never touch each
//! other's state; masters are immutable and shared by `Arc` so many sessions
//! can score against the same call without copying its frames.

pub mod manager;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::audio::gate::ChunkGate;
use crate::audio::level::LevelMeter;
use crate::audio::vad::VadStatus;
use crate::config::{AlignmentConfig, EngineConfig};
use crate::dtw::{IncrementalAligner, ScoreCurve, SimilarityReading};
use crate::error::{CallMatchError, Result};
use crate::features::{FeatureFrame, MfccExtractor, StreamingExtractor};

/// Opaque handle for a live session.
///
/// Ids are never reused within an engine's lifetime, so a stale handle fails
/// with [`CallMatchError::UnknownSession`] instead of touching a newer
/// session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable feature sequence of a master call.
#[derive(Debug)]
pub struct MasterProfile {
    frames: Arc<Vec<FeatureFrame>>,
    sample_rate: u32,
    voiced_samples: usize,
}

impl MasterProfile {
    /// Extracts a profile from raw samples at the engine's sample rate.
    ///
    /// The recording is voice-gated first, so leading and trailing silence do
    /// not dilute the profile. Fails with [`CallMatchError::InvalidAudio`]
    /// when no voiced frames survive gating.
    pub fn from_samples(samples: &[f32], config: &EngineConfig) -> Result<Self> {
        if samples.iter().any(|s| !s.is_finite()) {
            return Err(CallMatchError::InvalidAudio {
                message: "master recording contains non-finite samples".into(),
            });
        }

        let sample_rate = config.audio.sample_rate;
        let mut gate = ChunkGate::new(config.vad.clone(), sample_rate);
        let voiced = gate.process(samples);

        let extractor = MfccExtractor::new(&config.features, sample_rate);
        let frames = extractor.extract(&voiced);
        if frames.is_empty() {
            return Err(CallMatchError::InvalidAudio {
                message: "master recording contains no voiced audio".into(),
            });
        }
        tracing::debug!(
            voiced_samples = voiced.len(),
            frames = frames.len(),
            "master profile extracted"
        );

        Ok(Self {
            frames: Arc::new(frames),
            sample_rate,
            voiced_samples: voiced.len(),
        })
    }

    pub fn frames(&self) -> &Arc<Vec<FeatureFrame>> {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Voiced duration of the master in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.voiced_samples as f64 / self.sample_rate as f64
    }
}

/// State for one live stream.
pub struct EngineSession {
    config: EngineConfig,
    gate: ChunkGate,
    extractor: StreamingExtractor,
    frames: Vec<FeatureFrame>,
    master: Option<Arc<MasterProfile>>,
    aligner: Option<IncrementalAligner>,
    aligned: usize,
    curve: ScoreCurve,
    last_reading: Option<SimilarityReading>,
    level: LevelMeter,
    samples_seen: u64,
}

impl EngineSession {
    pub fn new(config: EngineConfig) -> Self {
        let sample_rate = config.audio.sample_rate;
        let gate = ChunkGate::new(config.vad.clone(), sample_rate);
        let extractor = StreamingExtractor::new(MfccExtractor::new(&config.features, sample_rate));
        let curve = ScoreCurve::new(&config.alignment.score);
        Self {
            config,
            gate,
            extractor,
            frames: Vec::new(),
            master: None,
            aligner: None,
            aligned: 0,
            curve,
            last_reading: None,
            level: LevelMeter::new(),
            samples_seen: 0,
        }
    }

    /// Attaches a master, discarding any in-progress alignment against a
    /// previous one. Frames captured so far are kept and replayed into the
    /// new aligner on the next similarity query.
    pub fn set_master(&mut self, master: Arc<MasterProfile>) {
        self.master = Some(master);
        self.aligner = None;
        self.aligned = 0;
        self.last_reading = None;
    }

    pub fn master(&self) -> Option<&Arc<MasterProfile>> {
        self.master.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Feeds one chunk of the live stream: gates it, extracts features from
    /// whatever voiced audio came through, and appends them to the session's
    /// frame history. Returns how many new frames were produced.
    ///
    /// Scoring is deliberately not done here; callers poll
    /// [`EngineSession::similarity`] at their own rate.
    pub fn process_chunk(&mut self, chunk: &[f32]) -> Result<usize> {
        if chunk.iter().any(|s| !s.is_finite()) {
            return Err(CallMatchError::InvalidAudio {
                message: "chunk contains non-finite samples".into(),
            });
        }

        self.samples_seen += chunk.len() as u64;
        self.level.update(chunk);

        let voiced = self.gate.process(chunk);
        let new_frames = self.extractor.push(&voiced);
        let produced = new_frames.len();
        self.frames.extend(new_frames);
        Ok(produced)
    }

    /// Scores the session against its master.
    ///
    /// Catches the aligner up on frames that arrived since the last call,
    /// then takes a fresh snapshot. Without a master or without any voiced
    /// frames the reading is pinned to the score floor and flagged
    /// [`crate::dtw::SimilarityStatus::InsufficientData`].
    pub fn similarity(&mut self) -> Result<SimilarityReading> {
        let Some(master) = self.master.clone() else {
            let reading = SimilarityReading::insufficient(self.frames.len());
            self.last_reading = Some(reading.clone());
            return Ok(reading);
        };
        if self.frames.is_empty() {
            let reading = SimilarityReading::insufficient(0);
            self.last_reading = Some(reading.clone());
            return Ok(reading);
        }

        let aligner = self.aligner.get_or_insert_with(|| {
            IncrementalAligner::new(master.frames().clone(), &self.config.alignment)
        });
        for frame in &self.frames[self.aligned..] {
            aligner.push_frame(frame);
        }
        self.aligned = self.frames.len();

        // A band with no reachable cell pins the reading to the floor
        // rather than failing; the caller keeps polling as frames arrive.
        let reading = match aligner.query() {
            Some(snap) => self.curve.reading(snap.normalized, self.aligned),
            None => SimilarityReading::insufficient(self.aligned),
        };
        self.last_reading = Some(reading.clone());
        Ok(reading)
    }

    /// Most recent reading, if any query has run since the last reset.
    pub fn last_reading(&self) -> Option<&SimilarityReading> {
        self.last_reading.as_ref()
    }

    pub fn vad_status(&self) -> VadStatus {
        self.gate.status()
    }

    /// Swaps the alignment parameters. The aligner is dropped and rebuilt
    /// from the full frame history on the next similarity query, so readings
    /// before and after the change never mix parameters.
    pub fn configure_alignment(&mut self, alignment: AlignmentConfig) {
        self.curve = ScoreCurve::new(&alignment.score);
        self.config.alignment = alignment;
        self.aligner = None;
        self.aligned = 0;
        self.last_reading = None;
    }

    /// Clears all streaming state while keeping the master attached.
    pub fn reset(&mut self) {
        self.gate.reset();
        self.extractor.reset();
        self.frames.clear();
        self.aligner = None;
        self.aligned = 0;
        self.last_reading = None;
        self.level.reset();
        self.samples_seen = 0;
    }

    pub fn feature_count(&self) -> usize {
        self.frames.len()
    }

    /// Total audio fed to the session in seconds, silence included.
    pub fn duration_secs(&self) -> f64 {
        self.samples_seen as f64 / self.config.audio.sample_rate as f64
    }

    /// Smoothed input level in `[0, 1]`.
    pub fn recording_level(&self) -> f32 {
        self.level.current()
    }
}
