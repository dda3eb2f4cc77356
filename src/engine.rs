//! Public engine facade.
//!
//! [`CallMatchEngine`] ties the session registry, feature pipeline and
//! aligner together behind an opaque-id API. All methods take `&self`; the
//! engine can be shared across threads and callers coordinate only through
//! session ids.

use std::path::Path;
use std::sync::Arc;

use crate::audio::vad::VadStatus;
use crate::audio::wav;
use crate::config::{AlignmentConfig, EngineConfig};
use crate::dtw::SimilarityReading;
use crate::error::{CallMatchError, Result};
use crate::session::manager::SessionManager;
use crate::session::{EngineSession, MasterProfile, SessionId};

pub struct CallMatchEngine {
    config: EngineConfig,
    sessions: SessionManager,
}

impl CallMatchEngine {
    /// Builds an engine, rejecting invalid configuration up front so session
    /// creation cannot fail later for configuration reasons.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            sessions: SessionManager::new(),
        })
    }

    pub fn with_defaults() -> Self {
        Self {
            config: EngineConfig::default(),
            sessions: SessionManager::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Opens a new session with the engine's configuration.
    pub fn create_session(&self) -> SessionId {
        let id = self.sessions.insert(EngineSession::new(self.config.clone()));
        tracing::info!(session = %id, "session created");
        id
    }

    /// Opens a session with its own configuration, validated eagerly.
    pub fn create_session_with(&self, config: EngineConfig) -> Result<SessionId> {
        config.validate()?;
        let id = self.sessions.insert(EngineSession::new(config));
        tracing::info!(session = %id, "session created with custom config");
        Ok(id)
    }

    /// Closes a session, releasing its state. The id is never reissued.
    pub fn close_session(&self, id: SessionId) -> Result<()> {
        self.sessions.remove(id)?;
        tracing::info!(session = %id, "session closed");
        Ok(())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Extracts a master profile from raw samples at the session's sample
    /// rate and attaches it to the session.
    pub fn load_master(&self, id: SessionId, samples: &[f32]) -> Result<()> {
        self.sessions.with_session(id, |session| {
            let profile = Arc::new(MasterProfile::from_samples(samples, session.config())?);
            tracing::debug!(session = %id, frames = profile.frame_count(), "master attached");
            session.set_master(profile);
            Ok(())
        })
    }

    /// Attaches an already-extracted profile. Profiles are immutable, so the
    /// same `Arc` can be attached to any number of sessions.
    pub fn load_master_profile(&self, id: SessionId, profile: Arc<MasterProfile>) -> Result<()> {
        self.sessions.with_session(id, |session| {
            tracing::debug!(
                session = %id,
                frames = profile.frame_count(),
                "master attached"
            );
            session.set_master(profile);
            Ok(())
        })
    }

    /// Reads a master recording from a WAV file, resampling and downmixing
    /// to the session's format, and attaches its profile to the session.
    pub fn load_master_wav(&self, id: SessionId, path: &Path) -> Result<()> {
        self.sessions.with_session(id, |session| {
            let samples = wav::read_master_wav(path, session.config().audio.sample_rate)?;
            let profile = Arc::new(MasterProfile::from_samples(&samples, session.config())?);
            tracing::debug!(session = %id, frames = profile.frame_count(), "master attached");
            session.set_master(profile);
            Ok(())
        })
    }

    /// Feeds one chunk of live audio into a session. Returns the number of
    /// voiced feature frames the chunk produced.
    pub fn process_chunk(&self, id: SessionId, chunk: &[f32]) -> Result<usize> {
        self.sessions.with_session(id, |session| session.process_chunk(chunk))
    }

    /// Current similarity of the session's stream against its master.
    pub fn similarity(&self, id: SessionId) -> Result<SimilarityReading> {
        self.sessions.with_session(id, |session| session.similarity())
    }

    /// Voice-activity snapshot for the session's stream.
    pub fn vad_status(&self, id: SessionId) -> Result<VadStatus> {
        self.sessions.with_session(id, |session| Ok(session.vad_status()))
    }

    /// Replaces a session's alignment parameters. Frames captured so far are
    /// re-aligned under the new parameters on the next similarity query.
    pub fn configure_alignment(&self, id: SessionId, alignment: AlignmentConfig) -> Result<()> {
        alignment.validate()?;
        self.sessions.with_session(id, |session| {
            session.configure_alignment(alignment);
            tracing::debug!(session = %id, "alignment reconfigured");
            Ok(())
        })
    }

    /// Clears a session's streaming state while keeping its master attached.
    pub fn reset_session(&self, id: SessionId) -> Result<()> {
        self.sessions.with_session(id, |session| {
            session.reset();
            Ok(())
        })
    }

    /// Voiced feature frames captured by the session so far.
    pub fn feature_count(&self, id: SessionId) -> Result<usize> {
        self.sessions.with_session(id, |session| Ok(session.feature_count()))
    }

    /// Total audio fed to the session in seconds, silence included.
    pub fn session_duration(&self, id: SessionId) -> Result<f64> {
        self.sessions.with_session(id, |session| Ok(session.duration_secs()))
    }

    /// Smoothed input level of the session's stream in `[0, 1]`.
    pub fn recording_level(&self, id: SessionId) -> Result<f32> {
        self.sessions.with_session(id, |session| Ok(session.recording_level()))
    }

    /// Serializes the session's current similarity reading to JSON.
    pub fn export_reading_json(&self, id: SessionId) -> Result<String> {
        let reading = self.similarity(id)?;
        serde_json::to_string(&reading).map_err(|err| CallMatchError::InternalComputation {
            message: format!("failed to serialize reading: {err}"),
        })
    }
}
