//! callmatch - Real-time wildlife call similarity scoring
//!
//! Feed a master recording and a live microphone stream into a session and
//! poll how closely the stream matches the master. The pipeline voice-gates
//! incoming audio, extracts MFCC features, and aligns them against the
//! master with a banded DTW that advances incrementally as chunks arrive.

// Enforce error handling discipline in library code
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod config;
pub mod defaults;
pub mod dtw;
pub mod engine;
pub mod error;
pub mod features;
pub mod session;

// Engine facade
pub use engine::CallMatchEngine;
pub use session::{MasterProfile, SessionId};

// Similarity readings
pub use dtw::{Alignment, DtwComparator, SimilarityReading, SimilarityStatus};

// Voice activity
pub use audio::vad::VadStatus;

// Error handling
pub use error::{CallMatchError, Result};

// Config
pub use config::{AlignmentConfig, EngineConfig, FeatureConfig, ScoreConfig, VadConfig};
