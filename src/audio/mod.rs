//! Audio-domain components: level metering, voice activity detection,
//! chunk gating, and WAV master-call loading.

pub mod gate;
pub mod level;
pub mod vad;
pub mod wav;
