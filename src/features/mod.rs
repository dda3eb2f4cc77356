//! Spectral feature extraction: mel filterbank plumbing and MFCC frames.

pub mod mel;
pub mod mfcc;

pub use mfcc::{FeatureFrame, MfccExtractor, StreamingExtractor};
