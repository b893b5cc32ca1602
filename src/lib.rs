//! Sample Analyzer - audio decoding and feature extraction
//!
//! Decodes audio samples through a fallback chain of backends, extracts
//! spectral, rhythmic and harmonic descriptors, and labels the result with
//! a rule-based classifier.

pub mod classify;
pub mod config;
pub mod decode;
pub mod dsp;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod waveplot;

pub use classify::{ClassificationRecord, Classifier};
pub use config::EngineConfig;
pub use decode::{AudioDecoder, AudioInfo, AudioSource, ValidationReport, Waveform};
pub use error::EngineError;
pub use features::{FeatureExtractor, FeatureRecord, MixFeatureProfile, MixFeatureRecord};
pub use pipeline::{AnalysisPipeline, AnalysisRecord, QuickSummary};
