//! Error taxonomy for the analysis engine
//!
//! Only decode-stage failures ever reach the caller. Everything after a
//! waveform exists degrades to defaults instead (see `features`).

use std::path::PathBuf;

/// Fatal errors surfaced by the decoder and the pipeline
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("Audio file not found: {0:?}")]
    FileNotFound(PathBuf),

    #[error("Audio file is empty: {0:?}")]
    EmptyFile(PathBuf),

    #[error("Unsupported audio format: .{extension} ({path:?})")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("Could not load audio file {path:?} with any of {attempts} decode strategies: {last_error}")]
    Decode {
        path: PathBuf,
        attempts: usize,
        last_error: String,
    },

    #[error("Failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    /// Whether the error was raised before any decode strategy ran
    pub fn is_pre_decode(&self) -> bool {
        !matches!(self, EngineError::Decode { .. })
    }
}

/// Failure of a single decode strategy
#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("Failed to open audio source")]
    Open(#[source] std::io::Error),

    #[error("Failed to probe audio format")]
    Probe(#[source] symphonia::core::errors::Error),

    #[error("No audio track found")]
    NoTrack,

    #[error("No sample rate in audio track")]
    NoSampleRate,

    #[error("Failed to create audio decoder")]
    CreateDecoder(#[source] symphonia::core::errors::Error),

    #[error("WAV decoding failed")]
    Wav(#[from] hound::Error),

    #[error("Resampling from {from} Hz to {to} Hz failed: {reason}")]
    Resample { from: u32, to: u32, reason: String },

    #[error("Backend does not handle .{0} sources")]
    Unsupported(String),

    #[error("Decoder produced no samples")]
    Empty,
}
