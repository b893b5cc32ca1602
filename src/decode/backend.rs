//! Decode backend trait and the data flowing through it

use crate::config::normalize_extension;
use crate::error::BackendError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where the encoded audio comes from
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// A file on disk
    File(PathBuf),

    /// An already-materialized upload; the extension stands in for a file name
    Memory { bytes: Arc<[u8]>, extension: String },
}

impl AudioSource {
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>, extension: &str) -> Self {
        AudioSource::Memory {
            bytes: bytes.into(),
            extension: normalize_extension(extension),
        }
    }

    /// Lower-case extension without the dot (empty if there is none)
    pub fn extension(&self) -> String {
        match self {
            AudioSource::File(path) => path
                .extension()
                .and_then(|e| e.to_str())
                .map(normalize_extension)
                .unwrap_or_default(),
            AudioSource::Memory { extension, .. } => extension.clone(),
        }
    }

    /// Path used in error messages
    pub fn display_path(&self) -> PathBuf {
        match self {
            AudioSource::File(path) => path.clone(),
            AudioSource::Memory { extension, .. } => {
                PathBuf::from(format!("<memory>.{}", extension))
            }
        }
    }
}

impl From<&Path> for AudioSource {
    fn from(path: &Path) -> Self {
        AudioSource::File(path.to_path_buf())
    }
}

impl From<PathBuf> for AudioSource {
    fn from(path: PathBuf) -> Self {
        AudioSource::File(path)
    }
}

impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_path().display())
    }
}

/// Rate a backend should deliver samples at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeRate {
    /// Resample inside the backend to this rate
    Target(u32),
    /// Keep the file's own rate
    Native,
}

/// Mono samples produced by a backend
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples, nominally in [-1, 1]
    pub samples: Vec<f32>,
    /// Rate of `samples`
    pub sample_rate: u32,
    /// Channel count of the source before down-mixing
    pub channels: usize,
    /// Source bit depth, when the container reports one
    pub bits_per_sample: Option<u32>,
}

/// A decoding library wrapped behind a common interface
pub trait DecodeBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Decode the whole source to mono
    fn decode(&self, source: &AudioSource, rate: DecodeRate) -> Result<DecodedAudio, BackendError>;
}

/// How a strategy asks its backend for samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyRate {
    /// The backend resamples to the target rate itself
    Target,
    /// Decode at the native rate, then resample manually afterwards
    NativeThenResample,
}

/// One step of the decoder's fallback chain
#[derive(Clone)]
pub struct Strategy {
    pub label: &'static str,
    pub backend: Arc<dyn DecodeBackend>,
    pub rate: StrategyRate,
}

impl Strategy {
    pub fn new(label: &'static str, backend: Arc<dyn DecodeBackend>, rate: StrategyRate) -> Self {
        Self {
            label,
            backend,
            rate,
        }
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy")
            .field("label", &self.label)
            .field("backend", &self.backend.name())
            .field("rate", &self.rate)
            .finish()
    }
}

/// Average interleaved frames down to one channel
pub(crate) fn downmix_interleaved(samples: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels > 1 {
        for chunk in samples.chunks(channels) {
            let mono: f32 = chunk.iter().sum::<f32>() / chunk.len() as f32;
            out.push(mono);
        }
    } else {
        out.extend_from_slice(samples);
    }
}
