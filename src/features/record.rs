//! Feature record types

use crate::dsp::PitchClass;
use serde::{Deserialize, Serialize};

/// Flat feature record; nested groups are flattened on serialisation
/// except `rhythm_pattern` and `harmonic_content`, which stay objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    #[serde(flatten)]
    pub basic: BasicProperties,

    #[serde(flatten)]
    pub musical: MusicalFeatures,

    #[serde(flatten)]
    pub spectral: SpectralFeatures,

    pub rhythm_pattern: RhythmPattern,

    pub harmonic_content: HarmonicContent,

    #[serde(flatten)]
    pub perceptual: PerceptualFeatures,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicProperties {
    pub duration_sec: f64,
    pub sample_rate: u32,
    /// Always 1; waveforms are mono
    pub channels: u16,
    /// Size of the waveform as 16-bit PCM, in bytes
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicalFeatures {
    pub tempo_bpm: Option<f64>,
    pub key_signature: Option<PitchClass>,
    pub time_signature: u8,
}

impl Default for MusicalFeatures {
    fn default() -> Self {
        Self {
            tempo_bpm: None,
            key_signature: None,
            time_signature: 4,
        }
    }
}

/// Time-averaged spectral statistics plus the full MFCC matrix
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectralFeatures {
    pub spectral_centroid: Option<f64>,
    pub spectral_rolloff: Option<f64>,
    pub zero_crossing_rate: Option<f64>,
    /// 13 coefficients, each a row over all frames
    pub mfcc_features: Option<Vec<Vec<f32>>>,
}

/// Beat statistics; intervals are in seconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RhythmPattern {
    pub beat_count: usize,
    pub avg_interval: Option<f64>,
    pub interval_std: Option<f64>,
    /// `1 - std / mean` of the beat intervals, clamped to [0, 1]
    pub rhythm_regularity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmonicContent {
    /// Harmonic share of total absolute amplitude after separation
    pub harmonic_ratio: f64,
    pub chroma_profile: [f64; 12],
    /// Standard deviation of `chroma_profile`
    pub harmonic_complexity: f64,
}

impl Default for HarmonicContent {
    fn default() -> Self {
        Self {
            harmonic_ratio: 0.5,
            chroma_profile: [0.0; 12],
            harmonic_complexity: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerceptualFeatures {
    /// `20 * log10(mean frame RMS + 1e-10)`
    pub loudness: f64,
    /// Mean frame RMS
    pub energy: f64,
    pub complexity: f64,
}

impl Default for PerceptualFeatures {
    fn default() -> Self {
        Self {
            loudness: -60.0,
            energy: 0.0,
            complexity: 0.5,
        }
    }
}
