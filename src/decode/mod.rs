//! Audio decoding layer
//!
//! Turns an arbitrary audio file (or an in-memory upload) into a canonical
//! mono waveform at the configured sample rate. Decoding goes through an
//! ordered chain of strategies, each backed by a `DecodeBackend`; the
//! first one that yields samples wins.

mod backend;
mod info;
mod loader;
mod resample;
mod symphonia_backend;
mod validate;
mod wav_backend;

pub use backend::{AudioSource, DecodeBackend, DecodeRate, DecodedAudio, Strategy, StrategyRate};
pub use info::AudioInfo;
pub use loader::AudioDecoder;
pub use resample::{resample_linear, resample_sinc};
pub use symphonia_backend::SymphoniaBackend;
pub use validate::ValidationReport;
pub use wav_backend::WavBackend;

/// Canonical mono waveform handed to feature extraction
///
/// Never empty. Owned by the analysis call that decoded it.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    /// Wrap mono samples; `None` if there are no samples or no sample rate
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Option<Self> {
        if samples.is_empty() || sample_rate == 0 {
            return None;
        }
        Some(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waveform_rejects_empty() {
        assert!(Waveform::from_samples(Vec::new(), 22050).is_none());
        assert!(Waveform::from_samples(vec![0.1], 0).is_none());
    }

    #[test]
    fn test_waveform_duration_and_peak() {
        let waveform = Waveform::from_samples(vec![0.0, -0.75, 0.5, 0.25], 4).unwrap();
        assert_eq!(waveform.len(), 4);
        assert!((waveform.duration_secs() - 1.0).abs() < 1e-9);
        assert!((waveform.peak() - 0.75).abs() < 1e-6);
    }
}
