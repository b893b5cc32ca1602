//! Frame-based signal measurements
//!
//! Every measurement here works on centred frames (the signal is
//! zero-padded by half a frame on both sides) so frame `t` is centred on
//! sample `t * hop_length`.

pub mod beat;
pub mod chroma;
pub mod frames;
pub mod hpss;
pub mod mel;
pub mod spectral;
pub mod stft;

pub use beat::{BeatTrack, BeatTracker};
pub use chroma::PitchClass;
pub use stft::Stft;

/// Why a measurement could not be produced
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DspError {
    #[error("Signal is empty")]
    EmptySignal,

    #[error("Invalid frame parameters: {0}")]
    InvalidParams(String),

    #[error("Signal too short for {0}")]
    TooShort(&'static str),

    #[error("No onsets found")]
    NoOnsets,
}

pub(crate) fn mean(values: &[f32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub(crate) fn std_dev(values: &[f32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values
        .iter()
        .map(|&v| (v as f64 - m).powi(2))
        .sum::<f64>()
        / values.len() as f64;
    var.sqrt()
}

/// Standard deviation over mean; NaN or infinite when the mean is zero
pub(crate) fn coefficient_of_variation(values: &[f32]) -> f64 {
    std_dev(values) / mean(values)
}

/// Power to decibels with a 1e-10 floor
#[inline]
pub(crate) fn power_to_db(power: f32) -> f32 {
    10.0 * power.max(1e-10).log10()
}

/// Centre frequency of each rfft bin
pub fn fft_frequencies(sample_rate: u32, n_fft: usize) -> Vec<f32> {
    let n_bins = n_fft / 2 + 1;
    (0..n_bins)
        .map(|k| k as f32 * sample_rate as f32 / n_fft as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!((mean(&values) - 2.5).abs() < 1e-12);
        assert!((std_dev(&values) - 1.118_034).abs() < 1e-6);
        assert!((coefficient_of_variation(&values) - 0.447_213_6).abs() < 1e-6);
        assert!(!coefficient_of_variation(&[0.0, 0.0]).is_finite());
    }

    #[test]
    fn test_fft_frequencies() {
        let freqs = fft_frequencies(22050, 2048);
        assert_eq!(freqs.len(), 1025);
        assert_eq!(freqs[0], 0.0);
        assert!((freqs[1024] - 11025.0).abs() < 1e-3);
    }

    #[test]
    fn test_power_to_db_floor() {
        assert!((power_to_db(1.0)).abs() < 1e-6);
        assert!((power_to_db(0.0) + 100.0).abs() < 1e-4);
    }
}
