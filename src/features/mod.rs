//! Feature extraction profiles
//!
//! Two profiles read the same primitive measurements: the six-group
//! [`FeatureExtractor`] and the narrower [`MixFeatureProfile`]. Neither can
//! fail once a waveform exists; a failing measurement is replaced by the
//! documented default for the fields that depend on it.

mod extractor;
pub mod mix;
mod record;

pub use extractor::{time_signature_from_tempo, FeatureExtractor};
pub use mix::{MixFeatureProfile, MixFeatureRecord, Mode};
pub use record::{
    BasicProperties, FeatureRecord, HarmonicContent, MusicalFeatures, PerceptualFeatures,
    RhythmPattern, SpectralFeatures,
};

use crate::config::EngineConfig;
use crate::decode::Waveform;
use crate::dsp::chroma::{chroma_profile, chromagram};
use crate::dsp::hpss::{self, Separation};
use crate::dsp::{fft_frequencies, frames, mel, spectral, BeatTrack, BeatTracker, DspError, Stft};
use std::cell::OnceCell;

/// A way of turning a waveform into a record
pub trait FeatureProfile {
    type Record;

    fn name(&self) -> &'static str;

    /// Extract a record; never fails, degraded fields carry defaults
    fn extract(&self, waveform: &Waveform) -> Self::Record;
}

/// Why one group or field fell back to its default
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    #[error("signal too short")]
    TooShort,

    #[error("{0} is not finite")]
    NonFinite(&'static str),

    #[error("no onsets in signal")]
    Silent,

    #[error("{0}")]
    Dsp(String),
}

impl From<DspError> for FeatureError {
    fn from(e: DspError) -> Self {
        match e {
            DspError::TooShort(_) => FeatureError::TooShort,
            DspError::NoOnsets => FeatureError::Silent,
            other => FeatureError::Dsp(other.to_string()),
        }
    }
}

/// Reject NaN and infinities under a field name
pub(crate) fn finite(name: &'static str, value: f64) -> Result<f64, FeatureError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FeatureError::NonFinite(name))
    }
}

/// Take a computed value or log and substitute its default
pub(crate) fn or_default<T>(
    what: &'static str,
    result: Result<T, FeatureError>,
    default: impl FnOnce() -> T,
) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            log::debug!("{} unavailable, using default: {}", what, e);
            default()
        }
    }
}

pub(crate) struct Spectrum {
    pub stft: Stft,
    pub magnitude: Vec<Vec<f32>>,
    pub power: Vec<Vec<f32>>,
    pub freqs: Vec<f32>,
}

/// Lazily computed primitives for one waveform
///
/// Each primitive is computed at most once per extraction; a failure is
/// cached too, so every dependent field sees the same error.
pub(crate) struct Measurements<'a> {
    waveform: &'a Waveform,
    config: &'a EngineConfig,
    spectrum: OnceCell<Result<Spectrum, FeatureError>>,
    rms: OnceCell<Vec<f32>>,
    beats: OnceCell<Result<BeatTrack, FeatureError>>,
    separation: OnceCell<Result<Separation, FeatureError>>,
    chroma: OnceCell<Result<[f32; 12], FeatureError>>,
}

impl<'a> Measurements<'a> {
    pub fn new(waveform: &'a Waveform, config: &'a EngineConfig) -> Self {
        Self {
            waveform,
            config,
            spectrum: OnceCell::new(),
            rms: OnceCell::new(),
            beats: OnceCell::new(),
            separation: OnceCell::new(),
            chroma: OnceCell::new(),
        }
    }

    pub fn waveform(&self) -> &Waveform {
        self.waveform
    }

    pub fn sample_rate(&self) -> u32 {
        self.waveform.sample_rate()
    }

    pub fn spectrum(&self) -> Result<&Spectrum, FeatureError> {
        self.spectrum
            .get_or_init(|| {
                let stft = Stft::compute(self.waveform.samples(), self.config.frame)?;
                Ok(Spectrum {
                    magnitude: stft.magnitude(),
                    power: stft.power(),
                    freqs: fft_frequencies(self.sample_rate(), self.config.frame.n_fft),
                    stft,
                })
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn rms(&self) -> &[f32] {
        self.rms
            .get_or_init(|| frames::rms(self.waveform.samples(), self.config.frame))
    }

    pub fn zero_crossing_rate(&self) -> Vec<f32> {
        frames::zero_crossing_rate(self.waveform.samples(), self.config.frame)
    }

    pub fn centroid(&self) -> Result<Vec<f32>, FeatureError> {
        let s = self.spectrum()?;
        Ok(spectral::centroid(&s.magnitude, &s.freqs))
    }

    pub fn rolloff(&self) -> Result<Vec<f32>, FeatureError> {
        let s = self.spectrum()?;
        Ok(spectral::rolloff(&s.magnitude, &s.freqs))
    }

    pub fn bandwidth(&self) -> Result<Vec<f32>, FeatureError> {
        let s = self.spectrum()?;
        Ok(spectral::bandwidth(&s.magnitude, &s.freqs))
    }

    pub fn flatness(&self) -> Result<Vec<f32>, FeatureError> {
        Ok(spectral::flatness(&self.spectrum()?.magnitude))
    }

    pub fn contrast(&self) -> Result<Vec<Vec<f32>>, FeatureError> {
        let s = self.spectrum()?;
        Ok(spectral::contrast(&s.magnitude, &s.freqs, self.sample_rate()))
    }

    pub fn mfcc(&self) -> Result<Vec<Vec<f32>>, FeatureError> {
        let s = self.spectrum()?;
        Ok(mel::mfcc(&s.power, self.sample_rate(), self.config.frame.n_fft))
    }

    /// Time-averaged chroma
    pub fn chroma_profile(&self) -> Result<[f32; 12], FeatureError> {
        self.chroma
            .get_or_init(|| {
                let s = self.spectrum()?;
                Ok(chroma_profile(&chromagram(&s.power, &s.freqs)))
            })
            .clone()
    }

    pub fn beats(&self) -> Result<&BeatTrack, FeatureError> {
        self.beats
            .get_or_init(|| {
                let tracker =
                    BeatTracker::new(self.sample_rate(), self.config.frame, self.config.tempo);
                Ok(tracker.track_stft(self.waveform.samples(), &self.spectrum()?.stft)?)
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn separation(&self) -> Result<&Separation, FeatureError> {
        self.separation
            .get_or_init(|| Ok(hpss::separate(&self.spectrum()?.stft)))
            .as_ref()
            .map_err(Clone::clone)
    }
}
