//! Streaming-service style feature vector
//!
//! Same primitives as the full extractor, combined into a fixed set of
//! unit-interval descriptors. Weighted fields are clamped to [0, 1] and
//! rounded to 3 decimals. Energy is the mean frame RMS rounded to 3
//! decimals, loudness and tempo are rounded to 1 decimal.

use super::{finite, or_default, FeatureError, FeatureProfile, Measurements};
use crate::config::EngineConfig;
use crate::decode::Waveform;
use crate::dsp::{self, chroma::dominant_pitch_class, PitchClass};
use serde::{Deserialize, Serialize};

/// Musical mode; only major is ever reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Major,
    /// Never reported; there is no mode detection
    Minor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixFeatureRecord {
    pub danceability: f64,
    pub energy: f64,
    pub valence: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub speechiness: f64,
    /// dB
    pub loudness: f64,
    /// BPM
    pub tempo: f64,
    pub key: PitchClass,
    pub mode: Mode,
    pub time_signature: u8,
}

impl Default for MixFeatureRecord {
    fn default() -> Self {
        Self {
            danceability: 0.0,
            energy: 0.0,
            valence: 0.0,
            acousticness: 0.0,
            instrumentalness: 0.0,
            liveness: 0.0,
            speechiness: 0.0,
            loudness: -60.0,
            tempo: 0.0,
            key: PitchClass::C,
            mode: Mode::Major,
            time_signature: 4,
        }
    }
}

/// Human-readable meaning of every [`MixFeatureRecord`] field
pub fn feature_descriptions() -> &'static [(&'static str, &'static str)] {
    &[
        (
            "danceability",
            "How suitable the audio is for dancing, from tempo, beat strength and rhythmic variation",
        ),
        ("energy", "Overall intensity, measured as mean frame RMS"),
        ("valence", "Musical positiveness; higher values sound brighter and happier"),
        ("acousticness", "Confidence from 0.0 to 1.0 that the audio is acoustic"),
        ("instrumentalness", "Likelihood that the audio contains no vocals"),
        ("liveness", "Likelihood that the audio was recorded in front of an audience"),
        ("speechiness", "Presence of spoken words; closer to 1.0 means more speech-like"),
        ("loudness", "Overall loudness in decibels (dB)"),
        ("tempo", "Estimated tempo in beats per minute (BPM)"),
        ("key", "Dominant pitch class in standard notation (C, C#, D, ...)"),
        ("mode", "Modality of the audio (major or minor)"),
        ("time_signature", "Estimated number of beats in each bar"),
    ]
}

/// Time signature guessed from the mean beat interval in seconds
///
/// Intervals under 0.5 s map to 4, under 0.75 s to 3, anything longer to
/// 6. No beats is 4.
pub fn time_signature_from_interval(mean_interval: Option<f64>) -> u8 {
    match mean_interval {
        Some(i) if i < 0.5 => 4,
        Some(i) if i < 0.75 => 3,
        Some(_) => 6,
        None => 4,
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn unit(value: f64) -> f64 {
    round_to(value.clamp(0.0, 1.0), 3)
}

/// Coefficient of variation, with a zero mean read as no variation
fn variation(values: &[f32]) -> f64 {
    let cv = dsp::coefficient_of_variation(values);
    if cv.is_finite() {
        cv
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct MixFeatureProfile {
    config: EngineConfig,
}

impl MixFeatureProfile {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn extract(&self, waveform: &Waveform) -> MixFeatureRecord {
        let m = Measurements::new(waveform, &self.config);
        let defaults = MixFeatureRecord::default();

        let mean_rms = dsp::mean(m.rms());
        let tempo = m.beats().map(|b| b.tempo_bpm);

        let record = MixFeatureRecord {
            danceability: or_default("danceability", danceability(&m, tempo.clone(), mean_rms), || {
                defaults.danceability
            }),
            energy: round_to(mean_rms, 3),
            valence: or_default("valence", valence(&m), || defaults.valence),
            acousticness: or_default("acousticness", acousticness(&m), || defaults.acousticness),
            instrumentalness: or_default("instrumentalness", instrumentalness(&m), || {
                defaults.instrumentalness
            }),
            liveness: or_default("liveness", liveness(&m), || defaults.liveness),
            speechiness: or_default("speechiness", speechiness(&m), || defaults.speechiness),
            loudness: or_default(
                "loudness",
                finite("loudness", 20.0 * (mean_rms + 1e-10).log10()).map(|db| round_to(db, 1)),
                || defaults.loudness,
            ),
            tempo: or_default("tempo", tempo.map(|t| round_to(t, 1)), || defaults.tempo),
            key: or_default(
                "key",
                m.chroma_profile().map(|p| dominant_pitch_class(&p)),
                || defaults.key,
            ),
            mode: Mode::Major,
            time_signature: time_signature_from_interval(mean_beat_interval(&m)),
        };

        log::debug!(
            "Mix features: tempo {:.1}, key {}, energy {:.3}",
            record.tempo,
            record.key,
            record.energy
        );

        record
    }
}

impl FeatureProfile for MixFeatureProfile {
    type Record = MixFeatureRecord;

    fn name(&self) -> &'static str {
        "mix"
    }

    fn extract(&self, waveform: &Waveform) -> MixFeatureRecord {
        MixFeatureProfile::extract(self, waveform)
    }
}

fn danceability(
    m: &Measurements,
    tempo: Result<f64, FeatureError>,
    mean_rms: f64,
) -> Result<f64, FeatureError> {
    let tempo = tempo?;
    let rhythm = variation(&m.centroid()?);
    let value = (tempo / 120.0) * 0.3 + (mean_rms / 0.1) * 0.4 + rhythm * 0.3;
    Ok(unit(finite("danceability", value)?))
}

/// Mean of the harmonic component over mean of the signal
fn mix_harmonic_ratio(m: &Measurements) -> Result<f64, FeatureError> {
    let harmonic = dsp::mean(&m.separation()?.harmonic);
    let signal = dsp::mean(m.waveform().samples());
    if signal == 0.0 {
        return Ok(0.0);
    }
    let ratio = harmonic / signal;
    Ok(if ratio.is_finite() { ratio } else { 0.0 })
}

fn valence(m: &Measurements) -> Result<f64, FeatureError> {
    let nyquist = m.sample_rate() as f64 / 2.0;
    let rolloff = dsp::mean(&m.rolloff()?);
    let bandwidth = dsp::mean(&m.bandwidth()?);
    let value = mix_harmonic_ratio(m)? * 0.4
        + (1.0 - rolloff / nyquist) * 0.3
        + (1.0 - bandwidth / 2000.0) * 0.3;
    Ok(unit(finite("valence", value)?))
}

fn acousticness(m: &Measurements) -> Result<f64, FeatureError> {
    let centroid = dsp::mean(&m.centroid()?);
    let contrast = m.contrast()?;
    let values: Vec<f32> = contrast.into_iter().flatten().collect();
    let value = (1.0 - centroid / 2000.0) * 0.5 + (dsp::mean(&values) / 10.0) * 0.5;
    Ok(unit(finite("acousticness", value)?))
}

fn instrumentalness(m: &Measurements) -> Result<f64, FeatureError> {
    let variances: Vec<f32> = m
        .mfcc()?
        .iter()
        .map(|coefficient| dsp::std_dev(coefficient).powi(2) as f32)
        .collect();
    Ok(unit(finite("instrumentalness", dsp::mean(&variances) / 100.0)?))
}

fn liveness(m: &Measurements) -> Result<f64, FeatureError> {
    let spread = dsp::std_dev(&m.flatness()?);
    Ok(unit(finite("liveness", spread * 10.0)?))
}

fn speechiness(m: &Measurements) -> Result<f64, FeatureError> {
    let bandwidth = dsp::mean(&m.bandwidth()?);
    let centroid = dsp::mean(&m.centroid()?);
    let value = (bandwidth / 2000.0) * (centroid / 2000.0) * 2.0;
    Ok(unit(finite("speechiness", value)?))
}

fn mean_beat_interval(m: &Measurements) -> Option<f64> {
    let intervals = m.beats().ok()?.intervals();
    if intervals.is_empty() {
        return None;
    }
    Some(intervals.iter().sum::<f64>() / intervals.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_thresholds() {
        assert_eq!(time_signature_from_interval(None), 4);
        assert_eq!(time_signature_from_interval(Some(0.49)), 4);
        assert_eq!(time_signature_from_interval(Some(0.5)), 3);
        assert_eq!(time_signature_from_interval(Some(0.74)), 3);
        assert_eq!(time_signature_from_interval(Some(0.75)), 6);
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round_to(-23.456, 1), -23.5);
        assert_eq!(unit(0.12345), 0.123);
        assert_eq!(unit(1.7), 1.0);
        assert_eq!(unit(-0.2), 0.0);
    }

    #[test]
    fn test_descriptions_cover_every_field() {
        let json = serde_json::to_value(MixFeatureRecord::default()).unwrap();
        let fields = json.as_object().unwrap();
        let described: Vec<&str> = feature_descriptions().iter().map(|(k, _)| *k).collect();
        assert_eq!(described.len(), fields.len());
        for key in fields.keys() {
            assert!(described.contains(&key.as_str()), "{} undescribed", key);
        }
    }

    #[test]
    fn test_silence() {
        let waveform = Waveform::from_samples(vec![0.0; 22050], 22050).unwrap();
        let record = MixFeatureProfile::default().extract(&waveform);
        assert_eq!(record.energy, 0.0);
        assert_eq!(record.tempo, 0.0);
        assert_eq!(record.danceability, 0.0);
        assert_eq!(record.key, PitchClass::C);
        assert_eq!(record.mode, Mode::Major);
        assert_eq!(record.time_signature, 4);
        assert!(record.loudness <= -60.0);
    }

    #[test]
    fn test_energy_is_rounded_rms() {
        let samples: Vec<f32> = (0..22050)
            .map(|i| if i % 2 == 0 { 0.8 } else { -0.8 })
            .collect();
        let waveform = Waveform::from_samples(samples, 22050).unwrap();
        let config = EngineConfig::default();
        let expected = round_to(dsp::mean(Measurements::new(&waveform, &config).rms()), 3);

        let record = MixFeatureProfile::default().extract(&waveform);
        assert_eq!(record.energy, expected);
        assert!(record.energy > 0.7 && record.energy <= 0.8);
    }

    #[test]
    fn test_tone_stays_in_bounds() {
        let samples: Vec<f32> = (0..44100)
            .map(|i| (0.4 * (2.0 * std::f64::consts::PI * 330.0 * i as f64 / 22050.0).sin()) as f32)
            .collect();
        let waveform = Waveform::from_samples(samples, 22050).unwrap();
        let record = MixFeatureProfile::default().extract(&waveform);

        for value in [
            record.danceability,
            record.energy,
            record.valence,
            record.acousticness,
            record.instrumentalness,
            record.liveness,
            record.speechiness,
        ] {
            assert!((0.0..=1.0).contains(&value), "{} out of range", value);
        }
        assert_eq!(record.key, PitchClass::E);
        assert_eq!(record.mode, Mode::Major);
    }
}
