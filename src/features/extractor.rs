//! Six-group feature extraction

use super::record::{
    BasicProperties, FeatureRecord, HarmonicContent, MusicalFeatures, PerceptualFeatures,
    RhythmPattern, SpectralFeatures,
};
use super::{finite, or_default, FeatureError, FeatureProfile, Measurements};
use crate::config::EngineConfig;
use crate::decode::Waveform;
use crate::dsp::{self, chroma::dominant_pitch_class};

/// Time signature guessed from tempo alone
///
/// Slow tempos map to 3, mid tempos to 4 and fast tempos to 6. Unknown
/// tempo is 4.
pub fn time_signature_from_tempo(tempo_bpm: Option<f64>) -> u8 {
    match tempo_bpm {
        Some(t) if t > 0.0 && t < 80.0 => 3,
        Some(t) if t >= 80.0 && t < 120.0 => 4,
        Some(t) if t >= 120.0 => 6,
        _ => 4,
    }
}

/// Full feature extractor
///
/// Each group is computed independently; a group that fails is replaced
/// by its `Default` and the others are unaffected.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: EngineConfig,
}

impl FeatureExtractor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn extract(&self, waveform: &Waveform) -> FeatureRecord {
        let m = Measurements::new(waveform, &self.config);

        let record = FeatureRecord {
            basic: basic_properties(waveform),
            musical: musical_features(&m),
            spectral: spectral_features(&m),
            rhythm_pattern: or_default(
                "rhythm pattern",
                rhythm_pattern(&m),
                RhythmPattern::default,
            ),
            harmonic_content: or_default(
                "harmonic content",
                harmonic_content(&m),
                HarmonicContent::default,
            ),
            perceptual: perceptual_features(&m),
        };

        log::debug!(
            "Extracted features: {:.2}s, tempo {:?}, key {:?}",
            record.basic.duration_sec,
            record.musical.tempo_bpm,
            record.musical.key_signature
        );

        record
    }
}

impl FeatureProfile for FeatureExtractor {
    type Record = FeatureRecord;

    fn name(&self) -> &'static str {
        "full"
    }

    fn extract(&self, waveform: &Waveform) -> FeatureRecord {
        FeatureExtractor::extract(self, waveform)
    }
}

fn basic_properties(waveform: &Waveform) -> BasicProperties {
    BasicProperties {
        duration_sec: waveform.duration_secs(),
        sample_rate: waveform.sample_rate(),
        channels: 1,
        size: waveform.len() as u64 * 2,
    }
}

fn musical_features(m: &Measurements) -> MusicalFeatures {
    let tempo_bpm = or_default("tempo", m.beats().map(|b| Some(b.tempo_bpm)), || None);

    let key_signature = or_default(
        "key",
        m.chroma_profile().map(|p| Some(dominant_pitch_class(&p))),
        || None,
    );

    MusicalFeatures {
        tempo_bpm,
        key_signature,
        time_signature: time_signature_from_tempo(tempo_bpm),
    }
}

fn spectral_features(m: &Measurements) -> SpectralFeatures {
    let mean_of = |what: &'static str, values: Result<Vec<f32>, FeatureError>| {
        or_default(
            what,
            values.and_then(|v| finite(what, dsp::mean(&v)).map(Some)),
            || None,
        )
    };

    SpectralFeatures {
        spectral_centroid: mean_of("spectral centroid", m.centroid()),
        spectral_rolloff: mean_of("spectral rolloff", m.rolloff()),
        zero_crossing_rate: mean_of("zero crossing rate", Ok(m.zero_crossing_rate())),
        mfcc_features: or_default("mfcc", m.mfcc().map(Some), || None),
    }
}

fn rhythm_pattern(m: &Measurements) -> Result<RhythmPattern, FeatureError> {
    let track = m.beats()?;
    let intervals: Vec<f32> = track.intervals().iter().map(|&i| i as f32).collect();

    if intervals.is_empty() {
        return Ok(RhythmPattern {
            beat_count: track.beat_times.len(),
            ..RhythmPattern::default()
        });
    }

    let mean = finite("beat interval mean", dsp::mean(&intervals))?;
    let std = finite("beat interval deviation", dsp::std_dev(&intervals))?;
    let regularity = finite("rhythm regularity", 1.0 - std / mean)?;

    Ok(RhythmPattern {
        beat_count: track.beat_times.len(),
        avg_interval: Some(mean),
        interval_std: Some(std),
        rhythm_regularity: regularity.clamp(0.0, 1.0),
    })
}

fn harmonic_content(m: &Measurements) -> Result<HarmonicContent, FeatureError> {
    let parts = m.separation()?;
    let harmonic: f64 = parts.harmonic.iter().map(|x| x.abs() as f64).sum();
    let percussive: f64 = parts.percussive.iter().map(|x| x.abs() as f64).sum();
    let harmonic_ratio = finite("harmonic ratio", harmonic / (harmonic + percussive))?;

    let profile = m.chroma_profile()?;

    Ok(HarmonicContent {
        harmonic_ratio,
        chroma_profile: profile.map(|v| v as f64),
        harmonic_complexity: dsp::std_dev(&profile),
    })
}

fn perceptual_features(m: &Measurements) -> PerceptualFeatures {
    let defaults = PerceptualFeatures::default();

    let energy = or_default("energy", finite("energy", dsp::mean(m.rms())), || defaults.energy);
    let loudness = or_default(
        "loudness",
        finite("loudness", 20.0 * (dsp::mean(m.rms()) + 1e-10).log10()),
        || defaults.loudness,
    );
    let complexity = or_default("complexity", complexity(m), || defaults.complexity);

    PerceptualFeatures {
        loudness,
        energy,
        complexity,
    }
}

/// Weighted spectral variability, capped at 1
fn complexity(m: &Measurements) -> Result<f64, FeatureError> {
    let centroid_cv = finite("centroid variation", dsp::coefficient_of_variation(&m.centroid()?))?;
    let rolloff_cv = finite("rolloff variation", dsp::coefficient_of_variation(&m.rolloff()?))?;
    let zcr = dsp::mean(&m.zero_crossing_rate());

    Ok((centroid_cv * 0.5 + rolloff_cv * 0.3 + zcr * 0.2).min(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, seconds: f64, sample_rate: u32) -> Waveform {
        let len = (seconds * sample_rate as f64) as usize;
        let samples = (0..len)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                (0.5 * (2.0 * std::f64::consts::PI * freq * t).sin()) as f32
            })
            .collect();
        Waveform::from_samples(samples, sample_rate).unwrap()
    }

    #[test]
    fn test_time_signature_thresholds() {
        assert_eq!(time_signature_from_tempo(None), 4);
        assert_eq!(time_signature_from_tempo(Some(79.9)), 3);
        assert_eq!(time_signature_from_tempo(Some(80.0)), 4);
        assert_eq!(time_signature_from_tempo(Some(119.9)), 4);
        assert_eq!(time_signature_from_tempo(Some(120.0)), 6);
        assert_eq!(time_signature_from_tempo(Some(0.0)), 4);
    }

    #[test]
    fn test_silence_uses_group_defaults() {
        let waveform = Waveform::from_samples(vec![0.0; 22050], 22050).unwrap();
        let record = FeatureExtractor::default().extract(&waveform);

        assert_eq!(record.basic.duration_sec, 1.0);
        assert_eq!(record.basic.size, 44100);
        assert_eq!(record.musical.tempo_bpm, None);
        assert_eq!(record.musical.time_signature, 4);
        assert_eq!(record.rhythm_pattern, RhythmPattern::default());
        assert_eq!(record.harmonic_content, HarmonicContent::default());
        assert_eq!(record.perceptual.energy, 0.0);
        assert!(record.perceptual.loudness <= -60.0);
        assert_eq!(record.perceptual.complexity, 0.5);
        assert_eq!(record.spectral.zero_crossing_rate, Some(0.0));
    }

    #[test]
    fn test_sine_features() {
        let record = FeatureExtractor::default().extract(&sine(440.0, 2.0, 22050));

        assert!((record.basic.duration_sec - 2.0).abs() < 0.05);
        assert_eq!(record.musical.key_signature, Some(crate::dsp::PitchClass::A));

        let zcr = record.spectral.zero_crossing_rate.unwrap();
        // Two crossings per cycle
        assert!((zcr - 880.0 / 22050.0).abs() < 0.01, "zcr {}", zcr);

        let centroid = record.spectral.spectral_centroid.unwrap();
        assert!((centroid - 440.0).abs() < 100.0, "centroid {}", centroid);

        let mfcc = record.spectral.mfcc_features.unwrap();
        assert_eq!(mfcc.len(), 13);
        assert_eq!(mfcc[0].len(), 1 + 44100 / 512);

        assert!(record.harmonic_content.harmonic_ratio > 0.7);
        assert!(record.perceptual.energy > 0.3 && record.perceptual.energy < 0.4);
        assert!(record.perceptual.complexity <= 1.0);
    }
}
