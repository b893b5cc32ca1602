//! Decode, extract and classify in one call

use crate::classify::{ClassificationRecord, Classifier};
use crate::config::EngineConfig;
use crate::decode::{AudioDecoder, AudioInfo, AudioSource, ValidationReport, Waveform};
use crate::dsp::{self, PitchClass};
use crate::error::EngineError;
use crate::features::{
    FeatureExtractor, FeatureRecord, Measurements, MixFeatureProfile, MixFeatureRecord,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Features and labels merged into one flat record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    #[serde(flatten)]
    pub features: FeatureRecord,

    #[serde(flatten)]
    pub classification: ClassificationRecord,
}

/// Cheap overview of an upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickSummary {
    /// Seconds, 2 decimals
    pub duration_sec: f64,
    pub sample_rate: u32,
    /// BPM, 2 decimals
    pub tempo_bpm: Option<f64>,
    /// Mean frame RMS, 5 decimals
    pub loudness_rms: f64,
    pub estimated_key: Option<PitchClass>,
}

/// Stateless orchestration of decoder, extractors and classifier
///
/// Only the decode stage can fail. Once a waveform exists every call
/// returns a full record.
#[derive(Debug, Clone)]
pub struct AnalysisPipeline {
    decoder: AudioDecoder,
    extractor: FeatureExtractor,
    mix: MixFeatureProfile,
    classifier: Classifier,
}

impl AnalysisPipeline {
    pub fn new(config: EngineConfig) -> Self {
        let decoder = AudioDecoder::new(config);
        Self::with_decoder(decoder)
    }

    /// Pipeline around a custom decoder; extraction uses its configuration
    pub fn with_decoder(decoder: AudioDecoder) -> Self {
        let config = decoder.config().clone();
        Self {
            extractor: FeatureExtractor::new(&config),
            mix: MixFeatureProfile::new(&config),
            classifier: Classifier::new(),
            decoder,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        self.decoder.config()
    }

    pub fn decoder(&self) -> &AudioDecoder {
        &self.decoder
    }

    pub fn validate(&self, path: &Path) -> ValidationReport {
        self.decoder.validate(path)
    }

    pub fn get_info(&self, path: &Path) -> Result<AudioInfo, EngineError> {
        self.decoder.get_info(path)
    }

    /// Full features plus classification for a file
    pub fn analyze(&self, path: &Path) -> Result<AnalysisRecord, EngineError> {
        self.analyze_source(&AudioSource::from(path))
    }

    /// Full features plus classification for an in-memory upload
    pub fn analyze_bytes(
        &self,
        bytes: &[u8],
        extension: &str,
    ) -> Result<AnalysisRecord, EngineError> {
        self.analyze_source(&AudioSource::from_bytes(bytes, extension))
    }

    pub fn analyze_source(&self, source: &AudioSource) -> Result<AnalysisRecord, EngineError> {
        log::info!("Analyzing {}", source);
        let waveform = self.decoder.load_source(source)?;
        Ok(self.analyze_waveform(&waveform))
    }

    /// Extract and classify an already decoded waveform
    pub fn analyze_waveform(&self, waveform: &Waveform) -> AnalysisRecord {
        let features = self.extractor.extract(waveform);
        let classification = self.classifier.classify(&features);

        log::info!(
            "Classified as {} ({:?}, {:?}), intensity {:.2}",
            classification.category,
            classification.mood,
            classification.genre,
            classification.intensity
        );

        AnalysisRecord {
            features,
            classification,
        }
    }

    /// Mix feature vector for a file
    pub fn analyze_mix(&self, path: &Path) -> Result<MixFeatureRecord, EngineError> {
        self.analyze_mix_source(&AudioSource::from(path))
    }

    pub fn analyze_mix_bytes(
        &self,
        bytes: &[u8],
        extension: &str,
    ) -> Result<MixFeatureRecord, EngineError> {
        self.analyze_mix_source(&AudioSource::from_bytes(bytes, extension))
    }

    pub fn analyze_mix_source(
        &self,
        source: &AudioSource,
    ) -> Result<MixFeatureRecord, EngineError> {
        log::info!("Extracting mix features from {}", source);
        let waveform = self.decoder.load_source(source)?;
        Ok(self.mix.extract(&waveform))
    }

    /// Duration, tempo, loudness and key without the full feature set
    pub fn summarize(&self, path: &Path) -> Result<QuickSummary, EngineError> {
        let waveform = self.decoder.load(path)?;
        Ok(self.summarize_waveform(&waveform))
    }

    pub fn summarize_waveform(&self, waveform: &Waveform) -> QuickSummary {
        let m = Measurements::new(waveform, self.config());
        let round = |value: f64, decimals: i32| {
            let factor = 10f64.powi(decimals);
            (value * factor).round() / factor
        };

        QuickSummary {
            duration_sec: round(waveform.duration_secs(), 2),
            sample_rate: waveform.sample_rate(),
            tempo_bpm: m.beats().ok().map(|b| round(b.tempo_bpm, 2)),
            loudness_rms: round(dsp::mean(m.rms()), 5),
            estimated_key: m
                .chroma_profile()
                .ok()
                .map(|p| dsp::chroma::dominant_pitch_class(&p)),
        }
    }
}

impl Default for AnalysisPipeline {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_is_ambient() {
        let waveform = Waveform::from_samples(vec![0.0; 22050 * 2], 22050).unwrap();
        let record = AnalysisPipeline::default().analyze_waveform(&waveform);

        assert_eq!(record.features.perceptual.energy, 0.0);
        assert_eq!(record.classification.category, crate::classify::Category::Ambient);
        assert_eq!(record.classification.genre, crate::classify::Genre::Ambient);
    }

    #[test]
    fn test_record_is_flat() {
        let waveform = Waveform::from_samples(vec![0.0; 22050], 22050).unwrap();
        let record = AnalysisPipeline::default().analyze_waveform(&waveform);
        let json = serde_json::to_value(&record).unwrap();
        for key in [
            "duration_sec",
            "tempo_bpm",
            "energy",
            "category",
            "tags",
            "mood",
            "intensity",
            "genre",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }

    #[test]
    fn test_summary_of_silence() {
        let waveform = Waveform::from_samples(vec![0.0; 33075], 22050).unwrap();
        let summary = AnalysisPipeline::default().summarize_waveform(&waveform);
        assert_eq!(summary.duration_sec, 1.5);
        assert_eq!(summary.sample_rate, 22050);
        assert_eq!(summary.tempo_bpm, None);
        assert_eq!(summary.loudness_rms, 0.0);
        assert_eq!(summary.estimated_key, Some(PitchClass::C));
    }

    #[test]
    fn test_unsupported_upload_fails_fast() {
        let result = AnalysisPipeline::default().analyze_bytes(b"not audio", "txt");
        assert!(matches!(result, Err(EngineError::UnsupportedFormat { .. })));
    }
}
