//! Fallback-chain audio decoder

use super::backend::{AudioSource, DecodeRate, Strategy, StrategyRate};
use super::info::{self, AudioInfo};
use super::resample::resample_linear;
use super::validate::{self, ValidationReport};
use super::{SymphoniaBackend, WavBackend, Waveform};
use crate::config::EngineConfig;
use crate::error::{BackendError, EngineError};
use std::path::Path;
use std::sync::Arc;

/// Loads audio into a canonical mono waveform at the configured rate
#[derive(Debug, Clone)]
pub struct AudioDecoder {
    config: EngineConfig,
    strategies: Vec<Strategy>,
}

impl AudioDecoder {
    /// Decoder with the default three-step fallback chain:
    ///
    /// 1. symphonia, resampled to the target rate
    /// 2. hound WAV reader with bit-depth-aware normalisation
    /// 3. symphonia at the native rate, then linear resampling
    pub fn new(config: EngineConfig) -> Self {
        let symphonia = Arc::new(SymphoniaBackend::new());
        let strategies = vec![
            Strategy::new("primary", symphonia.clone(), StrategyRate::Target),
            Strategy::new("wav fallback", Arc::new(WavBackend::new()), StrategyRate::Target),
            Strategy::new("native-rate fallback", symphonia, StrategyRate::NativeThenResample),
        ];
        Self::with_strategies(config, strategies)
    }

    /// Decoder with a custom strategy chain
    pub fn with_strategies(config: EngineConfig, strategies: Vec<Strategy>) -> Self {
        Self { config, strategies }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Decode a file on disk
    pub fn load(&self, path: &Path) -> Result<Waveform, EngineError> {
        self.load_source(&AudioSource::from(path))
    }

    /// Decode an in-memory upload
    pub fn load_bytes(&self, bytes: &[u8], extension: &str) -> Result<Waveform, EngineError> {
        self.load_source(&AudioSource::from_bytes(bytes, extension))
    }

    /// Run the pre-decode checks, then each strategy until one yields samples
    pub fn load_source(&self, source: &AudioSource) -> Result<Waveform, EngineError> {
        self.check_source(source)?;

        let mut last_error = String::from("no decode strategies configured");

        for strategy in &self.strategies {
            match self.attempt(strategy, source) {
                Ok(waveform) => {
                    log::debug!(
                        "{} ({}) loaded {}: {} samples at {}Hz",
                        strategy.label,
                        strategy.backend.name(),
                        source,
                        waveform.len(),
                        waveform.sample_rate()
                    );
                    return Ok(waveform);
                }
                Err(e) => {
                    log::warn!(
                        "{} ({}) failed to load {}: {}",
                        strategy.label,
                        strategy.backend.name(),
                        source,
                        e
                    );
                    last_error = e.to_string();
                }
            }
        }

        Err(EngineError::Decode {
            path: source.display_path(),
            attempts: self.strategies.len(),
            last_error,
        })
    }

    /// Existence, emptiness and format checks; no decoding happens here
    pub fn check_source(&self, source: &AudioSource) -> Result<(), EngineError> {
        match source {
            AudioSource::File(path) => {
                if !path.exists() {
                    return Err(EngineError::FileNotFound(path.clone()));
                }
                let metadata = std::fs::metadata(path).map_err(|e| EngineError::Io {
                    path: path.clone(),
                    source: e,
                })?;
                if metadata.len() == 0 {
                    return Err(EngineError::EmptyFile(path.clone()));
                }
            }
            AudioSource::Memory { bytes, .. } => {
                if bytes.is_empty() {
                    return Err(EngineError::EmptyFile(source.display_path()));
                }
            }
        }

        let extension = source.extension();
        if !self.config.is_supported(&extension) {
            return Err(EngineError::UnsupportedFormat {
                path: source.display_path(),
                extension,
            });
        }

        Ok(())
    }

    fn attempt(&self, strategy: &Strategy, source: &AudioSource) -> Result<Waveform, BackendError> {
        let target = self.config.target_sample_rate;

        let (samples, sample_rate) = match strategy.rate {
            StrategyRate::Target => {
                let decoded = strategy.backend.decode(source, DecodeRate::Target(target))?;
                (decoded.samples, decoded.sample_rate)
            }
            StrategyRate::NativeThenResample => {
                let decoded = strategy.backend.decode(source, DecodeRate::Native)?;
                if decoded.sample_rate != target {
                    (resample_linear(&decoded.samples, decoded.sample_rate, target), target)
                } else {
                    (decoded.samples, decoded.sample_rate)
                }
            }
        };

        Waveform::from_samples(samples, sample_rate).ok_or(BackendError::Empty)
    }

    /// Lightweight file description; see [`AudioInfo`]
    pub fn get_info(&self, path: &Path) -> Result<AudioInfo, EngineError> {
        info::probe(path, &self.config)
    }

    /// Pre-flight check that never fails; see [`ValidationReport`]
    pub fn validate(&self, path: &Path) -> ValidationReport {
        validate::validate(self, path)
    }
}

impl Default for AudioDecoder {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{DecodeBackend, DecodedAudio};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend returning canned output and counting calls
    struct FakeBackend {
        calls: AtomicUsize,
        output: Option<(Vec<f32>, u32)>,
    }

    impl FakeBackend {
        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                output: None,
            })
        }

        fn returning(samples: Vec<f32>, sample_rate: u32) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                output: Some((samples, sample_rate)),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl DecodeBackend for FakeBackend {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn decode(
            &self,
            _source: &AudioSource,
            rate: DecodeRate,
        ) -> Result<DecodedAudio, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (samples, native_rate) = self.output.clone().ok_or(BackendError::NoTrack)?;
            let sample_rate = match rate {
                DecodeRate::Target(t) => t,
                DecodeRate::Native => native_rate,
            };
            Ok(DecodedAudio {
                samples,
                sample_rate,
                channels: 1,
                bits_per_sample: None,
            })
        }
    }

    fn memory_source() -> AudioSource {
        AudioSource::from_bytes(vec![1u8; 64], "wav")
    }

    #[test]
    fn test_first_success_short_circuits() {
        let first = FakeBackend::returning(vec![0.1; 100], 22050);
        let second = FakeBackend::returning(vec![0.2; 100], 22050);
        let decoder = AudioDecoder::with_strategies(
            EngineConfig::default(),
            vec![
                Strategy::new("one", first.clone(), StrategyRate::Target),
                Strategy::new("two", second.clone(), StrategyRate::Target),
            ],
        );

        let waveform = decoder.load_source(&memory_source()).unwrap();
        assert_eq!(waveform.samples()[0], 0.1);
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 0);
    }

    #[test]
    fn test_empty_output_falls_through() {
        let empty = FakeBackend::returning(Vec::new(), 22050);
        let good = FakeBackend::returning(vec![0.3; 10], 22050);
        let decoder = AudioDecoder::with_strategies(
            EngineConfig::default(),
            vec![
                Strategy::new("empty", empty.clone(), StrategyRate::Target),
                Strategy::new("good", good.clone(), StrategyRate::Target),
            ],
        );

        let waveform = decoder.load_source(&memory_source()).unwrap();
        assert_eq!(waveform.len(), 10);
        assert_eq!(empty.calls(), 1);
        assert_eq!(good.calls(), 1);
    }

    #[test]
    fn test_native_strategy_resamples_to_target() {
        let native = FakeBackend::returning(vec![0.5; 44100], 44100);
        let decoder = AudioDecoder::with_strategies(
            EngineConfig::default(),
            vec![Strategy::new("native", native, StrategyRate::NativeThenResample)],
        );

        let waveform = decoder.load_source(&memory_source()).unwrap();
        assert_eq!(waveform.sample_rate(), 22050);
        assert_eq!(waveform.len(), 22050);
    }

    #[test]
    fn test_exhausted_chain_reports_attempts() {
        let a = FakeBackend::failing();
        let b = FakeBackend::failing();
        let decoder = AudioDecoder::with_strategies(
            EngineConfig::default(),
            vec![
                Strategy::new("a", a.clone(), StrategyRate::Target),
                Strategy::new("b", b.clone(), StrategyRate::NativeThenResample),
            ],
        );

        match decoder.load_source(&memory_source()) {
            Err(EngineError::Decode { attempts, path, .. }) => {
                assert_eq!(attempts, 2);
                assert_eq!(path, std::path::PathBuf::from("<memory>.wav"));
            }
            other => panic!("expected decode error, got {:?}", other),
        }
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
    }

    #[test]
    fn test_unsupported_format_skips_backends() {
        let backend = FakeBackend::returning(vec![0.1; 10], 22050);
        let decoder = AudioDecoder::with_strategies(
            EngineConfig::default(),
            vec![Strategy::new("only", backend.clone(), StrategyRate::Target)],
        );

        let result = decoder.load_source(&AudioSource::from_bytes(vec![1u8; 8], "txt"));
        assert!(matches!(result, Err(EngineError::UnsupportedFormat { .. })));
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn test_empty_buffer_is_rejected() {
        let backend = FakeBackend::returning(vec![0.1; 10], 22050);
        let decoder = AudioDecoder::with_strategies(
            EngineConfig::default(),
            vec![Strategy::new("only", backend.clone(), StrategyRate::Target)],
        );

        let result = decoder.load_bytes(&[], "wav");
        assert!(matches!(result, Err(EngineError::EmptyFile(_))));
        assert_eq!(backend.calls(), 0);
    }
}
