mod common;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sample_analyzer::classify::Category;
use sample_analyzer::dsp::PitchClass;
use sample_analyzer::{AnalysisPipeline, Waveform};
use tempfile::TempDir;

// Half a second at the default 22050 Hz, between two whole-frame lags
const CLICK_PERIOD: usize = 11025;

#[test]
fn test_silent_file_is_ambient() {
    let dir = TempDir::new().unwrap();
    let path = common::write_float_wav(
        &dir.path().join("silence.wav"),
        &vec![0.0; 22050 * 2],
        22050,
    );

    let record = AnalysisPipeline::default().analyze(&path).unwrap();
    assert_eq!(record.features.perceptual.energy, 0.0);
    assert!(record.features.perceptual.loudness <= -60.0);
    assert_eq!(record.classification.category, Category::Ambient);
    assert!(record.classification.tags.contains(&"quiet".to_string()));
}

#[test]
fn test_sine_file() {
    let dir = TempDir::new().unwrap();
    let path = common::write_float_wav(
        &dir.path().join("a440.wav"),
        &common::sine(440.0, 2.0, 22050, 0.5),
        22050,
    );

    let record = AnalysisPipeline::default().analyze(&path).unwrap();
    assert!((record.features.basic.duration_sec - 2.0).abs() < 0.05);
    assert!(record.features.spectral.zero_crossing_rate.unwrap() < 0.1);
    assert_ne!(record.classification.category, Category::Percussion);
    assert_eq!(record.features.musical.key_signature, Some(PitchClass::A));
}

#[test]
fn test_click_train_tempo() {
    let samples = common::click_train(CLICK_PERIOD, 22050 * 10);
    let waveform = Waveform::from_samples(samples, 22050).unwrap();

    let record = AnalysisPipeline::default().analyze_waveform(&waveform);
    let tempo = record.features.musical.tempo_bpm.unwrap();
    assert!((tempo - 120.0).abs() <= 5.0, "tempo {}", tempo);
    assert_eq!(record.features.musical.time_signature, 6);
    assert!(record.features.rhythm_pattern.beat_count >= 10);

    let interval = record.features.rhythm_pattern.avg_interval.unwrap();
    assert!((interval - 0.5).abs() < 0.05, "interval {}", interval);
}

#[test]
fn test_click_train_file() {
    let dir = TempDir::new().unwrap();
    let samples = common::click_train(CLICK_PERIOD, 22050 * 8);
    let path = common::write_float_wav(&dir.path().join("clicks.wav"), &samples, 22050);

    let pipeline = AnalysisPipeline::default();
    let record = pipeline.analyze(&path).unwrap();
    let tempo = record.features.musical.tempo_bpm.unwrap();
    assert!((tempo - 120.0).abs() <= 5.0, "tempo {}", tempo);
    assert_eq!(record.features.musical.time_signature, 6);

    let mix = pipeline.analyze_mix(&path).unwrap();
    assert!((mix.tempo - 120.0).abs() <= 5.0);
}

#[test]
fn test_analysis_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let mut samples = common::sine(330.0, 1.5, 22050, 0.3);
    for (s, c) in samples.iter_mut().zip(common::click_train(5512, 33075)) {
        *s += c * 0.5;
    }
    let path = common::write_float_wav(&dir.path().join("mixed.wav"), &samples, 22050);

    let pipeline = AnalysisPipeline::default();
    let first = pipeline.analyze(&path).unwrap();
    let second = pipeline.analyze(&path).unwrap();

    assert_eq!(first.classification.category, second.classification.category);
    assert_eq!(first.classification.mood, second.classification.mood);
    assert_eq!(first.classification.genre, second.classification.genre);
    assert!((first.features.perceptual.energy - second.features.perceptual.energy).abs() < 1e-9);
    assert!((first.classification.intensity - second.classification.intensity).abs() < 1e-9);
}

#[test]
fn test_bytes_match_file() {
    let dir = TempDir::new().unwrap();
    let path = common::write_float_wav(
        &dir.path().join("upload.wav"),
        &common::sine(261.63, 1.0, 22050, 0.4),
        22050,
    );
    let bytes = std::fs::read(&path).unwrap();

    let pipeline = AnalysisPipeline::default();
    assert_eq!(pipeline.analyze(&path).unwrap(), pipeline.analyze_bytes(&bytes, "wav").unwrap());
    assert_eq!(
        pipeline.analyze_mix(&path).unwrap(),
        pipeline.analyze_mix_bytes(&bytes, ".WAV").unwrap()
    );
}

#[test]
fn test_summary() {
    let dir = TempDir::new().unwrap();
    let path = common::write_float_wav(
        &dir.path().join("summary.wav"),
        &common::sine(440.0, 2.0, 22050, 0.5),
        22050,
    );

    let summary = AnalysisPipeline::default().summarize(&path).unwrap();
    assert_eq!(summary.duration_sec, 2.0);
    assert_eq!(summary.sample_rate, 22050);
    assert_eq!(summary.estimated_key, Some(PitchClass::A));
    assert!(summary.loudness_rms > 0.3 && summary.loudness_rms < 0.4);
}

#[test]
fn test_bounded_fields_on_random_signals() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let pipeline = AnalysisPipeline::default();

    for _ in 0..6 {
        let freq: f64 = rng.random_range(40.0..6000.0);
        let amplitude: f64 = rng.random_range(0.0..1.0);
        let seconds: f64 = rng.random_range(0.2..1.5);
        let noise: f64 = rng.random_range(0.0..0.5);

        let samples: Vec<f32> = common::sine(freq, seconds, 22050, amplitude)
            .into_iter()
            .map(|s| (s + rng.random_range(-noise..=noise) as f32).clamp(-1.0, 1.0))
            .collect();
        let waveform = Waveform::from_samples(samples, 22050).unwrap();

        let record = pipeline.analyze_waveform(&waveform);
        let intensity = record.classification.intensity;
        assert!((0.0..=1.0).contains(&intensity), "intensity {}", intensity);
        assert!(record.features.perceptual.complexity <= 1.0);
        assert!((0.0..=1.0).contains(&record.features.rhythm_pattern.rhythm_regularity));

        let mix = sample_analyzer::MixFeatureProfile::new(pipeline.config()).extract(&waveform);
        for value in [
            mix.danceability,
            mix.energy,
            mix.valence,
            mix.acousticness,
            mix.instrumentalness,
            mix.liveness,
            mix.speechiness,
        ] {
            assert!((0.0..=1.0).contains(&value), "mix value {} for {} Hz", value, freq);
        }
    }
}

#[test]
fn test_missing_file_is_fatal() {
    let result = AnalysisPipeline::default().analyze(std::path::Path::new("/nonexistent/clip.wav"));
    assert!(matches!(result, Err(sample_analyzer::EngineError::FileNotFound(_))));
}
