//! WAV fixtures shared by the integration tests

#![allow(dead_code)]

use hound::{SampleFormat, WavSpec, WavWriter};
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

/// Mono sine tone
pub fn sine(freq: f64, seconds: f64, sample_rate: u32, amplitude: f64) -> Vec<f32> {
    let len = (seconds * sample_rate as f64) as usize;
    (0..len)
        .map(|i| (amplitude * (2.0 * PI * freq * i as f64 / sample_rate as f64).sin()) as f32)
        .collect()
}

/// Decaying noise bursts every `period` samples, the first half a period in
pub fn click_train(period: usize, len: usize) -> Vec<f32> {
    let mut samples = vec![0.0f32; len];
    let mut start = period / 2;
    while start < len {
        for i in 0..256.min(len - start) {
            let decay = (-(i as f32) / 48.0).exp();
            let sign = if (i * 7919) % 3 == 0 { -1.0 } else { 1.0 };
            samples[start + i] = 0.9 * decay * sign;
        }
        start += period;
    }
    samples
}

/// Write 32-bit float mono WAV
pub fn write_float_wav(path: &Path, samples: &[f32], sample_rate: u32) -> PathBuf {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
    path.to_path_buf()
}

/// Write 16-bit PCM WAV; `frames` holds one `Vec` of channel values per frame
pub fn write_pcm16_wav(path: &Path, frames: &[Vec<f32>], sample_rate: u32) -> PathBuf {
    let channels = frames.first().map(|f| f.len()).unwrap_or(1) as u16;
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for frame in frames {
        for &s in frame {
            writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
        }
    }
    writer.finalize().unwrap();
    path.to_path_buf()
}
