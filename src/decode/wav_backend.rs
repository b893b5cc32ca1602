//! Secondary decode backend: plain RIFF/WAVE reading via hound
//!
//! Used when symphonia refuses a file. Integer PCM is read raw and then
//! scaled with a divisor picked from the bit depth.

use super::backend::{downmix_interleaved, AudioSource, DecodeBackend, DecodeRate, DecodedAudio};
use super::resample::resample_sinc;
use crate::error::BackendError;
use hound::{SampleFormat, WavReader};
use std::io::{Cursor, Read};

/// hound-based WAV decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct WavBackend;

impl WavBackend {
    pub fn new() -> Self {
        Self
    }
}

impl DecodeBackend for WavBackend {
    fn name(&self) -> &'static str {
        "hound"
    }

    fn decode(&self, source: &AudioSource, rate: DecodeRate) -> Result<DecodedAudio, BackendError> {
        let extension = source.extension();
        if extension != "wav" {
            return Err(BackendError::Unsupported(extension));
        }

        let raw = match source {
            AudioSource::File(path) => read_wav(WavReader::open(path)?)?,
            AudioSource::Memory { bytes, .. } => {
                read_wav(WavReader::new(Cursor::new(bytes.clone()))?)?
            }
        };

        let RawWav {
            interleaved,
            channels,
            sample_rate,
            bits_per_sample,
            is_float,
        } = raw;

        let mut samples = Vec::with_capacity(interleaved.len() / channels.max(1));
        downmix_interleaved(&interleaved, channels, &mut samples);
        drop(interleaved);

        let mut out_rate = sample_rate;
        if let DecodeRate::Target(target) = rate {
            if sample_rate != target {
                samples = resample_sinc(samples, sample_rate, target)?;
                out_rate = target;
            }
        }

        if !is_float {
            let divisor = pcm_divisor(bits_per_sample);
            for s in samples.iter_mut() {
                *s /= divisor;
            }
        }

        if samples.is_empty() {
            return Err(BackendError::Empty);
        }

        Ok(DecodedAudio {
            samples,
            sample_rate: out_rate,
            channels,
            bits_per_sample: Some(bits_per_sample as u32),
        })
    }
}

/// Scale factor mapping integer PCM onto [-1, 1]
///
/// 16-bit and 32-bit get their full-scale divisor; any other width is
/// divided by 128 (the 8-bit scale).
pub fn pcm_divisor(bits_per_sample: u16) -> f32 {
    match bits_per_sample {
        16 => 32768.0,
        32 => 2_147_483_648.0,
        _ => 128.0,
    }
}

struct RawWav {
    interleaved: Vec<f32>,
    channels: usize,
    sample_rate: u32,
    bits_per_sample: u16,
    is_float: bool,
}

fn read_wav<R: Read>(mut reader: WavReader<R>) -> Result<RawWav, BackendError> {
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32))
            .collect::<Result<_, _>>()?,
    };

    Ok(RawWav {
        interleaved,
        channels: spec.channels as usize,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        is_float: spec.sample_format == SampleFormat::Float,
    })
}
