//! Primary decode backend built on symphonia
//!
//! Handles every container symphonia's default registry knows (WAV, MP3,
//! FLAC, OGG/Vorbis, MP4/AAC). Per-packet decode errors are treated as
//! recoverable and only logged at debug level.

use super::backend::{downmix_interleaved, AudioSource, DecodeBackend, DecodeRate, DecodedAudio};
use super::resample::resample_sinc;
use crate::error::BackendError;
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Symphonia-based decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaBackend;

impl SymphoniaBackend {
    pub fn new() -> Self {
        Self
    }

    /// Decode at most `max_seconds` of audio at the native rate
    pub fn decode_partial(
        &self,
        source: &AudioSource,
        max_seconds: Option<f32>,
    ) -> Result<DecodedAudio, BackendError> {
        let mut opened = open(source)?;

        let max_samples = max_seconds
            .map(|secs| (secs.max(0.0) * opened.sample_rate as f32).ceil() as usize)
            .unwrap_or(usize::MAX);

        let mut all_samples: Vec<f32> = Vec::new();
        let mut channels = opened.channels;

        loop {
            let packet = match opened.format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => {
                    log::debug!("Error reading packet from {}: {:?}", source, e);
                    break;
                }
            };

            if packet.track_id() != opened.track_id {
                continue;
            }

            let decoded = match opened.decoder.decode(&packet) {
                Ok(d) => d,
                Err(e) => {
                    log::debug!("Skipping undecodable packet in {}: {:?}", source, e);
                    continue;
                }
            };

            let spec = *decoded.spec();
            let capacity = decoded.capacity() as u64;

            let mut sample_buf = SampleBuffer::<f32>::new(capacity, spec);
            sample_buf.copy_interleaved_ref(decoded);

            channels = spec.channels.count();
            downmix_interleaved(sample_buf.samples(), channels, &mut all_samples);

            if all_samples.len() >= max_samples {
                all_samples.truncate(max_samples);
                break;
            }
        }

        if all_samples.is_empty() {
            return Err(BackendError::Empty);
        }

        Ok(DecodedAudio {
            samples: all_samples,
            sample_rate: opened.sample_rate,
            channels,
            bits_per_sample: opened.bits_per_sample,
        })
    }

    /// Read the stream duration without decoding audio
    ///
    /// Uses the frame count from the container header when present and
    /// otherwise walks every packet, summing packet durations.
    pub fn probe_duration(&self, source: &AudioSource) -> Result<f64, BackendError> {
        let mut opened = open(source)?;

        if let Some(n_frames) = opened.n_frames {
            return Ok(n_frames as f64 / opened.sample_rate as f64);
        }

        let mut total: u64 = 0;
        loop {
            match opened.format.next_packet() {
                Ok(packet) if packet.track_id() == opened.track_id => total += packet.dur,
                Ok(_) => continue,
                Err(_) => break,
            }
        }

        let seconds = match opened.time_base {
            Some(tb) => {
                let time = tb.calc_time(total);
                time.seconds as f64 + time.frac
            }
            None => total as f64 / opened.sample_rate as f64,
        };

        if seconds <= 0.0 {
            return Err(BackendError::Empty);
        }
        Ok(seconds)
    }
}

impl DecodeBackend for SymphoniaBackend {
    fn name(&self) -> &'static str {
        "symphonia"
    }

    fn decode(&self, source: &AudioSource, rate: DecodeRate) -> Result<DecodedAudio, BackendError> {
        let mut decoded = self.decode_partial(source, None)?;

        log::debug!(
            "symphonia decoded {} samples ({:.1}s) at {}Hz from {}",
            decoded.samples.len(),
            decoded.samples.len() as f32 / decoded.sample_rate as f32,
            decoded.sample_rate,
            source
        );

        if let DecodeRate::Target(target) = rate {
            if decoded.sample_rate != target {
                decoded.samples = resample_sinc(decoded.samples, decoded.sample_rate, target)?;
                decoded.sample_rate = target;
            }
        }

        Ok(decoded)
    }
}

/// An opened container with a decoder for its first audio track
struct OpenedTrack {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
    bits_per_sample: Option<u32>,
    n_frames: Option<u64>,
    time_base: Option<symphonia::core::units::TimeBase>,
}

fn open(source: &AudioSource) -> Result<OpenedTrack, BackendError> {
    let media: Box<dyn MediaSource> = match source {
        AudioSource::File(path) => Box::new(std::fs::File::open(path).map_err(BackendError::Open)?),
        AudioSource::Memory { bytes, .. } => Box::new(Cursor::new(bytes.clone())),
    };
    let mss = MediaSourceStream::new(media, Default::default());

    let mut hint = Hint::new();
    let extension = source.extension();
    if !extension.is_empty() {
        hint.with_extension(&extension);
    }

    let format_opts = FormatOptions::default();
    let metadata_opts = MetadataOptions::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_opts, &metadata_opts)
        .map_err(BackendError::Probe)?;

    let format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(BackendError::NoTrack)?;

    let params = track.codec_params.clone();
    let track_id = track.id;
    let sample_rate = params.sample_rate.ok_or(BackendError::NoSampleRate)?;

    let decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(BackendError::CreateDecoder)?;

    Ok(OpenedTrack {
        format,
        decoder,
        track_id,
        sample_rate,
        channels: params.channels.map(|c| c.count()).unwrap_or(1),
        bits_per_sample: params.bits_per_sample,
        n_frames: params.n_frames,
        time_base: params.time_base,
    })
}
