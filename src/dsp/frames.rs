//! Time-domain framing, RMS and zero-crossing rate

use crate::config::FrameParams;

/// Zero-padded view of a signal sliced into overlapping frames
pub struct Framed {
    padded: Vec<f32>,
    frame_length: usize,
    hop_length: usize,
    count: usize,
}

impl Framed {
    pub fn new(samples: &[f32], params: FrameParams) -> Self {
        let pad = params.n_fft / 2;
        let mut padded = vec![0.0f32; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        let count = if params.hop_length == 0 || padded.len() < params.n_fft {
            0
        } else {
            1 + (padded.len() - params.n_fft) / params.hop_length
        };

        Self {
            padded,
            frame_length: params.n_fft,
            hop_length: params.hop_length,
            count,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f32]> + '_ {
        (0..self.count).map(move |i| {
            let start = i * self.hop_length;
            &self.padded[start..start + self.frame_length]
        })
    }
}

/// Root-mean-square amplitude of each frame
pub fn rms(samples: &[f32], params: FrameParams) -> Vec<f32> {
    Framed::new(samples, params)
        .iter()
        .map(|frame| rms_and_peak(frame).0)
        .collect()
}

/// Fraction of sign changes in each frame
///
/// Values within 1e-10 of zero count as positive, so silence never
/// crosses.
pub fn zero_crossing_rate(samples: &[f32], params: FrameParams) -> Vec<f32> {
    let is_negative = |x: f32| x < -1e-10;

    Framed::new(samples, params)
        .iter()
        .map(|frame| {
            let crossings = frame
                .windows(2)
                .filter(|pair| is_negative(pair[0]) != is_negative(pair[1]))
                .count();
            crossings as f32 / frame.len() as f32
        })
        .collect()
}

/// RMS and peak of a sample chunk
#[inline]
pub fn rms_and_peak(samples: &[f32]) -> (f32, f32) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }

    let mut sum_sq = 0.0f64;
    let mut peak = 0.0f32;

    for &sample in samples {
        let abs = sample.abs();
        sum_sq += (abs as f64) * (abs as f64);
        if abs > peak {
            peak = abs;
        }
    }

    let rms = (sum_sq / samples.len() as f64).sqrt() as f32;
    (rms, peak)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> FrameParams {
        FrameParams {
            n_fft: 8,
            hop_length: 4,
        }
    }

    #[test]
    fn test_frame_count_is_centred() {
        let samples = vec![1.0f32; 16];
        let framed = Framed::new(&samples, params());
        // 1 + len / hop
        assert_eq!(framed.len(), 5);
        // First frame is half padding
        let first = framed.iter().next().unwrap();
        assert_eq!(&first[..4], &[0.0; 4]);
        assert_eq!(&first[4..], &[1.0; 4]);
    }

    #[test]
    fn test_rms_and_peak() {
        let samples = vec![0.0, 0.5, -0.5, 0.25, -0.25];
        let (rms, peak) = rms_and_peak(&samples);
        assert!((peak - 0.5).abs() < 0.001);
        assert!(rms > 0.0 && rms < peak);
    }

    #[test]
    fn test_zcr_of_alternating_signal() {
        let samples: Vec<f32> = (0..64).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let zcr = zero_crossing_rate(&samples, params());
        // Middle frames are full of sign changes: 7 crossings over 8 samples
        assert!((zcr[4] - 7.0 / 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_silence_has_no_crossings_or_energy() {
        let samples = vec![0.0f32; 64];
        assert!(zero_crossing_rate(&samples, params()).iter().all(|&z| z == 0.0));
        assert!(rms(&samples, params()).iter().all(|&r| r == 0.0));
    }
}
