//! Short-time Fourier transform and its inverse

use super::frames::Framed;
use super::DspError;
use crate::config::FrameParams;
use apodize::hanning_iter;
use rustfft::{num_complex::Complex, FftPlanner};

/// Periodic Hann window of length `n`
pub fn hann_window(n: usize) -> Vec<f32> {
    // apodize yields the symmetric form; dropping the last point of an
    // n+1 window gives the periodic one
    hanning_iter(n + 1).take(n).map(|x| x as f32).collect()
}

/// Complex spectrogram, stored frame-major (`frames[t][bin]`)
#[derive(Debug, Clone)]
pub struct Stft {
    frames: Vec<Vec<Complex<f32>>>,
    params: FrameParams,
    signal_len: usize,
}

impl Stft {
    pub fn compute(samples: &[f32], params: FrameParams) -> Result<Self, DspError> {
        if samples.is_empty() {
            return Err(DspError::EmptySignal);
        }
        if params.n_fft < 2 || params.hop_length == 0 {
            return Err(DspError::InvalidParams(format!(
                "n_fft={} hop_length={}",
                params.n_fft, params.hop_length
            )));
        }

        let n_fft = params.n_fft;
        let n_bins = n_fft / 2 + 1;
        let window = hann_window(n_fft);

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n_fft);
        let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); fft.get_inplace_scratch_len()];

        let framed = Framed::new(samples, params);
        let mut frames = Vec::with_capacity(framed.len());

        for frame in framed.iter() {
            for ((slot, &x), &w) in buffer.iter_mut().zip(frame).zip(&window) {
                *slot = Complex::new(x * w, 0.0);
            }
            fft.process_with_scratch(&mut buffer, &mut scratch);
            frames.push(buffer[..n_bins].to_vec());
        }

        Ok(Self {
            frames,
            params,
            signal_len: samples.len(),
        })
    }

    pub fn frames(&self) -> &[Vec<Complex<f32>>] {
        &self.frames
    }

    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn n_bins(&self) -> usize {
        self.params.n_fft / 2 + 1
    }

    pub fn params(&self) -> FrameParams {
        self.params
    }

    pub fn magnitude(&self) -> Vec<Vec<f32>> {
        self.frames
            .iter()
            .map(|frame| frame.iter().map(|c| c.norm()).collect())
            .collect()
    }

    pub fn power(&self) -> Vec<Vec<f32>> {
        self.frames
            .iter()
            .map(|frame| frame.iter().map(|c| c.norm_sqr()).collect())
            .collect()
    }

    /// Same framing with every bin scaled by `mask[t][bin]`
    pub fn masked(&self, mask: &[Vec<f32>]) -> Self {
        let frames = self
            .frames
            .iter()
            .zip(mask)
            .map(|(frame, weights)| frame.iter().zip(weights).map(|(&c, &w)| c * w).collect())
            .collect();

        Self {
            frames,
            params: self.params,
            signal_len: self.signal_len,
        }
    }

    /// Weighted overlap-add back to a signal of the original length
    pub fn inverse(&self) -> Vec<f32> {
        let n_fft = self.params.n_fft;
        let hop = self.params.hop_length;
        let n_bins = self.n_bins();

        if self.frames.is_empty() {
            return vec![0.0; self.signal_len];
        }

        let window = hann_window(n_fft);
        let mut planner = FftPlanner::<f32>::new();
        let ifft = planner.plan_fft_inverse(n_fft);
        let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); ifft.get_inplace_scratch_len()];

        let output_len = n_fft + hop * (self.frames.len() - 1);
        let mut output = vec![0.0f32; output_len];
        let mut window_sum = vec![0.0f32; output_len];
        let scale = 1.0 / n_fft as f32;

        for (t, frame) in self.frames.iter().enumerate() {
            // Rebuild the full Hermitian spectrum from the one-sided bins
            buffer[..n_bins].copy_from_slice(frame);
            for k in n_bins..n_fft {
                buffer[k] = frame[n_fft - k].conj();
            }
            ifft.process_with_scratch(&mut buffer, &mut scratch);

            let start = t * hop;
            for (i, (&w, c)) in window.iter().zip(&buffer).enumerate() {
                output[start + i] += c.re * scale * w;
                window_sum[start + i] += w * w;
            }
        }

        for (sample, &norm) in output.iter_mut().zip(&window_sum) {
            if norm > 1e-8 {
                *sample /= norm;
            }
        }

        let pad = n_fft / 2;
        let mut signal: Vec<f32> = output.into_iter().skip(pad).collect();
        signal.resize(self.signal_len, 0.0);
        signal
    }
}
