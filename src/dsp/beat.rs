//! Onset strength, tempo estimation and dynamic-programming beat tracking

use super::mel::{power_to_db_matrix, MelFilterbank, N_MELS};
use super::stft::Stft;
use super::DspError;
use crate::config::{FrameParams, TempoParams};

/// How strongly beats are held to the estimated period
const TIGHTNESS: f64 = 100.0;

/// Longest lag considered by the tempo autocorrelation, in seconds
const AUTOCORRELATION_SECONDS: f64 = 8.0;

/// Samples on each side of a candidate onset when measuring its energy rise
const RISE_WINDOW: usize = 64;

/// Estimated tempo and beat positions
#[derive(Debug, Clone, PartialEq)]
pub struct BeatTrack {
    pub tempo_bpm: f64,
    /// Beat timestamps in seconds
    pub beat_times: Vec<f64>,
}

impl BeatTrack {
    /// Seconds between consecutive beats
    pub fn intervals(&self) -> Vec<f64> {
        self.beat_times.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

/// Beat tracker for one sample rate and framing
#[derive(Debug, Clone, Copy)]
pub struct BeatTracker {
    sample_rate: u32,
    frame: FrameParams,
    tempo: TempoParams,
}

impl BeatTracker {
    pub fn new(sample_rate: u32, frame: FrameParams, tempo: TempoParams) -> Self {
        Self {
            sample_rate,
            frame,
            tempo,
        }
    }

    fn frame_rate(&self) -> f64 {
        self.sample_rate as f64 / self.frame.hop_length as f64
    }

    /// Estimate tempo and beat times from a signal
    pub fn track(&self, samples: &[f32]) -> Result<BeatTrack, DspError> {
        let stft = Stft::compute(samples, self.frame)?;
        self.track_stft(samples, &stft)
    }

    /// Same as [`track`](Self::track) but reuses the spectrogram of `samples`
    ///
    /// Beats are found on the frame grid, then each is moved to the sample
    /// where the signal energy rises most sharply. The tempo is re-derived
    /// from those sample positions so it is not limited to whole-frame lags.
    pub fn track_stft(&self, samples: &[f32], stft: &Stft) -> Result<BeatTrack, DspError> {
        let onsets = self.onset_strength(&stft.power());
        if onsets.iter().all(|&x| x == 0.0) {
            return Err(DspError::NoOnsets);
        }

        let lag_tempo = self.estimate_tempo(&onsets)?;
        let beats = self.pick_beats(&onsets, lag_tempo);
        let onset_samples = refine_onsets(samples, &beats, self.frame);
        let tempo_bpm = self.refine_tempo(lag_tempo, &onset_samples);

        log::debug!(
            "Tempo {:.2} BPM (lag estimate {:.2}), {} beats",
            tempo_bpm,
            lag_tempo,
            onset_samples.len()
        );

        let sample_rate = self.sample_rate as f64;
        Ok(BeatTrack {
            tempo_bpm,
            beat_times: onset_samples.iter().map(|&s| s as f64 / sample_rate).collect(),
        })
    }

    /// Tempo from the median spacing of sample-accurate beat onsets
    ///
    /// Falls back to `lag_tempo` unless the refined value lies strictly
    /// between the tempos of the neighbouring autocorrelation lags.
    fn refine_tempo(&self, lag_tempo: f64, onset_samples: &[usize]) -> f64 {
        let mut intervals: Vec<usize> = onset_samples
            .windows(2)
            .map(|w| w[1].saturating_sub(w[0]))
            .filter(|&d| d > 0)
            .collect();
        if intervals.is_empty() {
            return lag_tempo;
        }

        intervals.sort_unstable();
        let mid = intervals.len() / 2;
        let median = if intervals.len() % 2 == 1 {
            intervals[mid] as f64
        } else {
            (intervals[mid - 1] + intervals[mid]) as f64 / 2.0
        };
        let refined = 60.0 * self.sample_rate as f64 / median;

        let beats_per_frame = 60.0 * self.frame_rate();
        let lag = beats_per_frame / lag_tempo;
        let slowest = beats_per_frame / (lag + 1.0);
        let fastest = beats_per_frame / (lag - 1.0).max(0.5);

        if refined > slowest && refined < fastest {
            refined
        } else {
            lag_tempo
        }
    }

    /// Mean positive log-mel flux, one value per STFT frame
    pub fn onset_strength(&self, power: &[Vec<f32>]) -> Vec<f32> {
        let n_frames = power.len();
        let filterbank = MelFilterbank::new(self.sample_rate, self.frame.n_fft, N_MELS);
        let mel_db = power_to_db_matrix(&filterbank.apply(power));

        let flux = mel_db.windows(2).map(|pair| {
            let rise: f32 = pair[1]
                .iter()
                .zip(&pair[0])
                .map(|(&now, &before)| (now - before).max(0.0))
                .sum();
            rise / pair[1].len().max(1) as f32
        });

        // Shift so each value lines up with the frame it was measured in
        // under centred framing
        let lead = 1 + self.frame.n_fft / (2 * self.frame.hop_length);
        let mut onsets: Vec<f32> = std::iter::repeat(0.0).take(lead).chain(flux).collect();
        onsets.resize(n_frames, 0.0);
        onsets
    }

    /// Tempo in BPM from the prior-weighted onset autocorrelation
    pub fn estimate_tempo(&self, onsets: &[f32]) -> Result<f64, DspError> {
        let frame_rate = self.frame_rate();
        let bpm_at = |lag: usize| 60.0 * frame_rate / lag as f64;

        let min_lag = (60.0 * frame_rate / self.tempo.max_bpm).ceil().max(1.0) as usize;
        let window = (AUTOCORRELATION_SECONDS * frame_rate) as usize;
        let max_lag = ((60.0 * frame_rate / self.tempo.min_bpm).floor() as usize)
            .min(window.saturating_sub(1))
            .min(onsets.len().saturating_sub(1));

        if min_lag > max_lag {
            return Err(DspError::TooShort("tempo estimation"));
        }

        let autocorrelation = |lag: usize| -> f64 {
            onsets
                .iter()
                .zip(&onsets[lag..])
                .map(|(&a, &b)| a as f64 * b as f64)
                .sum()
        };

        let energy = autocorrelation(0);
        if energy <= 0.0 {
            return Err(DspError::NoOnsets);
        }

        let prior_centre = self.tempo.prior_bpm.log2();
        let mut best: Option<(usize, f64)> = None;

        for lag in min_lag..=max_lag {
            let strength = (autocorrelation(lag) / energy).max(0.0);
            let log_prior = -0.5 * (bpm_at(lag).log2() - prior_centre).powi(2);
            let score = (1e6 * strength).ln_1p() + log_prior;
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((lag, score));
            }
        }

        best.map(|(lag, _)| bpm_at(lag))
            .ok_or(DspError::TooShort("tempo estimation"))
    }

    /// Beat frame indices for a fixed tempo
    fn pick_beats(&self, onsets: &[f32], tempo_bpm: f64) -> Vec<usize> {
        let period = (60.0 * self.frame_rate() / tempo_bpm).round_ties_even().max(1.0) as usize;

        let normalized = normalize_onsets(onsets);
        let local = local_score(&normalized, period);
        let (backlink, cumulative) = dynamic_program(&local, period);

        let Some(last) = last_beat(&cumulative) else {
            return Vec::new();
        };

        let mut beats = vec![last];
        let mut current = last;
        while let Some(prev) = backlink[current] {
            beats.push(prev);
            current = prev;
        }
        beats.reverse();

        trim_beats(&local, &beats)
    }
}

/// Sample index of the sharpest energy rise within `n_fft` of each beat frame
///
/// The result is sorted and free of duplicates.
fn refine_onsets(samples: &[f32], beats: &[usize], frame: FrameParams) -> Vec<usize> {
    let n = samples.len();
    let mut total = 0.0f64;
    let energy: Vec<f64> = std::iter::once(0.0)
        .chain(samples.iter().map(|&s| {
            total += s as f64 * s as f64;
            total
        }))
        .collect();

    let rise = |t: usize| {
        let after = energy[(t + RISE_WINDOW).min(n)] - energy[t];
        let before = energy[t] - energy[t.saturating_sub(RISE_WINDOW)];
        after - before
    };

    let mut refined: Vec<usize> = beats
        .iter()
        .filter_map(|&b| {
            let centre = b * frame.hop_length;
            let lo = centre.saturating_sub(frame.n_fft).min(n);
            let hi = (centre + frame.n_fft).min(n);
            (lo..hi)
                .fold(None, |best: Option<(usize, f64)>, t| {
                    let r = rise(t);
                    match best {
                        Some((_, best_rise)) if best_rise >= r => best,
                        _ => Some((t, r)),
                    }
                })
                .map(|(t, _)| t)
        })
        .collect();

    refined.sort_unstable();
    refined.dedup();
    refined
}

/// Onsets scaled by their sample standard deviation
fn normalize_onsets(onsets: &[f32]) -> Vec<f64> {
    let n = onsets.len() as f64;
    let mean = onsets.iter().map(|&x| x as f64).sum::<f64>() / n;
    let var = onsets.iter().map(|&x| (x as f64 - mean).powi(2)).sum::<f64>() / (n - 1.0).max(1.0);
    let scale = var.sqrt() + f64::MIN_POSITIVE;
    onsets.iter().map(|&x| x as f64 / scale).collect()
}

/// Onsets smoothed by a Gaussian one beat period wide on either side
fn local_score(onsets: &[f64], period: usize) -> Vec<f64> {
    let p = period as isize;
    let kernel: Vec<f64> = (-p..=p)
        .map(|k| (-0.5 * (k as f64 * 32.0 / period as f64).powi(2)).exp())
        .collect();

    let n = onsets.len() as isize;
    (0..n)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .filter_map(|(k, &w)| {
                    let j = i + k as isize - p;
                    (0..n).contains(&j).then(|| w * onsets[j as usize])
                })
                .sum()
        })
        .collect()
}

/// Best cumulative score ending at each frame and the beat before it
fn dynamic_program(local: &[f64], period: usize) -> (Vec<Option<usize>>, Vec<f64>) {
    let n = local.len();
    let max_local = local.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let threshold = 0.01 * max_local;

    // Offsets back to the previous beat, furthest first
    let far = 2 * period;
    let near = (period as f64 / 2.0).round_ties_even() as usize;
    let offsets: Vec<usize> = (near..=far).rev().collect();
    let transition: Vec<f64> = offsets
        .iter()
        .map(|&d| -TIGHTNESS * (d as f64 / period as f64).ln().powi(2))
        .collect();

    let mut backlink = vec![None; n];
    let mut cumulative = vec![0.0f64; n];
    let mut leading_silence = true;

    for i in 0..n {
        let mut best_score = f64::NEG_INFINITY;
        let mut best_prev = None;

        for (&d, &cost) in offsets.iter().zip(&transition) {
            let (candidate, prev) = match i.checked_sub(d) {
                Some(prev) => (cost + cumulative[prev], Some(prev)),
                None => (cost, None),
            };
            if candidate > best_score {
                best_score = candidate;
                best_prev = prev;
            }
        }

        cumulative[i] = local[i] + best_score;

        if leading_silence && local[i] < threshold {
            backlink[i] = None;
        } else {
            backlink[i] = best_prev;
            leading_silence = false;
        }
    }

    (backlink, cumulative)
}

/// Last frame whose cumulative score is a strong local maximum
fn last_beat(cumulative: &[f64]) -> Option<usize> {
    let n = cumulative.len();
    let is_peak = |i: usize| {
        let before = if i == 0 { cumulative[0] } else { cumulative[i - 1] };
        let after = if i + 1 == n { cumulative[i] } else { cumulative[i + 1] };
        cumulative[i] > before && cumulative[i] >= after
    };

    let mut peaks: Vec<f64> = (0..n).filter(|&i| is_peak(i)).map(|i| cumulative[i]).collect();
    if peaks.is_empty() {
        return None;
    }
    peaks.sort_by(f64::total_cmp);
    let median = if peaks.len() % 2 == 1 {
        peaks[peaks.len() / 2]
    } else {
        (peaks[peaks.len() / 2 - 1] + peaks[peaks.len() / 2]) / 2.0
    };

    // Non-peaks score zero, so they only qualify against a negative median
    (0..n).rev().find(|&i| {
        let score = if is_peak(i) { 2.0 * cumulative[i] } else { 0.0 };
        score > median
    })
}

/// Drop weak beats at both ends
///
/// Beats whose Hann-smoothed local score stays under half the RMS of that
/// score are removed; the last strong beat is dropped too.
fn trim_beats(local: &[f64], beats: &[usize]) -> Vec<usize> {
    let smoothing = super::stft::hann_window(5);

    let strength: Vec<f64> = beats.iter().map(|&b| local[b]).collect();
    let n = strength.len() as isize;
    let smooth: Vec<f64> = (0..n)
        .map(|i| {
            smoothing
                .iter()
                .enumerate()
                .filter_map(|(k, &w)| {
                    let j = i + 2 - k as isize;
                    (0..n).contains(&j).then(|| w as f64 * strength[j as usize])
                })
                .sum()
        })
        .collect();

    if smooth.is_empty() {
        return Vec::new();
    }
    let rms = (smooth.iter().map(|v| v * v).sum::<f64>() / smooth.len() as f64).sqrt();
    let threshold = 0.5 * rms;

    let first = smooth.iter().position(|&v| v > threshold);
    let last = smooth.iter().rposition(|&v| v > threshold);
    match (first, last) {
        (Some(first), Some(last)) => beats[first..last].to_vec(),
        _ => Vec::new(),
    }
}
