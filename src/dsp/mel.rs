//! Mel filterbank, decibel scaling and MFCCs

use super::{fft_frequencies, power_to_db};

pub const N_MELS: usize = 128;
pub const N_MFCC: usize = 13;

/// Dynamic range kept by [`power_to_db_matrix`]
pub const TOP_DB: f32 = 80.0;

// Slaney mel scale: linear below 1 kHz, logarithmic above
const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// One triangular filter, stored as its non-zero span
#[derive(Debug, Clone)]
struct MelFilter {
    start_bin: usize,
    weights: Vec<f32>,
}

/// Area-normalised triangular filters spanning 0 Hz to Nyquist
#[derive(Debug, Clone)]
pub struct MelFilterbank {
    filters: Vec<MelFilter>,
}

impl MelFilterbank {
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize) -> Self {
        let fft_freqs = fft_frequencies(sample_rate, n_fft);
        let max_mel = hz_to_mel(sample_rate as f64 / 2.0);

        let mel_points: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(max_mel * i as f64 / (n_mels + 1) as f64))
            .collect();

        let filters = (0..n_mels)
            .map(|m| {
                let (left, centre, right) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
                let norm = 2.0 / (right - left);

                let weights: Vec<(usize, f32)> = fft_freqs
                    .iter()
                    .enumerate()
                    .filter_map(|(bin, &f)| {
                        let f = f as f64;
                        let rising = (f - left) / (centre - left);
                        let falling = (right - f) / (right - centre);
                        let w = rising.min(falling).max(0.0);
                        (w > 0.0).then_some((bin, (w * norm) as f32))
                    })
                    .collect();

                match weights.first() {
                    Some(&(start_bin, _)) => MelFilter {
                        start_bin,
                        weights: weights.iter().map(|&(_, w)| w).collect(),
                    },
                    None => MelFilter {
                        start_bin: 0,
                        weights: Vec::new(),
                    },
                }
            })
            .collect();

        Self { filters }
    }

    pub fn n_mels(&self) -> usize {
        self.filters.len()
    }

    /// Project a frame-major power spectrogram onto the mel bands
    pub fn apply(&self, power: &[Vec<f32>]) -> Vec<Vec<f32>> {
        power
            .iter()
            .map(|frame| {
                self.filters
                    .iter()
                    .map(|filter| {
                        frame
                            .iter()
                            .skip(filter.start_bin)
                            .zip(&filter.weights)
                            .map(|(&p, &w)| p * w)
                            .sum()
                    })
                    .collect()
            })
            .collect()
    }
}

/// Power to dB (reference 1.0), clipped to [`TOP_DB`] below the global peak
pub fn power_to_db_matrix(power: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let db: Vec<Vec<f32>> = power
        .iter()
        .map(|row| row.iter().map(|&p| power_to_db(p)).collect())
        .collect();
    let max = db
        .iter()
        .flatten()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    let floor = max - TOP_DB;
    db.into_iter()
        .map(|row| row.into_iter().map(|v| v.max(floor)).collect())
        .collect()
}

/// Orthonormal DCT-II basis, `n_out` rows over `n_in` inputs
fn dct_basis(n_in: usize, n_out: usize) -> Vec<Vec<f32>> {
    let n = n_in as f64;
    (0..n_out)
        .map(|k| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            (0..n_in)
                .map(|i| {
                    let angle = std::f64::consts::PI * k as f64 * (2 * i + 1) as f64 / (2.0 * n);
                    (scale * angle.cos()) as f32
                })
                .collect()
        })
        .collect()
}

/// Mel-frequency cepstral coefficients, coefficient-major (`mfcc[c][t]`)
pub fn mfcc(power: &[Vec<f32>], sample_rate: u32, n_fft: usize) -> Vec<Vec<f32>> {
    let filterbank = MelFilterbank::new(sample_rate, n_fft, N_MELS);
    let mel_db = power_to_db_matrix(&filterbank.apply(power));
    let basis = dct_basis(filterbank.n_mels(), N_MFCC);

    basis
        .iter()
        .map(|row| {
            mel_db
                .iter()
                .map(|frame| frame.iter().zip(row).map(|(&x, &b)| x * b).sum())
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mel_scale_roundtrip_points() {
        assert!((hz_to_mel(1000.0) - 15.0).abs() < 1e-9);
        assert!((hz_to_mel(200.0) - 3.0).abs() < 1e-9);
        assert!((mel_to_hz(hz_to_mel(4321.0)) - 4321.0).abs() < 1e-6);
    }

    #[test]
    fn test_filterbank_shape() {
        let bank = MelFilterbank::new(22050, 2048, N_MELS);
        assert_eq!(bank.n_mels(), N_MELS);
        // Higher filters are wider
        let first = bank.filters.iter().find(|f| !f.weights.is_empty()).unwrap();
        let last = bank.filters.last().unwrap();
        assert!(last.weights.len() > first.weights.len());
    }

    #[test]
    fn test_dct_basis_is_orthonormal() {
        let basis = dct_basis(16, 4);
        for a in 0..4 {
            for b in 0..4 {
                let dot: f32 = basis[a].iter().zip(&basis[b]).map(|(x, y)| x * y).sum();
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_mfcc_layout() {
        let frames = vec![vec![1.0f32; 1025]; 7];
        let coeffs = mfcc(&frames, 22050, 2048);
        assert_eq!(coeffs.len(), N_MFCC);
        assert!(coeffs.iter().all(|c| c.len() == 7));
        assert!(coeffs.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn test_db_clipping() {
        let db = power_to_db_matrix(&[vec![1.0, 0.0]]);
        assert!((db[0][0]).abs() < 1e-6);
        assert!((db[0][1] + TOP_DB).abs() < 1e-4);
    }
}
