//! Per-frame spectral shape statistics
//!
//! All functions take a frame-major magnitude spectrogram and the bin
//! centre frequencies from [`super::fft_frequencies`].

use super::power_to_db;

/// Fraction of energy below the rolloff frequency
pub const ROLLOFF_PERCENT: f32 = 0.85;

/// Lowest band edge of the contrast octaves
pub const CONTRAST_FMIN: f32 = 200.0;
pub const CONTRAST_BANDS: usize = 6;
const CONTRAST_QUANTILE: f32 = 0.02;

/// Spectral centroid of each frame in Hz (0 for a silent frame)
pub fn centroid(magnitude: &[Vec<f32>], freqs: &[f32]) -> Vec<f32> {
    magnitude
        .iter()
        .map(|frame| frame_centroid(frame, freqs))
        .collect()
}

fn frame_centroid(frame: &[f32], freqs: &[f32]) -> f32 {
    let total: f64 = frame.iter().map(|&m| m as f64).sum();
    if total <= f64::MIN_POSITIVE {
        return 0.0;
    }
    let weighted: f64 = frame
        .iter()
        .zip(freqs)
        .map(|(&m, &f)| m as f64 * f as f64)
        .sum();
    (weighted / total) as f32
}

/// Frequency below which [`ROLLOFF_PERCENT`] of each frame's energy lies
pub fn rolloff(magnitude: &[Vec<f32>], freqs: &[f32]) -> Vec<f32> {
    magnitude
        .iter()
        .map(|frame| {
            let total: f64 = frame.iter().map(|&m| m as f64).sum();
            let threshold = ROLLOFF_PERCENT as f64 * total;
            let mut cumulative = 0.0f64;
            for (&m, &f) in frame.iter().zip(freqs) {
                cumulative += m as f64;
                if cumulative >= threshold {
                    return f;
                }
            }
            freqs.last().copied().unwrap_or(0.0)
        })
        .collect()
}

/// Second-order spectral bandwidth in Hz
pub fn bandwidth(magnitude: &[Vec<f32>], freqs: &[f32]) -> Vec<f32> {
    magnitude
        .iter()
        .map(|frame| {
            let total: f64 = frame.iter().map(|&m| m as f64).sum();
            if total <= f64::MIN_POSITIVE {
                return 0.0;
            }
            let centre = frame_centroid(frame, freqs) as f64;
            let spread: f64 = frame
                .iter()
                .zip(freqs)
                .map(|(&m, &f)| (m as f64 / total) * (f as f64 - centre).powi(2))
                .sum();
            spread.sqrt() as f32
        })
        .collect()
}

/// Wiener entropy of the power spectrum: geometric over arithmetic mean
///
/// A silent frame is perfectly flat (1.0) because every bin sits at the
/// amplitude floor.
pub fn flatness(magnitude: &[Vec<f32>]) -> Vec<f32> {
    const AMIN: f64 = 1e-10;

    magnitude
        .iter()
        .map(|frame| {
            if frame.is_empty() {
                return 0.0;
            }
            let n = frame.len() as f64;
            let mut log_sum = 0.0f64;
            let mut sum = 0.0f64;
            for &m in frame {
                let power = (m as f64 * m as f64).max(AMIN);
                log_sum += power.ln();
                sum += power;
            }
            ((log_sum / n).exp() / (sum / n)) as f32
        })
        .collect()
}

/// Octave-band spectral contrast, band-major (`bands[k][t]`) in dB
///
/// Bands start at [`CONTRAST_FMIN`] and double. The band count is capped
/// so the top edge stays below Nyquist; at 22050 Hz that leaves five
/// octaves plus the sub-200 Hz band.
pub fn contrast(magnitude: &[Vec<f32>], freqs: &[f32], sample_rate: u32) -> Vec<Vec<f32>> {
    let nyquist = sample_rate as f32 / 2.0;
    let mut n_bands = CONTRAST_BANDS;
    while n_bands > 0 && CONTRAST_FMIN * 2f32.powi(n_bands as i32) >= nyquist {
        n_bands -= 1;
    }

    let mut edges = vec![0.0f32];
    edges.extend((0..=n_bands).map(|i| CONTRAST_FMIN * 2f32.powi(i as i32)));

    let mut peaks = Vec::with_capacity(n_bands + 1);
    let mut valleys = Vec::with_capacity(n_bands + 1);

    for k in 0..=n_bands {
        let (low, high) = (edges[k], edges[k + 1]);
        let in_band: Vec<usize> = (0..freqs.len())
            .filter(|&i| freqs[i] >= low && freqs[i] <= high)
            .collect();
        let (Some(&first), Some(&last)) = (in_band.first(), in_band.last()) else {
            continue;
        };

        let start = if k > 0 { first.saturating_sub(1) } else { first };
        let end = if k == n_bands { freqs.len() - 1 } else { last };
        let band_size = end - start + 1;
        // Every band but the top drops its last bin, which the next band owns
        let sub_end = if k < n_bands { end } else { end + 1 };

        let take = ((CONTRAST_QUANTILE * band_size as f32).round() as usize).max(1);

        let mut band_peaks = Vec::with_capacity(magnitude.len());
        let mut band_valleys = Vec::with_capacity(magnitude.len());
        for frame in magnitude {
            let mut sorted: Vec<f32> = frame[start..sub_end].to_vec();
            sorted.sort_by(f32::total_cmp);
            let take = take.min(sorted.len()).max(1);
            let valley = sorted[..take].iter().sum::<f32>() / take as f32;
            let peak = sorted[sorted.len() - take..].iter().sum::<f32>() / take as f32;
            band_valleys.push(valley);
            band_peaks.push(peak);
        }
        peaks.push(band_peaks);
        valleys.push(band_valleys);
    }

    let peak_db = to_db_clipped(&peaks);
    let valley_db = to_db_clipped(&valleys);

    peak_db
        .iter()
        .zip(&valley_db)
        .map(|(p, v)| p.iter().zip(v).map(|(a, b)| a - b).collect())
        .collect()
}

/// Decibels with everything more than 80 dB below the maximum clipped
fn to_db_clipped(values: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let db: Vec<Vec<f32>> = values
        .iter()
        .map(|row| row.iter().map(|&v| power_to_db(v)).collect())
        .collect();
    let max = db
        .iter()
        .flatten()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    let floor = max - 80.0;
    db.into_iter()
        .map(|row| row.into_iter().map(|v| v.max(floor)).collect())
        .collect()
}
