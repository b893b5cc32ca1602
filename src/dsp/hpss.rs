//! Harmonic/percussive source separation by median filtering

use super::Stft;

/// Median filter length along both axes
pub const KERNEL_SIZE: usize = 31;

/// Time-domain harmonic and percussive components of a signal
#[derive(Debug, Clone)]
pub struct Separation {
    pub harmonic: Vec<f32>,
    pub percussive: Vec<f32>,
}

/// Split a spectrogram into harmonic and percussive signals
///
/// Harmonic energy is smooth along time, percussive energy is smooth along
/// frequency. Each bin is assigned by a soft mask with power 2.
pub fn separate(stft: &Stft) -> Separation {
    let magnitude = stft.magnitude();
    let n_frames = magnitude.len();
    let n_bins = stft.n_bins();

    let mut harmonic_mag = vec![vec![0.0f32; n_bins]; n_frames];
    let mut window = Vec::with_capacity(KERNEL_SIZE);

    for bin in 0..n_bins {
        let row: Vec<f32> = magnitude.iter().map(|frame| frame[bin]).collect();
        for (t, value) in median_filter(&row, KERNEL_SIZE, &mut window).into_iter().enumerate() {
            harmonic_mag[t][bin] = value;
        }
    }

    let percussive_mag: Vec<Vec<f32>> = magnitude
        .iter()
        .map(|frame| median_filter(frame, KERNEL_SIZE, &mut window))
        .collect();

    let mut harmonic_mask = vec![vec![0.0f32; n_bins]; n_frames];
    let mut percussive_mask = vec![vec![0.0f32; n_bins]; n_frames];

    for t in 0..n_frames {
        for bin in 0..n_bins {
            let (h, p) = soft_masks(harmonic_mag[t][bin], percussive_mag[t][bin]);
            harmonic_mask[t][bin] = h;
            percussive_mask[t][bin] = p;
        }
    }

    Separation {
        harmonic: stft.masked(&harmonic_mask).inverse(),
        percussive: stft.masked(&percussive_mask).inverse(),
    }
}

/// Power-2 Wiener masks for a (harmonic, percussive) magnitude pair
fn soft_masks(harmonic: f32, percussive: f32) -> (f32, f32) {
    let reference = harmonic.max(percussive);
    if reference < f32::MIN_POSITIVE {
        return (0.0, 0.0);
    }
    let h = (harmonic / reference).powi(2);
    let p = (percussive / reference).powi(2);
    (h / (h + p), p / (h + p))
}

/// Running median with edges mirrored about the outermost sample
fn median_filter(values: &[f32], size: usize, window: &mut Vec<f32>) -> Vec<f32> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let half = (size / 2) as isize;

    (0..n as isize)
        .map(|centre| {
            window.clear();
            window.extend((centre - half..=centre + half).map(|i| values[reflect(i, n)]));
            let mid = window.len() / 2;
            let (_, median, _) = window.select_nth_unstable_by(mid, f32::total_cmp);
            *median
        })
        .collect()
}

/// Index into `0..n` with symmetric reflection (`d c b a | a b c d | d c b a`)
fn reflect(index: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let m = index.rem_euclid(period);
    if m >= n as isize {
        (period - 1 - m) as usize
    } else {
        m as usize
    }
}
