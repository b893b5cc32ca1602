//! Sample rate conversion
//!
//! Backends use band-limited sinc resampling (rubato). The last fallback
//! strategy uses plain linear interpolation so it shares no machinery with
//! the strategies that already failed.

use crate::error::BackendError;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Resample mono samples with a windowed-sinc filter
pub fn resample_sinc(samples: Vec<f32>, from: u32, to: u32) -> Result<Vec<f32>, BackendError> {
    if from == to || samples.is_empty() {
        return Ok(samples);
    }

    let resample_error = |reason: String| BackendError::Resample { from, to, reason };

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to as f64 / from as f64;
    let num_frames = samples.len();

    // Single pass: chunk size is the whole input
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, num_frames, 1)
        .map_err(|e| resample_error(e.to_string()))?;

    let mut output = resampler
        .process(&[samples], None)
        .map_err(|e| resample_error(e.to_string()))?;

    let resampled = output.pop().unwrap_or_default();

    log::debug!(
        "Resampled {} frames ({} Hz) -> {} frames ({} Hz)",
        num_frames,
        from,
        resampled.len(),
        to
    );

    Ok(resampled)
}

/// Resample mono samples by linear interpolation
pub fn resample_linear(samples: &[f32], from: u32, to: u32) -> Vec<f32> {
    if from == to || samples.is_empty() || from == 0 || to == 0 {
        return samples.to_vec();
    }

    let out_len = ((samples.len() as u64 * to as u64) / from as u64).max(1) as usize;
    let step = from as f64 / to as f64;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = (pos.floor() as usize).min(last);
            let next = (idx + 1).min(last);
            let frac = (pos - idx as f64) as f32;
            samples[idx] + (samples[next] - samples[idx]) * frac
        })
        .collect()
}
