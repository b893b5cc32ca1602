//! Amplitude-envelope previews of a waveform
//!
//! The signal is split into equal columns. Each column is drawn as a peak
//! band with a brighter RMS band inside it, mirrored around the centre line.

use crate::decode::Waveform;
use crate::dsp::frames::rms_and_peak;
use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const PEAK_COLOUR: Rgb<u8> = Rgb([120, 160, 220]);
const RMS_COLOUR: Rgb<u8> = Rgb([30, 80, 170]);
const AXIS_COLOUR: Rgb<u8> = Rgb([200, 200, 200]);

/// Per-column `(rms, peak)` envelope
///
/// Columns beyond the number of samples are empty (`(0.0, 0.0)`).
pub fn overview(waveform: &Waveform, columns: usize) -> Vec<(f32, f32)> {
    let samples = waveform.samples();
    if columns == 0 {
        return Vec::new();
    }

    (0..columns)
        .map(|col| {
            let start = col * samples.len() / columns;
            let end = ((col + 1) * samples.len() / columns).min(samples.len());
            rms_and_peak(&samples[start..end])
        })
        .collect()
}

/// Render the envelope as a PNG image
pub fn render_png(waveform: &Waveform, width: u32, height: u32) -> Result<Vec<u8>> {
    anyhow::ensure!(
        width > 0 && height > 0,
        "Waveplot size must be non-zero, got {}x{}",
        width,
        height
    );

    let envelope = overview(waveform, width as usize);
    let mut img = RgbImage::from_pixel(width, height, BACKGROUND);
    let centre = (height - 1) as f32 / 2.0;

    for (x, &(rms, peak)) in envelope.iter().enumerate() {
        let x = x as u32;
        let peak_half = (peak.min(1.0) * centre).round() as u32;
        let rms_half = (rms.min(1.0) * centre).round() as u32;

        for y in 0..height {
            let distance = (y as f32 - centre).abs().round() as u32;
            if distance <= rms_half && rms > 0.0 {
                img.put_pixel(x, y, RMS_COLOUR);
            } else if distance <= peak_half && peak > 0.0 {
                img.put_pixel(x, y, PEAK_COLOUR);
            } else if distance == 0 {
                img.put_pixel(x, y, AXIS_COLOUR);
            }
        }
    }

    log::debug!(
        "Rendered {}x{} waveplot of {:.2}s",
        width,
        height,
        waveform.duration_secs()
    );

    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, ImageFormat::Png)
        .context("Failed to encode waveplot PNG")?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Waveform {
        let samples = (0..1000).map(|i| i as f32 / 1000.0).collect();
        Waveform::from_samples(samples, 22050).unwrap()
    }

    #[test]
    fn test_overview_columns() {
        let envelope = overview(&ramp(), 10);
        assert_eq!(envelope.len(), 10);
        // Peaks rise with the ramp
        assert!(envelope.windows(2).all(|w| w[1].1 > w[0].1));
        assert!((envelope[9].1 - 0.999).abs() < 1e-6);
        assert!(envelope.iter().all(|&(rms, peak)| rms <= peak));
    }

    #[test]
    fn test_more_columns_than_samples() {
        let waveform = Waveform::from_samples(vec![0.5; 3], 22050).unwrap();
        let envelope = overview(&waveform, 6);
        assert_eq!(envelope.len(), 6);
        assert!(envelope.iter().any(|&c| c == (0.0, 0.0)));
    }

    #[test]
    fn test_render_png() {
        let png = render_png(&ramp(), 64, 32).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), 64);
        assert_eq!(decoded.height(), 32);
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(render_png(&ramp(), 0, 10).is_err());
    }
}
