//! Pitch-class energy (chroma) and key estimation

use serde::{Deserialize, Serialize};
use std::fmt;

/// The twelve pitch classes, starting at C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C#")]
    CSharp,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "D#")]
    DSharp,
    #[serde(rename = "E")]
    E,
    #[serde(rename = "F")]
    F,
    #[serde(rename = "F#")]
    FSharp,
    #[serde(rename = "G")]
    G,
    #[serde(rename = "G#")]
    GSharp,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A#")]
    ASharp,
    #[serde(rename = "B")]
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Pitch class of a chroma bin; wraps modulo 12
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 12]
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Sharp-spelled note name
    pub fn name(&self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Chroma bin of each FFT bin; `None` for DC
fn bin_classes(freqs: &[f32]) -> Vec<Option<usize>> {
    freqs
        .iter()
        .map(|&f| {
            if f <= 0.0 {
                return None;
            }
            let midi = (12.0 * (f as f64 / 440.0).log2() + 69.0).round();
            Some(midi.rem_euclid(12.0) as usize)
        })
        .collect()
}

/// Frame-major chromagram (`chroma[t][class]`), each frame scaled to max 1
pub fn chromagram(power: &[Vec<f32>], freqs: &[f32]) -> Vec<[f32; 12]> {
    let classes = bin_classes(freqs);

    power
        .iter()
        .map(|frame| {
            let mut bins = [0.0f32; 12];
            for (&p, class) in frame.iter().zip(&classes) {
                if let Some(c) = class {
                    bins[*c] += p;
                }
            }
            let max = bins.iter().copied().fold(0.0f32, f32::max);
            if max > f32::MIN_POSITIVE {
                bins.iter_mut().for_each(|b| *b /= max);
            }
            bins
        })
        .collect()
}

/// Time-averaged chroma energy per pitch class
pub fn chroma_profile(chroma: &[[f32; 12]]) -> [f32; 12] {
    let mut profile = [0.0f32; 12];
    if chroma.is_empty() {
        return profile;
    }
    for frame in chroma {
        for (acc, &v) in profile.iter_mut().zip(frame) {
            *acc += v;
        }
    }
    let n = chroma.len() as f32;
    profile.iter_mut().for_each(|v| *v /= n);
    profile
}

/// Strongest pitch class; ties and silence resolve to the lowest index
pub fn dominant_pitch_class(profile: &[f32; 12]) -> PitchClass {
    let mut best = 0;
    for (i, &v) in profile.iter().enumerate() {
        if v > profile[best] {
            best = i;
        }
    }
    PitchClass::from_index(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FrameParams;
    use crate::dsp::{fft_frequencies, Stft};

    #[test]
    fn test_names_and_serde() {
        assert_eq!(PitchClass::from_index(1).name(), "C#");
        assert_eq!(PitchClass::from_index(21), PitchClass::A);
        assert_eq!(PitchClass::ASharp.to_string(), "A#");
        assert_eq!(serde_json::to_string(&PitchClass::FSharp).unwrap(), "\"F#\"");
    }

    #[test]
    fn test_a440_folds_to_a() {
        let samples: Vec<f32> = (0..22050)
            .map(|i| (2.0 * std::f64::consts::PI * 440.0 * i as f64 / 22050.0).sin() as f32)
            .collect();
        let stft = Stft::compute(&samples, FrameParams::default()).unwrap();
        let chroma = chromagram(&stft.power(), &fft_frequencies(22050, 2048));
        let profile = chroma_profile(&chroma);
        assert_eq!(dominant_pitch_class(&profile), PitchClass::A);
        assert!((profile[PitchClass::A.index()] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_silence_resolves_to_c() {
        let chroma = vec![[0.0f32; 12]; 4];
        let profile = chroma_profile(&chroma);
        assert_eq!(profile, [0.0; 12]);
        assert_eq!(dominant_pitch_class(&profile), PitchClass::C);
    }
}
