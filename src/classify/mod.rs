//! Rule-based labelling of feature records

use crate::features::FeatureRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

// Stand-ins for features that could not be measured
const DEFAULT_ZERO_CROSSING_RATE: f64 = 0.1;
const DEFAULT_SPECTRAL_CENTROID: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Musical,
    Percussion,
    Ambient,
    Fx,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Musical => "musical",
            Category::Percussion => "percussion",
            Category::Ambient => "ambient",
            Category::Fx => "fx",
        }
    }

    /// Tags every sample of this category carries
    fn tags(&self) -> [&'static str; 2] {
        match self {
            Category::Musical => ["tonal", "harmonic"],
            Category::Percussion => ["rhythmic", "percussive"],
            Category::Ambient => ["atmospheric", "textural"],
            Category::Fx => ["effect", "impact"],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Bright,
    Dark,
    Energetic,
    Mysterious,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Genre {
    Electronic,
    Acoustic,
    Percussion,
    Ambient,
    SoundEffect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub category: Category,
    pub tags: Vec<String>,
    pub mood: Mood,
    /// Always within [0, 1]
    pub intensity: f64,
    pub genre: Genre,
}

/// The classifier inputs, with unmeasured values already defaulted
#[derive(Debug, Clone, Copy)]
struct Inputs {
    harmonic_ratio: f64,
    zero_crossing_rate: f64,
    energy: f64,
    spectral_centroid: f64,
    complexity: f64,
    loudness: f64,
}

impl From<&FeatureRecord> for Inputs {
    fn from(record: &FeatureRecord) -> Self {
        Self {
            harmonic_ratio: record.harmonic_content.harmonic_ratio,
            zero_crossing_rate: record
                .spectral
                .zero_crossing_rate
                .unwrap_or(DEFAULT_ZERO_CROSSING_RATE),
            energy: record.perceptual.energy,
            spectral_centroid: record
                .spectral
                .spectral_centroid
                .unwrap_or(DEFAULT_SPECTRAL_CENTROID),
            complexity: record.perceptual.complexity,
            loudness: record.perceptual.loudness,
        }
    }
}

/// Derives labels from a [`FeatureRecord`]; every rule is first-match-wins
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier;

impl Classifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, record: &FeatureRecord) -> ClassificationRecord {
        let inputs = Inputs::from(record);
        let category = category(&inputs);

        ClassificationRecord {
            category,
            tags: tags(&inputs, category),
            mood: mood(&inputs),
            intensity: intensity(&inputs),
            genre: genre(&inputs, category),
        }
    }
}

fn category(f: &Inputs) -> Category {
    if f.harmonic_ratio > 0.7 {
        Category::Musical
    } else if f.zero_crossing_rate > 0.15 {
        Category::Percussion
    } else if f.energy < 0.01 {
        Category::Ambient
    } else {
        Category::Fx
    }
}

fn tags(f: &Inputs, category: Category) -> Vec<String> {
    let mut tags = Vec::new();

    if f.spectral_centroid > 0.7 {
        tags.push("bright");
    } else if f.spectral_centroid < 0.3 {
        tags.push("dark");
    }

    if f.energy > 0.1 {
        tags.push("loud");
    } else if f.energy < 0.01 {
        tags.push("quiet");
    }

    if f.complexity > 0.7 {
        tags.push("complex");
    } else if f.complexity < 0.3 {
        tags.push("simple");
    }

    tags.extend(category.tags());
    tags.into_iter().map(String::from).collect()
}

fn mood(f: &Inputs) -> Mood {
    if f.spectral_centroid > 0.7 && f.energy > 0.05 {
        Mood::Bright
    } else if f.spectral_centroid < 0.3 && f.energy < 0.02 {
        Mood::Dark
    } else if f.energy > 0.1 {
        Mood::Energetic
    } else if f.complexity > 0.7 {
        Mood::Mysterious
    } else {
        Mood::Neutral
    }
}

fn intensity(f: &Inputs) -> f64 {
    let loudness = ((f.loudness + 60.0) / 60.0).max(0.0);
    let value = f.energy * 0.4 + f.complexity * 0.3 + loudness * 0.3;
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn genre(f: &Inputs, category: Category) -> Genre {
    match category {
        Category::Musical if f.spectral_centroid > 0.6 => Genre::Electronic,
        Category::Musical => Genre::Acoustic,
        Category::Percussion => Genre::Percussion,
        Category::Ambient => Genre::Ambient,
        Category::Fx => Genre::SoundEffect,
    }
}
