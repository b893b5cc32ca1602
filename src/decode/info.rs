//! Cheap file description without a full decode

use super::backend::AudioSource;
use super::SymphoniaBackend;
use crate::config::{normalize_extension, EngineConfig};
use crate::error::EngineError;
use anyhow::{Context, Result};
use lofty::prelude::*;
use lofty::probe::Probe;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Basic facts about an audio file
///
/// Size and extension always come from the filesystem. Every other field
/// is `None` unless a probe actually reported it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioInfo {
    pub file_path: PathBuf,
    pub file_size_bytes: u64,
    /// Size in MiB, rounded to 2 decimals
    pub file_size_mb: f64,
    /// Lower-case extension without the dot
    pub extension: String,
    pub duration_sec: Option<f64>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub bit_depth: Option<u16>,
}

impl AudioInfo {
    /// Filesystem-only description with every probed field unset
    pub fn from_file_size(path: &Path, file_size_bytes: u64) -> Self {
        Self {
            file_path: path.to_path_buf(),
            file_size_bytes,
            file_size_mb: (file_size_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0,
            extension: path
                .extension()
                .and_then(|e| e.to_str())
                .map(normalize_extension)
                .unwrap_or_default(),
            duration_sec: None,
            sample_rate: None,
            channels: None,
            bit_depth: None,
        }
    }
}

/// Build an [`AudioInfo`] from independent probes
///
/// 1. A bounded partial decode fills sample rate, channels and bit depth.
/// 2. A separate duration probe (container header, else packet scan).
/// 3. Container properties via lofty fill whatever is still unset.
///
/// A failing probe leaves its fields unset and never blanks another's.
pub(crate) fn probe(path: &Path, config: &EngineConfig) -> Result<AudioInfo, EngineError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            EngineError::FileNotFound(path.to_path_buf())
        } else {
            EngineError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    let mut info = AudioInfo::from_file_size(path, metadata.len());
    let source = AudioSource::from(path);
    let backend = SymphoniaBackend::new();

    match backend.decode_partial(&source, Some(config.info_probe_seconds)) {
        Ok(partial) => {
            info.sample_rate = Some(partial.sample_rate);
            info.channels = Some(partial.channels as u16);
            info.bit_depth = partial.bits_per_sample.map(|b| b as u16);
        }
        Err(e) => log::debug!("Partial decode probe failed for {:?}: {}", path, e),
    }

    match backend.probe_duration(&source) {
        Ok(duration) => info.duration_sec = Some(duration),
        Err(e) => log::debug!("Duration probe failed for {:?}: {}", path, e),
    }

    let incomplete = info.duration_sec.is_none()
        || info.sample_rate.is_none()
        || info.channels.is_none()
        || info.bit_depth.is_none();

    if incomplete {
        match container_properties(path) {
            Ok(props) => {
                info.duration_sec = info.duration_sec.or(props.duration_sec);
                info.sample_rate = info.sample_rate.or(props.sample_rate);
                info.channels = info.channels.or(props.channels);
                info.bit_depth = info.bit_depth.or(props.bit_depth);
            }
            Err(e) => log::debug!("Container property probe failed for {:?}: {:#}", path, e),
        }
    }

    Ok(info)
}

struct ContainerProperties {
    duration_sec: Option<f64>,
    sample_rate: Option<u32>,
    channels: Option<u16>,
    bit_depth: Option<u16>,
}

fn container_properties(path: &Path) -> Result<ContainerProperties> {
    let tagged_file = Probe::open(path)
        .map_err(|e| anyhow::anyhow!("Failed to open {:?}: {}", path, e))?
        .guess_file_type()
        .context("Failed to guess container type")?
        .read()
        .map_err(|e| anyhow::anyhow!("Failed to read container properties: {}", e))?;

    let properties = tagged_file.properties();
    let duration = properties.duration().as_secs_f64();

    Ok(ContainerProperties {
        duration_sec: (duration > 0.0).then_some(duration),
        sample_rate: properties.sample_rate(),
        channels: properties.channels().map(u16::from),
        bit_depth: properties.bit_depth().map(u16::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_in_mb_is_rounded() {
        let info = AudioInfo::from_file_size(Path::new("/tmp/a.FLAC"), 1_572_864);
        assert_eq!(info.file_size_mb, 1.5);
        assert_eq!(info.extension, "flac");
        assert!(info.duration_sec.is_none());
        assert!(info.sample_rate.is_none());
    }

    #[test]
    fn test_missing_file_is_reported() {
        let result = probe(Path::new("/nonexistent/info.wav"), &EngineConfig::default());
        assert!(matches!(result, Err(EngineError::FileNotFound(_))));
    }
}
