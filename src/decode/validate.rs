//! Pre-flight validation of audio files

use super::info::AudioInfo;
use super::loader::AudioDecoder;
use super::AudioSource;
use crate::error::EngineError;
use serde::Serialize;
use std::path::Path;

/// Outcome of [`AudioDecoder::validate`]
///
/// `info` is `None` only when the file could not be found at all.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub loadable: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Option<AudioInfo>,
}

impl ValidationReport {
    fn fail(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }
}

pub(crate) fn validate(decoder: &AudioDecoder, path: &Path) -> ValidationReport {
    let config = decoder.config();
    let report = ValidationReport::default();

    // Terminal checks first: none of these touch a decoder
    if let Err(e) = decoder.check_source(&AudioSource::from(path)) {
        let message = match &e {
            EngineError::FileNotFound(p) => format!("File not found: {}", p.display()),
            EngineError::EmptyFile(_) => "File is empty".to_string(),
            EngineError::UnsupportedFormat { extension, .. } => {
                format!("Unsupported format: .{}", extension)
            }
            other => format!("Validation error: {}", other),
        };
        let info = match e {
            EngineError::FileNotFound(_) => None,
            _ => std::fs::metadata(path)
                .ok()
                .map(|m| AudioInfo::from_file_size(path, m.len())),
        };
        return ValidationReport { info, ..report }.fail(message);
    }

    let info = match decoder.get_info(path) {
        Ok(info) => info,
        Err(e) => return report.fail(format!("Validation error: {}", e)),
    };

    let mut report = ValidationReport {
        info: Some(info.clone()),
        ..report
    };

    if info.file_size_bytes > config.large_file_warning_bytes {
        report.warnings.push(format!(
            "File is very large (>{}MB), analysis may be slow",
            config.large_file_warning_bytes / (1024 * 1024)
        ));
    }

    match decoder.load(path) {
        Ok(waveform) => {
            report.loadable = true;
            report.is_valid = true;

            if waveform.len() < config.min_samples_warning {
                report.warnings.push("Audio file is very short".to_string());
            }
            if waveform.peak() < config.quiet_peak_threshold {
                report.warnings.push("Audio file appears to be very quiet".to_string());
            }
        }
        Err(e) => {
            report.errors.push(format!("Failed to load audio: {}", e));
        }
    }

    log::debug!(
        "Validated {:?}: valid={}, {} error(s), {} warning(s)",
        path,
        report.is_valid,
        report.errors.len(),
        report.warnings.len()
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file() {
        let report = AudioDecoder::default().validate(Path::new("/nonexistent/missing.wav"));
        assert!(!report.is_valid);
        assert!(!report.loadable);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("File not found"));
        assert!(report.info.is_none());
    }

    #[test]
    fn test_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.wav");
        std::fs::write(&path, b"").unwrap();

        let report = AudioDecoder::default().validate(&path);
        assert!(!report.is_valid);
        assert_eq!(report.errors, vec!["File is empty".to_string()]);
        assert_eq!(report.info.map(|i| i.file_size_bytes), Some(0));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"not audio").unwrap();

        let report = AudioDecoder::default().validate(&path);
        assert!(!report.is_valid);
        assert_eq!(report.errors, vec!["Unsupported format: .txt".to_string()]);
    }
}
