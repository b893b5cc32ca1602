//! Engine configuration

/// Default analysis sample rate
pub const DEFAULT_SAMPLE_RATE: u32 = 22050;

/// Extensions accepted by the format gate
pub const DEFAULT_FORMATS: [&str; 7] = ["wav", "mp3", "flac", "ogg", "m4a", "aac", "wma"];

/// STFT framing shared by every frame-based feature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameParams {
    /// FFT size (also the time-domain frame length for RMS/ZCR)
    pub n_fft: usize,
    /// Hop between consecutive frames, in samples
    pub hop_length: usize,
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop_length: 512,
        }
    }
}

/// Tempo search window for beat tracking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoParams {
    /// Slowest tempo considered
    pub min_bpm: f64,
    /// Fastest tempo considered
    pub max_bpm: f64,
    /// Centre of the log-normal tempo prior
    pub prior_bpm: f64,
}

impl Default for TempoParams {
    fn default() -> Self {
        Self {
            min_bpm: 30.0,
            max_bpm: 320.0,
            prior_bpm: 120.0,
        }
    }
}

/// Configuration for one analysis engine
///
/// There is no shared analyzer instance: build one of these (usually via
/// `Default`) and hand it to the decoder and pipeline explicitly.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Every waveform is resampled to this rate
    pub target_sample_rate: u32,

    /// Lower-case extensions without the leading dot
    pub supported_formats: Vec<String>,

    /// Files above this size get a validation warning (200 MiB)
    pub large_file_warning_bytes: u64,

    /// How much audio `get_info` decodes to learn rate/channels
    pub info_probe_seconds: f32,

    /// Waveforms shorter than this get a validation warning
    pub min_samples_warning: usize,

    /// Waveforms whose peak stays below this get a validation warning
    pub quiet_peak_threshold: f32,

    pub frame: FrameParams,

    pub tempo: TempoParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: DEFAULT_SAMPLE_RATE,
            supported_formats: DEFAULT_FORMATS.iter().map(|f| f.to_string()).collect(),
            large_file_warning_bytes: 200 * 1024 * 1024,
            info_probe_seconds: 1.0,
            min_samples_warning: 1000,
            quiet_peak_threshold: 0.001,
            frame: FrameParams::default(),
            tempo: TempoParams::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the analysis sample rate
    pub fn with_target_sample_rate(mut self, sample_rate: u32) -> Self {
        self.target_sample_rate = sample_rate;
        self
    }

    /// Replace the format allow-list (leading dots and case are ignored)
    pub fn with_supported_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.supported_formats = formats
            .into_iter()
            .map(|f| normalize_extension(f.as_ref()))
            .collect();
        self
    }

    /// Set STFT framing
    pub fn with_frame_params(mut self, n_fft: usize, hop_length: usize) -> Self {
        self.frame = FrameParams { n_fft, hop_length };
        self
    }

    /// Set the beat-tracking tempo window
    pub fn with_tempo_range(mut self, min_bpm: f64, max_bpm: f64) -> Self {
        self.tempo.min_bpm = min_bpm;
        self.tempo.max_bpm = max_bpm;
        self
    }

    /// Whether an extension passes the format gate
    pub fn is_supported(&self, extension: &str) -> bool {
        let ext = normalize_extension(extension);
        self.supported_formats.iter().any(|f| *f == ext)
    }
}

/// Lower-case an extension and strip a leading dot
pub fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_lowercase()
}
