use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::mode::ComparisonMode;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub diff: DiffConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub persist: PersistConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Whether frames come from one continuous source or from two stills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Successive frames of a capture device or video file.
    #[default]
    #[serde(alias = "dithering")]
    Stream,
    /// Exactly two still images compared against each other.
    #[serde(alias = "image")]
    Pair,
}

impl FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stream" | "dithering" => Ok(RunMode::Stream),
            "pair" | "image" => Ok(RunMode::Pair),
            other => Err(ConfigError::UnknownRunMode(other.to_string())),
        }
    }
}

/// Capture backend preference, expressed as the ffmpeg input device to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Let ffmpeg pick the demuxer (files) or use the platform default (devices).
    #[default]
    Any,
    V4l2,
    Avfoundation,
    Dshow,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Any => "any",
            Backend::V4l2 => "v4l2",
            Backend::Avfoundation => "avfoundation",
            Backend::Dshow => "dshow",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" | "ffmpeg" => Ok(Backend::Any),
            "v4l2" => Ok(Backend::V4l2),
            "avfoundation" => Ok(Backend::Avfoundation),
            "dshow" => Ok(Backend::Dshow),
            other => Err(ConfigError::UnsupportedBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SourceConfig {
    #[serde(default)]
    pub mode: RunMode,
    /// Capture device: an index, or a backend-specific device name.
    #[serde(default, deserialize_with = "device_name")]
    pub device: Option<String>,
    #[serde(default)]
    pub files: Vec<PathBuf>,
    #[serde(default)]
    pub backend: Backend,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    /// Requested four-character pixel format, e.g. MJPG or YUY2.
    pub pixel_format: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiffConfig {
    #[serde(default)]
    pub method: ComparisonMode,
    /// Kept wide so out-of-range values reach validation instead of failing to parse.
    #[serde(default = "default_fill_value")]
    pub fill_value: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default)]
    pub display: bool,
    #[serde(default)]
    pub start_paused: bool,
    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct OutputConfig {
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersistConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            method: ComparisonMode::default(),
            fill_value: default_fill_value(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            display: false,
            start_paused: false,
            idle_poll_ms: default_idle_poll_ms(),
        }
    }
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }

    /// Check everything that can be checked without touching a device or the output directory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=255).contains(&self.diff.fill_value) {
            return Err(ConfigError::FillValueRange(self.diff.fill_value));
        }

        let source = &self.source;
        if let Some(fourcc) = &source.pixel_format {
            if fourcc.len() != 4 || !fourcc.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(ConfigError::PixelFormat(fourcc.clone()));
            }
        }
        if source.width == Some(0) || source.height == Some(0) {
            return Err(ConfigError::Dimensions);
        }
        if let Some(fps) = source.fps {
            if !(fps.is_finite() && fps > 0.0) {
                return Err(ConfigError::FrameRate(fps));
            }
        }
        if self.persist.workers == 0 {
            return Err(ConfigError::Workers);
        }

        match source.mode {
            RunMode::Stream => match (&source.device, source.files.len()) {
                (Some(_), 0) => Ok(()),
                (Some(_), _) => Err(ConfigError::ConflictingSources),
                (None, 1) => Ok(()),
                (None, 0) => Err(ConfigError::MissingSource),
                (None, n) => Err(ConfigError::StreamFileCount(n)),
            },
            RunMode::Pair => {
                if source.device.is_some() {
                    return Err(ConfigError::ConflictingSources);
                }
                if source.files.len() != 2 {
                    return Err(ConfigError::PairFileCount(source.files.len()));
                }
                if self.diff.method == ComparisonMode::Normal {
                    return Err(ConfigError::NormalInPairMode);
                }
                Ok(())
            }
        }
    }

    /// Fill value as a channel byte. Only meaningful after [`Config::validate`].
    pub fn fill_value(&self) -> u8 {
        u8::try_from(self.diff.fill_value.clamp(0, 255)).unwrap_or(u8::MAX)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("fill value {0} is outside 0-255")]
    FillValueRange(i64),
    #[error("pixel format '{0}' must be exactly 4 characters (e.g. MJPG, YUY2)")]
    PixelFormat(String),
    #[error("requested width and height must be positive")]
    Dimensions,
    #[error("requested frame rate {0} must be positive")]
    FrameRate(f64),
    #[error("persistence needs at least one worker")]
    Workers,
    #[error("unknown run mode '{0}', expected stream or pair")]
    UnknownRunMode(String),
    #[error("unsupported capture backend '{0}', expected any, v4l2, avfoundation or dshow")]
    UnsupportedBackend(String),
    #[error("capture device and files are mutually exclusive")]
    ConflictingSources,
    #[error("need a capture device or one file for stream mode")]
    MissingSource,
    #[error("only one file is allowed for stream mode, got {0}")]
    StreamFileCount(usize),
    #[error("need two files for pair mode, got {0}")]
    PairFileCount(usize),
    #[error("the normal method has nothing to compare in pair mode")]
    NormalInPairMode,
}

/// Accept `device = 0` as well as `device = "FaceTime HD Camera"`.
fn device_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Device {
        Index(u32),
        Name(String),
    }
    Ok(Option::<Device>::deserialize(deserializer)?.map(|device| match device {
        Device::Index(i) => i.to_string(),
        Device::Name(name) => name,
    }))
}

// Default value functions
fn default_fill_value() -> i64 {
    255
}
fn default_idle_poll_ms() -> u64 {
    10
}
fn default_workers() -> usize {
    4
}
fn default_log_level() -> String {
    "info".into()
}
