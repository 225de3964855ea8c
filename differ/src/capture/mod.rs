//! Frame sources: a capture device or video file decoded by ffmpeg, or a
//! pair of still images.

pub mod ffmpeg;
pub mod still;

use std::future::Future;
use std::path::PathBuf;
use videodiff_common::config::{Backend, RunMode, SourceConfig};
use videodiff_common::frame::{Frame, StreamMetadata};

pub use ffmpeg::FfmpegSource;
pub use still::StillPairSource;

/// Pull-based supplier of raw frames.
pub trait FrameSource: Send {
    /// Next frame, or `Ok(None)` at end of stream.
    fn read_frame(&mut self) -> impl Future<Output = Result<Option<Frame>, CaptureError>> + Send;

    /// 0-based index of the frame that the next read will return, i.e. the
    /// number of frames consumed so far.
    fn position(&self) -> u64;

    fn metadata(&self) -> StreamMetadata;

    /// Release the underlying device or file. Called once at shutdown.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to spawn {0}: {1}")]
    Spawn(&'static str, std::io::Error),
    #[error("failed to probe {input}: {reason}")]
    Probe { input: String, reason: String },
    #[error("no video stream found in {0}")]
    NoVideoStream(String),
    #[error("failed to read frame from ffmpeg: {0}")]
    Read(std::io::Error),
    #[error("ffmpeg exited with non-zero status: {0}")]
    FfmpegFailed(String),
    #[error("backend {backend} cannot open device '{device}': {reason}")]
    Device {
        backend: Backend,
        device: String,
        reason: &'static str,
    },
    #[error("failed to load image {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("images differ in size: {first} vs {second}")]
    ShapeMismatch { first: String, second: String },
    #[error("invalid frame from {0}: {1}")]
    Frame(String, videodiff_common::frame::FrameError),
}

/// The concrete source chosen from configuration.
pub enum Source {
    Ffmpeg(FfmpegSource),
    Still(StillPairSource),
}

impl Source {
    /// Open whatever `config` describes. Expects an already validated config.
    pub async fn open(config: &SourceConfig) -> Result<Self, CaptureError> {
        match config.mode {
            RunMode::Stream => Ok(Source::Ffmpeg(FfmpegSource::open(config).await?)),
            RunMode::Pair => {
                let (first, second) = match config.files.as_slice() {
                    [first, second] => (first, second),
                    _ => {
                        return Err(CaptureError::Probe {
                            input: format!("{:?}", config.files),
                            reason: "pair mode needs exactly two files".into(),
                        })
                    }
                };
                Ok(Source::Still(StillPairSource::open(first, second)?))
            }
        }
    }
}

impl FrameSource for Source {
    async fn read_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        match self {
            Source::Ffmpeg(s) => s.read_frame().await,
            Source::Still(s) => s.read_frame().await,
        }
    }

    fn position(&self) -> u64 {
        match self {
            Source::Ffmpeg(s) => s.position(),
            Source::Still(s) => s.position(),
        }
    }

    fn metadata(&self) -> StreamMetadata {
        match self {
            Source::Ffmpeg(s) => s.metadata(),
            Source::Still(s) => s.metadata(),
        }
    }

    async fn close(&mut self) {
        match self {
            Source::Ffmpeg(s) => s.close().await,
            Source::Still(s) => s.close().await,
        }
    }
}
