use std::collections::VecDeque;
use std::path::Path;
use tracing::info;
use videodiff_common::frame::{Frame, StreamMetadata};

use super::{CaptureError, FrameSource};

/// Two still images served as a two-frame stream: the first file seeds the
/// comparison, the second is compared against it.
pub struct StillPairSource {
    frames: VecDeque<Frame>,
    position: u64,
    metadata: StreamMetadata,
}

impl StillPairSource {
    pub fn open(first: &Path, second: &Path) -> Result<Self, CaptureError> {
        let a = load_bgr(first)?;
        let b = load_bgr(second)?;
        if !a.same_shape(&b) {
            return Err(CaptureError::ShapeMismatch {
                first: format!("{}x{}", a.width(), a.height()),
                second: format!("{}x{}", b.width(), b.height()),
            });
        }

        let format = image::ImageFormat::from_path(second)
            .ok()
            .and_then(|f| f.extensions_str().first().copied())
            .unwrap_or("unknown");
        let metadata = StreamMetadata {
            container: "image".into(),
            pixel_format: format.to_ascii_uppercase(),
            backend: "image".into(),
            width: b.width(),
            height: b.height(),
            fps: 0.0,
            channels: b.channels(),
            depth: 8,
        };
        info!(
            first = %first.display(),
            second = %second.display(),
            width = b.width(),
            height = b.height(),
            "loaded image pair"
        );

        Ok(Self {
            frames: VecDeque::from([a, b]),
            position: 0,
            metadata,
        })
    }
}

/// Decode an image file into a 3-channel BGR frame.
pub fn load_bgr(path: &Path) -> Result<Frame, CaptureError> {
    let rgb = image::open(path)
        .map_err(|source| CaptureError::Image {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgb8();
    let (width, height) = rgb.dimensions();
    let mut data = rgb.into_raw();
    for pixel in data.chunks_exact_mut(3) {
        pixel.swap(0, 2);
    }
    Frame::new(width, height, 3, data).map_err(|e| CaptureError::Frame(path.display().to_string(), e))
}

impl FrameSource for StillPairSource {
    async fn read_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let frame = self.frames.pop_front();
        if frame.is_some() {
            self.position += 1;
        }
        Ok(frame)
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn metadata(&self) -> StreamMetadata {
        self.metadata.clone()
    }

    async fn close(&mut self) {
        self.frames.clear();
    }
}
