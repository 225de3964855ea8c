use image::{ColorType, ImageFormat};
use std::path::Path;
use tracing::{debug, warn};
use videodiff_common::frame::Frame;

/// Encodes one frame to one file.
///
/// `write` reports success as a flag; a failed frame never stops the run.
pub trait FrameWriter: Send + Sync {
    /// Whether an encoder exists for the path's extension.
    fn can_encode(&self, path: &Path) -> bool;

    fn write(&self, path: &Path, frame: &Frame) -> bool;
}

/// Encoder backed by the `image` crate; the format follows the file extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageWriter;

impl FrameWriter for ImageWriter {
    fn can_encode(&self, path: &Path) -> bool {
        ImageFormat::from_path(path)
            .map(|format| format.writing_enabled())
            .unwrap_or(false)
    }

    fn write(&self, path: &Path, frame: &Frame) -> bool {
        let format = match ImageFormat::from_path(path) {
            Ok(format) if format.writing_enabled() => format,
            _ => {
                warn!(path = %path.display(), "no image encoder for extension");
                return false;
            }
        };

        let color = if frame.channels() == 4 {
            ColorType::Rgba8
        } else {
            ColorType::Rgb8
        };
        let rgb = to_rgb_order(frame);
        match image::save_buffer_with_format(path, &rgb, frame.width(), frame.height(), color, format) {
            Ok(()) => {
                debug!(path = %path.display(), "frame written");
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to encode frame");
                false
            }
        }
    }
}

/// Copy of the pixel data with blue and red swapped.
fn to_rgb_order(frame: &Frame) -> Vec<u8> {
    let mut data = frame.data().to_vec();
    for pixel in data.chunks_exact_mut(frame.channels() as usize) {
        pixel.swap(0, 2);
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        // One blue pixel, one red pixel (BGR order).
        Frame::new(2, 1, 3, vec![255, 0, 0, 0, 0, 255]).unwrap()
    }

    #[test]
    fn tiff_is_encodable() {
        assert!(ImageWriter.can_encode(Path::new("out/2.tiff")));
        assert!(ImageWriter.can_encode(Path::new("out/2.png")));
        assert!(!ImageWriter.can_encode(Path::new("out/2.xyz")));
        assert!(!ImageWriter.can_encode(Path::new("out/2")));
    }

    #[test]
    fn writes_tiff_in_rgb_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2.tiff");
        assert!(ImageWriter.write(&path, &sample()));

        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (2, 1));
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 255]);
        assert_eq!(decoded.get_pixel(1, 0).0, [255, 0, 0]);
    }

    #[test]
    fn writes_four_channel_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("3.tiff");
        let frame = Frame::new(1, 1, 4, vec![1, 2, 3, 4]).unwrap();
        assert!(ImageWriter.write(&path, &frame));
        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0, [3, 2, 1, 4]);
    }

    #[test]
    fn unknown_extension_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2.xyz");
        assert!(!ImageWriter.write(&path, &sample()));
        assert!(!path.exists());
    }

    #[test]
    fn unwritable_directory_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("2.tiff");
        assert!(!ImageWriter.write(&path, &sample()));
    }
}
