use std::fmt;

/// Colour plane selector for the single-channel comparison modes.
///
/// Pixels are stored in B, G, R order, so the discriminant doubles as the
/// byte offset inside a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Blue = 0,
    Green = 1,
    Red = 2,
}

impl Channel {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// A decoded picture: `width * height` pixels of `channels` interleaved
/// 8-bit values in B, G, R(, X) order.
///
/// Layout:
///   row-major, no padding between rows
///   pixel (x, y) starts at `(y * width + x) * channels`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

pub const MIN_CHANNELS: u8 = 3;
pub const MAX_CHANNELS: u8 = 4;

impl Frame {
    /// Wrap an existing pixel buffer. The buffer length must match the shape exactly.
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self, FrameError> {
        if !(MIN_CHANNELS..=MAX_CHANNELS).contains(&channels) {
            return Err(FrameError::ChannelCount(channels));
        }
        let expected = Self::buffer_len(width, height, channels);
        if data.len() != expected {
            return Err(FrameError::BufferSize {
                got: data.len(),
                expected,
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// A frame with every byte set to `value`.
    pub fn filled(width: u32, height: u32, channels: u8, value: u8) -> Result<Self, FrameError> {
        Self::new(
            width,
            height,
            channels,
            vec![value; Self::buffer_len(width, height, channels)],
        )
    }

    /// Number of bytes a frame of this shape occupies.
    pub fn buffer_len(width: u32, height: u32, channels: u8) -> usize {
        width as usize * height as usize * channels as usize
    }

    // -- Accessors --------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn shape(&self) -> (u32, u32, u8) {
        (self.width, self.height, self.channels)
    }

    pub fn same_shape(&self, other: &Frame) -> bool {
        self.shape() == other.shape()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Iterate pixels as `channels`-sized slices.
    pub fn pixels(&self) -> std::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(self.channels as usize)
    }

    pub fn pixels_mut(&mut self) -> std::slice::ChunksExactMut<'_, u8> {
        self.data.chunks_exact_mut(self.channels as usize)
    }

    /// Channel tuple at (x, y), or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        let start = self.offset(x, y)?;
        Some(&self.data[start..start + self.channels as usize])
    }

    pub fn pixel_mut(&mut self, x: u32, y: u32) -> Option<&mut [u8]> {
        let start = self.offset(x, y)?;
        let end = start + self.channels as usize;
        Some(&mut self.data[start..end])
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * self.channels as usize)
    }
}

/// Stream properties reported by the capture side, captured once on the
/// first frame of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamMetadata {
    /// Container or demuxer name (e.g. "avi", "video4linux2,v4l2", "image").
    pub container: String,
    /// Four-character code when the stream has one, codec name otherwise.
    pub pixel_format: String,
    /// Capture backend that produced the frames.
    pub backend: String,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub channels: u8,
    /// Bits per channel value.
    pub depth: u8,
}

impl fmt::Display for StreamMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "backend={} fourcc={:?} container={} size={}x{} fps={} frame=({}, {}, {}) depth=u{}",
            self.backend,
            self.pixel_format,
            self.container,
            self.width,
            self.height,
            self.fps,
            self.height,
            self.width,
            self.channels,
            self.depth,
        )
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("unsupported channel count {0}, expected 3 or 4")]
    ChannelCount(u8),
    #[error("pixel buffer has {got} bytes, expected {expected}")]
    BufferSize { got: usize, expected: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_checks_buffer_length() {
        let err = Frame::new(2, 2, 3, vec![0; 11]).unwrap_err();
        assert_eq!(err, FrameError::BufferSize { got: 11, expected: 12 });
        assert!(Frame::new(2, 2, 3, vec![0; 12]).is_ok());
    }

    #[test]
    fn new_rejects_two_channels() {
        assert_eq!(
            Frame::new(1, 1, 2, vec![0; 2]).unwrap_err(),
            FrameError::ChannelCount(2)
        );
    }

    #[test]
    fn pixel_addressing_is_row_major() {
        let data: Vec<u8> = (0..24).collect();
        let frame = Frame::new(4, 2, 3, data).unwrap();
        assert_eq!(frame.pixel(0, 0).unwrap(), &[0, 1, 2]);
        assert_eq!(frame.pixel(1, 0).unwrap(), &[3, 4, 5]);
        assert_eq!(frame.pixel(0, 1).unwrap(), &[12, 13, 14]);
        assert!(frame.pixel(4, 0).is_none());
        assert!(frame.pixel(0, 2).is_none());
    }

    #[test]
    fn pixels_iterates_channel_tuples() {
        let frame = Frame::filled(3, 1, 4, 9).unwrap();
        let pixels: Vec<&[u8]> = frame.pixels().collect();
        assert_eq!(pixels.len(), 3);
        assert!(pixels.iter().all(|p| *p == [9, 9, 9, 9]));
    }

    #[test]
    fn channel_index_matches_bgr_order() {
        assert_eq!(Channel::Blue.index(), 0);
        assert_eq!(Channel::Green.index(), 1);
        assert_eq!(Channel::Red.index(), 2);
    }

    #[test]
    fn metadata_display_lists_shape() {
        let meta = StreamMetadata {
            container: "avi".into(),
            pixel_format: "MJPG".into(),
            backend: "ffmpeg".into(),
            width: 640,
            height: 480,
            fps: 30.0,
            channels: 3,
            depth: 8,
        };
        let line = meta.to_string();
        assert!(line.contains("fourcc=\"MJPG\""));
        assert!(line.contains("size=640x480"));
        assert!(line.contains("frame=(480, 640, 3)"));
    }
}
