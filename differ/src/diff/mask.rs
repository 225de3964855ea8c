use videodiff_common::frame::Frame;

use super::traits::FrameDiff;

/// Paints every changed pixel with a flat grey level.
///
/// A pixel counts as changed when any of its channels differs from the
/// previous frame. Changed pixels get `fill` in their first three channels
/// (a 4th channel is carried over from the current frame); unchanged pixels
/// are copied from the current frame.
pub struct MaskDifference {
    fill: u8,
}

impl MaskDifference {
    pub fn new(fill: u8) -> Self {
        Self { fill }
    }
}

impl FrameDiff for MaskDifference {
    fn apply(&self, current: &Frame, previous: &Frame) -> Frame {
        debug_assert!(current.same_shape(previous));
        let mut result = current.clone();
        for (out, prev) in result.pixels_mut().zip(previous.pixels()) {
            if out != prev {
                out[..3].fill(self.fill);
            }
        }
        result
    }

    fn name(&self) -> &str {
        "mask"
    }
}

/// Normal playback: the current frame, untouched.
pub struct Passthrough;

impl FrameDiff for Passthrough {
    fn apply(&self, current: &Frame, _previous: &Frame) -> Frame {
        current.clone()
    }

    fn name(&self) -> &str {
        "normal"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changed_pixels_take_fill_value() {
        let previous = Frame::filled(3, 3, 3, 10).unwrap();
        let mut current = previous.clone();
        current.pixel_mut(1, 2).unwrap()[2] = 11;

        let result = MaskDifference::new(200).apply(&current, &previous);
        for y in 0..3 {
            for x in 0..3 {
                let expected: &[u8] = if (x, y) == (1, 2) {
                    &[200, 200, 200]
                } else {
                    current.pixel(x, y).unwrap()
                };
                assert_eq!(result.pixel(x, y).unwrap(), expected, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn identical_frames_pass_through() {
        let frame = Frame::new(2, 1, 3, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let result = MaskDifference::new(0).apply(&frame, &frame.clone());
        assert_eq!(result, frame);
    }

    #[test]
    fn fourth_channel_difference_counts_but_is_kept() {
        let previous = Frame::new(1, 1, 4, vec![1, 2, 3, 4]).unwrap();
        let current = Frame::new(1, 1, 4, vec![1, 2, 3, 99]).unwrap();
        let result = MaskDifference::new(255).apply(&current, &previous);
        assert_eq!(result.data(), &[255, 255, 255, 99]);
    }

    #[test]
    fn passthrough_ignores_previous() {
        let a = Frame::filled(2, 2, 3, 1).unwrap();
        let b = Frame::filled(2, 2, 3, 200).unwrap();
        assert_eq!(Passthrough.apply(&a, &b), a);
    }
}
