use videodiff_common::frame::{Channel, Frame};

use super::project::{project, project_in_place};
use super::traits::FrameDiff;

/// Single-plane difference: `current` projected onto one channel, then
/// `current - previous` on every channel with modular 8-bit arithmetic.
///
/// A pixel that got darker by one step shows up as 255, never clamped to 0.
/// Against a raw previous frame the other planes come out as `0 - previous`;
/// once the previous frame is itself a projection (see
/// [`FrameDiff::carry_forward`]) they are zero.
pub struct ChannelDifference {
    channel: Channel,
}

impl ChannelDifference {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

impl FrameDiff for ChannelDifference {
    fn apply(&self, current: &Frame, previous: &Frame) -> Frame {
        debug_assert!(current.same_shape(previous));
        let mut result = project(current, self.channel);
        for (out, prev) in result.data_mut().iter_mut().zip(previous.data()) {
            *out = out.wrapping_sub(*prev);
        }
        result
    }

    fn carry_forward(&self, mut current: Frame) -> Frame {
        project_in_place(&mut current, self.channel);
        current
    }

    fn name(&self) -> &str {
        match self.channel {
            Channel::Blue => "blue",
            Channel::Green => "green",
            Channel::Red => "red",
        }
    }
}

/// `previous - current` over every channel, wrapping.
///
/// Note the operand order is reversed relative to [`ChannelDifference`].
pub struct AbsoluteDifference;

impl FrameDiff for AbsoluteDifference {
    fn apply(&self, current: &Frame, previous: &Frame) -> Frame {
        debug_assert!(current.same_shape(previous));
        let mut result = current.clone();
        for (out, prev) in result.data_mut().iter_mut().zip(previous.data()) {
            *out = prev.wrapping_sub(*out);
        }
        result
    }

    fn name(&self) -> &str {
        "absolute"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(data: Vec<u8>) -> Frame {
        Frame::new(2, 1, 3, data).unwrap()
    }

    #[test]
    fn subtraction_wraps_instead_of_clamping() {
        let current = frame(vec![0, 0, 0, 5, 5, 5]);
        let previous = frame(vec![0, 1, 0, 0, 2, 0]);
        let result = ChannelDifference::new(Channel::Green).apply(&current, &previous);
        assert_eq!(result.data(), &[0, 255, 0, 0, 3, 0]);
    }

    #[test]
    fn other_planes_wrap_against_a_raw_previous_frame() {
        let a = frame(vec![10, 20, 30, 10, 20, 30]);
        let b = frame(vec![1, 2, 3, 1, 2, 3]);
        let result = ChannelDifference::new(Channel::Green).apply(&a, &b);
        assert_eq!(result.pixel(0, 0).unwrap(), &[255, 18, 253]);
    }

    #[test]
    fn matches_projection_then_subtraction_for_every_channel() {
        let a = frame(vec![12, 200, 7, 0, 255, 128]);
        let b = frame(vec![13, 100, 9, 1, 0, 128]);
        for channel in [Channel::Blue, Channel::Green, Channel::Red] {
            let expected: Vec<u8> = project(&a, channel)
                .data()
                .iter()
                .zip(b.data())
                .map(|(x, y)| x.wrapping_sub(*y))
                .collect();
            let result = ChannelDifference::new(channel).apply(&a, &b);
            assert_eq!(result.data(), expected.as_slice(), "channel {:?}", channel);
        }
    }

    #[test]
    fn carried_frame_is_the_projection() {
        let diff = ChannelDifference::new(Channel::Red);
        let carried = diff.carry_forward(frame(vec![1, 2, 3, 4, 5, 6]));
        assert_eq!(carried.data(), &[0, 0, 3, 0, 0, 6]);

        // Against a projected previous frame only the selected plane is non-zero.
        let next = frame(vec![9, 9, 1, 9, 9, 9]);
        let result = diff.apply(&next, &carried);
        assert_eq!(result.data(), &[0, 0, 254, 0, 0, 3]);
    }

    #[test]
    fn fourth_channel_is_projected_away() {
        let current = Frame::new(1, 1, 4, vec![9, 9, 9, 9]).unwrap();
        let raw = Frame::new(1, 1, 4, vec![1, 1, 1, 1]).unwrap();
        let diff = ChannelDifference::new(Channel::Red);
        assert_eq!(diff.apply(&current, &raw).data(), &[255, 255, 8, 255]);

        let projected = diff.carry_forward(raw);
        assert_eq!(diff.apply(&current, &projected).data(), &[0, 0, 8, 0]);
    }

    #[test]
    fn other_diffs_carry_the_raw_frame() {
        let a = frame(vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(AbsoluteDifference.carry_forward(a.clone()), a);
    }

    #[test]
    fn absolute_is_previous_minus_current() {
        let a = frame(vec![10, 0, 255, 1, 2, 3]);
        let b = frame(vec![3, 1, 0, 1, 2, 3]);
        let result = AbsoluteDifference.apply(&a, &b);
        assert_eq!(result.data(), &[249, 1, 1, 0, 0, 0]);
    }

    #[test]
    fn absolute_is_not_commutative() {
        let a = frame(vec![10, 20, 30, 40, 50, 60]);
        let b = frame(vec![11, 20, 30, 40, 50, 60]);
        let ab = AbsoluteDifference.apply(&a, &b);
        let ba = AbsoluteDifference.apply(&b, &a);
        assert_ne!(ab, ba);
        assert_eq!(ab.data()[0], 1);
        assert_eq!(ba.data()[0], 255);
    }

    #[test]
    fn inputs_are_left_untouched() {
        let a = frame(vec![1, 2, 3, 4, 5, 6]);
        let b = frame(vec![6, 5, 4, 3, 2, 1]);
        let _ = ChannelDifference::new(Channel::Blue).apply(&a, &b);
        let _ = AbsoluteDifference.apply(&a, &b);
        assert_eq!(a.data(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(b.data(), &[6, 5, 4, 3, 2, 1]);
    }
}
