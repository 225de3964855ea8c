//! Pixel-domain comparisons between a frame and its predecessor.

pub mod channel;
pub mod mask;
pub mod project;
pub mod traits;

use videodiff_common::mode::ComparisonMode;

use channel::{AbsoluteDifference, ChannelDifference};
use mask::{MaskDifference, Passthrough};
pub use traits::FrameDiff;

/// Build the comparison for `mode`. `fill` is only used by the mask.
pub fn for_mode(mode: ComparisonMode, fill: u8) -> Box<dyn FrameDiff> {
    match mode.channel() {
        Some(channel) => Box::new(ChannelDifference::new(channel)),
        None => match mode {
            ComparisonMode::Absolute => Box::new(AbsoluteDifference),
            ComparisonMode::Mask => Box::new(MaskDifference::new(fill)),
            _ => Box::new(Passthrough),
        },
    }
}
