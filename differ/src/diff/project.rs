use videodiff_common::frame::{Channel, Frame};

/// Copy of `frame` with every channel except `keep` zeroed, 4th channel included.
pub fn project(frame: &Frame, keep: Channel) -> Frame {
    let mut scratch = frame.clone();
    project_in_place(&mut scratch, keep);
    scratch
}

/// Zero every channel except `keep` on a buffer the caller owns outright.
pub fn project_in_place(frame: &mut Frame, keep: Channel) {
    let keep = keep.index();
    for pixel in frame.pixels_mut() {
        for (i, value) in pixel.iter_mut().enumerate() {
            if i != keep {
                *value = 0;
            }
        }
    }
}
