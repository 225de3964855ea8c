//! Asynchronous persistence of result frames.

pub mod layout;
pub mod sink;
pub mod writer;

pub use layout::{frame_path, prepare_output_dir, LayoutError};
pub use sink::{PersistenceSink, SubmitError, WriteHandle, WriteOutcome};
pub use writer::{FrameWriter, ImageWriter};
