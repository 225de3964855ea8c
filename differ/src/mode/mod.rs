pub mod keys;
pub mod state;

pub use keys::{event_for_key, InputEvent};
pub use state::{ModeStateMachine, PlaybackState, Transition};
