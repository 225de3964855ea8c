use tracing::info;
use videodiff_common::mode::ComparisonMode;

use super::keys::InputEvent;

/// Playback sub-state, orthogonal to the comparison mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackState {
    /// Frames are only consumed on an explicit step.
    pub frame_by_frame: bool,
    /// A step (or mode change) is waiting to be rendered.
    pub render_pending: bool,
}

/// What an input event did to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed.
    Ignored,
    ModeChanged {
        from: ComparisonMode,
        to: ComparisonMode,
    },
    /// Free-running → frame-by-frame, with one frame to render.
    EnteredFrameByFrame,
    /// Already paused; one more frame requested.
    Stepped,
    /// Frame-by-frame → free-running.
    Resumed,
    Quit,
}

/// Active comparison mode plus playback control.
///
/// Never blocks and never fails: every event maps to exactly one
/// [`Transition`].
#[derive(Debug, Clone)]
pub struct ModeStateMachine {
    mode: ComparisonMode,
    playback: PlaybackState,
}

impl ModeStateMachine {
    pub fn new(mode: ComparisonMode, start_paused: bool) -> Self {
        Self {
            mode,
            playback: PlaybackState {
                frame_by_frame: start_paused,
                render_pending: true,
            },
        }
    }

    pub fn mode(&self) -> ComparisonMode {
        self.mode
    }

    pub fn playback(&self) -> PlaybackState {
        self.playback
    }

    /// False while paused with nothing left to render: the driver must not
    /// pull a new source frame.
    pub fn should_advance(&self) -> bool {
        !self.playback.frame_by_frame || self.playback.render_pending
    }

    /// Mark the pending step as rendered. No-op in free-running playback.
    pub fn consume_render(&mut self) {
        if self.playback.frame_by_frame {
            self.playback.render_pending = false;
        }
    }

    pub fn apply(&mut self, event: InputEvent) -> Transition {
        match event {
            InputEvent::Quit => {
                info!("q: quit requested");
                Transition::Quit
            }
            InputEvent::Select(to) if to == self.mode => Transition::Ignored,
            InputEvent::Select(to) => {
                let from = self.mode;
                self.mode = to;
                self.playback.render_pending = true;
                info!(from = %from, to = %to, "{}: switching comparison method", to.key());
                Transition::ModeChanged { from, to }
            }
            InputEvent::Step => {
                self.playback.render_pending = true;
                if self.playback.frame_by_frame {
                    Transition::Stepped
                } else {
                    self.playback.frame_by_frame = true;
                    info!("p: switching to frame-by-frame playback");
                    Transition::EnteredFrameByFrame
                }
            }
            InputEvent::Continue if self.playback.frame_by_frame => {
                self.playback.frame_by_frame = false;
                self.playback.render_pending = true;
                info!("c: switching back to normal playback");
                Transition::Resumed
            }
            InputEvent::Continue => Transition::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_follows_config() {
        let sm = ModeStateMachine::new(ComparisonMode::Green, false);
        assert_eq!(sm.mode(), ComparisonMode::Green);
        assert!(!sm.playback().frame_by_frame);
        assert!(sm.should_advance());

        let paused = ModeStateMachine::new(ComparisonMode::Mask, true);
        assert!(paused.playback().frame_by_frame);
        // The first frame is always rendered, even when starting paused.
        assert!(paused.should_advance());
    }

    #[test]
    fn selecting_active_mode_is_a_no_op() {
        let mut sm = ModeStateMachine::new(ComparisonMode::Red, true);
        sm.consume_render();
        assert!(!sm.playback().render_pending);

        assert_eq!(sm.apply(InputEvent::Select(ComparisonMode::Red)), Transition::Ignored);
        assert!(!sm.playback().render_pending);
        assert!(!sm.should_advance());
    }

    #[test]
    fn selecting_new_mode_requests_render() {
        let mut sm = ModeStateMachine::new(ComparisonMode::Green, true);
        sm.consume_render();

        let t = sm.apply(InputEvent::Select(ComparisonMode::Absolute));
        assert_eq!(
            t,
            Transition::ModeChanged {
                from: ComparisonMode::Green,
                to: ComparisonMode::Absolute
            }
        );
        assert_eq!(sm.mode(), ComparisonMode::Absolute);
        assert!(sm.should_advance());
    }

    #[test]
    fn step_pauses_then_retriggers() {
        let mut sm = ModeStateMachine::new(ComparisonMode::Green, false);
        assert_eq!(sm.apply(InputEvent::Step), Transition::EnteredFrameByFrame);
        assert!(sm.playback().frame_by_frame);
        assert!(sm.playback().render_pending);

        sm.consume_render();
        assert!(!sm.should_advance());

        assert_eq!(sm.apply(InputEvent::Step), Transition::Stepped);
        assert!(sm.playback().render_pending);
        assert!(sm.should_advance());
    }

    #[test]
    fn continue_only_acts_while_paused() {
        let mut sm = ModeStateMachine::new(ComparisonMode::Green, false);
        assert_eq!(sm.apply(InputEvent::Continue), Transition::Ignored);

        let mut paused = ModeStateMachine::new(ComparisonMode::Green, true);
        paused.consume_render();
        assert_eq!(paused.apply(InputEvent::Continue), Transition::Resumed);
        assert!(!paused.playback().frame_by_frame);
        assert!(paused.should_advance());
    }

    #[test]
    fn consume_render_is_ignored_when_free_running() {
        let mut sm = ModeStateMachine::new(ComparisonMode::Green, false);
        sm.consume_render();
        assert!(sm.playback().render_pending);
        assert!(sm.should_advance());
    }

    #[test]
    fn quit_leaves_state_untouched() {
        let mut sm = ModeStateMachine::new(ComparisonMode::Blue, true);
        assert_eq!(sm.apply(InputEvent::Quit), Transition::Quit);
        assert_eq!(sm.mode(), ComparisonMode::Blue);
        assert!(sm.playback().frame_by_frame);
    }
}
