use videodiff_common::mode::ComparisonMode;

/// A user command decoded from a single key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Switch the active comparison mode.
    Select(ComparisonMode),
    /// Enter frame-by-frame playback and render one more frame.
    Step,
    /// Leave frame-by-frame playback.
    Continue,
    /// Stop the run.
    Quit,
}

/// Key bindings:
///   b g r a m n  select blue / green / red / absolute / mask / normal
///   p            step (pauses first if needed)
///   c            continue free-running playback
///   q            quit
pub fn event_for_key(key: char) -> Option<InputEvent> {
    match key {
        'q' => Some(InputEvent::Quit),
        'p' => Some(InputEvent::Step),
        'c' => Some(InputEvent::Continue),
        other => ComparisonMode::ALL
            .into_iter()
            .find(|mode| mode.key() == other)
            .map(InputEvent::Select),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_keys() {
        assert_eq!(event_for_key('b'), Some(InputEvent::Select(ComparisonMode::Blue)));
        assert_eq!(event_for_key('g'), Some(InputEvent::Select(ComparisonMode::Green)));
        assert_eq!(event_for_key('r'), Some(InputEvent::Select(ComparisonMode::Red)));
        assert_eq!(event_for_key('a'), Some(InputEvent::Select(ComparisonMode::Absolute)));
        assert_eq!(event_for_key('m'), Some(InputEvent::Select(ComparisonMode::Mask)));
        assert_eq!(event_for_key('n'), Some(InputEvent::Select(ComparisonMode::Normal)));
    }

    #[test]
    fn playback_keys() {
        assert_eq!(event_for_key('p'), Some(InputEvent::Step));
        assert_eq!(event_for_key('c'), Some(InputEvent::Continue));
        assert_eq!(event_for_key('q'), Some(InputEvent::Quit));
    }

    #[test]
    fn unbound_keys_are_ignored() {
        assert_eq!(event_for_key('x'), None);
        assert_eq!(event_for_key('Q'), None);
        assert_eq!(event_for_key(' '), None);
    }
}
