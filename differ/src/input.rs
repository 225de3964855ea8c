//! Non-blocking key sources feeding the mode state machine.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::collections::VecDeque;
use std::io;
use std::time::Duration;
use tracing::{debug, warn};

use crate::shutdown::Interrupt;

/// Yields at most one pending key per call and never waits for input.
pub trait KeySource: Send {
    fn poll_key(&mut self) -> Option<char>;
}

/// Replays a fixed script, one entry per poll. `None` entries model polls
/// where no key was pressed; once the script runs out every poll is empty.
#[derive(Debug, Default)]
pub struct ScriptedKeys {
    script: VecDeque<Option<char>>,
}

impl ScriptedKeys {
    pub fn new(script: impl IntoIterator<Item = Option<char>>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    /// Script where every entry is a key press.
    pub fn pressed(keys: &str) -> Self {
        Self::new(keys.chars().map(Some))
    }

    /// A source that never produces a key.
    pub fn silent() -> Self {
        Self::default()
    }
}

impl KeySource for ScriptedKeys {
    fn poll_key(&mut self) -> Option<char> {
        self.script.pop_front().flatten()
    }
}

/// Keys typed into the controlling terminal, read in raw mode.
///
/// Raw mode swallows the terminal's own Ctrl-C handling, so Ctrl-C is
/// translated into an [`Interrupt`] here.
pub struct TerminalKeys {
    interrupt: Interrupt,
    raw_mode: bool,
}

impl TerminalKeys {
    pub fn enter(interrupt: Interrupt) -> io::Result<Self> {
        enable_raw_mode()?;
        debug!("terminal raw mode enabled for key input");
        Ok(Self {
            interrupt,
            raw_mode: true,
        })
    }

    fn decode(&self, key: KeyEvent) -> Option<char> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.interrupt.trigger();
                None
            }
            KeyCode::Char(c) if key.modifiers.difference(KeyModifiers::SHIFT).is_empty() => Some(c),
            KeyCode::Esc => Some('q'),
            _ => None,
        }
    }
}

impl KeySource for TerminalKeys {
    fn poll_key(&mut self) -> Option<char> {
        match event::poll(Duration::ZERO) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) => self.decode(key),
                Ok(_) => None,
                Err(e) => {
                    warn!(error = %e, "failed to read terminal event");
                    None
                }
            },
            Ok(false) => None,
            Err(e) => {
                warn!(error = %e, "failed to poll terminal events");
                None
            }
        }
    }
}

impl Drop for TerminalKeys {
    fn drop(&mut self) {
        if self.raw_mode {
            self.raw_mode = false;
            // Best-effort restore; nothing useful to do on failure during drop.
            let _ = disable_raw_mode();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_keys_replay_in_order() {
        let mut keys = ScriptedKeys::new([Some('r'), None, Some('q')]);
        assert_eq!(keys.poll_key(), Some('r'));
        assert_eq!(keys.poll_key(), None);
        assert_eq!(keys.poll_key(), Some('q'));
        assert_eq!(keys.poll_key(), None);
        assert_eq!(keys.poll_key(), None);
    }

    #[test]
    fn pressed_builds_one_entry_per_char() {
        let mut keys = ScriptedKeys::pressed("pc");
        assert_eq!(keys.poll_key(), Some('p'));
        assert_eq!(keys.poll_key(), Some('c'));
        assert_eq!(keys.poll_key(), None);
    }

    #[test]
    fn silent_never_yields() {
        let mut keys = ScriptedKeys::silent();
        assert!((0..5).all(|_| keys.poll_key().is_none()));
    }
}
