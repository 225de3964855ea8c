use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::frame::Channel;

/// How a frame is compared against its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonMode {
    #[serde(alias = "b")]
    Blue,
    #[default]
    #[serde(alias = "g")]
    Green,
    #[serde(alias = "r")]
    Red,
    #[serde(alias = "a")]
    Absolute,
    #[serde(alias = "m")]
    Mask,
    #[serde(alias = "n")]
    Normal,
}

impl ComparisonMode {
    pub const ALL: [ComparisonMode; 6] = [
        ComparisonMode::Blue,
        ComparisonMode::Green,
        ComparisonMode::Red,
        ComparisonMode::Absolute,
        ComparisonMode::Mask,
        ComparisonMode::Normal,
    ];

    /// The colour plane kept by the single-channel modes.
    pub fn channel(self) -> Option<Channel> {
        match self {
            ComparisonMode::Blue => Some(Channel::Blue),
            ComparisonMode::Green => Some(Channel::Green),
            ComparisonMode::Red => Some(Channel::Red),
            _ => None,
        }
    }

    /// Single-letter key that selects this mode at runtime.
    pub fn key(self) -> char {
        match self {
            ComparisonMode::Blue => 'b',
            ComparisonMode::Green => 'g',
            ComparisonMode::Red => 'r',
            ComparisonMode::Absolute => 'a',
            ComparisonMode::Mask => 'm',
            ComparisonMode::Normal => 'n',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonMode::Blue => "blue",
            ComparisonMode::Green => "green",
            ComparisonMode::Red => "red",
            ComparisonMode::Absolute => "absolute",
            ComparisonMode::Mask => "mask",
            ComparisonMode::Normal => "normal",
        }
    }
}

impl fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        ComparisonMode::ALL
            .into_iter()
            .find(|m| m.as_str() == lowered || lowered.len() == 1 && lowered.starts_with(m.key()))
            .ok_or_else(|| ParseModeError(s.to_string()))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown comparison method '{0}', expected one of b, g, r, a, m, n")]
pub struct ParseModeError(pub String);
