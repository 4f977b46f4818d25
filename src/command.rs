//! Commands and requests shared by every component.
//!
//! [`Command`] is what command sources deliver to the daemon;
//! [`SwitchRequest`] is what the tracker hands to the switch strategies.
//!
//! Direction strings on the wire are parsed leniently ("next", "Right",
//! "prev", ...), the same way for JSON and for any future text source.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Relative desktop step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Next,
    Previous,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Next => write!(f, "next"),
            Direction::Previous => write!(f, "previous"),
        }
    }
}

/// Parse a direction string (case-insensitive; accepts "next", "right",
/// "previous", "prev", "left").
fn parse_direction(s: &str) -> Option<Direction> {
    let normalized: String = s
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(|c| c.to_lowercase())
        .collect();
    match normalized.as_str() {
        "next" | "right" => Some(Direction::Next),
        "previous" | "prev" | "left" => Some(Direction::Previous),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_direction(&s).ok_or_else(|| DeError::custom(format!("invalid direction: {:?}", s)))
    }
}

/// A single switch request handed to the strategy chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchRequest {
    /// Go to the desktop at this 1-based index.
    Index(i64),
    /// Step relative to the active desktop.
    Step(Direction),
}

impl fmt::Display for SwitchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchRequest::Index(i) => write!(f, "desktop {}", i),
            SwitchRequest::Step(dir) => write!(f, "{} desktop", dir),
        }
    }
}

/// Every action the daemon accepts.
///
/// # Wire format
///
/// ```json
/// {"SwitchTo":3}
/// "Next"
/// "Previous"
/// {"Go":"left"}
/// "Refresh"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum Command {
    /// Switch to the desktop at this 1-based index.
    SwitchTo(i64),

    /// Switch to the next desktop.
    Next,

    /// Switch to the previous desktop.
    Previous,

    /// Step in a direction given as text; equivalent to `Next`/`Previous`.
    Go(Direction),

    /// Force a fresh read of the desktop state.
    Refresh,
}

impl Command {
    /// The switch this command asks for, if any.
    pub fn switch_request(&self) -> Option<SwitchRequest> {
        match self {
            Command::SwitchTo(i) => Some(SwitchRequest::Index(*i)),
            Command::Next => Some(SwitchRequest::Step(Direction::Next)),
            Command::Previous => Some(SwitchRequest::Step(Direction::Previous)),
            Command::Go(dir) => Some(SwitchRequest::Step(*dir)),
            Command::Refresh => None,
        }
    }
}
