//! Caller-side text formatting.
//!
//! The wire protocol carries opaque lines. Names, timestamps and the
//! farewell text are conventions of this front end only.

use std::time::{SystemTime, UNIX_EPOCH};

/// Input line that ends the session.
pub const EXIT_COMMAND: &str = "exit";

/// Name used when none is given.
pub const ANONYMOUS: &str = "anonymous";

/// Prefix for lines received from the server.
const INBOUND_MARKER: &str = "➤";

/// How outgoing lines are decorated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Display name prefixed to every message.
    pub name: String,
    /// Prefix messages with a `[HH:MM:SS]` clock stamp.
    pub timestamps: bool,
    /// Offset from UTC applied to clock stamps, in minutes.
    pub utc_offset_minutes: i32,
}

impl Profile {
    /// Profile for `name`, normalized by [`display_name`].
    pub fn new(name: &str, timestamps: bool) -> Self {
        Self { name: display_name(name), timestamps, utc_offset_minutes: 0 }
    }

    /// Stamp messages in the zone `minutes` east of UTC.
    #[must_use]
    pub fn with_utc_offset(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    /// Outgoing line for user input `text` typed at `now`.
    pub fn compose(&self, text: &str, now: SystemTime) -> String {
        if self.timestamps {
            format!("[{}] {}: {text}", clock_stamp(now, self.utc_offset_minutes), self.name)
        } else {
            format!("{}: {text}", self.name)
        }
    }

    /// Line announcing that this user left.
    pub fn farewell(&self) -> String {
        format!("{} has left the chat.", self.name)
    }
}

/// Trimmed name, or [`ANONYMOUS`] when empty.
pub fn display_name(raw: &str) -> String {
    let name = raw.trim();
    if name.is_empty() { ANONYMOUS.to_string() } else { name.to_string() }
}

/// `HH:MM:SS` of `now`, shifted `utc_offset_minutes` from UTC.
pub fn clock_stamp(now: SystemTime, utc_offset_minutes: i32) -> String {
    let utc = now.duration_since(UNIX_EPOCH).map_or(0, |since| since.as_secs()) % 86_400;
    let secs = (utc as i64 + i64::from(utc_offset_minutes) * 60).rem_euclid(86_400);
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

/// Display form of a line received from the server.
pub fn render_inbound(line: &str) -> String {
    format!("{INBOUND_MARKER} {line}")
}
