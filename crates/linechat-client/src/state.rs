//! Connection lifecycle state.
//!
//! ```text
//! ┌──────────────┐ connect ┌───────────┐ shutdown ┌─────────┐ close ┌────────┐
//! │ Disconnected │────────>│ Connected │─────────>│ Closing │──────>│ Closed │
//! └──────────────┘         └───────────┘          └─────────┘       └────────┘
//!                                │                                      ↑
//!                                └──────────────── close ───────────────┘
//! ```
//!
//! Transitions only move to the right. The state is shared between the
//! caller and the reader task, so it lives in an atomic.

use std::{
    fmt,
    sync::atomic::{AtomicU8, Ordering},
};

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConnectionState {
    /// No socket established yet.
    Disconnected,
    /// Both streams open; sends are accepted.
    Connected,
    /// Graceful shutdown in progress; only the farewell may be written.
    Closing,
    /// Streams closed.
    Closed,
}

impl ConnectionState {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::Connected => 1,
            Self::Closing => 2,
            Self::Closed => 3,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Disconnected,
            1 => Self::Connected,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Atomically shared [`ConnectionState`] with forward-only transitions.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(ConnectionState::Disconnected.as_u8()))
    }

    pub(crate) fn load(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move from `from` to `to`.
    ///
    /// Fails if the current state is not `from`, or if `to` is not strictly
    /// later than `from`.
    pub(crate) fn advance(&self, from: ConnectionState, to: ConnectionState) -> bool {
        if to <= from {
            return false;
        }
        self.0.compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire).is_ok()
    }

    /// Move to [`ConnectionState::Closed`], returning the previous state.
    pub(crate) fn close(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.swap(ConnectionState::Closed.as_u8(), Ordering::AcqRel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_disconnected() {
        assert_eq!(StateCell::new().load(), ConnectionState::Disconnected);
    }

    #[test]
    fn advances_forward_through_every_state() {
        let cell = StateCell::new();

        assert!(cell.advance(ConnectionState::Disconnected, ConnectionState::Connected));
        assert!(cell.advance(ConnectionState::Connected, ConnectionState::Closing));
        assert!(cell.advance(ConnectionState::Closing, ConnectionState::Closed));
        assert_eq!(cell.load(), ConnectionState::Closed);
    }

    #[test]
    fn refuses_backward_transition() {
        let cell = StateCell::new();
        cell.advance(ConnectionState::Disconnected, ConnectionState::Connected);
        cell.advance(ConnectionState::Connected, ConnectionState::Closing);

        assert!(!cell.advance(ConnectionState::Closing, ConnectionState::Connected));
        assert_eq!(cell.load(), ConnectionState::Closing);
    }

    #[test]
    fn refuses_transition_from_stale_state() {
        let cell = StateCell::new();
        cell.advance(ConnectionState::Disconnected, ConnectionState::Connected);

        // Someone else already began closing
        assert!(cell.advance(ConnectionState::Connected, ConnectionState::Closing));
        assert!(!cell.advance(ConnectionState::Connected, ConnectionState::Closing));
    }

    #[test]
    fn close_reports_previous_state_once() {
        let cell = StateCell::new();
        cell.advance(ConnectionState::Disconnected, ConnectionState::Connected);

        assert_eq!(cell.close(), ConnectionState::Connected);
        assert_eq!(cell.close(), ConnectionState::Closed);
        assert_eq!(cell.load(), ConnectionState::Closed);
    }
}
