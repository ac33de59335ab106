//! Consumer adapter for inbound lines.
//!
//! The reader task is the only caller of a [`DeliveryTarget`]. It holds the
//! target weakly: the caller keeps ownership, and once the last strong
//! reference is gone the reader stops.

use std::{fmt, sync::Arc};

use tokio::sync::mpsc;

/// Why the inbound reader stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisconnectReason {
    /// Peer closed its end of the stream.
    EndOfStream,
    /// Reading failed (I/O error or invalid UTF-8).
    ReadError,
    /// Cancellation was requested locally.
    Cancelled,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::EndOfStream => "connection closed by peer",
            Self::ReadError => "read error",
            Self::Cancelled => "cancelled",
        };
        f.write_str(reason)
    }
}

/// Receives inbound lines and the final disconnect notification.
///
/// Both methods run on the reader task. They must not block: a slow
/// `on_message` stalls draining of the socket. Hand work off to another
/// task or queue instead (see [`ChannelTarget`]).
///
/// `on_disconnected` is called exactly once per reader, and no
/// `on_message` follows it.
pub trait DeliveryTarget: Send + Sync {
    /// One line received, without its terminator.
    fn on_message(&self, line: String);

    /// The reader stopped.
    fn on_disconnected(&self, reason: DisconnectReason);
}

/// Event forwarded by [`ChannelTarget`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Line received.
    Message(String),
    /// Reader stopped.
    Disconnected(DisconnectReason),
}

/// [`DeliveryTarget`] that forwards everything into an unbounded channel.
///
/// Never blocks the reader. Events are dropped silently once the receiver
/// is gone.
#[derive(Debug)]
pub struct ChannelTarget {
    events: mpsc::UnboundedSender<InboundEvent>,
}

impl ChannelTarget {
    /// Create a target and the receiver its events arrive on.
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<InboundEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { events }), rx)
    }

    fn forward(&self, event: InboundEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("inbound event receiver dropped");
        }
    }
}

impl DeliveryTarget for ChannelTarget {
    fn on_message(&self, line: String) {
        self.forward(InboundEvent::Message(line));
    }

    fn on_disconnected(&self, reason: DisconnectReason) {
        self.forward(InboundEvent::Disconnected(reason));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_target_forwards_in_order() {
        let (target, mut rx) = ChannelTarget::channel();

        target.on_message("first".to_string());
        target.on_message("second".to_string());
        target.on_disconnected(DisconnectReason::EndOfStream);

        assert_eq!(rx.try_recv().unwrap(), InboundEvent::Message("first".to_string()));
        assert_eq!(rx.try_recv().unwrap(), InboundEvent::Message("second".to_string()));
        assert_eq!(
            rx.try_recv().unwrap(),
            InboundEvent::Disconnected(DisconnectReason::EndOfStream)
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn channel_target_tolerates_dropped_receiver() {
        let (target, rx) = ChannelTarget::channel();
        drop(rx);

        target.on_message("nobody listening".to_string());
        target.on_disconnected(DisconnectReason::Cancelled);
    }

    #[test]
    fn disconnect_reason_display() {
        assert_eq!(DisconnectReason::EndOfStream.to_string(), "connection closed by peer");
        assert_eq!(DisconnectReason::ReadError.to_string(), "read error");
        assert_eq!(DisconnectReason::Cancelled.to_string(), "cancelled");
    }
}
