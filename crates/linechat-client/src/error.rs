//! Error types.
//!
//! Connection-time and send-time failures are returned to the immediate
//! caller. Failures inside the background reader never surface here; they
//! become a [`DisconnectReason`](crate::DisconnectReason) delivered to the
//! consumer.

use std::io;

use thiserror::Error;

use crate::Endpoint;

/// Failure to establish a connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The address did not resolve to any socket address.
    #[error("host unknown: {address}: {source}")]
    HostUnknown {
        /// Address that failed to resolve.
        address: String,
        /// Resolver error.
        source: io::Error,
    },

    /// The socket could not be established (refused, timed out, ...).
    #[error("failed to connect to {endpoint}: {source}")]
    Io {
        /// Endpoint the connection was attempted to.
        endpoint: Endpoint,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// Failure to send a line.
#[derive(Debug, Error)]
pub enum SendError {
    /// The connection is closing or closed.
    #[error("not connected")]
    NotConnected,

    /// The line contains a line terminator and cannot be framed.
    #[error("line contains a line terminator")]
    InvalidLine,

    /// Write or flush failed.
    #[error("write failed: {0}")]
    Io(#[from] io::Error),
}

/// Failure to start the inbound reader.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StartError {
    /// A reader was already started for this connection.
    #[error("reader already started")]
    ReaderAlreadyStarted,

    /// The connection is closing or closed.
    #[error("not connected")]
    NotConnected,
}

/// Failure to open a [`Session`](crate::Session).
#[derive(Debug, Error)]
pub enum SessionError {
    /// Connection could not be established.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Reader could not be started.
    #[error(transparent)]
    Start(#[from] StartError),
}
