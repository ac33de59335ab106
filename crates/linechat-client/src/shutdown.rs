//! Graceful shutdown.
//!
//! Ordering:
//! 1. `Connected -> Closing`. Other senders are refused from here on.
//! 2. Farewell line, if any, written and flushed.
//! 3. Reader cancelled and joined, bounded by a timeout.
//! 4. [`Connection::close`].
//!
//! The farewell is therefore the last line on the wire and is fully flushed
//! before the stream is shut down. "Sent" means flushed locally: the
//! protocol has no acknowledgment.

use std::time::Duration;

use crate::{
    ClientConfig, Connection, DEFAULT_SHUTDOWN_TIMEOUT, DisconnectReason, ReaderHandle, Transport,
};

/// Options for [`shutdown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownOptions {
    /// Final line written before the stream is closed.
    pub farewell: Option<String>,
    /// Upper bound on writing and flushing the farewell.
    pub farewell_timeout: Duration,
    /// Upper bound on waiting for the reader to stop.
    pub reader_timeout: Duration,
}

impl ShutdownOptions {
    /// Options with the shutdown timeout from `config` and no farewell.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            farewell: None,
            farewell_timeout: config.shutdown_timeout,
            reader_timeout: config.shutdown_timeout,
        }
    }

    /// Send `line` as the farewell.
    #[must_use]
    pub fn with_farewell(mut self, line: impl Into<String>) -> Self {
        self.farewell = Some(line.into());
        self
    }
}

impl Default for ShutdownOptions {
    fn default() -> Self {
        Self {
            farewell: None,
            farewell_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            reader_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

/// Outcome of [`shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReport {
    /// Shutdown had already begun; nothing was done.
    AlreadyClosed,
    /// The connection was closed by this call.
    Closed {
        /// Farewell was written and flushed.
        farewell_sent: bool,
        /// Why the reader stopped. `None` if there was no reader or it had
        /// to be aborted.
        reader: Option<DisconnectReason>,
    },
}

/// Close `connection` gracefully.
///
/// A no-op returning [`ShutdownReport::AlreadyClosed`] if the connection is
/// already closing or closed. Farewell failures are logged and reported but
/// never stop the teardown.
pub async fn shutdown<S: Transport>(
    connection: &Connection<S>,
    reader: Option<ReaderHandle>,
    options: ShutdownOptions,
) -> ShutdownReport {
    if !connection.begin_closing() {
        tracing::debug!(endpoint = %connection.endpoint(), "shutdown already in progress");
        return ShutdownReport::AlreadyClosed;
    }

    let farewell_sent = match options.farewell.as_deref() {
        Some(line) => {
            let sender = connection.sender();
            match tokio::time::timeout(options.farewell_timeout, sender.send_final(line)).await {
                Ok(Ok(())) => true,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "farewell not sent");
                    false
                },
                Err(_) => {
                    tracing::warn!(timeout = ?options.farewell_timeout, "farewell flush timed out");
                    false
                },
            }
        },
        None => false,
    };

    let reader = match reader {
        Some(handle) => {
            handle.cancel();
            handle.join(options.reader_timeout).await
        },
        None => None,
    };

    connection.close().await;

    tracing::debug!(farewell_sent, ?reader, "shutdown complete");

    ShutdownReport::Closed { farewell_sent, reader }
}
