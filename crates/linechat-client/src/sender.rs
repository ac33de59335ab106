//! Outbound line writes.

use std::{fmt, sync::Arc};

use tokio::io::{AsyncWrite, AsyncWriteExt, WriteHalf};

use crate::{ConnectionState, SendError, Transport, connection::Shared};

/// Line terminator written after every outbound line.
const TERMINATOR: u8 = b'\n';

/// Writes lines to a [`Connection`](crate::Connection).
///
/// Clones share the connection. Calls from any number of tasks are
/// serialized: each line is written and flushed while holding the write
/// half, so lines never interleave on the wire.
pub struct LineSender<S> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for LineSender<S> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<S> fmt::Debug for LineSender<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineSender").field("endpoint", &self.shared.endpoint).finish()
    }
}

impl<S: Transport> LineSender<S> {
    pub(crate) fn new(shared: Arc<Shared<S>>) -> Self {
        Self { shared }
    }

    /// Write `line` followed by `\n` and flush.
    ///
    /// Returns once the flush completes. Does not wait on the reader.
    ///
    /// # Errors
    ///
    /// - [`SendError::InvalidLine`] if `line` contains `\n` or `\r`
    /// - [`SendError::NotConnected`] unless the connection is
    ///   [`ConnectionState::Connected`], or if it closes mid-write
    /// - [`SendError::Io`] if the write or flush fails
    pub async fn send(&self, line: &str) -> Result<(), SendError> {
        validate_line(line)?;

        if self.shared.state.load() != ConnectionState::Connected {
            return Err(SendError::NotConnected);
        }

        let mut guard = self.shared.writer.lock().await;

        // Shutdown may have begun while waiting for the lock
        if self.shared.state.load() != ConnectionState::Connected {
            return Err(SendError::NotConnected);
        }
        let writer = guard.as_mut().ok_or(SendError::NotConnected)?;

        self.write_until_closed(writer, line).await
    }

    /// Write the final line during shutdown.
    ///
    /// Skips the state check so the farewell goes out after the connection
    /// has entered [`ConnectionState::Closing`] and other sends are refused.
    pub(crate) async fn send_final(&self, line: &str) -> Result<(), SendError> {
        validate_line(line)?;

        let mut guard = self.shared.writer.lock().await;
        let writer = guard.as_mut().ok_or(SendError::NotConnected)?;

        self.write_until_closed(writer, line).await
    }

    /// Write `line`, abandoning the write if the connection closes first.
    ///
    /// A peer that stops reading can stall `write_all` indefinitely while
    /// the write half is locked. Closing wakes the writer so the lock is
    /// released and close can shut the stream down.
    async fn write_until_closed(
        &self,
        writer: &mut WriteHalf<S>,
        line: &str,
    ) -> Result<(), SendError> {
        let mut closed = self.shared.closed.subscribe();

        tokio::select! {
            biased;
            _ = closed.wait_for(|is_closed| *is_closed) => {
                tracing::debug!(endpoint = %self.shared.endpoint, "write abandoned on close");
                Err(SendError::NotConnected)
            },
            result = write_line(writer, line) => result,
        }
    }
}

/// Check that `line` can be framed: no `\n` and no `\r`.
///
/// # Errors
///
/// Returns [`SendError::InvalidLine`] if a terminator is embedded.
pub fn validate_line(line: &str) -> Result<(), SendError> {
    if line.contains(['\n', '\r']) { Err(SendError::InvalidLine) } else { Ok(()) }
}

/// Single write of line + terminator, then flush.
async fn write_line<W>(writer: &mut W, line: &str) -> Result<(), SendError>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::with_capacity(line.len() + 1);
    buf.extend_from_slice(line.as_bytes());
    buf.push(TERMINATOR);

    writer.write_all(&buf).await?;
    writer.flush().await?;

    tracing::trace!(bytes = buf.len(), "line written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, BufReader, duplex};

    use super::*;
    use crate::{Connection, Endpoint};

    #[test]
    fn validate_accepts_plain_text() {
        assert!(validate_line("hello world").is_ok());
        assert!(validate_line("").is_ok());
        assert!(validate_line("[12:00:00] ana: ✓ ünïcode").is_ok());
    }

    #[test]
    fn validate_rejects_terminators() {
        assert!(matches!(validate_line("a\nb"), Err(SendError::InvalidLine)));
        assert!(matches!(validate_line("a\r"), Err(SendError::InvalidLine)));
        assert!(matches!(validate_line("\r\n"), Err(SendError::InvalidLine)));
    }

    #[tokio::test]
    async fn write_line_appends_single_terminator() {
        let mut buf = Vec::new();

        write_line(&mut buf, "hello").await.unwrap();

        assert_eq!(buf, b"hello\n");
    }

    #[tokio::test]
    async fn send_writes_exact_line() {
        let (local, remote) = duplex(1024);
        let conn = Connection::from_stream(local, Endpoint::new("memory", 1));
        let mut lines = BufReader::new(remote).lines();

        conn.sender().send("hello").await.unwrap();
        conn.sender().send("").await.unwrap();

        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("hello"));
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some(""));
    }

    #[tokio::test]
    async fn send_rejects_embedded_newline_without_writing() {
        let (local, remote) = duplex(1024);
        let conn = Connection::from_stream(local, Endpoint::new("memory", 1));
        let sender = conn.sender();
        let mut lines = BufReader::new(remote).lines();

        let result = sender.send("two\nlines").await;
        assert!(matches!(result, Err(SendError::InvalidLine)));

        sender.send("after").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("after"));
    }

    #[tokio::test]
    async fn send_after_close_is_not_connected() {
        let (local, _remote) = duplex(1024);
        let conn = Connection::from_stream(local, Endpoint::new("memory", 1));
        let sender = conn.sender();

        conn.close().await;

        assert!(matches!(sender.send("late").await, Err(SendError::NotConnected)));
    }

    #[tokio::test]
    async fn send_while_closing_is_refused_but_final_line_is_written() {
        let (local, remote) = duplex(1024);
        let conn = Connection::from_stream(local, Endpoint::new("memory", 1));
        let sender = conn.sender();
        let mut lines = BufReader::new(remote).lines();

        assert!(conn.begin_closing());

        assert!(matches!(sender.send("user").await, Err(SendError::NotConnected)));
        sender.send_final("bye").await.unwrap();

        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("bye"));
    }

    #[tokio::test]
    async fn close_releases_write_stalled_on_silent_peer() {
        let (local, _remote) = duplex(64);
        let conn = Connection::from_stream(local, Endpoint::new("memory", 1));
        let sender = conn.sender();

        let stalled = tokio::spawn(async move { sender.send(&"x".repeat(4096)).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!stalled.is_finished(), "write should be blocked on the full pipe");

        tokio::time::timeout(Duration::from_secs(3), conn.close())
            .await
            .expect("close must not wait for the stalled write");

        let result = stalled.await.unwrap();
        assert!(matches!(result, Err(SendError::NotConnected)), "got {result:?}");
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn send_fails_with_io_when_peer_is_gone() {
        let (local, remote) = duplex(64);
        let conn = Connection::from_stream(local, Endpoint::new("memory", 1));
        drop(remote);

        let result = conn.sender().send("into the void").await;

        assert!(matches!(result, Err(SendError::Io(_))), "got {result:?}");
    }
}
