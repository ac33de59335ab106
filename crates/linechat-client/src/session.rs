//! One client session: a connection, its sender and its reader.

use std::sync::Arc;

use tokio::net::TcpStream;

use crate::{
    ClientConfig, Connection, ConnectionState, DeliveryTarget, LineSender, ReaderHandle,
    SendError, SessionError, ShutdownOptions, ShutdownReport, StartError, Transport, shutdown,
};

/// A connection with its reader running.
///
/// Owns the [`ReaderHandle`]; dropping the session cancels the reader.
#[derive(Debug)]
pub struct Session<S = TcpStream> {
    connection: Connection<S>,
    sender: LineSender<S>,
    reader: Option<ReaderHandle>,
}

impl Session<TcpStream> {
    /// Connect to the configured endpoint and start delivering to `target`.
    pub async fn connect<T>(config: &ClientConfig, target: &Arc<T>) -> Result<Self, SessionError>
    where
        T: DeliveryTarget + ?Sized + 'static,
    {
        let connection = Connection::connect_with_config(config).await?;
        Ok(Self::start(connection, target)?)
    }
}

impl<S: Transport> Session<S> {
    /// Start the reader on an established connection.
    pub fn start<T>(connection: Connection<S>, target: &Arc<T>) -> Result<Self, StartError>
    where
        T: DeliveryTarget + ?Sized + 'static,
    {
        let reader = connection.start_reader(target)?;
        let sender = connection.sender();
        Ok(Self { connection, sender, reader: Some(reader) })
    }

    /// Send one line. See [`LineSender::send`].
    pub async fn send(&self, line: &str) -> Result<(), SendError> {
        self.sender.send(line).await
    }

    /// Sender handle usable from other tasks.
    pub fn sender(&self) -> LineSender<S> {
        self.sender.clone()
    }

    /// Underlying connection.
    pub fn connection(&self) -> &Connection<S> {
        &self.connection
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Whether the reader has stopped (peer closed, error, or cancelled).
    pub fn reader_finished(&self) -> bool {
        self.reader.as_ref().is_none_or(ReaderHandle::is_finished)
    }

    /// Shut the session down gracefully. See [`shutdown`].
    ///
    /// Later calls return [`ShutdownReport::AlreadyClosed`].
    pub async fn close(&mut self, options: ShutdownOptions) -> ShutdownReport {
        shutdown(&self.connection, self.reader.take(), options).await
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, duplex};

    use super::*;
    use crate::{ChannelTarget, DisconnectReason, Endpoint, InboundEvent};

    #[tokio::test]
    async fn session_sends_and_receives() {
        let (local, remote) = duplex(1024);
        let (target, mut events) = ChannelTarget::channel();
        let session =
            Session::start(Connection::from_stream(local, Endpoint::new("memory", 1)), &target)
                .unwrap();
        let (peer_read, mut peer_write) = tokio::io::split(remote);
        let mut peer_lines = BufReader::new(peer_read).lines();

        session.send("out").await.unwrap();
        peer_write.write_all(b"in\n").await.unwrap();

        assert_eq!(peer_lines.next_line().await.unwrap().as_deref(), Some("out"));
        assert_eq!(events.recv().await, Some(InboundEvent::Message("in".to_string())));
    }

    #[tokio::test]
    async fn close_twice_reports_already_closed() {
        let (local, _remote) = duplex(1024);
        let (target, _events) = ChannelTarget::channel();
        let mut session =
            Session::start(Connection::from_stream(local, Endpoint::new("memory", 1)), &target)
                .unwrap();

        let first = session.close(ShutdownOptions::default()).await;
        let second = session.close(ShutdownOptions::default()).await;

        assert_eq!(first, ShutdownReport::Closed {
            farewell_sent: false,
            reader: Some(DisconnectReason::Cancelled),
        });
        assert_eq!(second, ShutdownReport::AlreadyClosed);
        assert!(session.reader_finished());
        assert_eq!(session.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn sender_clone_is_refused_after_close() {
        let (local, _remote) = duplex(1024);
        let (target, _events) = ChannelTarget::channel();
        let mut session =
            Session::start(Connection::from_stream(local, Endpoint::new("memory", 1)), &target)
                .unwrap();
        let sender = session.sender();

        session.close(ShutdownOptions::default()).await;

        assert!(matches!(sender.send("late").await, Err(SendError::NotConnected)));
    }
}
