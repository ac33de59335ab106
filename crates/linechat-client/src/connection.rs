//! Connection ownership and lifecycle.
//!
//! A [`Connection`] owns both halves of one byte stream and the shared
//! [`ConnectionState`]. The read half is handed to the inbound reader
//! exactly once; the write half stays behind an async mutex so that
//! concurrent senders never interleave.
//!
//! `Connection` is generic over the stream so the same code runs on tokio
//! TCP, in-memory duplex pipes and simulated networks. Handles are cheap
//! clones of one shared connection.

use std::{
    fmt, io,
    net::SocketAddr,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf},
    net::{TcpStream, lookup_host},
    sync::{Mutex as AsyncMutex, watch},
};

use crate::{
    ClientConfig, ConnectError, ConnectionState, DEFAULT_CONNECT_TIMEOUT, Endpoint, LineSender,
    state::StateCell,
};

/// Byte stream a [`Connection`] can run over.
pub trait Transport: AsyncRead + AsyncWrite + Send + 'static {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Send + 'static {}

/// Connection over a real TCP socket.
pub type TcpConnection = Connection<TcpStream>;

/// State shared by every handle to one connection.
pub(crate) struct Shared<S> {
    pub(crate) endpoint: Endpoint,
    pub(crate) state: StateCell,
    /// Read half until the reader takes it.
    reader: Mutex<Option<ReadHalf<S>>>,
    /// Write half until close takes it.
    pub(crate) writer: AsyncMutex<Option<WriteHalf<S>>>,
    /// Flipped to `true` on close; wakes a running reader and any write
    /// blocked on a stalled peer.
    pub(crate) closed: watch::Sender<bool>,
}

/// One established duplex connection.
pub struct Connection<S> {
    pub(crate) shared: Arc<Shared<S>>,
}

impl<S> Clone for Connection<S> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<S> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.shared.endpoint)
            .field("state", &self.shared.state.load())
            .finish_non_exhaustive()
    }
}

impl Connection<TcpStream> {
    /// Connect to `address:port` with the default connect timeout.
    ///
    /// # Errors
    ///
    /// - [`ConnectError::HostUnknown`] if the address does not resolve
    /// - [`ConnectError::Io`] if no socket could be established
    pub async fn connect(address: &str, port: u16) -> Result<Self, ConnectError> {
        Self::connect_with_timeout(address, port, DEFAULT_CONNECT_TIMEOUT).await
    }

    /// Connect to the endpoint described by `config`.
    pub async fn connect_with_config(config: &ClientConfig) -> Result<Self, ConnectError> {
        Self::connect_with_timeout(&config.address, config.port, config.connect_timeout).await
    }

    /// Connect to `address:port`, giving up after `connect_timeout`.
    ///
    /// The timeout covers name resolution and socket establishment
    /// together. Every resolved address is tried in order; the last failure
    /// is reported.
    pub async fn connect_with_timeout(
        address: &str,
        port: u16,
        connect_timeout: Duration,
    ) -> Result<Self, ConnectError> {
        let endpoint = Endpoint::new(address, port);

        let stream =
            within(connect_timeout, &endpoint, resolve_and_connect(&endpoint)).await?;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "failed to disable Nagle");
        }

        tracing::info!(%endpoint, "connected");

        Ok(Self::from_stream(stream, endpoint))
    }
}

/// Run `attempt`, failing with [`ConnectError::Io`] (`TimedOut`) once
/// `limit` elapses.
async fn within<T, F>(limit: Duration, endpoint: &Endpoint, attempt: F) -> Result<T, ConnectError>
where
    F: Future<Output = Result<T, ConnectError>>,
{
    tokio::time::timeout(limit, attempt).await.unwrap_or_else(|_| {
        Err(ConnectError::Io {
            endpoint: endpoint.clone(),
            source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
        })
    })
}

/// Resolve `endpoint` and connect to the first address that accepts.
async fn resolve_and_connect(endpoint: &Endpoint) -> Result<TcpStream, ConnectError> {
    let address = endpoint.address.as_str();

    let addrs: Vec<SocketAddr> = lookup_host((address, endpoint.port))
        .await
        .map_err(|source| ConnectError::HostUnknown { address: address.to_string(), source })?
        .collect();

    if addrs.is_empty() {
        return Err(ConnectError::HostUnknown {
            address: address.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no addresses resolved"),
        });
    }

    if endpoint.port == 0 {
        return Err(ConnectError::Io {
            endpoint: endpoint.clone(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "port 0 is not connectable"),
        });
    }

    connect_any(&addrs)
        .await
        .map_err(|source| ConnectError::Io { endpoint: endpoint.clone(), source })
}

/// Try each address in turn.
async fn connect_any(addrs: &[SocketAddr]) -> io::Result<TcpStream> {
    let mut last_error = None;

    for addr in addrs {
        match TcpStream::connect(*addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::debug!(%addr, error = %e, "connect attempt failed");
                last_error = Some(e);
            },
        }
    }

    Err(last_error
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no addresses")))
}

impl<S: Transport> Connection<S> {
    /// Wrap an already established stream.
    ///
    /// The connection starts in [`ConnectionState::Connected`].
    pub fn from_stream(stream: S, endpoint: Endpoint) -> Self {
        let (reader, writer) = tokio::io::split(stream);

        let state = StateCell::new();
        state.advance(ConnectionState::Disconnected, ConnectionState::Connected);
        tracing::debug!(%endpoint, "connection state: disconnected -> connected");

        let (closed, _) = watch::channel(false);

        Self {
            shared: Arc::new(Shared {
                endpoint,
                state,
                reader: Mutex::new(Some(reader)),
                writer: AsyncMutex::new(Some(writer)),
                closed,
            }),
        }
    }

    /// Remote endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.shared.endpoint
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state.load()
    }

    /// Whether sends are currently accepted.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Handle for writing lines to this connection.
    pub fn sender(&self) -> LineSender<S> {
        LineSender::new(Arc::clone(&self.shared))
    }

    /// Close both halves of the stream.
    ///
    /// Idempotent: only the first call has any effect. Sends no farewell;
    /// use [`shutdown`](crate::shutdown) for a graceful close. A running
    /// reader is woken and stops with
    /// [`DisconnectReason::Cancelled`](crate::DisconnectReason::Cancelled).
    pub async fn close(&self) {
        let previous = self.shared.state.close();
        if previous == ConnectionState::Closed {
            return;
        }
        tracing::debug!(endpoint = %self.shared.endpoint, "connection state: {previous} -> closed");

        self.shared.closed.send_replace(true);
        drop(self.take_read_half());

        let writer = self.shared.writer.lock().await.take();
        if let Some(mut writer) = writer {
            if let Err(e) = writer.shutdown().await {
                tracing::debug!(error = %e, "write half shutdown failed");
            }
        }

        tracing::info!(endpoint = %self.shared.endpoint, "connection closed");
    }

    /// Advance `Connected -> Closing`. Fails if shutdown already began.
    pub(crate) fn begin_closing(&self) -> bool {
        let began = self.shared.state.advance(ConnectionState::Connected, ConnectionState::Closing);
        if began {
            tracing::debug!(
                endpoint = %self.shared.endpoint,
                "connection state: connected -> closing"
            );
        }
        began
    }

    /// Take the read half. Returns `None` once taken or after close.
    pub(crate) fn take_read_half(&self) -> Option<ReadHalf<S>> {
        self.shared.reader.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// Receiver that observes `true` once the connection closes.
    pub(crate) fn closed_signal(&self) -> watch::Receiver<bool> {
        self.shared.closed.subscribe()
    }
}
