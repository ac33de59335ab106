//! Line chat client
//!
//! Duplex text-messaging over a single TCP connection. Outbound lines are
//! written by the caller; inbound lines are delivered to a consumer from a
//! background reader task. The wire format is UTF-8 text terminated by `\n`.
//!
//! # Architecture
//!
//! ```text
//!  caller ──send──▶ LineSender ──┐
//!                                ▼
//!                          ┌────────────┐   TCP   ┌──────┐
//!                          │ Connection │◀───────▶│ peer │
//!                          └────────────┘         └──────┘
//!                                │
//!  DeliveryTarget ◀── reader ◀───┘
//! ```
//!
//! # Components
//!
//! - [`Connection`]: Owns both stream halves and the lifecycle state
//! - [`LineSender`]: Serialized, flushed line writes
//! - [`ReaderHandle`]: Cancellable background read loop
//! - [`DeliveryTarget`]: Consumer capability for inbound lines
//! - [`shutdown`]: Farewell, reader cancellation, then close
//! - [`Session`]: All of the above for one connection

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod connection;
mod error;
mod reader;
mod sender;
mod session;
mod shutdown;
mod state;
mod target;

pub use config::{
    ClientConfig, DEFAULT_ADDRESS, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT,
    DEFAULT_SHUTDOWN_TIMEOUT, Endpoint,
};
pub use connection::{Connection, TcpConnection, Transport};
pub use error::{ConnectError, SendError, SessionError, StartError};
pub use reader::ReaderHandle;
pub use sender::{LineSender, validate_line};
pub use session::Session;
pub use shutdown::{ShutdownOptions, ShutdownReport, shutdown};
pub use state::ConnectionState;
pub use target::{ChannelTarget, DeliveryTarget, DisconnectReason, InboundEvent};
