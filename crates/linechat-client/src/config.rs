//! Client configuration.

use std::{fmt, time::Duration};

/// Address used when none is configured.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1";

/// Port used when none is configured.
pub const DEFAULT_PORT: u16 = 5000;

/// Upper bound on name resolution plus socket establishment.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on each shutdown phase (farewell flush, reader join).
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Remote endpoint of a connection, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Host name or IP literal.
    pub address: String,
    /// TCP port.
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint from an address and port.
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self { address: address.into(), port }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.address.contains(':') {
            write!(f, "[{}]:{}", self.address, self.port)
        } else {
            write!(f, "{}:{}", self.address, self.port)
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server host name or IP literal
    pub address: String,
    /// Server port
    pub port: u16,
    /// Timeout for resolving and connecting
    pub connect_timeout: Duration,
    /// Timeout for each graceful shutdown phase
    pub shutdown_timeout: Duration,
}

impl ClientConfig {
    /// Configuration for the given endpoint with default timeouts.
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self { address: address.into(), port, ..Self::default() }
    }

    /// Endpoint described by this configuration.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.address.clone(), self.port)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}
