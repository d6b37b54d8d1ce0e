//! Error types
//!
//! Defines domain-specific error types for each layer of the relay.

use std::fmt;
use std::io;
use std::net::SocketAddr;

use crate::registry::ConnectionId;

/// Wire protocol errors
#[derive(Debug)]
pub enum ProtocolError {
    /// A payload handed to the encoder contains the 0x00 terminator byte.
    EmbeddedTerminator { command: u8 },
    Io(io::Error),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::EmbeddedTerminator { command } => write!(
                f,
                "Payload of '{}' frame contains a 0x00 byte",
                char::from(*command)
            ),
            ProtocolError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<io::Error> for ProtocolError {
    fn from(error: io::Error) -> Self {
        ProtocolError::Io(error)
    }
}

/// Connection registry errors
#[derive(Debug, PartialEq, Eq)]
pub enum RegistryError {
    AlreadyRegistered(ConnectionId),
    NotRegistered(ConnectionId),
    NameTooLong { len: usize, max: usize },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::AlreadyRegistered(id) => write!(f, "Connection {} already registered", id),
            RegistryError::NotRegistered(id) => write!(f, "Connection {} not registered", id),
            RegistryError::NameTooLong { len, max } => {
                write!(f, "Name of {} bytes exceeds the {} byte limit", len, max)
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Outbound delivery errors
#[derive(Debug, PartialEq, Eq)]
pub enum DispatchError {
    NotRegistered(ConnectionId),
    QueueFull(ConnectionId),
    QueueClosed(ConnectionId),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::NotRegistered(id) => write!(f, "Connection {} not registered", id),
            DispatchError::QueueFull(id) => write!(f, "Outbound queue of connection {} is full", id),
            DispatchError::QueueClosed(id) => {
                write!(f, "Outbound queue of connection {} is closed", id)
            }
        }
    }
}

impl std::error::Error for DispatchError {}

/// General relay error that encompasses all error types
#[derive(Debug)]
pub enum RelayError {
    Protocol(ProtocolError),
    Registry(RegistryError),
    Dispatch(DispatchError),
    Config(config::ConfigError),
    Io(io::Error),
    UnsupportedPeer(SocketAddr),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Protocol(e) => write!(f, "Protocol error: {}", e),
            RelayError::Registry(e) => write!(f, "Registry error: {}", e),
            RelayError::Dispatch(e) => write!(f, "Dispatch error: {}", e),
            RelayError::Config(e) => write!(f, "Configuration error: {}", e),
            RelayError::Io(e) => write!(f, "I/O error: {}", e),
            RelayError::UnsupportedPeer(addr) => {
                write!(f, "Peer {} has no IPv4 address", addr)
            }
        }
    }
}

impl std::error::Error for RelayError {}

impl From<ProtocolError> for RelayError {
    fn from(error: ProtocolError) -> Self {
        RelayError::Protocol(error)
    }
}

impl From<RegistryError> for RelayError {
    fn from(error: RegistryError) -> Self {
        RelayError::Registry(error)
    }
}

impl From<DispatchError> for RelayError {
    fn from(error: DispatchError) -> Self {
        RelayError::Dispatch(error)
    }
}

impl From<config::ConfigError> for RelayError {
    fn from(error: config::ConfigError) -> Self {
        RelayError::Config(error)
    }
}

impl From<io::Error> for RelayError {
    fn from(error: io::Error) -> Self {
        RelayError::Io(error)
    }
}
