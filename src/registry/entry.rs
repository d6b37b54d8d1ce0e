//! Module `entry`
//!
//! Defines the per-connection record kept in the registry.

use bytes::Bytes;
use std::fmt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::protocol::Address;

/// Server-assigned identity of one accepted connection.
///
/// Ids are handed out in increasing order, so ordering by id is ordering
/// by accept time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Represents one live connection as seen by the registry.
///
/// Holds the peer address, the display name once a welcome succeeded, the
/// sending side of the connection's outbound queue, and the token that
/// stops all of the connection's tasks.
#[derive(Debug)]
pub struct Entry {
    address: Address,
    name: Option<Bytes>,
    outbound: mpsc::Sender<Bytes>,
    shutdown: CancellationToken,
}

impl Entry {
    pub fn new(address: Address, outbound: mpsc::Sender<Bytes>, shutdown: CancellationToken) -> Self {
        Self {
            address,
            name: None,
            outbound,
            shutdown,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Returns the display name if the connection completed a welcome.
    pub fn name(&self) -> Option<&Bytes> {
        self.name.as_ref()
    }

    /// Returns whether the connection is broadcast-eligible.
    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }

    pub fn outbound(&self) -> &mpsc::Sender<Bytes> {
        &self.outbound
    }

    pub fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub(crate) fn set_name(&mut self, name: Bytes) {
        self.name = Some(name);
    }
}
