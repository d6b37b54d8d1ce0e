//! Peer addresses as carried on the wire.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Length of the address field in every frame.
pub const ADDRESS_LEN: usize = 4;

/// Four raw IPv4 octets identifying a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// The all-zero address used in server frames where the field is unused.
    pub const UNSPECIFIED: Address = Address([0; ADDRESS_LEN]);

    pub const fn new(octets: [u8; ADDRESS_LEN]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; ADDRESS_LEN] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns true if any octet is 0x00 and therefore cannot be embedded in a payload.
    pub fn has_zero_octet(&self) -> bool {
        self.0.contains(&0)
    }

    /// Derives the wire address of a peer.
    ///
    /// IPv4-mapped IPv6 peers are unmapped; any other IPv6 peer has no
    /// representation and yields `None`.
    pub fn from_peer(peer: &SocketAddr) -> Option<Self> {
        match peer.ip() {
            IpAddr::V4(v4) => Some(v4.into()),
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map(Into::into),
        }
    }
}

impl From<Ipv4Addr> for Address {
    fn from(ip: Ipv4Addr) -> Self {
        Self(ip.octets())
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(octets: [u8; ADDRESS_LEN]) -> Self {
        Self(octets)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{}.{}.{}.{}", a, b, c, d)
    }
}
