//! Module `frame`
//!
//! Raw wire frames and their typed interpretation.
//!
//! Every frame on the wire is a command byte, a 4-byte address, a payload
//! free of 0x00 bytes, and a single 0x00 terminator.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use crate::error::ProtocolError;
use crate::protocol::address::{ADDRESS_LEN, Address};

/// Byte terminating every frame.
pub const TERMINATOR: u8 = 0x00;

/// Longest display name accepted by a welcome.
pub const MAX_NAME_LEN: usize = 10;

/// Longest chat or typing payload that is forwarded.
pub const MAX_MESSAGE_LEN: usize = 50;

/// Separator between online table entries.
pub const TABLE_SEPARATOR: u8 = b'\n';

pub const CMD_WELCOME: u8 = b'w';
pub const CMD_CHAT: u8 = b'm';
pub const CMD_TYPING: u8 = b't';
pub const CMD_TABLE: u8 = b'a';
pub const CMD_JOINED: u8 = b'c';
pub const CMD_LEFT: u8 = b'd';
pub const CMD_KEEPALIVE: u8 = b'k';

/// One undecoded protocol unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub command: u8,
    pub address: Address,
    pub payload: Bytes,
}

impl RawFrame {
    pub fn new(command: u8, address: Address, payload: impl Into<Bytes>) -> Self {
        Self {
            command,
            address,
            payload: payload.into(),
        }
    }

    /// Number of bytes this frame occupies on the wire, terminator included.
    pub fn wire_len(&self) -> usize {
        1 + ADDRESS_LEN + self.payload.len() + 1
    }

    /// Appends the wire form of this frame to `dst`.
    pub fn encode_into(&self, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        if self.payload.contains(&TERMINATOR) {
            return Err(ProtocolError::EmbeddedTerminator {
                command: self.command,
            });
        }
        dst.reserve(self.wire_len());
        dst.put_u8(self.command);
        dst.put_slice(self.address.as_bytes());
        dst.put_slice(&self.payload);
        dst.put_u8(TERMINATOR);
        Ok(())
    }

    pub fn encode(&self) -> Result<Bytes, ProtocolError> {
        let mut buf = BytesMut::with_capacity(self.wire_len());
        self.encode_into(&mut buf)?;
        Ok(buf.freeze())
    }
}

impl fmt::Display for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' {} \"{}\"",
            char::from(self.command).escape_default(),
            self.address,
            String::from_utf8_lossy(&self.payload).escape_default()
        )
    }
}

/// One row of the online table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub address: Address,
    pub name: Bytes,
}

/// Typed view of a frame.
///
/// Client-originated address fields are kept as received; the session
/// handler never trusts them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Welcome { address: Address, name: Bytes },
    Chat { address: Address, text: Bytes },
    Typing { address: Address, payload: Bytes },
    TableRequest,
    OnlineTable(Vec<TableEntry>),
    Joined { address: Address, name: Bytes },
    Left { address: Address },
    Keepalive,
    Unknown(RawFrame),
}

impl Frame {
    /// Interprets a frame received by the server.
    pub fn from_client(raw: RawFrame) -> Self {
        match raw.command {
            CMD_WELCOME => Frame::Welcome {
                address: raw.address,
                name: raw.payload,
            },
            CMD_CHAT => Frame::Chat {
                address: raw.address,
                text: raw.payload,
            },
            CMD_TYPING => Frame::Typing {
                address: raw.address,
                payload: raw.payload,
            },
            CMD_TABLE => Frame::TableRequest,
            _ => Frame::Unknown(raw),
        }
    }

    /// Interprets a frame received by a client.
    pub fn from_server(raw: RawFrame) -> Self {
        match raw.command {
            CMD_CHAT => Frame::Chat {
                address: raw.address,
                text: raw.payload,
            },
            CMD_TYPING => Frame::Typing {
                address: raw.address,
                payload: raw.payload,
            },
            CMD_TABLE => Frame::OnlineTable(parse_table(raw.payload)),
            CMD_JOINED => Frame::Joined {
                address: raw.address,
                name: raw.payload,
            },
            CMD_LEFT => Frame::Left {
                address: raw.address,
            },
            CMD_KEEPALIVE => Frame::Keepalive,
            _ => Frame::Unknown(raw),
        }
    }

    pub fn to_raw(&self) -> RawFrame {
        match self {
            Frame::Welcome { address, name } => RawFrame::new(CMD_WELCOME, *address, name.clone()),
            Frame::Chat { address, text } => RawFrame::new(CMD_CHAT, *address, text.clone()),
            Frame::Typing { address, payload } => {
                RawFrame::new(CMD_TYPING, *address, payload.clone())
            }
            Frame::TableRequest => RawFrame::new(CMD_TABLE, Address::UNSPECIFIED, Bytes::new()),
            Frame::OnlineTable(entries) => {
                let mut payload = BytesMut::new();
                for entry in entries {
                    payload.put_slice(entry.address.as_bytes());
                    payload.put_slice(&entry.name);
                    payload.put_u8(TABLE_SEPARATOR);
                }
                RawFrame::new(CMD_TABLE, Address::UNSPECIFIED, payload.freeze())
            }
            Frame::Joined { address, name } => RawFrame::new(CMD_JOINED, *address, name.clone()),
            Frame::Left { address } => RawFrame::new(CMD_LEFT, *address, Bytes::new()),
            Frame::Keepalive => RawFrame::new(CMD_KEEPALIVE, Address::UNSPECIFIED, Bytes::new()),
            Frame::Unknown(raw) => raw.clone(),
        }
    }
}

/// Splits an online table payload into entries.
///
/// Each entry starts with exactly four address bytes, so an address octet
/// equal to `\n` does not end the entry early.
fn parse_table(mut payload: Bytes) -> Vec<TableEntry> {
    let mut entries = Vec::new();
    while payload.len() >= ADDRESS_LEN {
        let mut octets = [0u8; ADDRESS_LEN];
        payload.copy_to_slice(&mut octets);
        let end = payload
            .iter()
            .position(|&b| b == TABLE_SEPARATOR)
            .unwrap_or(payload.len());
        let name = payload.split_to(end);
        if payload.has_remaining() {
            payload.advance(1);
        }
        entries.push(TableEntry {
            address: Address::new(octets),
            name,
        });
    }
    entries
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Welcome { name, .. } => write!(f, "Welcome {}", String::from_utf8_lossy(name)),
            Frame::Chat { address, text } => {
                write!(f, "Message from {}: {}", address, String::from_utf8_lossy(text))
            }
            Frame::Typing { address, .. } => write!(f, "Typing {}", address),
            Frame::TableRequest => write!(f, "Online table request"),
            Frame::OnlineTable(entries) => {
                let clients: Vec<String> = entries
                    .iter()
                    .map(|e| format!("{}: {}", e.address, String::from_utf8_lossy(&e.name)))
                    .collect();
                write!(f, "Available clients: [{}]", clients.join(", "))
            }
            Frame::Joined { address, name } => {
                write!(f, "New client {}: {}", address, String::from_utf8_lossy(name))
            }
            Frame::Left { address } => write!(f, "Client disconnected {}", address),
            Frame::Keepalive => write!(f, "Keepalive"),
            Frame::Unknown(raw) => write!(f, "Unknown frame {}", raw),
        }
    }
}

/// Renders bytes as space-separated hex for trace logging.
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = Address::new([127, 1, 1, 2]);

    #[test]
    fn test_keepalive_is_six_bytes() {
        let wire = Frame::Keepalive.to_raw().encode().unwrap();
        assert_eq!(&wire[..], b"k\x00\x00\x00\x00\x00");
    }

    #[test]
    fn test_encode_rejects_embedded_terminator() {
        let raw = RawFrame::new(CMD_CHAT, ALICE, &b"hi\x00there"[..]);
        assert!(matches!(
            raw.encode(),
            Err(ProtocolError::EmbeddedTerminator { command: b'm' })
        ));
    }

    #[test]
    fn test_from_client_maps_commands() {
        let raw = RawFrame::new(CMD_WELCOME, ALICE, &b"alice"[..]);
        assert_eq!(
            Frame::from_client(raw),
            Frame::Welcome {
                address: ALICE,
                name: Bytes::from_static(b"alice")
            }
        );
        let raw = RawFrame::new(CMD_TABLE, Address::UNSPECIFIED, Bytes::new());
        assert_eq!(Frame::from_client(raw), Frame::TableRequest);
    }

    #[test]
    fn test_server_only_commands_are_unknown_from_client() {
        for command in [CMD_JOINED, CMD_LEFT, CMD_KEEPALIVE, b'z'] {
            let raw = RawFrame::new(command, ALICE, Bytes::new());
            assert_eq!(Frame::from_client(raw.clone()), Frame::Unknown(raw));
        }
    }

    #[test]
    fn test_online_table_layout() {
        let table = Frame::OnlineTable(vec![
            TableEntry {
                address: ALICE,
                name: Bytes::from_static(b"alice"),
            },
            TableEntry {
                address: Address::new([127, 1, 1, 3]),
                name: Bytes::from_static(b"bob"),
            },
        ]);
        let wire = table.to_raw().encode().unwrap();
        assert_eq!(
            &wire[..],
            b"a\x00\x00\x00\x00\x7f\x01\x01\x02alice\n\x7f\x01\x01\x03bob\n\x00"
        );
    }

    #[test]
    fn test_online_table_parse_tolerates_newline_octet() {
        let entries = vec![
            TableEntry {
                address: Address::new([10, 10, 10, 10]),
                name: Bytes::from_static(b"nl"),
            },
            TableEntry {
                address: Address::new([1, 2, 3, 4]),
                name: Bytes::from_static(b"x"),
            },
        ];
        let raw = Frame::OnlineTable(entries.clone()).to_raw();
        assert_eq!(Frame::from_server(raw), Frame::OnlineTable(entries));
    }

    #[test]
    fn test_empty_online_table() {
        let raw = RawFrame::new(CMD_TABLE, Address::UNSPECIFIED, Bytes::new());
        assert_eq!(Frame::from_server(raw), Frame::OnlineTable(Vec::new()));
    }

    #[test]
    fn test_display() {
        let frame = Frame::Joined {
            address: ALICE,
            name: Bytes::from_static(b"alice"),
        };
        assert_eq!(frame.to_string(), "New client 127.1.1.2: alice");
        assert_eq!(hex_dump(b"k\x00"), "6b 00");
    }
}
