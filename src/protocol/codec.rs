//! Module `codec`
//!
//! Byte-at-a-time frame decoder and the matching encoder, usable with
//! `tokio_util::codec::{FramedRead, FramedWrite, Framed}`.

use bytes::{Buf, BufMut, BytesMut};
use log::warn;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;
use crate::protocol::address::{ADDRESS_LEN, Address};
use crate::protocol::frame::{RawFrame, TERMINATOR};

/// Payload cap applied when no explicit limit is configured.
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 512;

/// Where the decoder is within the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    /// Next byte is a command byte.
    AwaitingCommand,
    /// `n` address bytes have been read so far.
    ReadingAddress(usize),
    /// Bytes are payload until a 0x00 arrives.
    ReadingPayload,
    /// Payload overflowed; bytes are dropped until the next 0x00.
    Discarding,
}

/// Resumable frame decoder.
///
/// Progress is kept across calls, so a frame may arrive split over any
/// number of reads.
#[derive(Debug)]
pub struct FrameCodec {
    state: DecodeState,
    command: u8,
    address: [u8; ADDRESS_LEN],
    payload: BytesMut,
    max_payload_len: usize,
}

impl FrameCodec {
    pub fn new(max_payload_len: usize) -> Self {
        Self {
            state: DecodeState::AwaitingCommand,
            command: 0,
            address: [0; ADDRESS_LEN],
            payload: BytesMut::new(),
            max_payload_len,
        }
    }

    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Returns true while a frame has been started but not terminated.
    pub fn is_mid_frame(&self) -> bool {
        self.state != DecodeState::AwaitingCommand
    }

    /// Feeds one byte, returning a frame when this byte terminates one.
    pub fn push(&mut self, byte: u8) -> Option<RawFrame> {
        match self.state {
            DecodeState::AwaitingCommand => {
                self.command = byte;
                self.address = [0; ADDRESS_LEN];
                self.payload.clear();
                self.state = DecodeState::ReadingAddress(0);
                None
            }
            DecodeState::ReadingAddress(n) => {
                self.address[n] = byte;
                self.state = if n + 1 == ADDRESS_LEN {
                    DecodeState::ReadingPayload
                } else {
                    DecodeState::ReadingAddress(n + 1)
                };
                None
            }
            DecodeState::ReadingPayload if byte == TERMINATOR => {
                self.state = DecodeState::AwaitingCommand;
                Some(RawFrame {
                    command: self.command,
                    address: Address::new(self.address),
                    payload: self.payload.split().freeze(),
                })
            }
            DecodeState::ReadingPayload => {
                if self.payload.len() >= self.max_payload_len {
                    warn!(
                        "Dropping '{}' frame: payload exceeds {} bytes",
                        char::from(self.command).escape_default(),
                        self.max_payload_len
                    );
                    self.payload.clear();
                    self.state = DecodeState::Discarding;
                } else {
                    self.payload.put_u8(byte);
                }
                None
            }
            DecodeState::Discarding => {
                if byte == TERMINATOR {
                    self.state = DecodeState::AwaitingCommand;
                }
                None
            }
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD_LEN)
    }
}

impl Decoder for FrameCodec {
    type Item = RawFrame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<RawFrame>, ProtocolError> {
        while src.has_remaining() {
            if let Some(frame) = self.push(src.get_u8()) {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }
}

impl Encoder<RawFrame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: RawFrame, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        item.encode_into(dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::{CMD_CHAT, CMD_WELCOME};
    use bytes::Bytes;

    fn decode_all(codec: &mut FrameCodec, bytes: &[u8]) -> Vec<RawFrame> {
        let mut src = BytesMut::from(bytes);
        let mut frames = Vec::new();
        while let Some(frame) = codec.decode(&mut src).unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_encode_then_decode_preserves_fields() {
        let mut codec = FrameCodec::default();
        let cases = [
            RawFrame::new(CMD_WELCOME, Address::new([1, 2, 3, 4]), &b"alice"[..]),
            RawFrame::new(CMD_CHAT, Address::new([0, 0, 0, 0]), Bytes::new()),
            RawFrame::new(0xff, Address::new([255, 0, 10, 0]), &b"\xc3\xa9t\xc3\xa9"[..]),
        ];
        for frame in cases {
            let mut wire = BytesMut::new();
            codec.encode(frame.clone(), &mut wire).unwrap();
            assert_eq!(decode_all(&mut codec, &wire), vec![frame]);
        }
    }

    #[test]
    fn test_resumes_across_partial_reads() {
        let mut codec = FrameCodec::default();
        let wire = b"m\x7f\x00\x00\x01hello\x00";
        let mut frames = Vec::new();
        for chunk in wire.chunks(3) {
            frames.extend(decode_all(&mut codec, chunk));
            if frames.is_empty() {
                assert!(codec.is_mid_frame());
            }
        }
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0].payload[..], b"hello");
        assert!(!codec.is_mid_frame());
    }

    #[test]
    fn test_zero_bytes_in_address_are_data() {
        let mut codec = FrameCodec::default();
        let frames = decode_all(&mut codec, b"d\x00\x00\x00\x00\x00");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].address, Address::UNSPECIFIED);
        assert!(frames[0].payload.is_empty());
    }

    #[test]
    fn test_multiple_frames_in_one_read() {
        let mut codec = FrameCodec::default();
        let frames = decode_all(&mut codec, b"m\x01\x02\x03\x04a\x00t\x01\x02\x03\x04\x00");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].command, b'm');
        assert_eq!(frames[1].command, b't');
    }

    #[test]
    fn test_early_terminator_splits_frame() {
        let mut codec = FrameCodec::default();
        // The 0x00 after "ab" ends the first frame; "cd" starts a new one.
        let frames = decode_all(&mut codec, b"m\x01\x02\x03\x04ab\x00cd");
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0].payload[..], b"ab");
        assert_eq!(codec.state(), DecodeState::ReadingAddress(1));
    }

    #[test]
    fn test_oversized_payload_is_discarded() {
        let mut codec = FrameCodec::new(4);
        let frames = decode_all(&mut codec, b"m\x01\x02\x03\x04abcdefgh");
        assert!(frames.is_empty());
        assert_eq!(codec.state(), DecodeState::Discarding);

        let frames = decode_all(&mut codec, b"ijk\x00m\x01\x02\x03\x04ok\x00");
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0].payload[..], b"ok");
    }

    #[test]
    fn test_payload_at_limit_is_kept() {
        let mut codec = FrameCodec::new(4);
        let frames = decode_all(&mut codec, b"m\x01\x02\x03\x04abcd\x00");
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0].payload[..], b"abcd");
    }
}
