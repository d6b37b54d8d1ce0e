//! Relay wire protocol
//!
//! Handles frame decoding, encoding, and typed interpretation.

pub mod address;
pub mod codec;
pub mod frame;

pub use address::Address;
pub use codec::{DecodeState, FrameCodec};
pub use frame::{Frame, RawFrame, TableEntry};
