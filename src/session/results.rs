//! Session result types
//!
//! Defines what the session handler did with each frame.

/// Outcome of handling one client frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Name stored; the joined notice reached `recipients` connections.
    Joined { recipients: usize },
    /// Chat or typing frame queued for `recipients` connections.
    Forwarded { recipients: usize },
    /// Online table queued for the requester.
    TableSent,
    Dropped(DropReason),
    /// Frame has no meaning for the server.
    Ignored,
}

/// Why a frame was silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    UnknownClient,
    NameTooLong,
    MessageTooLong,
    Undeliverable,
}
