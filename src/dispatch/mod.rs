//! Outbound delivery
//!
//! Broadcast, direct sends, disconnect, and keepalive probing.

pub mod broadcast;
pub mod keepalive;

pub use broadcast::Dispatcher;
pub use keepalive::run_keepalive;
