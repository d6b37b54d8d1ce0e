//! Server core functionality
//!
//! This module contains the accept loop and the per-connection tasks.

pub mod connection;
pub mod core;

pub use core::Server;
