//! Connection registry
//!
//! Shared table of live connections and their display names.

pub mod entry;
pub mod table;

pub use entry::{ConnectionId, Entry};
pub use table::Registry;

use std::sync::Arc;
use tokio::sync::Mutex;

/// Registry handle shared by every connection task.
pub type SharedRegistry = Arc<Mutex<Registry>>;
