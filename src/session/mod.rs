//! Client session handling
//!
//! Applies client frames to the registry and dispatcher.

pub mod handler;
pub mod results;

pub use handler::SessionHandler;
pub use results::{DropReason, SessionOutcome};
