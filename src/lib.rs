pub mod config;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;

pub use config::RelayConfig;
pub use server::Server;
