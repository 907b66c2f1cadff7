//! WebSocket server
//!
//! Accepts connections, runs one subscriber session per connection, and drives
//! the broadcast engine in the background.

pub mod config;
pub mod listener;

pub use config::{ServerConfig, DEFAULT_PORT};
pub use listener::LocatorServer;
