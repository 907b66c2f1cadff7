//! # locator-rs
//!
//! Pushes a live count of tracked objects inside a circle to every connected
//! WebSocket client.
//!
//! Each client sends a center and a radius once. The server polls a snapshot
//! feed (the OpenSky Network by default) on a fixed interval, and after every
//! successful poll tells each client how many objects are now inside its circle.
//!
//! ## Quick start
//!
//! ```no_run
//! use locator_rs::feed::OpenSkyFeed;
//! use locator_rs::{LocatorServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = LocatorServer::new(ServerConfig::default(), OpenSkyFeed::new()?);
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Layout
//!
//! - [`geo`]: great-circle distance
//! - [`snapshot`]: tracked objects and the atomically replaced snapshot store
//! - [`registry`]: subscribers, their filters and single-slot delivery
//! - [`engine`]: the refresh/broadcast cycle
//! - [`session`]: per-connection subscriber lifecycle
//! - [`server`]: accept loop and configuration
//! - [`feed`], [`transport`]: the snapshot source and the client connection

pub mod client;
pub mod engine;
pub mod error;
pub mod feed;
pub mod geo;
pub mod registry;
pub mod server;
pub mod session;
pub mod snapshot;
pub mod stats;
pub mod transport;

pub use engine::{BroadcastEngine, EngineConfig};
pub use error::{Error, Result};
pub use server::{LocatorServer, ServerConfig};
