//! Locator client
//!
//! Subscribes to a locator server and yields the count for one circle after
//! every refresh.

pub mod watcher;

pub use watcher::{Watcher, WatcherConfig};
